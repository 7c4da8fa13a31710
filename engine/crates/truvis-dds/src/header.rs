//! DDS 文件头的内存布局
//!
//! 所有字段都是小端 u32，直接用 bytemuck 从字节流里读出来。
//! 参考: <https://learn.microsoft.com/en-us/windows/win32/direct3ddds/dds-header>

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::error::FormatError;

/// "DDS "
pub const DDS_MAGIC: u32 = 0x2053_4444;
/// `DdsHeader::size` 必须等于这个值
pub const DDS_HEADER_SIZE: u32 = 124;
/// magic + DdsHeader
pub const DDS_BASE_HEADER_LEN: usize = 4 + DDS_HEADER_SIZE as usize;
/// magic + DdsHeader + DdsHeaderDxt10
pub const DDS_MAX_HEADER_LEN: usize = DDS_BASE_HEADER_LEN + size_of::<DdsHeaderDxt10>();

pub const fn make_four_cc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

pub const FOURCC_DX10: u32 = make_four_cc(b"DX10");
pub const FOURCC_DXT1: u32 = make_four_cc(b"DXT1");
pub const FOURCC_DXT2: u32 = make_four_cc(b"DXT2");
pub const FOURCC_DXT3: u32 = make_four_cc(b"DXT3");
pub const FOURCC_DXT4: u32 = make_four_cc(b"DXT4");
pub const FOURCC_DXT5: u32 = make_four_cc(b"DXT5");

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PixelFormatFlags: u32 {
        const ALPHA_PIXELS = 0x1;
        const ALPHA = 0x2;
        const FOUR_CC = 0x4;
        const RGB = 0x40;
        const YUV = 0x200;
        const LUMINANCE = 0x2_0000;
        const BUMP_DUDV = 0x8_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps2: u32 {
        const CUBEMAP = 0x200;
        const VOLUME = 0x20_0000;
    }
}

/// DX10 扩展头里的 resource dimension
pub const D3D10_RESOURCE_DIMENSION_TEXTURE3D: u32 = 4;
/// DX10 扩展头里的 misc flag: cubemap
pub const D3D10_RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl DdsPixelFormat {
    #[inline]
    pub fn flags(&self) -> PixelFormatFlags {
        PixelFormatFlags::from_bits_retain(self.flags)
    }

    #[inline]
    pub fn is_bit_mask(&self, r: u32, g: u32, b: u32, a: u32) -> bool {
        self.r_bit_mask == r && self.g_bit_mask == g && self.b_bit_mask == b && self.a_bit_mask == a
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DdsHeaderDxt10 {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

/// 原始文件头，尚未做格式映射
#[derive(Debug, Clone, Copy)]
pub struct RawHeaders {
    pub header: DdsHeader,
    pub header10: Option<DdsHeaderDxt10>,
}

impl RawHeaders {
    /// 校验 magic 与 header size，并读出主文件头和（可选的）DX10 扩展头
    ///
    /// 校验失败时不会分配任何缓冲区。
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < 4 {
            return Err(FormatError::Truncated {
                expected: DDS_BASE_HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let magic = read_u32(bytes, 0);
        if magic != DDS_MAGIC {
            return Err(FormatError::InvalidMagic(magic));
        }
        if bytes.len() < DDS_BASE_HEADER_LEN {
            return Err(FormatError::Truncated {
                expected: DDS_BASE_HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let header: DdsHeader = bytemuck::pod_read_unaligned(&bytes[4..DDS_BASE_HEADER_LEN]);
        let header = header.to_native();
        if header.size != DDS_HEADER_SIZE {
            return Err(FormatError::InvalidHeaderSize(header.size));
        }

        let header10 = if header.pixel_format.four_cc == FOURCC_DX10 {
            if bytes.len() < DDS_MAX_HEADER_LEN {
                return Err(FormatError::Truncated {
                    expected: DDS_MAX_HEADER_LEN,
                    actual: bytes.len(),
                });
            }
            let header10: DdsHeaderDxt10 = bytemuck::pod_read_unaligned(&bytes[DDS_BASE_HEADER_LEN..DDS_MAX_HEADER_LEN]);
            Some(header10.to_native())
        } else {
            None
        };

        Ok(Self { header, header10 })
    }

    /// 像素数据在文件中的起始偏移
    #[inline]
    pub fn data_offset(&self) -> usize {
        if self.header10.is_some() { DDS_MAX_HEADER_LEN } else { DDS_BASE_HEADER_LEN }
    }
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

/// DDS 是小端格式；大端平台上按字段做一次转换
trait ToNative {
    fn to_native(self) -> Self;
}

impl ToNative for DdsHeader {
    fn to_native(mut self) -> Self {
        if cfg!(target_endian = "big") {
            for word in bytemuck::cast_slice_mut::<DdsHeader, u32>(std::slice::from_mut(&mut self)) {
                *word = u32::from_le(*word);
            }
        }
        self
    }
}

impl ToNative for DdsHeaderDxt10 {
    fn to_native(mut self) -> Self {
        if cfg!(target_endian = "big") {
            for word in bytemuck::cast_slice_mut::<DdsHeaderDxt10, u32>(std::slice::from_mut(&mut self)) {
                *word = u32::from_le(*word);
            }
        }
        self
    }
}
