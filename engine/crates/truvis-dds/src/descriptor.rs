use serde::{Deserialize, Serialize};

use crate::dxgi::resolve_dxgi_format;
use crate::error::{DdsError, FormatError};
use crate::header::{Caps2, D3D10_RESOURCE_DIMENSION_TEXTURE3D, D3D10_RESOURCE_MISC_TEXTURECUBE, RawHeaders};
use crate::layout::MipLayout;
use crate::legacy::resolve_legacy_format;
use crate::pixel_format::{ColorSpace, PixelFormat};

/// 超过这个数量的 mip 一定是坏文件
pub const MAX_MIP_COUNT: u32 = 32;
/// D3D11 的 texture array 上限
pub const MAX_ARRAY_SIZE: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureDimension {
    Texture2D,
    Texture3D,
    Cube,
}

/// 从文件头解析出的纹理描述，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub width: u32,
    pub height: u32,
    /// 非 volume 纹理恒为 1
    pub depth: u32,
    pub mip_count: u32,
    pub format: PixelFormat,
    pub color_space: ColorSpace,
    pub dimension: TextureDimension,
    /// 至少为 1；cubemap 数组中每个元素包含 6 个面
    pub array_size: u32,
    /// payload 在文件中的起始偏移
    pub data_offset: usize,
}

// new & init
impl FormatDescriptor {
    pub fn from_headers(raw: &RawHeaders) -> Result<Self, DdsError> {
        let header = &raw.header;
        let caps2 = Caps2::from_bits_retain(header.caps2);

        let mip_count = header.mip_map_count.max(1);
        if mip_count > MAX_MIP_COUNT {
            return Err(FormatError::InvalidMipCount(mip_count).into());
        }

        let (format, dimension, array_size) = match &raw.header10 {
            Some(header10) => {
                let format = resolve_dxgi_format(header10.dxgi_format)?;
                let dimension = if header10.resource_dimension == D3D10_RESOURCE_DIMENSION_TEXTURE3D {
                    TextureDimension::Texture3D
                } else if header10.misc_flag & D3D10_RESOURCE_MISC_TEXTURECUBE != 0 {
                    TextureDimension::Cube
                } else {
                    TextureDimension::Texture2D
                };
                (format, dimension, header10.array_size.max(1))
            }
            None => {
                if header.pixel_format.size != 32 {
                    log::warn!("DDS pixel format block declares size {}, expected 32", header.pixel_format.size);
                }
                let format = resolve_legacy_format(&header.pixel_format)?;
                let dimension = if caps2.contains(Caps2::VOLUME) {
                    TextureDimension::Texture3D
                } else if caps2.contains(Caps2::CUBEMAP) {
                    TextureDimension::Cube
                } else {
                    TextureDimension::Texture2D
                };
                (format, dimension, 1)
            }
        };
        if array_size > MAX_ARRAY_SIZE {
            return Err(FormatError::InvalidArraySize(array_size).into());
        }

        let depth = match dimension {
            TextureDimension::Texture3D => header.depth.max(1),
            _ => 1,
        };

        let descriptor = Self {
            width: header.width,
            height: header.height,
            depth,
            mip_count,
            format,
            color_space: format.color_space(),
            dimension,
            array_size,
            data_offset: raw.data_offset(),
        };
        // payload 大小超出内存寻址范围的文件头在这里就失败
        descriptor.mip_layout()?;
        Ok(descriptor)
    }

    /// 调用方指定颜色空间
    ///
    /// legacy 文件头无法表达 sRGB，`linear = false` 时把格式提升为对应的 sRGB 格式；
    /// 没有对应版本的格式保持不变。颜色空间仍然由格式白名单决定。
    pub fn with_linear_override(mut self, linear: bool) -> Self {
        let twin = if linear { self.format.unorm_twin() } else { self.format.srgb_twin() };
        if let Some(format) = twin {
            self.format = format;
        }
        self.color_space = self.format.color_space();
        self
    }
}

// getters
impl FormatDescriptor {
    #[inline]
    pub fn is_volume(&self) -> bool {
        self.dimension == TextureDimension::Texture3D
    }

    #[inline]
    pub fn is_cubemap(&self) -> bool {
        self.dimension == TextureDimension::Cube
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.array_size > 1
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        self.color_space == ColorSpace::Linear
    }

    /// 实际的图像层数：cubemap 每个数组元素 6 个面
    #[inline]
    pub fn layer_count(&self) -> u32 {
        if self.is_cubemap() { self.array_size * 6 } else { self.array_size }
    }

    pub fn mip_layout(&self) -> Result<MipLayout, FormatError> {
        MipLayout::new(
            self.format,
            self.dimension,
            [self.width, self.height, self.depth],
            self.mip_count,
            self.layer_count(),
        )
    }
}

/// 解析文件开头的字节（至少包含完整文件头），得到纹理描述
pub fn decode_header(bytes: &[u8]) -> Result<FormatDescriptor, DdsError> {
    let raw = RawHeaders::read(bytes)?;
    FormatDescriptor::from_headers(&raw)
}
