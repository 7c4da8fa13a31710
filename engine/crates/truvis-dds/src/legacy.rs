//! legacy 像素格式描述 (bitmask + fourCC) 到 [`PixelFormat`] 的映射
//!
//! 基本上是 DirectXTex 中 `GetDXGIFormat` 的翻译，只保留能映射到 [`PixelFormat`] 的项。
//! sRGB 格式只能写在 DX10 扩展头里，这里不会产生 sRGB 格式。

use crate::error::UnsupportedFormatError;
use crate::header::{
    DdsPixelFormat, FOURCC_DXT1, FOURCC_DXT2, FOURCC_DXT3, FOURCC_DXT4, FOURCC_DXT5, PixelFormatFlags, make_four_cc,
};
use crate::pixel_format::PixelFormat;

/// (bit count, r, g, b, a) -> format
type MaskEntry = (u32, u32, u32, u32, u32, PixelFormat);

const RGB_TABLE: &[MaskEntry] = &[
    (32, 0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000, PixelFormat::R8G8B8A8Unorm),
    (32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000, PixelFormat::B8G8R8A8Unorm),
    (32, 0x3FF0_0000, 0x000F_FC00, 0x0000_03FF, 0xC000_0000, PixelFormat::A2R10G10B10UnormPack32),
    (32, 0x0000_FFFF, 0xFFFF_0000, 0, 0, PixelFormat::R16G16Unorm),
    (32, 0xFFFF_FFFF, 0, 0, 0, PixelFormat::R32Sfloat),
    (16, 0x7C00, 0x03E0, 0x001F, 0x8000, PixelFormat::B5G5R5A1UnormPack16),
    (16, 0xF800, 0x07E0, 0x001F, 0, PixelFormat::B5G6R5UnormPack16),
    (16, 0x0F00, 0x00F0, 0x000F, 0xF000, PixelFormat::B4G4R4A4UnormPack16),
    (16, 0x00FF, 0, 0, 0xFF00, PixelFormat::R8G8Unorm),
    (16, 0xFFFF, 0, 0, 0, PixelFormat::R16Unorm),
    (8, 0xFF, 0, 0, 0, PixelFormat::R8Unorm),
];

const LUMINANCE_TABLE: &[MaskEntry] = &[
    (16, 0xFFFF, 0, 0, 0, PixelFormat::R16Unorm),
    (16, 0x00FF, 0, 0, 0xFF00, PixelFormat::R8G8Unorm),
    // L16 写成了三个通道，按 L16 读取
    (16, 0xFFFF, 0xFFFF, 0xFFFF, 0, PixelFormat::R16Unorm),
    (8, 0xFF, 0, 0, 0, PixelFormat::R8Unorm),
    (8, 0x00FF, 0, 0, 0xFF00, PixelFormat::R8G8Unorm),
    // 有些 L8 高度图把三个通道都填了 0xFF
    (8, 0xFF, 0xFF, 0xFF, 0, PixelFormat::R8Unorm),
];

const BUMP_DUDV_TABLE: &[MaskEntry] = &[
    (32, 0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000, PixelFormat::R8G8B8A8Snorm),
    (32, 0x0000_FFFF, 0xFFFF_0000, 0, 0, PixelFormat::R16G16Snorm),
    (16, 0x00FF, 0xFF00, 0, 0, PixelFormat::R8G8Snorm),
];

const FOURCC_TABLE: &[(u32, PixelFormat)] = &[
    (FOURCC_DXT1, PixelFormat::Bc1Unorm),
    (FOURCC_DXT3, PixelFormat::Bc2Unorm),
    (FOURCC_DXT5, PixelFormat::Bc3Unorm),
    // premultiplied alpha 没有单独的格式，数据布局与 DXT3/DXT5 相同
    (FOURCC_DXT2, PixelFormat::Bc2Unorm),
    (FOURCC_DXT4, PixelFormat::Bc3Unorm),
    (make_four_cc(b"ATI1"), PixelFormat::Bc4Unorm),
    (make_four_cc(b"BC4U"), PixelFormat::Bc4Unorm),
    (make_four_cc(b"BC4S"), PixelFormat::Bc4Snorm),
    (make_four_cc(b"ATI2"), PixelFormat::Bc5Unorm),
    (make_four_cc(b"BC5U"), PixelFormat::Bc5Unorm),
    (make_four_cc(b"BC5S"), PixelFormat::Bc5Snorm),
    // D3DFORMAT 枚举值直接写在 fourCC 里
    (36, PixelFormat::R16G16B16A16Unorm),  // D3DFMT_A16B16G16R16
    (110, PixelFormat::R16G16B16A16Snorm), // D3DFMT_Q16W16V16U16
    (111, PixelFormat::R16Sfloat),         // D3DFMT_R16F
    (112, PixelFormat::R16G16Sfloat),      // D3DFMT_G16R16F
    (113, PixelFormat::R16G16B16A16Sfloat), // D3DFMT_A16B16G16R16F
    (114, PixelFormat::R32Sfloat),         // D3DFMT_R32F
    (115, PixelFormat::R32G32Sfloat),      // D3DFMT_G32R32F
    (116, PixelFormat::R32G32B32A32Sfloat), // D3DFMT_A32B32G32R32F
];

fn match_masks(table: &[MaskEntry], ddpf: &DdsPixelFormat) -> Option<PixelFormat> {
    table
        .iter()
        .find(|(bits, r, g, b, a, _)| ddpf.rgb_bit_count == *bits && ddpf.is_bit_mask(*r, *g, *b, *a))
        .map(|entry| entry.5)
}

/// 按 RGB -> LUMINANCE -> ALPHA -> BUMPDUDV -> FOURCC 的顺序解析 legacy 像素格式
pub fn resolve_legacy_format(ddpf: &DdsPixelFormat) -> Result<PixelFormat, UnsupportedFormatError> {
    let flags = ddpf.flags();

    let format = if flags.contains(PixelFormatFlags::RGB) {
        match_masks(RGB_TABLE, ddpf)
    } else if flags.contains(PixelFormatFlags::LUMINANCE) {
        match_masks(LUMINANCE_TABLE, ddpf)
    } else if flags.contains(PixelFormatFlags::ALPHA) {
        (ddpf.rgb_bit_count == 8).then_some(PixelFormat::A8Unorm)
    } else if flags.contains(PixelFormatFlags::BUMP_DUDV) {
        match_masks(BUMP_DUDV_TABLE, ddpf)
    } else if flags.contains(PixelFormatFlags::FOUR_CC) {
        FOURCC_TABLE.iter().find(|(code, _)| *code == ddpf.four_cc).map(|entry| entry.1)
    } else {
        None
    };

    format.ok_or(UnsupportedFormatError::PixelFormat {
        flags: ddpf.flags,
        bit_count: ddpf.rgb_bit_count,
        r_mask: ddpf.r_bit_mask,
        g_mask: ddpf.g_bit_mask,
        b_mask: ddpf.b_bit_mask,
        a_mask: ddpf.a_bit_mask,
        four_cc: ddpf.four_cc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(bits: u32, r: u32, g: u32, b: u32, a: u32) -> DdsPixelFormat {
        DdsPixelFormat {
            size: 32,
            flags: (PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS).bits(),
            rgb_bit_count: bits,
            r_bit_mask: r,
            g_bit_mask: g,
            b_bit_mask: b,
            a_bit_mask: a,
            ..Default::default()
        }
    }

    fn four_cc(code: u32) -> DdsPixelFormat {
        DdsPixelFormat {
            size: 32,
            flags: PixelFormatFlags::FOUR_CC.bits(),
            four_cc: code,
            ..Default::default()
        }
    }

    #[test]
    fn test_rgba8_masks() {
        let ddpf = rgb(32, 0xFF, 0xFF00, 0xFF_0000, 0xFF00_0000);
        assert_eq!(resolve_legacy_format(&ddpf), Ok(PixelFormat::R8G8B8A8Unorm));

        let ddpf = rgb(32, 0xFF_0000, 0xFF00, 0xFF, 0xFF00_0000);
        assert_eq!(resolve_legacy_format(&ddpf), Ok(PixelFormat::B8G8R8A8Unorm));
    }

    #[test]
    fn test_bgrx_is_unsupported() {
        let ddpf = rgb(32, 0xFF_0000, 0xFF00, 0xFF, 0);
        let err = resolve_legacy_format(&ddpf).unwrap_err();
        match err {
            UnsupportedFormatError::PixelFormat { bit_count, a_mask, .. } => {
                assert_eq!(bit_count, 32);
                assert_eq!(a_mask, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_luminance_heightmap() {
        let ddpf = DdsPixelFormat {
            flags: PixelFormatFlags::LUMINANCE.bits(),
            rgb_bit_count: 8,
            r_bit_mask: 0xFF,
            g_bit_mask: 0xFF,
            b_bit_mask: 0xFF,
            ..Default::default()
        };
        assert_eq!(resolve_legacy_format(&ddpf), Ok(PixelFormat::R8Unorm));
    }

    #[test]
    fn test_alpha_only() {
        let ddpf = DdsPixelFormat {
            flags: PixelFormatFlags::ALPHA.bits(),
            rgb_bit_count: 8,
            a_bit_mask: 0xFF,
            ..Default::default()
        };
        assert_eq!(resolve_legacy_format(&ddpf), Ok(PixelFormat::A8Unorm));
    }

    #[test]
    fn test_bump_dudv() {
        let ddpf = DdsPixelFormat {
            flags: PixelFormatFlags::BUMP_DUDV.bits(),
            rgb_bit_count: 16,
            r_bit_mask: 0x00FF,
            g_bit_mask: 0xFF00,
            ..Default::default()
        };
        assert_eq!(resolve_legacy_format(&ddpf), Ok(PixelFormat::R8G8Snorm));
    }

    #[test]
    fn test_four_cc_codes() {
        assert_eq!(resolve_legacy_format(&four_cc(FOURCC_DXT1)), Ok(PixelFormat::Bc1Unorm));
        assert_eq!(resolve_legacy_format(&four_cc(FOURCC_DXT2)), Ok(PixelFormat::Bc2Unorm));
        assert_eq!(resolve_legacy_format(&four_cc(FOURCC_DXT4)), Ok(PixelFormat::Bc3Unorm));
        assert_eq!(resolve_legacy_format(&four_cc(make_four_cc(b"ATI2"))), Ok(PixelFormat::Bc5Unorm));
        assert_eq!(resolve_legacy_format(&four_cc(113)), Ok(PixelFormat::R16G16B16A16Sfloat));
        assert!(resolve_legacy_format(&four_cc(make_four_cc(b"YUY2"))).is_err());
    }
}
