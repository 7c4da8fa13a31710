//! DX10 扩展头中 DXGI_FORMAT 到 [`PixelFormat`] 的映射

use crate::error::UnsupportedFormatError;
use crate::pixel_format::PixelFormat;

pub fn resolve_dxgi_format(dxgi_format: u32) -> Result<PixelFormat, UnsupportedFormatError> {
    use PixelFormat as F;

    let format = match dxgi_format {
        2 => F::R32G32B32A32Sfloat,
        3 => F::R32G32B32A32Uint,
        4 => F::R32G32B32A32Sint,
        6 => F::R32G32B32Sfloat,
        7 => F::R32G32B32Uint,
        8 => F::R32G32B32Sint,
        10 => F::R16G16B16A16Sfloat,
        11 => F::R16G16B16A16Unorm,
        12 => F::R16G16B16A16Uint,
        13 => F::R16G16B16A16Snorm,
        14 => F::R16G16B16A16Sint,
        16 => F::R32G32Sfloat,
        17 => F::R32G32Uint,
        18 => F::R32G32Sint,
        24 => F::A2R10G10B10UnormPack32,
        25 => F::A2R10G10B10UintPack32,
        26 => F::B10G11R11UfloatPack32,
        28 => F::R8G8B8A8Unorm,
        29 => F::R8G8B8A8Srgb,
        30 => F::R8G8B8A8Uint,
        31 => F::R8G8B8A8Snorm,
        32 => F::R8G8B8A8Sint,
        34 => F::R16G16Sfloat,
        35 => F::R16G16Unorm,
        36 => F::R16G16Uint,
        37 => F::R16G16Snorm,
        38 => F::R16G16Sint,
        41 => F::R32Sfloat,
        42 => F::R32Uint,
        43 => F::R32Sint,
        49 => F::R8G8Unorm,
        50 => F::R8G8Uint,
        51 => F::R8G8Snorm,
        52 => F::R8G8Sint,
        54 => F::R16Sfloat,
        56 => F::R16Unorm,
        57 => F::R16Uint,
        58 => F::R16Snorm,
        59 => F::R16Sint,
        61 => F::R8Unorm,
        62 => F::R8Uint,
        63 => F::R8Snorm,
        64 => F::R8Sint,
        65 => F::A8Unorm,
        67 => F::E5B9G9R9UfloatPack32,
        71 => F::Bc1Unorm,
        72 => F::Bc1Srgb,
        74 => F::Bc2Unorm,
        75 => F::Bc2Srgb,
        77 => F::Bc3Unorm,
        78 => F::Bc3Srgb,
        80 => F::Bc4Unorm,
        81 => F::Bc4Snorm,
        83 => F::Bc5Unorm,
        84 => F::Bc5Snorm,
        85 => F::B5G6R5UnormPack16,
        86 => F::B5G5R5A1UnormPack16,
        // X8 通道按 A8 读取
        87 | 88 => F::B8G8R8A8Unorm,
        91 | 93 => F::B8G8R8A8Srgb,
        95 => F::Bc6hUfloat,
        96 => F::Bc6hSfloat,
        98 => F::Bc7Unorm,
        99 => F::Bc7Srgb,
        115 => F::B4G4R4A4UnormPack16,
        other => return Err(UnsupportedFormatError::DxgiFormat(other)),
    };
    Ok(format)
}
