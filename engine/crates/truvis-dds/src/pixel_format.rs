use serde::{Deserialize, Serialize};

/// 与具体图形 API 无关的像素格式
///
/// 两套描述方式（legacy bitmask 与 DX10 的 DXGI code）最终都映射到这里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    // 8-bit 单通道
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    A8Unorm,

    // 8-bit 双通道
    R8G8Unorm,
    R8G8Snorm,
    R8G8Uint,
    R8G8Sint,

    // 8-bit 四通道
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    R8G8B8A8Snorm,
    R8G8B8A8Uint,
    R8G8B8A8Sint,
    B8G8R8A8Unorm,
    B8G8R8A8Srgb,

    // 16-bit
    R16Unorm,
    R16Snorm,
    R16Uint,
    R16Sint,
    R16Sfloat,
    R16G16Unorm,
    R16G16Snorm,
    R16G16Uint,
    R16G16Sint,
    R16G16Sfloat,
    R16G16B16A16Unorm,
    R16G16B16A16Snorm,
    R16G16B16A16Uint,
    R16G16B16A16Sint,
    R16G16B16A16Sfloat,

    // 32-bit
    R32Uint,
    R32Sint,
    R32Sfloat,
    R32G32Uint,
    R32G32Sint,
    R32G32Sfloat,
    R32G32B32Uint,
    R32G32B32Sint,
    R32G32B32Sfloat,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32A32Sfloat,

    // packed
    B5G6R5UnormPack16,
    B5G5R5A1UnormPack16,
    B4G4R4A4UnormPack16,
    A2R10G10B10UnormPack32,
    A2R10G10B10UintPack32,
    B10G11R11UfloatPack32,
    E5B9G9R9UfloatPack32,

    // block compressed
    Bc1Unorm,
    Bc1Srgb,
    Bc2Unorm,
    Bc2Srgb,
    Bc3Unorm,
    Bc3Srgb,
    Bc4Unorm,
    Bc4Snorm,
    Bc5Unorm,
    Bc5Snorm,
    Bc6hUfloat,
    Bc6hSfloat,
    Bc7Unorm,
    Bc7Srgb,
}

/// 块信息：未压缩格式的块为 1x1，块大小即每像素字节数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub width: u32,
    pub height: u32,
    pub bytes: u32,
}

impl BlockInfo {
    const fn pixel(bytes: u32) -> Self {
        Self {
            width: 1,
            height: 1,
            bytes,
        }
    }

    const fn bc(bytes: u32) -> Self {
        Self {
            width: 4,
            height: 4,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// 采样值与光强成正比
    Linear,
    /// gamma 编码 (sRGB)
    Perceptual,
}

impl PixelFormat {
    /// 被视为 linear 的格式白名单
    ///
    /// 不在列表中的格式一律按 perceptual 处理，不根据名字推断。
    pub const LINEAR_FORMATS: &'static [PixelFormat] = &[
        PixelFormat::R16G16B16A16Unorm,
        PixelFormat::A2R10G10B10UnormPack32,
        PixelFormat::R8G8B8A8Unorm,
        PixelFormat::R16G16Unorm,
        PixelFormat::R8G8Unorm,
        PixelFormat::R16Unorm,
        PixelFormat::R8Unorm,
        PixelFormat::A8Unorm,
        PixelFormat::Bc1Unorm,
        PixelFormat::Bc2Unorm,
        PixelFormat::Bc3Unorm,
        PixelFormat::Bc4Unorm,
        PixelFormat::Bc5Unorm,
        PixelFormat::B5G6R5UnormPack16,
        PixelFormat::B5G5R5A1UnormPack16,
        PixelFormat::B8G8R8A8Unorm,
        PixelFormat::Bc7Unorm,
        PixelFormat::B4G4R4A4UnormPack16,
    ];

    pub fn block_info(self) -> BlockInfo {
        use PixelFormat::*;
        match self {
            R8Unorm | R8Snorm | R8Uint | R8Sint | A8Unorm => BlockInfo::pixel(1),

            R8G8Unorm | R8G8Snorm | R8G8Uint | R8G8Sint => BlockInfo::pixel(2),
            R16Unorm | R16Snorm | R16Uint | R16Sint | R16Sfloat => BlockInfo::pixel(2),
            B5G6R5UnormPack16 | B5G5R5A1UnormPack16 | B4G4R4A4UnormPack16 => BlockInfo::pixel(2),

            R8G8B8A8Unorm | R8G8B8A8Srgb | R8G8B8A8Snorm | R8G8B8A8Uint | R8G8B8A8Sint => BlockInfo::pixel(4),
            B8G8R8A8Unorm | B8G8R8A8Srgb => BlockInfo::pixel(4),
            R16G16Unorm | R16G16Snorm | R16G16Uint | R16G16Sint | R16G16Sfloat => BlockInfo::pixel(4),
            R32Uint | R32Sint | R32Sfloat => BlockInfo::pixel(4),
            A2R10G10B10UnormPack32 | A2R10G10B10UintPack32 | B10G11R11UfloatPack32 | E5B9G9R9UfloatPack32 => {
                BlockInfo::pixel(4)
            }

            R16G16B16A16Unorm | R16G16B16A16Snorm | R16G16B16A16Uint | R16G16B16A16Sint | R16G16B16A16Sfloat => {
                BlockInfo::pixel(8)
            }
            R32G32Uint | R32G32Sint | R32G32Sfloat => BlockInfo::pixel(8),
            R32G32B32Uint | R32G32B32Sint | R32G32B32Sfloat => BlockInfo::pixel(12),
            R32G32B32A32Uint | R32G32B32A32Sint | R32G32B32A32Sfloat => BlockInfo::pixel(16),

            Bc1Unorm | Bc1Srgb | Bc4Unorm | Bc4Snorm => BlockInfo::bc(8),
            Bc2Unorm | Bc2Srgb | Bc3Unorm | Bc3Srgb | Bc5Unorm | Bc5Snorm => BlockInfo::bc(16),
            Bc6hUfloat | Bc6hSfloat | Bc7Unorm | Bc7Srgb => BlockInfo::bc(16),
        }
    }

    #[inline]
    pub fn is_compressed(self) -> bool {
        let block = self.block_info();
        block.width > 1 || block.height > 1
    }

    #[inline]
    pub fn color_space(self) -> ColorSpace {
        if Self::LINEAR_FORMATS.contains(&self) { ColorSpace::Linear } else { ColorSpace::Perceptual }
    }

    /// 对应的 sRGB 格式（如果存在）
    pub fn srgb_twin(self) -> Option<PixelFormat> {
        use PixelFormat::*;
        match self {
            R8G8B8A8Unorm => Some(R8G8B8A8Srgb),
            B8G8R8A8Unorm => Some(B8G8R8A8Srgb),
            Bc1Unorm => Some(Bc1Srgb),
            Bc2Unorm => Some(Bc2Srgb),
            Bc3Unorm => Some(Bc3Srgb),
            Bc7Unorm => Some(Bc7Srgb),
            _ => None,
        }
    }

    /// [`Self::srgb_twin`] 的反向映射
    pub fn unorm_twin(self) -> Option<PixelFormat> {
        use PixelFormat::*;
        match self {
            R8G8B8A8Srgb => Some(R8G8B8A8Unorm),
            B8G8R8A8Srgb => Some(B8G8R8A8Unorm),
            Bc1Srgb => Some(Bc1Unorm),
            Bc2Srgb => Some(Bc2Unorm),
            Bc3Srgb => Some(Bc3Unorm),
            Bc7Srgb => Some(Bc7Unorm),
            _ => None,
        }
    }
}
