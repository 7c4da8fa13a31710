//! 像素数据中每个 (layer, mip) 的字节布局

use crate::descriptor::TextureDimension;
use crate::error::FormatError;
use crate::pixel_format::PixelFormat;

/// payload 中的一段：某个 layer 的某一级 mip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipRegion {
    pub layer: u32,
    pub mip: u32,
    /// 该级 mip 的像素尺寸，最小为 1
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// 相对于 payload 起始处的偏移
    pub offset: usize,
    pub size: usize,
}

impl MipRegion {
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// 按 layer-major 顺序排列的 mip 布局：先是 layer 0 的所有 mip，然后是 layer 1 ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLayout {
    mip_count: u32,
    layer_count: u32,
    regions: Vec<MipRegion>,
    total_size: usize,
}

/// 2D / cube 面的单个 mip 字节数: `(w/bw * h/bh) >> 2*mip * block_bytes`
///
/// 除法向下取整，所以尺寸小于一个块的压缩 mip 会得到 0。结果超出 `usize` 时返回 `None`。
pub fn mip_byte_size_2d(format: PixelFormat, width: u32, height: u32, mip: u32) -> Option<usize> {
    let block = format.block_info();
    let blocks = u64::from(width / block.width) * u64::from(height / block.height);
    let bytes = blocks.checked_shr(mip.saturating_mul(2)).unwrap_or(0).checked_mul(u64::from(block.bytes))?;
    usize::try_from(bytes).ok()
}

/// volume 的单个 mip 字节数: `(w/bw * h/bh * depth) >> 3*mip * block_bytes`
pub fn mip_byte_size_3d(format: PixelFormat, width: u32, height: u32, depth: u32, mip: u32) -> Option<usize> {
    let block = format.block_info();
    let blocks = (u64::from(width / block.width) * u64::from(height / block.height)).checked_mul(u64::from(depth))?;
    let bytes = blocks.checked_shr(mip.saturating_mul(3)).unwrap_or(0).checked_mul(u64::from(block.bytes))?;
    usize::try_from(bytes).ok()
}

/// 第 `mip` 级的边长，最小为 1
#[inline]
fn mip_extent(extent: u32, mip: u32) -> u32 {
    extent.checked_shr(mip).unwrap_or(0).max(1)
}

// new & init
impl MipLayout {
    /// 计算所有 region 的偏移与大小
    ///
    /// 任何一个 region 或者总大小超出 `usize` 时返回 [`FormatError::PayloadTooLarge`]。
    pub fn new(
        format: PixelFormat,
        dimension: TextureDimension,
        [width, height, depth]: [u32; 3],
        mip_count: u32,
        layer_count: u32,
    ) -> Result<Self, FormatError> {
        let mip_count = mip_count.max(1);
        let layer_count = layer_count.max(1);
        let too_large = || FormatError::PayloadTooLarge {
            width,
            height,
            depth,
            layers: layer_count,
        };

        let mut regions = Vec::with_capacity(mip_count as usize * layer_count as usize);
        let mut offset = 0usize;
        for layer in 0..layer_count {
            for mip in 0..mip_count {
                let size = match dimension {
                    TextureDimension::Texture3D => mip_byte_size_3d(format, width, height, depth, mip),
                    TextureDimension::Texture2D | TextureDimension::Cube => {
                        mip_byte_size_2d(format, width, height, mip)
                    }
                }
                .ok_or_else(too_large)?;
                regions.push(MipRegion {
                    layer,
                    mip,
                    width: mip_extent(width, mip),
                    height: mip_extent(height, mip),
                    depth: mip_extent(depth, mip),
                    offset,
                    size,
                });
                offset = offset.checked_add(size).ok_or_else(too_large)?;
            }
        }

        Ok(Self {
            mip_count,
            layer_count,
            regions,
            total_size: offset,
        })
    }
}

// getters
impl MipLayout {
    #[inline]
    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// 所有 region 的字节数之和，即期望的 payload 长度
    #[inline]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// payload 顺序排列的全部 region
    #[inline]
    pub fn regions(&self) -> &[MipRegion] {
        &self.regions
    }

    pub fn region(&self, layer: u32, mip: u32) -> Option<&MipRegion> {
        if layer >= self.layer_count || mip >= self.mip_count {
            return None;
        }
        self.regions.get(layer as usize * self.mip_count as usize + mip as usize)
    }
}
