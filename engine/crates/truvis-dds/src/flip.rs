//! 垂直翻转 payload 中的每一张图像
//!
//! 未压缩格式直接交换行；BC1-BC5 交换块行，同时反转块内的行顺序。
//! BC6H / BC7 的块内编码依赖分区表，无法在不重新编码的情况下翻转。

use crate::error::FlipError;
use crate::layout::{MipLayout, MipRegion};
use crate::pixel_format::PixelFormat;

/// 每个 BC 块内行的翻转方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Uncompressed,
    /// BC1: 2 个颜色端点 + 每行 1 字节索引
    Bc1,
    /// BC2: 每行 16 bit 的显式 alpha + BC1 颜色块
    Bc2,
    /// BC3: BC4 alpha 块 + BC1 颜色块
    Bc3,
    /// BC4: 2 个端点 + 每行 12 bit 索引
    Bc4,
    /// BC5: 两个 BC4 块
    Bc5,
}

fn block_kind(format: PixelFormat) -> Result<BlockKind, FlipError> {
    use PixelFormat::*;
    let kind = match format {
        Bc1Unorm | Bc1Srgb => BlockKind::Bc1,
        Bc2Unorm | Bc2Srgb => BlockKind::Bc2,
        Bc3Unorm | Bc3Srgb => BlockKind::Bc3,
        Bc4Unorm | Bc4Snorm => BlockKind::Bc4,
        Bc5Unorm | Bc5Snorm => BlockKind::Bc5,
        Bc6hUfloat | Bc6hSfloat | Bc7Unorm | Bc7Srgb => return Err(FlipError::NotFlippable(format)),
        _ => BlockKind::Uncompressed,
    };
    Ok(kind)
}

/// 格式是否支持 [`flip_vertical`]
pub fn is_flippable(format: PixelFormat) -> bool {
    block_kind(format).is_ok()
}

/// 原地垂直翻转 `bytes` 中按 `layout` 排布的每一个 (layer, mip)
///
/// region 的字节数小于一整张图像时（压缩格式的最小几级 mip）跳过该 region。
pub fn flip_vertical(format: PixelFormat, layout: &MipLayout, bytes: &mut [u8]) -> Result<(), FlipError> {
    let kind = block_kind(format)?;
    if bytes.len() < layout.total_size() {
        return Err(FlipError::PayloadTooSmall {
            expected: layout.total_size(),
            actual: bytes.len(),
        });
    }

    for region in layout.regions() {
        flip_region(format, kind, region, &mut bytes[region.range()]);
    }
    Ok(())
}

fn flip_region(format: PixelFormat, kind: BlockKind, region: &MipRegion, bytes: &mut [u8]) {
    let block = format.block_info();
    let blocks_wide = region.width.div_ceil(block.width) as usize;
    let blocks_high = region.height.div_ceil(block.height) as usize;
    let row_pitch = blocks_wide * block.bytes as usize;
    let slice_size = row_pitch * blocks_high;
    if slice_size == 0 {
        return;
    }

    for slice in bytes.chunks_exact_mut(slice_size).take(region.depth as usize) {
        swap_rows(slice, row_pitch, blocks_high);
        if kind != BlockKind::Uncompressed {
            for b in slice.chunks_exact_mut(block.bytes as usize) {
                flip_block(kind, b);
            }
        }
    }
}

fn swap_rows(slice: &mut [u8], row_pitch: usize, rows: usize) {
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = slice.split_at_mut(bottom * row_pitch);
        head[top * row_pitch..(top + 1) * row_pitch].swap_with_slice(&mut tail[..row_pitch]);
    }
}

fn flip_block(kind: BlockKind, block: &mut [u8]) {
    match kind {
        BlockKind::Uncompressed => {}
        BlockKind::Bc1 => flip_bc1_colors(block),
        BlockKind::Bc2 => {
            flip_bc2_alpha(&mut block[..8]);
            flip_bc1_colors(&mut block[8..]);
        }
        BlockKind::Bc3 => {
            flip_bc4_indices(&mut block[..8]);
            flip_bc1_colors(&mut block[8..]);
        }
        BlockKind::Bc4 => flip_bc4_indices(block),
        BlockKind::Bc5 => {
            flip_bc4_indices(&mut block[..8]);
            flip_bc4_indices(&mut block[8..]);
        }
    }
}

fn flip_bc1_colors(block: &mut [u8]) {
    block[4..8].reverse();
}

fn flip_bc2_alpha(alpha: &mut [u8]) {
    let mut words: [u16; 4] = std::array::from_fn(|i| u16::from_le_bytes([alpha[2 * i], alpha[2 * i + 1]]));
    words.reverse();
    for (i, word) in words.iter().enumerate() {
        alpha[2 * i..2 * i + 2].copy_from_slice(&word.to_le_bytes());
    }
}

fn flip_bc4_indices(block: &mut [u8]) {
    let mut bits = [0u8; 8];
    bits[..6].copy_from_slice(&block[2..8]);
    let bits = u64::from_le_bytes(bits);

    let mut row_bits: [u64; 4] = std::array::from_fn(|r| (bits >> (12 * r)) & 0xFFF);
    row_bits.reverse();

    let flipped = row_bits.iter().enumerate().fold(0u64, |acc, (r, v)| acc | (v << (12 * r)));
    block[2..8].copy_from_slice(&flipped.to_le_bytes()[..6]);
}
