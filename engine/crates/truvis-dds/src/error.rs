use thiserror::Error;

/// 文件头本身不合法：magic / header size 不匹配，或者字节数不够
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid magic: expected 0x20534444 (\"DDS \"), found {0:#010x}")]
    InvalidMagic(u32),

    #[error("invalid header size: expected 124, found {0}")]
    InvalidHeaderSize(u32),

    #[error("truncated header: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid mip count: {0} exceeds {max}", max = crate::MAX_MIP_COUNT)]
    InvalidMipCount(u32),

    #[error("invalid array size: {0} exceeds {max}", max = crate::MAX_ARRAY_SIZE)]
    InvalidArraySize(u32),

    #[error("payload size of {width}x{height}x{depth} with {layers} layers does not fit in memory")]
    PayloadTooLarge { width: u32, height: u32, depth: u32, layers: u32 },
}

/// 文件头合法，但像素格式无法映射到 [`crate::PixelFormat`]
///
/// 会携带原始的 flags / mask / code，便于排查是哪个工具导出的文件。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedFormatError {
    #[error(
        "unsupported DDS pixel format: flags={flags:#x}, bit_count={bit_count}, \
         masks=[{r_mask:#010x}, {g_mask:#010x}, {b_mask:#010x}, {a_mask:#010x}], four_cc={four_cc:#010x}"
    )]
    PixelFormat {
        flags: u32,
        bit_count: u32,
        r_mask: u32,
        g_mask: u32,
        b_mask: u32,
        a_mask: u32,
        four_cc: u32,
    },

    #[error("unsupported DDS texture: DXGI format {0} is not supported")]
    DxgiFormat(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdsError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedFormatError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlipError {
    #[error("{0:?} cannot be flipped without re-encoding")]
    NotFlippable(crate::PixelFormat),

    #[error("payload too small for flip: need {expected} bytes, got {actual}")]
    PayloadTooSmall { expected: usize, actual: usize },
}
