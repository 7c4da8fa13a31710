use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use truvis_dds::{DdsError, FlipError, FormatError, PixelFormat, UnsupportedFormatError};

use crate::host::HostTextureId;

/// 宿主拒绝创建或上传纹理
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("texture size {width}x{height}x{depth} with {mip_count} mips and {layer_count} layers is empty")]
    ZeroSize {
        width: u32,
        height: u32,
        depth: u32,
        mip_count: u32,
        layer_count: u32,
    },

    #[error("texture dimension {size} exceeds host limit {max}")]
    TooLarge { size: u32, max: u32 },

    #[error("host does not support pixel format {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("unknown host texture {0:?}")]
    UnknownTexture(HostTextureId),

    #[error("upload of layer {layer} mip {mip}: expected {expected} bytes, got {actual}")]
    RegionMismatch {
        layer: u32,
        mip: u32,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Layout(#[from] FormatError),
}

/// 一次纹理加载的失败原因
///
/// 需要 `Clone`：失败会保存在 handle 中，每次取结果时都重新返回。
#[derive(Debug, Clone, Error)]
pub enum TextureError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedFormatError),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Flip(#[from] FlipError),

    /// 后台任务 panic 或者在完成前被丢弃
    #[error("texture load aborted while {stage}")]
    Aborted { stage: &'static str },
}

impl From<DdsError> for TextureError {
    fn from(err: DdsError) -> Self {
        match err {
            DdsError::Format(e) => Self::Format(e),
            DdsError::Unsupported(e) => Self::Unsupported(e),
        }
    }
}

impl TextureError {
    pub fn io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(err),
        }
    }

    /// 用于日志分类
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Format(_) => "format",
            Self::Unsupported(_) => "unsupported",
            Self::Io { .. } => "io",
            Self::Upload(_) => "upload",
            Self::Flip(_) => "flip",
            Self::Aborted { .. } => "aborted",
        }
    }
}
