//! DDS 容器解析
//!
//! 只负责把文件头解析成 [`FormatDescriptor`] 并计算每级 mip 的字节布局，
//! 不做任何像素解码。payload 原样交给上层上传。

pub mod descriptor;
pub mod dxgi;
pub mod error;
pub mod flip;
pub mod header;
pub mod layout;
pub mod legacy;
pub mod pixel_format;

pub use descriptor::{FormatDescriptor, MAX_ARRAY_SIZE, MAX_MIP_COUNT, TextureDimension, decode_header};
pub use error::{DdsError, FlipError, FormatError, UnsupportedFormatError};
pub use flip::{flip_vertical, is_flippable};
pub use header::{DDS_MAGIC, DDS_MAX_HEADER_LEN};
pub use layout::{MipLayout, MipRegion};
pub use pixel_format::{BlockInfo, ColorSpace, PixelFormat};
