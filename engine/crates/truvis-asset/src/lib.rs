//! 异步、引用计数的 DDS 纹理加载
//!
//! 整体流程：
//! 1. [`TextureHub::load_texture`] 创建 [`TextureHandle`]，立即在宿主线程池中发起文件头读取。
//! 2. 每帧 [`TextureHub::update`] 推进每个加载：解析文件头 -> 读取 payload -> (翻转) -> 逐 mip 上传。
//! 3. 每一步只在异步操作 ([`CompleteHandler`]) 未完成时挂起，不会隐式阻塞。
//! 4. handle 的引用计数归零时销毁宿主纹理。
//!
//! 图形 API 由宿主通过 [`TextureHost`] 提供，[`MemoryTextureHost`] 是一个纯内存的实现。

pub mod complete_handler;
pub mod config;
pub mod error;
pub mod file_reader;
pub mod guards;
pub mod handle;
pub mod host;
pub mod memory_host;
mod pipeline;
pub mod texture_hub;

pub use complete_handler::{CompleteHandler, Completed, GpuTimeline, JobHandle, TimelineCompleteHandler, spawn_job};
pub use config::{LoaderConfig, ProcessPolicy};
pub use error::{TextureError, UploadError};
pub use file_reader::{FileReader, ReadBuffer, ReadHandle, ReadMode, build_io_pool};
pub use guards::{CompleteGuard, PinnedSlice, TextureGuard};
pub use handle::{LoadState, StepResult, TextureHandle};
pub use host::{HostTextureId, TextureCreateInfo, TextureHost, UploadSettings};
pub use memory_host::MemoryTextureHost;
pub use texture_hub::{LoadHint, TextureHub, TextureLoadOptions};
