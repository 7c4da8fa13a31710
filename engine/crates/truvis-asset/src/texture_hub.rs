use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{LoaderConfig, ProcessPolicy};
use crate::file_reader::{FileReader, ReadMode};
use crate::handle::{HandleShared, LoadState, StepResult, TextureHandle};
use crate::host::TextureHost;
use crate::pipeline::{LoadContext, LoadPipeline};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadHint {
    /// 立即返回，由 [`TextureHub::update`] 推进
    #[default]
    Asynchronous,
    /// 阻塞直到加载结束再返回
    Synchronous,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureLoadOptions {
    pub hint: LoadHint,
    /// 上传完成后 CPU 端不再保留数据
    pub unreadable: bool,
    /// 覆盖文件头中的颜色空间；`Some(false)` 会把格式提升为对应的 sRGB 格式
    pub linear: Option<bool>,
}

impl TextureLoadOptions {
    pub fn synchronous() -> Self {
        Self {
            hint: LoadHint::Synchronous,
            ..Default::default()
        }
    }
}

/// 纹理加载中心 (Facade)
///
/// 职责:
/// 1. 按路径去重：同一路径的加载还存活时，直接返回它的新引用。
/// 2. 每帧 [`TextureHub::update`] 推进所有未完成的加载。
/// 3. 清理已经结束且没有任何 owner 的条目。
///
/// 引用计数归零但仍在加载的条目会继续被推进，结束时立即销毁产生的纹理。
pub struct TextureHub {
    context: Arc<LoadContext>,

    // 路径到共享状态的映射，不计入引用计数
    texture_cache: HashMap<PathBuf, Arc<HandleShared>>,
}

// new & init
impl TextureHub {
    /// `io_pool` 由宿主提供，用于文件读取和像素翻转
    pub fn new(config: &LoaderConfig, host: Arc<dyn TextureHost>, io_pool: Arc<rayon::ThreadPool>) -> Self {
        config.apply(host.as_ref());

        let mode = if config.use_async_read { ReadMode::Async } else { ReadMode::Inline };
        let context = LoadContext {
            host,
            reader: FileReader::new(io_pool, mode),
            policy: config.process_policy(),
            allow_native_uploads: config.allow_native_uploads,
            max_texture_dimension: config.max_texture_dimension,
        };

        Self {
            context: Arc::new(context),
            texture_cache: HashMap::new(),
        }
    }
}

// destroy
impl TextureHub {
    /// 等待所有未完成的加载结束
    ///
    /// 没有 owner 的纹理随之销毁；仍被持有的 handle 不受影响。
    pub fn destroy(mut self) {
        log::info!("TextureHub is being destroyed, waiting for {} loads...", self.texture_cache.len());
        for shared in self.texture_cache.values() {
            shared.wait_until_done();
        }
        self.texture_cache.clear();
        log::info!("TextureHub destroyed.");
    }
}

// getters
impl TextureHub {
    pub fn host(&self) -> &Arc<dyn TextureHost> {
        &self.context.host
    }

    pub fn policy(&self) -> &ProcessPolicy {
        &self.context.policy
    }

    /// 尚未完成的文件读取数量
    pub fn reads_in_flight(&self) -> usize {
        self.context.reader.in_flight()
    }

    /// 当前跟踪的加载数量（包括已经没有 owner 但仍在加载的）
    pub fn tracked_count(&self) -> usize {
        self.texture_cache.len()
    }

    pub fn get_status(&self, path: &Path) -> Option<LoadState> {
        self.texture_cache.get(path).map(|shared| shared.state())
    }
}

// tools
impl TextureHub {
    /// 请求加载纹理
    ///
    /// 1. 如果同一路径的加载还有 owner，返回它的新引用。
    /// 2. 否则创建新的 handle 并立即发起文件头读取。
    /// 3. `Synchronous` 时阻塞到加载结束。
    pub fn load_texture(&mut self, path: impl AsRef<Path>, options: TextureLoadOptions) -> TextureHandle {
        let path = path.as_ref();

        let handle = match self.texture_cache.get(path).and_then(|shared| shared.try_acquire()) {
            Some(handle) => handle,
            None => {
                log::info!("Request load texture: {:?}", path);
                let pipeline = LoadPipeline::new(self.context.clone(), path.to_path_buf(), options);
                let shared = Arc::new(HandleShared::new(path.to_path_buf(), pipeline));
                self.texture_cache.insert(path.to_path_buf(), shared.clone());
                TextureHandle::from_shared(shared)
            }
        };

        match options.hint {
            LoadHint::Synchronous => {
                let _ = handle.get_texture();
            }
            LoadHint::Asynchronous => {
                handle.step();
            }
        }
        handle
    }

    /// 驱动加载流程 (每帧调用)
    ///
    /// 每个未结束的加载推进一次，然后清理已结束且没有 owner 的条目。
    /// 返回本次推进后仍未结束的加载数量。
    pub fn update(&mut self) -> usize {
        let mut pending = 0;
        for shared in self.texture_cache.values() {
            if shared.step() == StepResult::Suspended {
                pending += 1;
            }
        }

        self.texture_cache.retain(|path, shared| {
            let keep = shared.ref_count() > 0 || !shared.state().is_terminal();
            if !keep {
                log::debug!("Drop finished texture entry: {:?}", path);
            }
            keep
        });
        pending
    }
}
