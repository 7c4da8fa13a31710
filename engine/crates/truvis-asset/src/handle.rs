use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use truvis_dds::FormatDescriptor;

use crate::error::TextureError;
use crate::guards::TextureGuard;
use crate::host::HostTextureId;
use crate::pipeline::{LoadPipeline, StepOutcome};

/// 纹理加载状态机
///
/// 状态流转: Pending -> WaitingOnIo -> WaitingOnUpload -> Complete
///                         \--------------------------\-> Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// 已经创建，尚未发起任何读取
    Pending,
    /// 正在读取文件头、payload，或在后台线程翻转像素
    WaitingOnIo,
    /// 宿主纹理已创建，正在等待上传完成
    WaitingOnUpload,
    /// 纹理已就绪
    Complete,
    /// 加载失败，失败原因保存在 handle 中
    Error,
}

impl LoadState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Complete | LoadState::Error)
    }
}

/// 一次 [`TextureHandle::step`] 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// 当前异步操作尚未完成
    Suspended,
    Done,
    Failed,
}

struct HandleInner {
    state: LoadState,
    pipeline: Option<LoadPipeline>,
    /// 只在 Complete 且尚未释放时存在
    texture: Option<TextureGuard>,
    descriptor: Option<FormatDescriptor>,
    /// 只在 Error 时存在
    failure: Option<TextureError>,
    /// 引用计数已经归零；pipeline 结束时立即销毁纹理
    released: bool,
}

/// 所有 [`TextureHandle`] 共享的状态
///
/// [`crate::TextureHub`] 也持有一份，但不计入引用计数。
pub(crate) struct HandleShared {
    path: PathBuf,
    ref_count: AtomicU32,
    inner: Mutex<HandleInner>,
}

// new & init
impl HandleShared {
    pub fn new(path: PathBuf, pipeline: LoadPipeline) -> Self {
        Self {
            path,
            ref_count: AtomicU32::new(1),
            inner: Mutex::new(HandleInner {
                state: LoadState::Pending,
                pipeline: Some(pipeline),
                texture: None,
                descriptor: None,
                failure: None,
                released: false,
            }),
        }
    }

    fn failed(path: PathBuf, error: TextureError) -> Self {
        Self {
            path,
            ref_count: AtomicU32::new(1),
            inner: Mutex::new(HandleInner {
                state: LoadState::Error,
                pipeline: None,
                texture: None,
                descriptor: None,
                failure: Some(error),
                released: false,
            }),
        }
    }
}

// getters
impl HandleShared {
    fn lock(&self) -> MutexGuard<'_, HandleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoadState {
        self.lock().state
    }
}

// tools
impl HandleShared {
    /// 引用计数不为 0 时加一并返回新的 handle
    pub fn try_acquire(self: &Arc<Self>) -> Option<TextureHandle> {
        let mut count = self.ref_count.load(Ordering::Acquire);
        loop {
            if count == 0 {
                return None;
            }
            match self.ref_count.compare_exchange_weak(count, count + 1, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Some(TextureHandle { shared: self.clone() }),
                Err(actual) => count = actual,
            }
        }
    }

    pub fn step(&self) -> StepResult {
        let mut inner = self.lock();
        self.step_locked(&mut inner)
    }

    fn step_locked(&self, inner: &mut HandleInner) -> StepResult {
        match inner.state {
            LoadState::Complete => return StepResult::Done,
            LoadState::Error => return StepResult::Failed,
            _ => {}
        }
        let Some(pipeline) = inner.pipeline.as_mut() else {
            inner.state = LoadState::Error;
            inner.failure = Some(TextureError::Aborted { stage: "pipeline missing" });
            return StepResult::Failed;
        };

        match pipeline.step() {
            StepOutcome::Suspended => {
                inner.state = pipeline.state();
                StepResult::Suspended
            }
            StepOutcome::Complete(loaded) => {
                inner.pipeline = None;
                inner.descriptor = Some(loaded.descriptor);
                inner.state = LoadState::Complete;
                if inner.released {
                    log::info!("Texture {:?} finished after its last owner released it, destroy", self.path);
                    drop(loaded.texture);
                } else {
                    inner.texture = Some(loaded.texture);
                }
                StepResult::Done
            }
            StepOutcome::Failed(err) => {
                log::error!("Failed to load texture {:?} ({}): {}", self.path, err.kind(), err);
                inner.pipeline = None;
                inner.failure = Some(err);
                inner.state = LoadState::Error;
                StepResult::Failed
            }
        }
    }

    /// 反复强制完成当前异步操作并推进，直到结束
    pub fn wait_until_done(&self) -> StepResult {
        let mut inner = self.lock();
        loop {
            match self.step_locked(&mut inner) {
                StepResult::Suspended => {
                    if let Some(pipeline) = inner.pipeline.as_mut() {
                        pipeline.wait_active();
                    }
                }
                done => return done,
            }
        }
    }

    fn result(&self, inner: &HandleInner) -> Option<Result<HostTextureId, TextureError>> {
        match inner.state {
            LoadState::Complete => Some(
                inner
                    .texture
                    .as_ref()
                    .map(TextureGuard::id)
                    .ok_or(TextureError::Aborted { stage: "reading a released texture" }),
            ),
            LoadState::Error => Some(Err(inner
                .failure
                .clone()
                .unwrap_or(TextureError::Aborted { stage: "failure missing" }))),
            _ => None,
        }
    }

    /// 最后一个 owner 释放时调用
    fn release(&self) {
        let mut inner = self.lock();
        inner.released = true;
        if inner.state.is_terminal() {
            if let Some(texture) = inner.texture.take() {
                log::info!("Release texture {:?}", self.path);
                drop(texture);
            }
        } else {
            log::info!("Texture {:?} released while loading, destroy when finished", self.path);
        }
    }
}

/// 纹理加载的引用计数句柄
///
/// 新建时引用计数为 1。[`TextureHandle::acquire`] / `clone` 加一，drop / [`TextureHandle::dispose`] 减一；
/// 计数归零时销毁宿主纹理，且只销毁一次。若此时仍在加载，则在加载结束时销毁。
pub struct TextureHandle {
    shared: Arc<HandleShared>,
}

// new & init
impl TextureHandle {
    /// `shared` 的引用计数必须已经包含这个 handle
    pub(crate) fn from_shared(shared: Arc<HandleShared>) -> Self {
        Self { shared }
    }

    /// 直接创建一个失败的 handle
    pub fn failed(path: impl Into<PathBuf>, error: TextureError) -> Self {
        Self {
            shared: Arc::new(HandleShared::failed(path.into(), error)),
        }
    }

    /// 引用计数加一，返回指向同一份加载结果的 handle
    pub fn acquire(&self) -> Self {
        self.shared.ref_count.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: self.shared.clone(),
        }
    }
}

// destroy
impl TextureHandle {
    /// 引用计数减一，等价于 drop
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        if self.shared.ref_count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.release();
        }
    }
}

impl Clone for TextureHandle {
    fn clone(&self) -> Self {
        self.acquire()
    }
}

// getters
impl TextureHandle {
    #[inline]
    pub fn path(&self) -> &Path {
        self.shared.path()
    }

    #[inline]
    pub fn ref_count(&self) -> u32 {
        self.shared.ref_count()
    }

    pub fn state(&self) -> LoadState {
        self.shared.state()
    }

    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// 指向同一份加载结果
    pub fn ptr_eq(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// 加载完成后可用
    pub fn descriptor(&self) -> Option<FormatDescriptor> {
        self.shared.lock().descriptor.clone()
    }

    /// 加载失败后可用
    pub fn failure(&self) -> Option<TextureError> {
        self.shared.lock().failure.clone()
    }
}

// tools
impl TextureHandle {
    /// 非阻塞地推进一次
    pub fn step(&self) -> StepResult {
        self.shared.step()
    }

    /// 非阻塞地查询结果，尚未结束时返回 `None`
    pub fn try_get_texture(&self) -> Option<Result<HostTextureId, TextureError>> {
        let inner = self.shared.lock();
        self.shared.result(&inner)
    }

    /// 阻塞直到加载结束
    ///
    /// 成功时每次都返回同一个纹理；失败时每次都返回保存的失败原因。
    pub fn get_texture(&self) -> Result<HostTextureId, TextureError> {
        self.shared.wait_until_done();
        let inner = self.shared.lock();
        self.shared
            .result(&inner)
            .unwrap_or(Err(TextureError::Aborted { stage: "waiting for texture" }))
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("path", &self.shared.path)
            .field("ref_count", &self.ref_count())
            .field("state", &self.state())
            .finish()
    }
}
