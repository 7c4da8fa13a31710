//! pipeline 中间产物的 RAII 包装
//!
//! 不论 pipeline 是正常完成、提前返回还是记录了失败，
//! 已经申请的资源都会在这里被释放。

use std::ops::{Deref, Range};
use std::sync::Arc;

use crate::complete_handler::CompleteHandler;
use crate::host::{HostTextureId, TextureHost};

/// 析构时强制等待尚未完成的异步操作
///
/// 保证后台任务不会在其结果被丢弃之后还在访问缓冲区。
pub struct CompleteGuard<H: CompleteHandler> {
    handler: Option<H>,
}

impl<H: CompleteHandler> CompleteGuard<H> {
    pub fn new(handler: H) -> Self {
        Self { handler: Some(handler) }
    }

    pub fn is_complete(&mut self) -> bool {
        self.handler.as_mut().is_none_or(|h| h.is_complete())
    }

    pub fn wait_until_complete(&mut self) {
        if let Some(handler) = self.handler.as_mut() {
            handler.wait_until_complete();
        }
    }

    /// 解除保护，交出 handler
    pub fn into_inner(mut self) -> H {
        // handler 只会在这里或 drop 中被取走
        self.handler.take().unwrap_or_else(|| unreachable!("CompleteGuard without handler"))
    }
}

impl<H: CompleteHandler> Drop for CompleteGuard<H> {
    fn drop(&mut self) {
        if let Some(mut handler) = self.handler.take()
            && !handler.is_complete()
        {
            log::warn!("Dropping an incomplete async operation, waiting for it to finish");
            handler.wait_until_complete();
        }
    }
}

/// 析构时销毁宿主纹理
pub struct TextureGuard {
    host: Arc<dyn TextureHost>,
    texture: HostTextureId,
}

impl TextureGuard {
    pub fn new(host: Arc<dyn TextureHost>, texture: HostTextureId) -> Self {
        Self { host, texture }
    }

    #[inline]
    pub fn id(&self) -> HostTextureId {
        self.texture
    }
}

impl Drop for TextureGuard {
    fn drop(&mut self) {
        log::debug!("Destroy host texture {:?}", self.texture);
        self.host.destroy(self.texture);
    }
}

impl std::fmt::Debug for TextureGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureGuard").field("texture", &self.texture).finish()
    }
}

/// 借给宿主上传用的一段 payload
///
/// 所有 `PinnedSlice` 都被丢弃后，底层缓冲区才会释放。
#[derive(Clone)]
pub struct PinnedSlice {
    buffer: Arc<Vec<u8>>,
    range: Range<usize>,
}

impl PinnedSlice {
    pub fn new(buffer: Vec<u8>) -> Self {
        let range = 0..buffer.len();
        Self {
            buffer: Arc::new(buffer),
            range,
        }
    }

    /// 相对于当前 slice 的子区间
    ///
    /// # Panics
    /// 子区间越界时 panic
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.range.len(),
            "PinnedSlice range {:?} out of bounds (len {})",
            range,
            self.range.len()
        );
        Self {
            buffer: self.buffer.clone(),
            range: self.range.start + range.start..self.range.start + range.end,
        }
    }

    /// 当前还有多少个 slice 持有同一个缓冲区
    #[inline]
    pub fn pin_count(&self) -> usize {
        Arc::strong_count(&self.buffer)
    }
}

impl Deref for PinnedSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer[self.range.clone()]
    }
}

impl std::fmt::Debug for PinnedSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedSlice").field("range", &self.range).finish()
    }
}
