//! 异步操作的统一等待接口
//!
//! 文件读取、后台任务、GPU 上传各自有不同的完成方式，
//! pipeline 只通过 [`CompleteHandler`] 查询或等待它们。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, TryRecvError};

pub trait CompleteHandler: Send {
    /// 非阻塞查询
    fn is_complete(&mut self) -> bool;

    /// 阻塞直到完成
    fn wait_until_complete(&mut self);
}

impl<H: CompleteHandler + ?Sized> CompleteHandler for Box<H> {
    fn is_complete(&mut self) -> bool {
        (**self).is_complete()
    }

    fn wait_until_complete(&mut self) {
        (**self).wait_until_complete()
    }
}

/// 已经完成的操作，比如同步读取
#[derive(Debug, Default)]
pub struct Completed;

impl CompleteHandler for Completed {
    fn is_complete(&mut self) -> bool {
        true
    }

    fn wait_until_complete(&mut self) {}
}

/// 线程池中运行的一个任务
///
/// 任务的返回值通过容量为 1 的 channel 传回。任务 panic 时 channel 会被直接断开，
/// 此时 [`JobHandle::finish`] 返回 `None`。
pub struct JobHandle<T> {
    receiver: Receiver<T>,
    /// `Some(None)` 表示任务已经结束但没有产出结果
    outcome: Option<Option<T>>,
}

/// 把 `job` 派发到 `pool` 中执行
pub fn spawn_job<T, F>(pool: &rayon::ThreadPool, job: F) -> JobHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = crossbeam_channel::bounded(1);
    pool.spawn(move || {
        // rayon 默认会在任务 panic 时 abort，这里把 panic 转成断开的 channel
        match catch_unwind(AssertUnwindSafe(job)) {
            Ok(value) => {
                let _ = sender.send(value);
            }
            Err(_) => log::error!("Background job panicked"),
        }
    });

    JobHandle {
        receiver,
        outcome: None,
    }
}

impl<T: Send> JobHandle<T> {
    /// 已经有结果的任务，不经过线程池
    pub fn ready(value: T) -> Self {
        // 发送端在这里就被丢弃了，但 outcome 已经有值，不会再去读 channel
        let (_, receiver) = crossbeam_channel::bounded(1);
        Self {
            receiver,
            outcome: Some(Some(value)),
        }
    }

    /// 等待任务结束并取出结果；任务 panic 时返回 `None`
    pub fn finish(mut self) -> Option<T> {
        self.wait_until_complete();
        self.outcome.flatten()
    }
}

impl<T: Send> CompleteHandler for JobHandle<T> {
    fn is_complete(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(value) => {
                self.outcome = Some(Some(value));
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.outcome = Some(None);
                true
            }
        }
    }

    fn wait_until_complete(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(self.receiver.recv().ok());
        }
    }
}

/// 宿主上传队列的进度，相当于一个 timeline semaphore
///
/// 宿主每完成一次提交就 signal 对应的值，值只增不减。
#[derive(Debug, Default)]
pub struct GpuTimeline {
    value: Mutex<u64>,
    signaled: Condvar,
}

impl GpuTimeline {
    pub fn new(initial_value: u64) -> Self {
        Self {
            value: Mutex::new(initial_value),
            signaled: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn signal(&self, value: u64) {
        let mut current = self.lock();
        if value > *current {
            *current = value;
            self.signaled.notify_all();
        }
    }

    pub fn current(&self) -> u64 {
        *self.lock()
    }

    /// 阻塞直到 timeline 达到 `value`
    pub fn wait(&self, value: u64) {
        let mut current = self.lock();
        while *current < value {
            current = self.signaled.wait(current).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// 等待 timeline 达到某个目标值
#[derive(Debug, Clone)]
pub struct TimelineCompleteHandler {
    timeline: Arc<GpuTimeline>,
    target_value: u64,
}

impl TimelineCompleteHandler {
    pub fn new(timeline: Arc<GpuTimeline>, target_value: u64) -> Self {
        Self { timeline, target_value }
    }

    #[inline]
    pub fn target_value(&self) -> u64 {
        self.target_value
    }
}

impl CompleteHandler for TimelineCompleteHandler {
    fn is_complete(&mut self) -> bool {
        self.timeline.current() >= self.target_value
    }

    fn wait_until_complete(&mut self) {
        self.timeline.wait(self.target_value);
    }
}
