use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crossbeam_channel::Sender;
use slotmap::SlotMap;
use truvis_dds::{MipLayout, MipRegion};

use crate::complete_handler::{CompleteHandler, Completed, GpuTimeline, TimelineCompleteHandler};
use crate::error::UploadError;
use crate::guards::PinnedSlice;
use crate::host::{HostTextureId, TextureCreateInfo, TextureHost, UploadSettings};

struct StoredTexture {
    info: TextureCreateInfo,
    layout: MipLayout,
    /// 与 `layout.regions()` 一一对应
    regions: Vec<Vec<u8>>,
}

/// 一次提交：若干个 region 的拷贝，完成后 signal `target_value`
struct UploadCommand {
    texture: HostTextureId,
    writes: Vec<(usize, PinnedSlice)>,
    target_value: u64,
}

type TextureStorage = Arc<Mutex<SlotMap<HostTextureId, StoredTexture>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 把纹理保存在内存中的宿主实现
///
/// 用于命令行工具和测试。上传命令按提交顺序在专用的 "Memory-Transfer-Queue" 线程上执行，
/// 每完成一次提交就推进 [`GpuTimeline`]，行为上与 transfer queue + timeline semaphore 一致。
///
/// # 线程生命周期
/// 当 `MemoryTextureHost` 被 Drop 时，先关闭命令 channel，
/// 后台线程处理完剩余的命令后退出，然后 join。
pub struct MemoryTextureHost {
    textures: TextureStorage,

    timeline: Arc<GpuTimeline>,
    /// 分配 timeline 值与发送命令必须在同一把锁内，保证执行顺序与 timeline 值一致
    next_timeline_value: Mutex<u64>,
    command_sender: Option<Sender<UploadCommand>>,
    transfer_thread: Option<thread::JoinHandle<()>>,

    settings: Mutex<UploadSettings>,
    native_uploads: AtomicBool,

    upload_count: AtomicUsize,
    destroy_count: AtomicUsize,
}

// new & init
impl MemoryTextureHost {
    pub fn new() -> io::Result<Self> {
        let textures: TextureStorage = Arc::new(Mutex::new(SlotMap::with_key()));
        let timeline = Arc::new(GpuTimeline::new(0));
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<UploadCommand>();

        let transfer_thread = {
            let textures = textures.clone();
            let timeline = timeline.clone();
            thread::Builder::new().name("Memory-Transfer-Queue".to_string()).spawn(move || {
                while let Ok(command) = command_rx.recv() {
                    Self::execute(&textures, command.texture, command.writes);
                    timeline.signal(command.target_value);
                }
            })?
        };

        Ok(Self {
            textures,
            timeline,
            next_timeline_value: Mutex::new(1),
            command_sender: Some(command_tx),
            transfer_thread: Some(transfer_thread),
            settings: Mutex::new(UploadSettings {
                buffer_size_mb: 128,
                persistent_buffer: true,
                max_texture_dimension: 16384,
            }),
            native_uploads: AtomicBool::new(true),
            upload_count: AtomicUsize::new(0),
            destroy_count: AtomicUsize::new(0),
        })
    }

    /// 关闭后 [`TextureHost::upload_native`] 返回 `None`
    pub fn set_native_uploads(&self, enabled: bool) {
        self.native_uploads.store(enabled, Ordering::Relaxed);
    }
}

// destroy
impl Drop for MemoryTextureHost {
    fn drop(&mut self) {
        // 先关闭 channel，否则后台线程的 recv 会一直阻塞
        self.command_sender = None;
        if let Some(thread) = self.transfer_thread.take()
            && thread.join().is_err()
        {
            log::error!("Failed to join memory transfer thread");
        }
    }
}

// getters
impl MemoryTextureHost {
    /// CPU 端读回某个 (layer, mip) 的数据；纹理不可读或不存在时返回 `None`
    pub fn mip_data(&self, texture: HostTextureId, layer: u32, mip: u32) -> Option<Vec<u8>> {
        let textures = lock(&self.textures);
        let stored = textures.get(texture)?;
        if !stored.info.readable {
            return None;
        }
        let index = region_index(&stored.layout, layer, mip)?;
        Some(stored.regions[index].clone())
    }

    pub fn texture_info(&self, texture: HostTextureId) -> Option<TextureCreateInfo> {
        lock(&self.textures).get(texture).map(|stored| stored.info.clone())
    }

    pub fn contains(&self, texture: HostTextureId) -> bool {
        lock(&self.textures).contains_key(texture)
    }

    /// 当前存活的纹理数量
    pub fn live_count(&self) -> usize {
        lock(&self.textures).len()
    }

    /// 成功销毁的纹理总数
    pub fn destroy_count(&self) -> usize {
        self.destroy_count.load(Ordering::Acquire)
    }

    /// 提交过的上传命令总数
    pub fn upload_count(&self) -> usize {
        self.upload_count.load(Ordering::Acquire)
    }

    pub fn settings(&self) -> UploadSettings {
        *lock(&self.settings)
    }

    #[inline]
    pub fn timeline(&self) -> &Arc<GpuTimeline> {
        &self.timeline
    }
}

// tools
impl MemoryTextureHost {
    fn execute(
        textures: &Mutex<SlotMap<HostTextureId, StoredTexture>>,
        texture: HostTextureId,
        writes: Vec<(usize, PinnedSlice)>,
    ) {
        let mut textures = lock(textures);
        let Some(stored) = textures.get_mut(texture) else {
            log::warn!("Upload target {:?} was destroyed before the upload executed", texture);
            return;
        };
        for (index, data) in writes {
            stored.regions[index].clear();
            stored.regions[index].extend_from_slice(&data);
        }
    }

    fn submit(&self, texture: HostTextureId, writes: Vec<(usize, PinnedSlice)>) -> Box<dyn CompleteHandler> {
        let mut next_value = lock(&self.next_timeline_value);
        let target_value = *next_value;
        *next_value += 1;

        let command = UploadCommand {
            texture,
            writes,
            target_value,
        };
        let sent = match &self.command_sender {
            Some(sender) => sender.send(command).map_err(|err| err.0),
            None => Err(command),
        };
        self.upload_count.fetch_add(1, Ordering::AcqRel);

        match sent {
            Ok(()) => Box::new(TimelineCompleteHandler::new(self.timeline.clone(), target_value)),
            Err(command) => {
                // 后台线程已经退出，直接在当前线程执行
                log::error!("Memory transfer queue is closed, upload executes inline");
                Self::execute(&self.textures, command.texture, command.writes);
                self.timeline.signal(command.target_value);
                Box::new(Completed)
            }
        }
    }

    fn check_native_upload(&self, texture: HostTextureId, layout: &MipLayout, len: usize) -> Result<(), UploadError> {
        let textures = lock(&self.textures);
        let stored = textures.get(texture).ok_or(UploadError::UnknownTexture(texture))?;
        if stored.layout != *layout || len < layout.total_size() {
            return Err(UploadError::RegionMismatch {
                layer: 0,
                mip: 0,
                expected: stored.layout.total_size(),
                actual: len,
            });
        }
        Ok(())
    }
}

fn region_index(layout: &MipLayout, layer: u32, mip: u32) -> Option<usize> {
    layout.region(layer, mip)?;
    Some((layer * layout.mip_count() + mip) as usize)
}

impl TextureHost for MemoryTextureHost {
    fn create(&self, info: &TextureCreateInfo) -> Result<HostTextureId, UploadError> {
        if info.width == 0 || info.height == 0 || info.depth == 0 || info.mip_count == 0 || info.layer_count == 0 {
            return Err(UploadError::ZeroSize {
                width: info.width,
                height: info.height,
                depth: info.depth,
                mip_count: info.mip_count,
                layer_count: info.layer_count,
            });
        }
        let max = lock(&self.settings).max_texture_dimension;
        let size = info.width.max(info.height).max(info.depth);
        if size > max {
            return Err(UploadError::TooLarge { size, max });
        }

        let layout = info.mip_layout()?;
        let regions = layout.regions().iter().map(|region| vec![0u8; region.size]).collect();
        let texture = lock(&self.textures).insert(StoredTexture {
            info: info.clone(),
            layout,
            regions,
        });
        log::debug!("Create host texture {:?}: {}", texture, info.name);
        Ok(texture)
    }

    fn upload(
        &self,
        texture: HostTextureId,
        region: &MipRegion,
        data: PinnedSlice,
    ) -> Result<Box<dyn CompleteHandler>, UploadError> {
        let index = {
            let textures = lock(&self.textures);
            let stored = textures.get(texture).ok_or(UploadError::UnknownTexture(texture))?;
            let mismatch = UploadError::RegionMismatch {
                layer: region.layer,
                mip: region.mip,
                expected: region.size,
                actual: data.len(),
            };
            let index = region_index(&stored.layout, region.layer, region.mip).ok_or(mismatch.clone())?;
            if stored.layout.regions()[index].size != data.len() {
                return Err(mismatch);
            }
            index
        };

        Ok(self.submit(texture, vec![(index, data)]))
    }

    fn upload_native(
        &self,
        texture: HostTextureId,
        layout: &MipLayout,
        data: PinnedSlice,
    ) -> Option<Result<Box<dyn CompleteHandler>, UploadError>> {
        if !self.native_uploads.load(Ordering::Relaxed) {
            return None;
        }

        if let Err(err) = self.check_native_upload(texture, layout, data.len()) {
            return Some(Err(err));
        }
        let writes = layout
            .regions()
            .iter()
            .enumerate()
            .map(|(index, region)| (index, data.slice(region.range())))
            .collect();
        Some(Ok(self.submit(texture, writes)))
    }

    fn destroy(&self, texture: HostTextureId) {
        if lock(&self.textures).remove(texture).is_some() {
            self.destroy_count.fetch_add(1, Ordering::AcqRel);
        } else {
            log::warn!("Destroy of unknown host texture {:?}", texture);
        }
    }

    fn apply_upload_settings(&self, settings: &UploadSettings) {
        *lock(&self.settings) = *settings;
    }
}
