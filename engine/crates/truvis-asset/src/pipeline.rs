use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use truvis_dds::{DDS_MAX_HEADER_LEN, FlipError, FormatDescriptor, MipLayout, MipRegion, decode_header, flip_vertical};

use crate::complete_handler::{CompleteHandler, JobHandle, spawn_job};
use crate::config::ProcessPolicy;
use crate::error::{TextureError, UploadError};
use crate::file_reader::{FileReader, ReadHandle};
use crate::guards::{CompleteGuard, PinnedSlice, TextureGuard};
use crate::handle::LoadState;
use crate::host::{TextureCreateInfo, TextureHost};
use crate::texture_hub::TextureLoadOptions;

/// 所有 pipeline 共享的依赖
pub(crate) struct LoadContext {
    pub host: Arc<dyn TextureHost>,
    pub reader: FileReader,
    pub policy: ProcessPolicy,
    pub allow_native_uploads: bool,
    /// 与宿主的上限一致，在分配 payload 之前检查
    pub max_texture_dimension: u32,
}

/// 上传完成后交给 handle 的结果
pub(crate) struct LoadedTexture {
    pub descriptor: FormatDescriptor,
    pub texture: TextureGuard,
}

pub(crate) enum StepOutcome {
    Suspended,
    Complete(LoadedTexture),
    Failed(TextureError),
}

struct Decoded {
    descriptor: FormatDescriptor,
    layout: MipLayout,
}

/// 每个阶段持有它自己的中间产物，阶段切换时旧的产物随之释放
///
/// 字段按声明顺序析构：先等待未完成的异步操作，再销毁纹理。
enum Stage {
    Pending,
    ReadingHeader {
        read: CompleteGuard<ReadHandle>,
    },
    ReadingPayload {
        read: CompleteGuard<ReadHandle>,
        decoded: Decoded,
    },
    Decoding {
        job: CompleteGuard<JobHandle<Result<Vec<u8>, FlipError>>>,
        decoded: Decoded,
    },
    Uploading {
        upload: CompleteGuard<Box<dyn CompleteHandler>>,
        texture: TextureGuard,
        payload: PinnedSlice,
        /// 当前上传完成后要上传的 region
        next_region: usize,
        decoded: Decoded,
    },
    Finished,
}

enum Progress {
    /// 已经切换到下一个阶段，可以继续推进
    Continue,
    Suspended,
    Complete(LoadedTexture),
}

/// 单个纹理的加载流程: 读文件头 -> 读 payload -> (翻转) -> 逐个 region 上传
///
/// 只有在当前异步操作未完成时才会挂起，其余情况下一次 [`LoadPipeline::step`] 会尽量向前推进。
pub(crate) struct LoadPipeline {
    context: Arc<LoadContext>,
    path: PathBuf,
    options: TextureLoadOptions,
    stage: Stage,
}

// new & init
impl LoadPipeline {
    pub fn new(context: Arc<LoadContext>, path: PathBuf, options: TextureLoadOptions) -> Self {
        Self {
            context,
            path,
            options,
            stage: Stage::Pending,
        }
    }
}

// getters
impl LoadPipeline {
    pub fn state(&self) -> LoadState {
        match self.stage {
            Stage::Pending => LoadState::Pending,
            Stage::ReadingHeader { .. } | Stage::ReadingPayload { .. } | Stage::Decoding { .. } => {
                LoadState::WaitingOnIo
            }
            Stage::Uploading { .. } => LoadState::WaitingOnUpload,
            // handle 在 pipeline 结束时就会把它丢弃
            Stage::Finished => LoadState::Error,
        }
    }
}

// tools
impl LoadPipeline {
    /// 推进到下一个挂起点，或者结束
    pub fn step(&mut self) -> StepOutcome {
        loop {
            match self.advance() {
                Ok(Progress::Continue) => continue,
                Ok(Progress::Suspended) => return StepOutcome::Suspended,
                Ok(Progress::Complete(loaded)) => return StepOutcome::Complete(loaded),
                Err(err) => {
                    self.stage = Stage::Finished;
                    return StepOutcome::Failed(err);
                }
            }
        }
    }

    /// 阻塞直到当前的异步操作完成
    pub fn wait_active(&mut self) {
        match &mut self.stage {
            Stage::ReadingHeader { read } | Stage::ReadingPayload { read, .. } => read.wait_until_complete(),
            Stage::Decoding { job, .. } => job.wait_until_complete(),
            Stage::Uploading { upload, .. } => upload.wait_until_complete(),
            Stage::Pending | Stage::Finished => {}
        }
    }

    fn advance(&mut self) -> Result<Progress, TextureError> {
        let stage = std::mem::replace(&mut self.stage, Stage::Finished);

        match stage {
            Stage::Pending => {
                let read = self.context.reader.read(&self.path, 0, DDS_MAX_HEADER_LEN, vec![0; DDS_MAX_HEADER_LEN]);
                self.stage = Stage::ReadingHeader {
                    read: CompleteGuard::new(read),
                };
                Ok(Progress::Continue)
            }

            Stage::ReadingHeader { mut read } => {
                if !read.is_complete() {
                    self.stage = Stage::ReadingHeader { read };
                    return Ok(Progress::Suspended);
                }
                let buffer = read.into_inner().finish().map_err(|e| TextureError::io(&self.path, e))?;

                // 文件头不合法或者尺寸超出宿主上限时直接失败，不会分配 payload 缓冲区
                let mut descriptor = decode_header(buffer.filled())?;
                if let Some(linear) = self.options.linear {
                    descriptor = descriptor.with_linear_override(linear);
                }
                let size = descriptor.width.max(descriptor.height).max(descriptor.depth);
                let max = self.context.max_texture_dimension;
                if size > max {
                    return Err(UploadError::TooLarge { size, max }.into());
                }
                let layout = descriptor.mip_layout()?;

                let read = self
                    .context
                    .reader
                    .read_exact(&self.path, descriptor.data_offset as u64, layout.total_size());
                self.stage = Stage::ReadingPayload {
                    read: CompleteGuard::new(read),
                    decoded: Decoded { descriptor, layout },
                };
                Ok(Progress::Continue)
            }

            Stage::ReadingPayload { mut read, decoded } => {
                if !read.is_complete() {
                    self.stage = Stage::ReadingPayload { read, decoded };
                    return Ok(Progress::Suspended);
                }
                let buffer = read.into_inner().finish().map_err(|e| TextureError::io(&self.path, e))?;

                let expected = decoded.layout.total_size();
                if buffer.bytes_read() < expected {
                    let err = io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("payload truncated: expected {} bytes, got {}", expected, buffer.bytes_read()),
                    );
                    return Err(TextureError::io(&self.path, err));
                }

                let descriptor = &decoded.descriptor;
                log::info!(
                    "IO finished for texture: {:?}, size: {}x{}x{}, {} mips, {} layers, {:?}",
                    self.path,
                    descriptor.width,
                    descriptor.height,
                    descriptor.depth,
                    descriptor.mip_count,
                    descriptor.layer_count(),
                    descriptor.format
                );

                let mut data = buffer.into_vec();
                let format = descriptor.format;
                if self.context.policy.needs_flip(format) {
                    let layout = decoded.layout.clone();
                    let job = spawn_job(self.context.reader.pool(), move || {
                        flip_vertical(format, &layout, &mut data).map(|()| data)
                    });
                    self.stage = Stage::Decoding {
                        job: CompleteGuard::new(job),
                        decoded,
                    };
                } else {
                    self.stage = self.begin_upload(decoded, data)?;
                }
                Ok(Progress::Continue)
            }

            Stage::Decoding { mut job, decoded } => {
                if !job.is_complete() {
                    self.stage = Stage::Decoding { job, decoded };
                    return Ok(Progress::Suspended);
                }
                let data = job.into_inner().finish().ok_or(TextureError::Aborted { stage: "decoding" })??;
                self.stage = self.begin_upload(decoded, data)?;
                Ok(Progress::Continue)
            }

            Stage::Uploading {
                mut upload,
                texture,
                payload,
                next_region,
                decoded,
            } => {
                if !upload.is_complete() {
                    self.stage = Stage::Uploading {
                        upload,
                        texture,
                        payload,
                        next_region,
                        decoded,
                    };
                    return Ok(Progress::Suspended);
                }
                drop(upload);

                if next_region >= decoded.layout.regions().len() {
                    log::info!("Upload finished for texture: {:?}", self.path);
                    return Ok(Progress::Complete(LoadedTexture {
                        descriptor: decoded.descriptor,
                        texture,
                    }));
                }

                let region = decoded.layout.regions()[next_region];
                let upload = self.upload_region(&texture, &region, &payload)?;
                self.stage = Stage::Uploading {
                    upload,
                    texture,
                    payload,
                    next_region: next_region + 1,
                    decoded,
                };
                Ok(Progress::Continue)
            }

            Stage::Finished => Err(TextureError::Aborted {
                stage: "stepping a finished load",
            }),
        }
    }

    /// 创建宿主纹理并发起第一次上传
    fn begin_upload(&self, decoded: Decoded, data: Vec<u8>) -> Result<Stage, TextureError> {
        let host = &self.context.host;
        let info = TextureCreateInfo::from_descriptor(
            self.path.to_string_lossy(),
            &decoded.descriptor,
            !self.options.unreadable,
        );
        let texture = TextureGuard::new(host.clone(), host.create(&info)?);
        let payload = PinnedSlice::new(data);

        if self.context.allow_native_uploads
            && let Some(result) = host.upload_native(texture.id(), &decoded.layout, payload.clone())
        {
            let upload = CompleteGuard::new(result?);
            return Ok(Stage::Uploading {
                upload,
                texture,
                payload,
                next_region: decoded.layout.regions().len(),
                decoded,
            });
        }

        let Some(&first) = decoded.layout.regions().first() else {
            return Err(TextureError::Aborted { stage: "uploading an empty layout" });
        };
        let upload = self.upload_region(&texture, &first, &payload)?;
        Ok(Stage::Uploading {
            upload,
            texture,
            payload,
            next_region: 1,
            decoded,
        })
    }

    fn upload_region(
        &self,
        texture: &TextureGuard,
        region: &MipRegion,
        payload: &PinnedSlice,
    ) -> Result<CompleteGuard<Box<dyn CompleteHandler>>, TextureError> {
        let handler = self.context.host.upload(texture.id(), region, payload.slice(region.range()))?;
        Ok(CompleteGuard::new(handler))
    }
}
