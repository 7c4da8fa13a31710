//! 宿主纹理 API 的边界
//!
//! 加载器本身不持有任何图形资源，纹理对象的创建、上传、销毁全部交给 [`TextureHost`]。

use slotmap::new_key_type;
use truvis_dds::{ColorSpace, FormatDescriptor, FormatError, MipLayout, MipRegion, PixelFormat, TextureDimension};

use crate::complete_handler::CompleteHandler;
use crate::error::UploadError;
use crate::guards::PinnedSlice;

new_key_type! { pub struct HostTextureId; }

/// 创建宿主纹理所需的全部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureCreateInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_count: u32,
    /// cubemap 的每个面各占一层
    pub layer_count: u32,
    pub dimension: TextureDimension,
    pub format: PixelFormat,
    pub color_space: ColorSpace,
    /// 上传完成后 CPU 端是否还能读回数据
    pub readable: bool,
}

impl TextureCreateInfo {
    pub fn from_descriptor(name: impl Into<String>, descriptor: &FormatDescriptor, readable: bool) -> Self {
        Self {
            name: name.into(),
            width: descriptor.width,
            height: descriptor.height,
            depth: descriptor.depth,
            mip_count: descriptor.mip_count,
            layer_count: descriptor.layer_count(),
            dimension: descriptor.dimension,
            format: descriptor.format,
            color_space: descriptor.color_space,
            readable,
        }
    }

    pub fn new_2d(name: impl Into<String>, width: u32, height: u32, mip_count: u32, format: PixelFormat) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            depth: 1,
            mip_count,
            layer_count: 1,
            dimension: TextureDimension::Texture2D,
            format,
            color_space: format.color_space(),
            readable: true,
        }
    }

    /// 与创建参数一致的 mip 布局
    pub fn mip_layout(&self) -> Result<MipLayout, FormatError> {
        MipLayout::new(
            self.format,
            self.dimension,
            [self.width, self.height, self.depth],
            self.mip_count,
            self.layer_count,
        )
    }
}

/// 上传通道的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    pub buffer_size_mb: u32,
    pub persistent_buffer: bool,
    pub max_texture_dimension: u32,
}

/// 宿主的纹理对象 API
///
/// 所有方法都可能在任意线程上调用。上传是异步的，返回的 [`CompleteHandler`]
/// 完成之前，宿主可以一直持有传入的 [`PinnedSlice`]。
pub trait TextureHost: Send + Sync {
    fn create(&self, info: &TextureCreateInfo) -> Result<HostTextureId, UploadError>;

    /// 上传一个 (layer, mip)
    fn upload(
        &self,
        texture: HostTextureId,
        region: &MipRegion,
        data: PinnedSlice,
    ) -> Result<Box<dyn CompleteHandler>, UploadError>;

    /// 一次上传整个 payload
    ///
    /// 返回 `None` 表示宿主不支持，调用方应改为逐个 region 上传。
    fn upload_native(
        &self,
        _texture: HostTextureId,
        _layout: &MipLayout,
        _data: PinnedSlice,
    ) -> Option<Result<Box<dyn CompleteHandler>, UploadError>> {
        None
    }

    fn destroy(&self, texture: HostTextureId);

    fn apply_upload_settings(&self, _settings: &UploadSettings) {}
}
