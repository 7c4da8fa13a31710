use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use truvis_dds::{PixelFormat, is_flippable};

use crate::host::{TextureHost, UploadSettings};

/// 上传缓冲区大小的合法范围 (MB)
pub const UPLOAD_BUFFER_SIZE_RANGE: std::ops::RangeInclusive<u32> = 2..=2047;

/// 纹理加载配置
///
/// 所有字段都有默认值，TOML 文件中只需要写需要修改的部分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 是否在加载时垂直翻转纹理（DDS 的原点在左上角）
    pub flip_textures: bool,

    /// 打包时是否对 DXT 纹理做 crunch 压缩
    pub crunch_compression: bool,

    /// 打包时是否启用 LZ4 压缩
    pub enable_lz4_compression: bool,

    /// 异步上传缓冲区大小，单位 MB
    pub async_upload_buffer_size: u32,

    /// 上传缓冲区是否常驻
    pub async_upload_persistent_buffer: bool,

    /// 宿主支持时，是否用一次整体上传代替逐 mip 上传
    pub allow_native_uploads: bool,

    /// false 时在调用线程上同步读取文件
    pub use_async_read: bool,

    /// 宿主允许的最大纹理边长
    pub max_texture_dimension: u32,

    /// 即使开启了 flip_textures 也不翻转的格式
    pub flip_exceptions: Vec<PixelFormat>,

    /// 打包时需要重新压缩的格式
    pub recompress_formats: Vec<PixelFormat>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            flip_textures: false,
            crunch_compression: false,
            enable_lz4_compression: true,
            async_upload_buffer_size: 128,
            async_upload_persistent_buffer: true,
            allow_native_uploads: true,
            use_async_read: true,
            max_texture_dimension: 16384,
            flip_exceptions: vec![
                PixelFormat::Bc6hUfloat,
                PixelFormat::Bc6hSfloat,
                PixelFormat::Bc7Unorm,
                PixelFormat::Bc7Srgb,
            ],
            recompress_formats: vec![PixelFormat::Bc1Unorm, PixelFormat::Bc1Srgb],
        }
    }
}

// new & init
impl LoaderConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: LoaderConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path.as_ref(), content).with_context(|| format!("写入配置文件失败: {:?}", path.as_ref()))?;
        Ok(())
    }
}

// tools
impl LoaderConfig {
    /// 交给宿主的上传参数，缓冲区大小会被限制在合法范围内
    pub fn upload_settings(&self) -> UploadSettings {
        let requested = self.async_upload_buffer_size;
        let buffer_size_mb = requested.clamp(*UPLOAD_BUFFER_SIZE_RANGE.start(), *UPLOAD_BUFFER_SIZE_RANGE.end());
        if buffer_size_mb != requested {
            log::warn!("async_upload_buffer_size {} MB is out of range, clamped to {} MB", requested, buffer_size_mb);
        }

        UploadSettings {
            buffer_size_mb,
            persistent_buffer: self.async_upload_persistent_buffer,
            max_texture_dimension: self.max_texture_dimension,
        }
    }

    /// 把上传相关的配置应用到宿主
    pub fn apply(&self, host: &dyn TextureHost) {
        let settings = self.upload_settings();
        log::info!(
            "Apply upload settings: buffer {} MB, persistent: {}, max dimension: {}",
            settings.buffer_size_mb,
            settings.persistent_buffer,
            settings.max_texture_dimension
        );
        host.apply_upload_settings(&settings);
    }

    pub fn process_policy(&self) -> ProcessPolicy {
        ProcessPolicy {
            flip_textures: self.flip_textures,
            recompress: self.crunch_compression || self.enable_lz4_compression,
            flip_exceptions: self.flip_exceptions.clone(),
            recompress_formats: self.recompress_formats.clone(),
        }
    }
}

/// 每种格式需要做哪些后处理
///
/// 不根据格式名推断，完全由配置中的例外表决定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPolicy {
    flip_textures: bool,
    recompress: bool,
    flip_exceptions: Vec<PixelFormat>,
    recompress_formats: Vec<PixelFormat>,
}

impl ProcessPolicy {
    pub fn needs_flip(&self, format: PixelFormat) -> bool {
        if !self.flip_textures || self.flip_exceptions.contains(&format) {
            return false;
        }
        if !is_flippable(format) {
            log::warn!("{:?} is not in flip_exceptions but cannot be flipped, skip", format);
            return false;
        }
        true
    }

    pub fn needs_recompress(&self, format: PixelFormat) -> bool {
        self.recompress && self.recompress_formats.contains(&format)
    }
}
