//! DDS 批量加载工具
//!
//! 加载指定文件或目录下的所有 `.dds` 文件，输出每个文件的格式信息以及翻转 / 重新压缩的判定。
//! 单个文件失败只记录日志，不影响其它文件。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use truvis_asset::{
    LoadHint, LoadState, LoaderConfig, MemoryTextureHost, TextureHandle, TextureHub, TextureLoadOptions,
    build_io_pool,
};
use truvis_crate_tools::init_log::init_log;

#[derive(Parser, Debug)]
#[command(name = "dds-batch")]
#[command(about = "Load DDS textures and report their layout")]
struct Cli {
    /// DDS 文件或包含 DDS 文件的目录
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// 加载配置 (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// IO 线程数
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// 逐个同步加载
    #[arg(long)]
    sync: bool,
}

fn collect_dds_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|path| walkdir::WalkDir::new(path).into_iter())
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::error!("Failed to walk directory: {}", err);
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("dds")))
        .map(|entry| entry.into_path())
        .collect()
}

fn report(hub: &TextureHub, handle: &TextureHandle) {
    let path = handle.path().display();
    match handle.get_texture() {
        Ok(texture) => {
            let Some(desc) = handle.descriptor() else {
                return;
            };
            let policy = hub.policy();
            println!(
                "{path}: {}x{}x{} {:?} {:?} compressed={} mips={} layers={} {:?} flip={} recompress={} texture={:?}",
                desc.width,
                desc.height,
                desc.depth,
                desc.dimension,
                desc.format,
                desc.format.is_compressed(),
                desc.mip_count,
                desc.layer_count(),
                desc.color_space,
                policy.needs_flip(desc.format),
                policy.needs_recompress(desc.format),
                texture
            );
        }
        Err(err) => println!("{path}: FAILED ({}) {err}", err.kind()),
    }
}

fn main() -> anyhow::Result<()> {
    init_log();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };
    let pool = build_io_pool(cli.threads).context("创建 IO 线程池失败")?;
    let host = Arc::new(MemoryTextureHost::new().context("创建纹理宿主失败")?);
    let mut hub = TextureHub::new(&config, host.clone(), Arc::new(pool));

    let files = collect_dds_files(&cli.paths);
    log::info!("Found {} DDS files", files.len());

    let options = TextureLoadOptions {
        hint: if cli.sync { LoadHint::Synchronous } else { LoadHint::Asynchronous },
        ..Default::default()
    };
    let handles: Vec<TextureHandle> = files.iter().map(|path| hub.load_texture(path, options)).collect();

    while hub.update() > 0 {
        std::thread::sleep(Duration::from_millis(1));
    }

    let failed = handles.iter().filter(|handle| handle.state() == LoadState::Error).count();
    for handle in &handles {
        report(&hub, handle);
    }

    drop(handles);
    hub.update();
    log::info!(
        "Loaded {} files, {} failed, {} textures destroyed",
        files.len(),
        failed,
        host.destroy_count()
    );
    hub.destroy();

    Ok(())
}
