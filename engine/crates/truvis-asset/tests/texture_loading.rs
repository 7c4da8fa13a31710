mod common;

use common::*;
use truvis_asset::{
    LoadHint, LoadState, LoaderConfig, StepResult, TextureError, TextureLoadOptions, UploadError,
};
use truvis_dds::{FormatError, PixelFormat, UnsupportedFormatError};

#[test]
fn test_async_load_uploads_every_mip() {
    let dir = tempfile::tempdir().unwrap();
    // 4x4 RGBA8, 2 mips: 64 + 16 bytes
    let payload = pattern(80);
    let path = write_dds(dir.path(), "rgba.dds", &header(4, 4, 2, rgba8_pixel_format()), None, &payload);

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::default());
    drive(&mut hub);
    assert_eq!(handle.state(), LoadState::Complete);

    let texture = handle.try_get_texture().unwrap().unwrap();
    assert_eq!(host.mip_data(texture, 0, 0).unwrap(), payload[..64]);
    assert_eq!(host.mip_data(texture, 0, 1).unwrap(), payload[64..]);

    let desc = handle.descriptor().unwrap();
    assert_eq!(desc.format, PixelFormat::R8G8B8A8Unorm);
    assert_eq!((desc.width, desc.height, desc.mip_count), (4, 4, 2));
}

#[test]
fn test_blocking_retrieval_returns_identical_texture() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "a.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));

    let (mut hub, _host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::default());

    let first = handle.get_texture().unwrap();
    let second = handle.get_texture().unwrap();
    assert_eq!(first, second);
    assert_eq!(handle.step(), StepResult::Done);
}

#[test]
fn test_bad_magic_is_sticky_and_allocates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.dds");
    let mut bytes = vec![0u8; 256];
    bytes[..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::default());

    for _ in 0..2 {
        match handle.get_texture() {
            Err(TextureError::Format(FormatError::InvalidMagic(magic))) => assert_eq!(magic, 0xDEAD_BEEF),
            other => panic!("unexpected result: {other:?}"),
        }
    }
    assert_eq!(handle.state(), LoadState::Error);
    assert!(handle.failure().unwrap().to_string().contains("invalid magic"));
    assert_eq!(host.live_count(), 0);
    assert_eq!(host.upload_count(), 0);
    assert_eq!(hub.reads_in_flight(), 0);
}

#[test]
fn test_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let mut pixel_format = rgba8_pixel_format();
    // X8R8G8B8 没有对应的格式
    pixel_format.r_bit_mask = 0x00FF_0000;
    pixel_format.b_bit_mask = 0x0000_00FF;
    pixel_format.a_bit_mask = 0;
    let path = write_dds(dir.path(), "xrgb.dds", &header(2, 2, 1, pixel_format), None, &pattern(16));

    let (mut hub, _host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    assert!(matches!(
        handle.get_texture(),
        Err(TextureError::Unsupported(UnsupportedFormatError::PixelFormat { a_mask: 0, .. }))
    ));
}

#[test]
fn test_truncated_payload_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "short.dds", &header(4, 4, 1, rgba8_pixel_format()), None, &pattern(10));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::default());
    match handle.get_texture() {
        Err(TextureError::Io { source, .. }) => assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(host.live_count(), 0);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut hub, _host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(dir.path().join("missing.dds"), TextureLoadOptions::default());
    drive(&mut hub);
    assert!(matches!(handle.try_get_texture(), Some(Err(TextureError::Io { .. }))));
}

#[test]
fn test_one_acquire_two_disposes_destroy_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "rc.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    let texture = handle.get_texture().unwrap();

    let acquired = handle.acquire();
    assert_eq!(acquired.ref_count(), 2);
    assert_eq!(acquired.get_texture().unwrap(), texture);

    handle.dispose();
    assert_eq!(host.destroy_count(), 0);
    assert!(host.contains(texture));

    acquired.dispose();
    assert_eq!(host.destroy_count(), 1);
    assert!(!host.contains(texture));

    hub.update();
    assert_eq!(hub.tracked_count(), 0);
    assert_eq!(host.destroy_count(), 1);
}

#[test]
fn test_two_threads_acquire_and_dispose() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "shared.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    let texture = handle.get_texture().unwrap();

    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<()>(0);
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let owned = handle.acquire();
            let ready_rx = ready_rx.clone();
            std::thread::spawn(move || {
                assert_eq!(owned.get_texture().unwrap(), texture);
                ready_rx.recv().unwrap();
                owned.dispose();
            })
        })
        .collect();
    handle.dispose();
    assert_eq!(host.destroy_count(), 0);

    ready_tx.send(()).unwrap();
    assert_eq!(host.destroy_count(), 0);
    ready_tx.send(()).unwrap();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(host.destroy_count(), 1);
    assert_eq!(host.live_count(), 0);
}

#[test]
fn test_release_while_loading_destroys_on_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "early.dds", &header(8, 8, 1, rgba8_pixel_format()), None, &pattern(256));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::default());
    let was_done = handle.is_done();
    drop(handle);

    drive(&mut hub);
    assert_eq!(hub.tracked_count(), 0);
    assert_eq!(host.live_count(), 0);
    if !was_done {
        assert_eq!(host.destroy_count(), 1);
    }
}

#[test]
fn test_same_path_shares_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "dup.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let first = hub.load_texture(&path, TextureLoadOptions::default());
    let second = hub.load_texture(&path, TextureLoadOptions::default());
    assert!(first.ptr_eq(&second));
    assert_eq!(first.ref_count(), 2);
    assert_eq!(hub.tracked_count(), 1);

    drive(&mut hub);
    assert_eq!(first.get_texture().unwrap(), second.get_texture().unwrap());
    assert_eq!(hub.get_status(&path), Some(LoadState::Complete));

    drop(first);
    drop(second);
    hub.update();
    assert_eq!(hub.get_status(&path), None);

    // 全部释放后重新加载会得到新的纹理
    let third = hub.load_texture(&path, TextureLoadOptions::synchronous());
    assert_eq!(third.ref_count(), 1);
    assert!(third.get_texture().is_ok());
    assert_eq!(host.live_count(), 1);
}

#[test]
fn test_malformed_file_does_not_affect_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_dds(dir.path(), "good.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));
    let bad = dir.path().join("bad.dds");
    std::fs::write(&bad, b"not a dds file").unwrap();

    let (mut hub, _host) = setup(&LoaderConfig::default());
    let handles = [
        hub.load_texture(&bad, TextureLoadOptions::default()),
        hub.load_texture(&good, TextureLoadOptions::default()),
    ];
    drive(&mut hub);

    assert_eq!(handles[0].state(), LoadState::Error);
    assert_eq!(handles[1].state(), LoadState::Complete);
}

#[test]
fn test_flip_rows_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "flip.dds", &header(2, 3, 1, r8_pixel_format()), None, &[1, 2, 3, 4, 5, 6]);

    let config = LoaderConfig {
        flip_textures: true,
        ..Default::default()
    };
    let (mut hub, host) = setup(&config);
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    let texture = handle.get_texture().unwrap();
    assert_eq!(host.mip_data(texture, 0, 0).unwrap(), vec![5, 6, 3, 4, 1, 2]);
}

#[test]
fn test_native_and_per_region_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "mips.dds", &header(4, 4, 3, r8_pixel_format()), None, &pattern(16 + 4 + 1));

    let (mut hub, host) = setup(&LoaderConfig::default());
    host.set_native_uploads(false);
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    let texture = handle.get_texture().unwrap();
    assert_eq!(host.upload_count(), 3);
    assert_eq!(host.mip_data(texture, 0, 2).unwrap(), pattern(21)[20..]);

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    handle.get_texture().unwrap();
    assert_eq!(host.upload_count(), 1);
}

#[test]
fn test_dx10_cubemap_layers() {
    let dir = tempfile::tempdir().unwrap();
    let (header, header10) = dx10_cube_header(2, 28);
    let payload = pattern(6 * 16);
    let path = write_dds(dir.path(), "cube.dds", &header, Some(&header10), &payload);

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    let texture = handle.get_texture().unwrap();

    let desc = handle.descriptor().unwrap();
    assert!(desc.is_cubemap());
    assert_eq!(desc.data_offset, 148);
    assert_eq!(host.texture_info(texture).unwrap().layer_count, 6);
    assert_eq!(host.mip_data(texture, 5, 0).unwrap(), payload[80..]);
}

#[test]
fn test_inline_read_with_synchronous_hint() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "sync.dds", &header(1, 1, 1, rgba8_pixel_format()), None, &pattern(4));

    let config = LoaderConfig {
        use_async_read: false,
        ..Default::default()
    };
    let (mut hub, _host) = setup(&config);
    let handle = hub.load_texture(
        &path,
        TextureLoadOptions {
            hint: LoadHint::Synchronous,
            ..Default::default()
        },
    );
    assert_eq!(handle.state(), LoadState::Complete);
    assert!(handle.try_get_texture().unwrap().is_ok());
}

#[test]
fn test_linear_override_and_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "srgb.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handle = hub.load_texture(
        &path,
        TextureLoadOptions {
            hint: LoadHint::Synchronous,
            unreadable: true,
            linear: Some(false),
        },
    );
    let texture = handle.get_texture().unwrap();
    let info = host.texture_info(texture).unwrap();
    assert_eq!(info.format, PixelFormat::R8G8B8A8Srgb);
    assert!(!info.readable);
    assert!(host.mip_data(texture, 0, 0).is_none());
}

#[test]
fn test_host_rejects_oversized_texture() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "big.dds", &header(16, 16, 1, r8_pixel_format()), None, &pattern(256));

    let config = LoaderConfig {
        max_texture_dimension: 8,
        ..Default::default()
    };
    let (mut hub, host) = setup(&config);
    assert_eq!(host.settings().max_texture_dimension, 8);

    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    assert!(matches!(
        handle.get_texture(),
        Err(TextureError::Upload(UploadError::TooLarge { size: 16, max: 8 }))
    ));
    assert_eq!(host.live_count(), 0);
}

#[test]
fn test_huge_header_fails_before_payload_allocation() {
    let dir = tempfile::tempdir().unwrap();
    let huge = write_dds(dir.path(), "huge.dds", &header(1 << 20, 1 << 20, 1, rgba8_pixel_format()), None, &pattern(16));
    let good = write_dds(dir.path(), "good.dds", &header(2, 2, 1, rgba8_pixel_format()), None, &pattern(16));

    let (mut hub, host) = setup(&LoaderConfig::default());
    let handles = [
        hub.load_texture(&huge, TextureLoadOptions::default()),
        hub.load_texture(&good, TextureLoadOptions::default()),
    ];
    drive(&mut hub);

    assert!(matches!(
        handles[0].get_texture(),
        Err(TextureError::Upload(UploadError::TooLarge { size: 1048576, max: 16384 }))
    ));
    assert!(handles[1].get_texture().is_ok());
    assert_eq!(host.live_count(), 1);
    assert_eq!(hub.reads_in_flight(), 0);
}

#[test]
fn test_huge_header_on_short_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dds(dir.path(), "huge.dds", &header(1 << 20, 1 << 20, 1, rgba8_pixel_format()), None, &pattern(16));

    // 宿主上限足够大时，由文件长度拒绝 4 TiB 的 payload
    let config = LoaderConfig {
        max_texture_dimension: 1 << 20,
        ..Default::default()
    };
    let (mut hub, host) = setup(&config);
    let handle = hub.load_texture(&path, TextureLoadOptions::default());
    match handle.get_texture() {
        Err(TextureError::Io { source, .. }) => assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(host.live_count(), 0);
}

#[test]
fn test_overflowing_header_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let (header, header10) = dx10_header(u32::MAX, u32::MAX, 2);
    let path = write_dds(dir.path(), "overflow.dds", &header, Some(&header10), &pattern(16));

    let config = LoaderConfig {
        max_texture_dimension: u32::MAX,
        ..Default::default()
    };
    let (mut hub, host) = setup(&config);
    let handle = hub.load_texture(&path, TextureLoadOptions::synchronous());
    assert!(matches!(
        handle.get_texture(),
        Err(TextureError::Format(FormatError::PayloadTooLarge { width: u32::MAX, .. }))
    ));
    assert_eq!(host.live_count(), 0);
}

#[test]
fn test_hub_destroy_waits_for_pending_loads() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..4)
        .map(|i| {
            write_dds(dir.path(), &format!("{i}.dds"), &header(8, 8, 1, rgba8_pixel_format()), None, &pattern(256))
        })
        .collect();

    let (mut hub, host) = setup(&LoaderConfig::default());
    let kept = hub.load_texture(&paths[0], TextureLoadOptions::default());
    for path in &paths[1..] {
        drop(hub.load_texture(path, TextureLoadOptions::default()));
    }

    hub.destroy();

    // 没有 owner 的三个纹理已经销毁，仍被持有的那个保持可用
    assert_eq!(host.live_count(), 1);
    assert!(kept.get_texture().is_ok());
    drop(kept);
    assert_eq!(host.live_count(), 0);
}
