#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use truvis_asset::{LoaderConfig, MemoryTextureHost, TextureHub, build_io_pool};
use truvis_dds::header::{
    Caps2, DDS_HEADER_SIZE, DDS_MAGIC, DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FOURCC_DX10, PixelFormatFlags,
};

pub fn rgba8_pixel_format() -> DdsPixelFormat {
    DdsPixelFormat {
        size: 32,
        flags: (PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS).bits(),
        rgb_bit_count: 32,
        r_bit_mask: 0x0000_00FF,
        g_bit_mask: 0x0000_FF00,
        b_bit_mask: 0x00FF_0000,
        a_bit_mask: 0xFF00_0000,
        ..Default::default()
    }
}

pub fn r8_pixel_format() -> DdsPixelFormat {
    DdsPixelFormat {
        size: 32,
        flags: PixelFormatFlags::LUMINANCE.bits(),
        rgb_bit_count: 8,
        r_bit_mask: 0xFF,
        ..Default::default()
    }
}

pub fn header(width: u32, height: u32, mips: u32, pixel_format: DdsPixelFormat) -> DdsHeader {
    DdsHeader {
        size: DDS_HEADER_SIZE,
        width,
        height,
        mip_map_count: mips,
        pixel_format,
        ..Default::default()
    }
}

/// 带 DX10 扩展头的 2D 纹理
pub fn dx10_header(width: u32, height: u32, dxgi_format: u32) -> (DdsHeader, DdsHeaderDxt10) {
    let pixel_format = DdsPixelFormat {
        size: 32,
        flags: PixelFormatFlags::FOUR_CC.bits(),
        four_cc: FOURCC_DX10,
        ..Default::default()
    };
    let header10 = DdsHeaderDxt10 {
        dxgi_format,
        resource_dimension: 3,
        array_size: 1,
        ..Default::default()
    };
    (header(width, height, 1, pixel_format), header10)
}

/// 带 DX10 扩展头的 cubemap
pub fn dx10_cube_header(face: u32, dxgi_format: u32) -> (DdsHeader, DdsHeaderDxt10) {
    let pixel_format = DdsPixelFormat {
        size: 32,
        flags: PixelFormatFlags::FOUR_CC.bits(),
        four_cc: FOURCC_DX10,
        ..Default::default()
    };
    let mut header = header(face, face, 1, pixel_format);
    header.caps2 = Caps2::CUBEMAP.bits();
    let header10 = DdsHeaderDxt10 {
        dxgi_format,
        resource_dimension: 3,
        misc_flag: 0x4,
        array_size: 1,
        misc_flags2: 0,
    };
    (header, header10)
}

/// 每个字节都不同的 payload，方便比对
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

pub fn write_dds(
    dir: &Path,
    name: &str,
    header: &DdsHeader,
    header10: Option<&DdsHeaderDxt10>,
    payload: &[u8],
) -> PathBuf {
    let mut bytes = DDS_MAGIC.to_le_bytes().to_vec();
    bytes.extend_from_slice(bytemuck::bytes_of(header));
    if let Some(header10) = header10 {
        bytes.extend_from_slice(bytemuck::bytes_of(header10));
    }
    bytes.extend_from_slice(payload);

    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn setup(config: &LoaderConfig) -> (TextureHub, Arc<MemoryTextureHost>) {
    truvis_crate_tools::init_log::init_test_log();
    let host = Arc::new(MemoryTextureHost::new().unwrap());
    let pool = Arc::new(build_io_pool(2).unwrap());
    let hub = TextureHub::new(config, host.clone(), pool);
    (hub, host)
}

/// 反复 update 直到没有未完成的加载
pub fn drive(hub: &mut TextureHub) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while hub.update() > 0 {
        assert!(Instant::now() < deadline, "texture loads did not finish in time");
        std::thread::sleep(Duration::from_millis(1));
    }
}
