use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::complete_handler::{CompleteHandler, JobHandle, spawn_job};

/// 创建给 [`FileReader`] 使用的线程池
///
/// 线程名为 "Asset-Loader-0", "Asset-Loader-1" ...，方便在调试器中辨认。
/// 线程池属于宿主，加载器自身不会创建线程。
pub fn build_io_pool(num_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|index| format!("Asset-Loader-{}", index))
        .build()
}

/// 一次读取的结果
#[derive(Debug)]
pub struct ReadBuffer {
    data: Vec<u8>,
    bytes_read: usize,
}

impl ReadBuffer {
    /// 实际读到的字节数，遇到文件末尾时可能小于请求的长度
    #[inline]
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// 已填充的部分
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.bytes_read]
    }

    /// 取出整个缓冲区（包括未填充的部分）
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// 一次文件读取的完成句柄
pub struct ReadHandle {
    path: PathBuf,
    job: JobHandle<io::Result<ReadBuffer>>,
}

impl ReadHandle {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 等待读取结束并取出结果
    pub fn finish(self) -> io::Result<ReadBuffer> {
        self.job
            .finish()
            .unwrap_or_else(|| Err(io::Error::other(format!("read job for {:?} panicked", self.path))))
    }
}

impl CompleteHandler for ReadHandle {
    fn is_complete(&mut self) -> bool {
        self.job.is_complete()
    }

    fn wait_until_complete(&mut self) {
        self.job.wait_until_complete()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// 在宿主提供的线程池中读取
    Async,
    /// 在调用线程上直接读取，返回的句柄已经完成
    Inline,
}

/// 非阻塞的文件读取
#[derive(Clone)]
pub struct FileReader {
    pool: Arc<rayon::ThreadPool>,
    mode: ReadMode,
    in_flight: Arc<AtomicUsize>,
}

// new & init
impl FileReader {
    pub fn new(pool: Arc<rayon::ThreadPool>, mode: ReadMode) -> Self {
        Self {
            pool,
            mode,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

// getters
impl FileReader {
    #[inline]
    pub fn pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.pool
    }

    #[inline]
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// 尚未完成的读取数量
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

// tools
impl FileReader {
    /// 从 `path` 的 `offset` 处读取 `len` 字节到 `buffer` 的开头
    ///
    /// # Panics
    /// `buffer` 比 `len` 小时 panic，这是调用方的编程错误
    pub fn read(&self, path: &Path, offset: u64, len: usize, buffer: Vec<u8>) -> ReadHandle {
        assert!(
            buffer.len() >= len,
            "read buffer too small for {:?}: {} bytes < {} bytes",
            path,
            buffer.len(),
            len
        );
        self.dispatch(path, move |path| read_at(path, offset, len, buffer))
    }

    /// 从 `path` 的 `offset` 处读取恰好 `len` 字节，缓冲区在读取任务中分配
    ///
    /// 文件在 `offset` 之后不足 `len` 字节时以 `UnexpectedEof` 失败，不会分配缓冲区。
    pub fn read_exact(&self, path: &Path, offset: u64, len: usize) -> ReadHandle {
        self.dispatch(path, move |path| read_exact_at(path, offset, len))
    }

    fn dispatch<F>(&self, path: &Path, read: F) -> ReadHandle
    where
        F: FnOnce(&Path) -> io::Result<ReadBuffer> + Send + 'static,
    {
        let path = path.to_path_buf();
        let job = match self.mode {
            ReadMode::Inline => JobHandle::ready(read(&path)),
            ReadMode::Async => {
                let task_path = path.clone();
                let in_flight = self.in_flight.clone();
                in_flight.fetch_add(1, Ordering::AcqRel);
                spawn_job(&self.pool, move || {
                    scopeguard::defer! {
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                    read(&task_path)
                })
            }
        };

        ReadHandle { path, job }
    }
}

/// 读到 `len` 字节或文件末尾为止
fn read_at(path: &Path, offset: u64, len: usize, mut buffer: Vec<u8>) -> io::Result<ReadBuffer> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < len {
        match file.read(&mut buffer[filled..len]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(ReadBuffer {
        data: buffer,
        bytes_read: filled,
    })
}

fn read_exact_at(path: &Path, offset: u64, len: usize) -> io::Result<ReadBuffer> {
    let available = fs::metadata(path)?.len().saturating_sub(offset);
    if available < len as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{:?} holds {} bytes after offset {}, expected {}", path, available, offset, len),
        ));
    }
    read_at(path, offset, len, vec![0; len])
}
