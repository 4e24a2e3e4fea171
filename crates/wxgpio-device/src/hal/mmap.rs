//! mmap 后端
//!
//! 打开内存设备文件并把 GPIO 寄存器块映射进进程地址空间，所有访问都是 volatile 的。

use super::{BLOCK_SIZE, BLOCK_WORDS, RegisterBlock};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr::NonNull;

#[derive(Debug)]
pub struct MmapRegisters {
    base: NonNull<u32>,
    // 映射存续期间保持打开
    _file: File,
}

// 映射只通过 &mut self 写入，外层由互斥锁串行化
unsafe impl Send for MmapRegisters {}

impl MmapRegisters {
    /// 以 O_RDWR | O_SYNC 打开内存设备
    pub fn open_device(path: &std::path::Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
    }

    /// 在 `offset` 处映射 [`BLOCK_SIZE`] 字节
    pub fn map(file: File, offset: u64) -> io::Result<Self> {
        let offset = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                BLOCK_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let base = NonNull::new(ptr.cast::<u32>())
            .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;

        Ok(Self { base, _file: file })
    }
}

impl RegisterBlock for MmapRegisters {
    fn read(&self, word: usize) -> u32 {
        debug_assert!(word < BLOCK_WORDS);
        unsafe { std::ptr::read_volatile(self.base.as_ptr().add(word)) }
    }

    fn write(&mut self, word: usize, value: u32) {
        debug_assert!(word < BLOCK_WORDS);
        unsafe { std::ptr::write_volatile(self.base.as_ptr().add(word), value) }
    }
}

impl Drop for MmapRegisters {
    fn drop(&mut self) {
        let result = unsafe { libc::munmap(self.base.as_ptr().cast(), BLOCK_SIZE) };
        if result != 0 {
            tracing::warn!("munmap of GPIO registers failed: {}", io::Error::last_os_error());
        }
    }
}
