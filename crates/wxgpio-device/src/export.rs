//! sysfs 导出通道
//!
//! 清理引脚时需要一并撤销 `/sys/class/gpio` 下的导出。

use crate::pin::PinIndex;
use std::fs;
use std::io;
use std::path::PathBuf;

pub trait ExportChannel: Send {
    /// 撤销引脚的系统级导出，返回是否确实撤销了一个导出
    fn unexport(&self, pin: PinIndex) -> io::Result<bool>;
}

#[derive(Debug, Clone)]
pub struct SysfsExport {
    root: PathBuf,
}

impl SysfsExport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExportChannel for SysfsExport {
    fn unexport(&self, pin: PinIndex) -> io::Result<bool> {
        if !self.root.join(format!("gpio{}", pin)).exists() {
            return Ok(false);
        }

        fs::write(self.root.join("unexport"), pin.to_string())?;
        tracing::debug!(pin = pin.number(), "sysfs export removed");
        Ok(true)
    }
}

/// 不使用 sysfs 时的空实现
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExport;

impl ExportChannel for NoExport {
    fn unexport(&self, _pin: PinIndex) -> io::Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexport_writes_pin_number() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("gpio17")).unwrap();
        fs::write(dir.path().join("unexport"), "").unwrap();

        let channel = SysfsExport::new(dir.path());
        assert!(channel.unexport(PinIndex::new(17).unwrap()).unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("unexport")).unwrap(), "17");
    }

    #[test]
    fn test_not_exported_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let channel = SysfsExport::new(dir.path());
        assert!(!channel.unexport(PinIndex::new(4).unwrap()).unwrap());
        assert!(!dir.path().join("unexport").exists());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("gpio5")).unwrap();
        // unexport 是目录，写入必然失败
        fs::create_dir(dir.path().join("unexport")).unwrap();

        let channel = SysfsExport::new(dir.path());
        assert!(channel.unexport(PinIndex::new(5).unwrap()).is_err());
    }
}
