//! 统一错误处理
//!
//! `SetupError` 对应一次性映射失败，`ControlError` 对应单次引脚操作失败。

use crate::types::Direction;
use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// 寄存器映射失败的原因，每一步对应一个变体
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Not running on a supported board: {reason}")]
    NotSupportedPlatform { reason: String },

    #[error("No access to {}: {source}", path.display())]
    PhysicalMemoryAccessDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Out of memory while allocating GPIO bookkeeping: {0}")]
    AllocationFailed(#[from] TryReserveError),

    #[error("Mmap of GPIO registers via {} failed: {source}", path.display())]
    MappingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SetupError {
    /// 给操作者的处理建议
    pub fn hint(&self) -> &'static str {
        match self {
            Self::NotSupportedPlatform { .. } => {
                "this hardware is not supported; run on a Raspberry Pi class board"
            }
            Self::PhysicalMemoryAccessDenied { .. } => {
                "try running as root, or add the user to the gpio group for /dev/gpiomem"
            }
            Self::AllocationFailed(_) => "the process is out of memory",
            Self::MappingFailed { .. } => {
                "the kernel refused the mapping; check the peripheral base and iomem restrictions"
            }
        }
    }
}

/// 单次引脚操作的失败，均可在修正条件后重试
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Invalid pin {pin}: valid pins are 0..{}", crate::types::PIN_COUNT)]
    InvalidPin { pin: u32 },

    #[error("Pin {pin} is configured as {actual}, expected {expected}")]
    WrongDirection {
        pin: u32,
        expected: Direction,
        actual: Direction,
    },

    #[error("GPIO registers are not mapped; call setup() first")]
    NotInitialized,

    #[error("Pin {pin} has no configured direction and cannot be exported")]
    Unconfigured { pin: u32 },
}

impl ControlError {
    /// 出错的引脚编号（若有）
    pub fn pin(&self) -> Option<u32> {
        match self {
            Self::InvalidPin { pin }
            | Self::WrongDirection { pin, .. }
            | Self::Unconfigured { pin } => Some(*pin),
            Self::NotInitialized => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("name cannot be empty")]
    EmptyName,
}

#[derive(Error, Debug)]
pub enum WxGpioError {
    #[error("初始化错误: {0}")]
    Setup(#[from] SetupError),

    #[error("引脚操作错误: {0}")]
    Control(#[from] ControlError),

    #[error("计数器错误: {0}")]
    Counter(#[from] CounterError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WxGpioError>;
