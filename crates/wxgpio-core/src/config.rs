//! 配置加载
//!
//! JSON 配置文件，缺失时使用默认值。所有字段都可省略。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    #[serde(default)]
    pub platform: PlatformSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub sysfs: SysfsSection,
    #[serde(default)]
    pub pull: PullSection,
    #[serde(default = "default_true")]
    pub cleanup_on_exit: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            platform: PlatformSection::default(),
            memory: MemorySection::default(),
            sysfs: SysfsSection::default(),
            pull: PullSection::default(),
            cleanup_on_exit: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSection {
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,
    #[serde(default = "default_device_tree_model_path")]
    pub device_tree_model_path: PathBuf,
    /// 无法识别的板子按 BCM2835 处理
    #[serde(default)]
    pub allow_unknown_board: bool,
}

fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}
fn default_device_tree_model_path() -> PathBuf {
    PathBuf::from("/proc/device-tree/model")
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            cpuinfo_path: default_cpuinfo_path(),
            device_tree_model_path: default_device_tree_model_path(),
            allow_unknown_board: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryDeviceKind {
    /// 只暴露 GPIO 寄存器块，偏移为 0
    Gpiomem,
    /// 整个物理内存，需要外设基址
    Mem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDevice {
    pub path: PathBuf,
    pub kind: MemoryDeviceKind,
}

impl MemoryDevice {
    pub fn gpiomem(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: MemoryDeviceKind::Gpiomem,
        }
    }

    pub fn mem(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: MemoryDeviceKind::Mem,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySection {
    /// 按顺序尝试
    #[serde(default = "default_memory_devices")]
    pub devices: Vec<MemoryDevice>,
    #[serde(default)]
    pub peripheral_base: Option<u64>,
}

fn default_memory_devices() -> Vec<MemoryDevice> {
    vec![
        MemoryDevice::gpiomem("/dev/gpiomem"),
        MemoryDevice::mem("/dev/mem"),
    ]
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            devices: default_memory_devices(),
            peripheral_base: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SysfsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sysfs_root")]
    pub root: PathBuf,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

impl Default for SysfsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            root: default_sysfs_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullSection {
    /// GPPUD 时钟脉冲宽度（微秒）
    #[serde(default = "default_pulse_us")]
    pub pulse_us: u64,
}

fn default_pulse_us() -> u64 {
    5
}

impl Default for PullSection {
    fn default() -> Self {
        Self {
            pulse_us: default_pulse_us(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl GpioConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            tracing::debug!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| crate::WxGpioError::Config(format!("读取配置失败: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| crate::WxGpioError::Config(format!("解析配置失败: {}", e)))?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| crate::WxGpioError::Config(format!("创建目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content)
            .map_err(|e| crate::WxGpioError::Config(format!("写入配置失败: {}", e)))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wxgpio")
            .join("config.json")
    }
}
