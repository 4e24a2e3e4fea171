//! 平台检测模块
//!
//! 通过 /proc/cpuinfo 和设备树型号识别开发板的 SoC，决定外设基址和上下拉寄存器布局。

use serde::{Deserialize, Serialize};
use std::fs;
use wxgpio_core::{PlatformSection, SetupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Soc {
    // Pi 1 / Zero / CM1
    Bcm2835,
    // Pi 2
    Bcm2836,
    // Pi 3 / Zero 2 / CM3
    Bcm2837,
    // Pi 4 / 400 / CM4
    Bcm2711,
}

/// 上下拉寄存器的两种硬件协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStyle {
    /// GPPUD + GPPUDCLK 时钟脉冲
    Clocked,
    /// GPIO_PUP_PDN_CNTRL，每个引脚 2 位
    Direct,
}

impl Soc {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bcm2835 => "bcm2835",
            Self::Bcm2836 => "bcm2836",
            Self::Bcm2837 => "bcm2837",
            Self::Bcm2711 => "bcm2711",
        }
    }

    /// 外设总线在物理地址空间中的基址
    pub fn peripheral_base(&self) -> u64 {
        match self {
            Self::Bcm2835 => 0x2000_0000,
            Self::Bcm2836 | Self::Bcm2837 => 0x3F00_0000,
            Self::Bcm2711 => 0xFE00_0000,
        }
    }

    pub fn pull_style(&self) -> PullStyle {
        match self {
            Self::Bcm2711 => PullStyle::Direct,
            _ => PullStyle::Clocked,
        }
    }

    fn from_hardware(hardware: &str) -> Option<Self> {
        match hardware.trim() {
            "BCM2708" | "BCM2835" => Some(Self::Bcm2835),
            "BCM2709" | "BCM2836" => Some(Self::Bcm2836),
            "BCM2710" | "BCM2837" => Some(Self::Bcm2837),
            "BCM2711" => Some(Self::Bcm2711),
            _ => None,
        }
    }

    /// 新式修订码：bit 23 置位，bit 12-15 为处理器类型。
    /// 返回 None 表示旧式修订码或无法解析
    fn from_revision(revision: &str) -> Option<Result<Self, String>> {
        let code = u32::from_str_radix(revision.trim(), 16).ok()?;
        if code & (1 << 23) == 0 {
            return None;
        }
        Some(match (code >> 12) & 0xF {
            0 => Ok(Self::Bcm2835),
            1 => Ok(Self::Bcm2836),
            2 => Ok(Self::Bcm2837),
            3 => Ok(Self::Bcm2711),
            // 4 是 BCM2712 (Pi 5)，GPIO 在 RP1 上
            other => Err(format!(
                "processor type {} (revision {}) has no BCM283x GPIO block",
                other,
                revision.trim()
            )),
        })
    }

    fn from_model(model: &str) -> Option<Result<Self, String>> {
        let model = model.trim_end_matches('\0');
        if !model.starts_with("Raspberry Pi") {
            return None;
        }
        Some(
            if model.contains("Raspberry Pi 5") || model.contains("Compute Module 5") {
                Err(format!("{} uses the RP1 GPIO block", model))
            } else if model.contains("Raspberry Pi 4")
                || model.contains("Raspberry Pi 400")
                || model.contains("Compute Module 4")
            {
                Ok(Self::Bcm2711)
            } else if model.contains("Raspberry Pi 3")
                || model.contains("Zero 2")
                || model.contains("Compute Module 3")
            {
                Ok(Self::Bcm2837)
            } else if model.contains("Raspberry Pi 2") {
                Ok(Self::Bcm2836)
            } else {
                Ok(Self::Bcm2835)
            },
        )
    }
}

impl std::fmt::Display for Soc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub soc: Soc,
    pub hardware: Option<String>,
    pub revision: Option<String>,
    pub model: Option<String>,
}

impl BoardInfo {
    pub fn detect(config: &PlatformSection) -> Result<Self, SetupError> {
        let cpuinfo = fs::read_to_string(&config.cpuinfo_path).ok();
        let model = fs::read_to_string(&config.device_tree_model_path).ok();

        if cpuinfo.is_none() && model.is_none() {
            return Err(SetupError::NotSupportedPlatform {
                reason: format!("unable to open {}", config.cpuinfo_path.display()),
            });
        }

        let hardware = cpuinfo.as_deref().and_then(|c| Self::cpuinfo_field(c, "Hardware"));
        let revision = cpuinfo.as_deref().and_then(|c| Self::cpuinfo_field(c, "Revision"));
        let model = model.map(|m| m.trim_end_matches('\0').trim().to_string());

        // 新内核在所有型号上都报告 Hardware: BCM2835，只有旧式修订码时才看它
        let detected = revision
            .as_deref()
            .and_then(Soc::from_revision)
            .or_else(|| model.as_deref().and_then(Soc::from_model))
            .or_else(|| hardware.as_deref().and_then(Soc::from_hardware).map(Ok));

        let soc = match detected {
            Some(Ok(soc)) => soc,
            Some(Err(reason)) => return Err(SetupError::NotSupportedPlatform { reason }),
            None if config.allow_unknown_board => {
                tracing::warn!("unrecognised board, assuming the bcm2835 register model");
                Soc::Bcm2835
            }
            None => {
                let seen = model
                    .clone()
                    .or_else(|| hardware.clone())
                    .unwrap_or_else(|| "no Hardware, Revision or model entry".to_string());
                return Err(SetupError::NotSupportedPlatform {
                    reason: format!("not running on a supported Raspberry Pi ({seen})"),
                });
            }
        };

        Ok(Self {
            soc,
            hardware,
            revision,
            model,
        })
    }

    fn cpuinfo_field(cpuinfo: &str, key: &str) -> Option<String> {
        cpuinfo.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            (name.trim() == key).then(|| value.trim().to_string())
        })
    }
}
