//! 引脚基础类型
//!
//! 方向、上下拉模式和电平，供设备层、配置和命令行共用。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 引脚数量（BCM283x 系列 GPIO 0..=53）
pub const PIN_COUNT: usize = 54;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// 未被本进程占用
    #[default]
    Unset,
    Input,
    Output,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "input" => Ok(Self::Input),
            "out" | "output" => Ok(Self::Output),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullMode {
    #[default]
    Off,
    PullUp,
    PullDown,
}

impl fmt::Display for PullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::PullUp => "up",
            Self::PullDown => "down",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PullMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "up" | "pull_up" => Ok(Self::PullUp),
            "down" | "pull_down" => Ok(Self::PullDown),
            other => Err(format!("unknown pull mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "low" => Ok(Self::Low),
            "1" | "high" => Ok(Self::High),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direction_aliases() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::Input);
        assert_eq!("OUTPUT".parse::<Direction>().unwrap(), Direction::Output);
        assert!("unset".parse::<Direction>().is_err());
    }

    #[test]
    fn test_parse_level_and_pull() {
        assert_eq!("1".parse::<Level>().unwrap(), Level::High);
        assert_eq!("low".parse::<Level>().unwrap(), Level::Low);
        assert_eq!("down".parse::<PullMode>().unwrap(), PullMode::PullDown);
        assert!("sideways".parse::<PullMode>().is_err());
    }

    #[test]
    fn test_level_inverted() {
        assert_eq!(Level::High.inverted(), Level::Low);
        assert_eq!(Level::from(false), Level::Low);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PullMode::PullUp).unwrap();
        assert_eq!(json, "\"pull_up\"");
        let dir: Direction = serde_json::from_str("\"output\"").unwrap();
        assert_eq!(dir, Direction::Output);
    }
}
