//! 引脚编号

use serde::{Deserialize, Serialize};
use std::fmt;
use wxgpio_core::{ControlError, PIN_COUNT};

/// 已校验的 BCM 引脚编号，取值 [0, 54)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PinIndex(u8);

impl PinIndex {
    pub fn new(pin: u32) -> Result<Self, ControlError> {
        if (pin as usize) < PIN_COUNT {
            Ok(Self(pin as u8))
        } else {
            Err(ControlError::InvalidPin { pin })
        }
    }

    pub fn all() -> impl Iterator<Item = PinIndex> {
        (0..PIN_COUNT as u8).map(PinIndex)
    }

    pub fn number(self) -> u32 {
        u32::from(self.0)
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }

    /// 所在 32 位 bank（0 或 1）和 bank 内的位
    pub(crate) fn bank_bit(self) -> (usize, u32) {
        (self.index() / 32, 1 << (self.0 % 32))
    }
}

impl TryFrom<u32> for PinIndex {
    type Error = ControlError;

    fn try_from(pin: u32) -> Result<Self, Self::Error> {
        Self::new(pin)
    }
}

impl From<PinIndex> for u32 {
    fn from(pin: PinIndex) -> Self {
        pin.number()
    }
}

impl fmt::Display for PinIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
