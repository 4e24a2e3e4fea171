//! 引脚状态表
//!
//! 固定 54 项，记录每个引脚最近一次配置的方向以及是否被本进程导出（占用）。
//! 条目原地复位，从不删除。不变量：`exported` 为真时方向一定不是 `Unset`。

use crate::pin::PinIndex;
use serde::{Deserialize, Serialize};
use wxgpio_core::{ControlError, Direction, PIN_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinState {
    pub direction: Direction,
    pub exported: bool,
}

#[derive(Debug, Clone)]
pub struct PinStateTable {
    entries: [PinState; PIN_COUNT],
}

impl Default for PinStateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PinStateTable {
    pub fn new() -> Self {
        Self {
            entries: [PinState::default(); PIN_COUNT],
        }
    }

    pub fn get(&self, pin: u32) -> Result<PinState, ControlError> {
        PinIndex::new(pin).map(|pin| self.entry(pin))
    }

    pub fn entry(&self, pin: PinIndex) -> PinState {
        self.entries[pin.index()]
    }

    /// 设为 `Unset` 时同时清除导出标记
    pub fn set_direction(&mut self, pin: PinIndex, direction: Direction) {
        let entry = &mut self.entries[pin.index()];
        entry.direction = direction;
        if direction == Direction::Unset {
            entry.exported = false;
        }
    }

    pub fn set_exported(&mut self, pin: PinIndex, exported: bool) -> Result<(), ControlError> {
        let entry = &mut self.entries[pin.index()];
        if exported && entry.direction == Direction::Unset {
            return Err(ControlError::Unconfigured { pin: pin.number() });
        }
        entry.exported = exported;
        Ok(())
    }

    /// 按编号升序列出所有已导出引脚
    pub fn exported_pins(&self) -> impl Iterator<Item = PinIndex> + '_ {
        PinIndex::all().filter(move |pin| self.entries[pin.index()].exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: u32) -> PinIndex {
        PinIndex::new(n).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let table = PinStateTable::new();
        assert_eq!(table.get(0).unwrap(), PinState::default());
        assert_eq!(table.get(53).unwrap().direction, Direction::Unset);
        assert_eq!(table.exported_pins().count(), 0);
        assert_eq!(table.get(54), Err(ControlError::InvalidPin { pin: 54 }));
    }

    #[test]
    fn test_export_requires_direction() {
        let mut table = PinStateTable::new();
        assert_eq!(
            table.set_exported(pin(5), true),
            Err(ControlError::Unconfigured { pin: 5 })
        );
        assert!(!table.entry(pin(5)).exported);

        table.set_direction(pin(5), Direction::Output);
        table.set_exported(pin(5), true).unwrap();
        assert_eq!(
            table.entry(pin(5)),
            PinState {
                direction: Direction::Output,
                exported: true
            }
        );
    }

    #[test]
    fn test_unset_clears_export() {
        let mut table = PinStateTable::new();
        table.set_direction(pin(9), Direction::Input);
        table.set_exported(pin(9), true).unwrap();
        table.set_direction(pin(9), Direction::Unset);
        assert!(!table.entry(pin(9)).exported);
    }

    #[test]
    fn test_exported_pins_ascending_and_restartable() {
        let mut table = PinStateTable::new();
        for n in [27, 4, 17] {
            table.set_direction(pin(n), Direction::Output);
            table.set_exported(pin(n), true).unwrap();
        }

        let first: Vec<u32> = table.exported_pins().map(PinIndex::number).collect();
        let second: Vec<u32> = table.exported_pins().map(PinIndex::number).collect();
        assert_eq!(first, vec![4, 17, 27]);
        assert_eq!(first, second);
    }
}
