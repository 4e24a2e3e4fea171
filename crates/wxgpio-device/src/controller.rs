//! 引脚控制器
//!
//! 对已映射寄存器执行方向、上下拉和电平操作，并在寄存器写入全部完成后才更新状态表。
//! 任何失败都不会改动状态表。

use crate::hal::{
    FSEL_INPUT, FSEL_MASK, FSEL_OUTPUT, GPCLR0, GPFSEL0, GPIO_PUP_PDN_CNTRL0, GPLEV0, GPPUD,
    GPPUDCLK0, GPSET0,
};
use crate::mapper::MappedRegisters;
use crate::pin::PinIndex;
use crate::platform::PullStyle;
use crate::table::PinStateTable;
use std::time::{Duration, Instant};
use wxgpio_core::{ControlError, Direction, Level, PullMode};

pub struct PinController<'a> {
    mapped: &'a mut MappedRegisters,
    table: &'a mut PinStateTable,
    pulse: Duration,
}

impl<'a> PinController<'a> {
    pub fn new(
        mapped: &'a mut MappedRegisters,
        table: &'a mut PinStateTable,
        pulse: Duration,
    ) -> Self {
        Self {
            mapped,
            table,
            pulse,
        }
    }

    pub fn configure(
        &mut self,
        pin: PinIndex,
        direction: Direction,
        pull: Option<PullMode>,
    ) -> Result<(), ControlError> {
        let function = match direction {
            Direction::Input => FSEL_INPUT,
            Direction::Output => FSEL_OUTPUT,
            Direction::Unset => return Err(ControlError::Unconfigured { pin: pin.number() }),
        };

        let index = pin.index();
        let shift = (index % 10) * 3;
        self.mapped.block_mut().modify(
            GPFSEL0 + index / 10,
            FSEL_MASK << shift,
            function << shift,
        );

        if direction == Direction::Input
            && let Some(pull) = pull
        {
            self.set_pull(pin, pull);
        }

        self.table.set_direction(pin, direction);
        self.table.set_exported(pin, true)?;

        tracing::debug!(pin = pin.number(), %direction, ?pull, "pin configured");
        Ok(())
    }

    pub fn write(&mut self, pin: PinIndex, level: Level) -> Result<(), ControlError> {
        let actual = self.table.entry(pin).direction;
        if actual != Direction::Output {
            return Err(ControlError::WrongDirection {
                pin: pin.number(),
                expected: Direction::Output,
                actual,
            });
        }

        let (bank, bit) = pin.bank_bit();
        let register = match level {
            Level::High => GPSET0,
            Level::Low => GPCLR0,
        };
        self.mapped.block_mut().write(register + bank, bit);

        tracing::debug!(pin = pin.number(), %level, "pin written");
        Ok(())
    }

    pub fn read(&self, pin: PinIndex) -> Level {
        read_level(&*self.mapped, pin)
    }

    pub fn toggle(&mut self, pin: PinIndex) -> Result<Level, ControlError> {
        let next = self.read(pin).inverted();
        self.write(pin, next)?;
        Ok(next)
    }

    fn set_pull(&mut self, pin: PinIndex, pull: PullMode) {
        match self.mapped.soc().pull_style() {
            PullStyle::Clocked => self.pulse_pull(pin, pull),
            PullStyle::Direct => {
                let code = match pull {
                    PullMode::Off => 0,
                    PullMode::PullUp => 1,
                    PullMode::PullDown => 2,
                };
                let index = pin.index();
                let shift = (index % 16) * 2;
                self.mapped.block_mut().modify(
                    GPIO_PUP_PDN_CNTRL0 + index / 16,
                    0b11 << shift,
                    code << shift,
                );
            }
        }
    }

    /// GPPUD 写入模式，等待，打时钟，等待，再把两者清零
    fn pulse_pull(&mut self, pin: PinIndex, pull: PullMode) {
        let code = match pull {
            PullMode::Off => 0,
            PullMode::PullDown => 1,
            PullMode::PullUp => 2,
        };
        let (bank, bit) = pin.bank_bit();
        let pulse = self.pulse;
        let block = self.mapped.block_mut();

        block.write(GPPUD, code);
        short_wait(pulse);
        block.write(GPPUDCLK0 + bank, bit);
        short_wait(pulse);
        block.write(GPPUD, 0);
        block.write(GPPUDCLK0 + bank, 0);
    }
}

/// 读取电平只访问 GPLEV，不依赖方向
pub fn read_level(mapped: &MappedRegisters, pin: PinIndex) -> Level {
    let (bank, bit) = pin.bank_bit();
    Level::from(mapped.block().read(GPLEV0 + bank) & bit != 0)
}

/// 忙等待，不让出线程
fn short_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MemoryRegisters;
    use crate::mapper::RegisterMapper;
    use crate::platform::Soc;

    fn mapped(soc: Soc) -> (RegisterMapper, MemoryRegisters) {
        let registers = MemoryRegisters::new();
        let mut mapper = RegisterMapper::simulated(soc, registers.clone());
        mapper.ensure_mapped().unwrap();
        (mapper, registers)
    }

    fn pin(n: u32) -> PinIndex {
        PinIndex::new(n).unwrap()
    }

    #[test]
    fn test_function_select_packs_ten_pins_per_register() {
        let (mut mapper, registers) = mapped(Soc::Bcm2837);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        controller.configure(pin(10), Direction::Output, None).unwrap();
        controller.configure(pin(13), Direction::Output, None).unwrap();
        controller.configure(pin(53), Direction::Output, None).unwrap();
        assert_eq!(registers.peek(GPFSEL0 + 1), (1 << 0) | (1 << 9));
        assert_eq!(registers.peek(GPFSEL0 + 5), 1 << 9);

        controller.configure(pin(10), Direction::Input, None).unwrap();
        assert_eq!(registers.peek(GPFSEL0 + 1), 1 << 9);
    }

    #[test]
    fn test_clocked_pull_sequence_order() {
        let (mut mapper, registers) = mapped(Soc::Bcm2835);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        controller
            .configure(pin(35), Direction::Input, Some(PullMode::PullUp))
            .unwrap();

        let writes = registers.writes();
        assert_eq!(
            &writes[1..],
            &[
                (GPPUD, 2),
                (GPPUDCLK0 + 1, 1 << 3),
                (GPPUD, 0),
                (GPPUDCLK0 + 1, 0),
            ]
        );
        assert_eq!(writes[0].0, GPFSEL0 + 3);
    }

    #[test]
    fn test_direct_pull_on_bcm2711() {
        let (mut mapper, registers) = mapped(Soc::Bcm2711);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        controller
            .configure(pin(17), Direction::Input, Some(PullMode::PullDown))
            .unwrap();
        assert_eq!(registers.peek(GPIO_PUP_PDN_CNTRL0 + 1), 2 << 2);
        assert!(registers.writes().iter().all(|(word, _)| *word != GPPUD));
    }

    #[test]
    fn test_pull_ignored_for_output() {
        let (mut mapper, registers) = mapped(Soc::Bcm2835);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        controller
            .configure(pin(4), Direction::Output, Some(PullMode::PullUp))
            .unwrap();
        assert_eq!(registers.write_count(), 1);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let (mut mapper, _registers) = mapped(Soc::Bcm2837);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        for n in [0, 31, 32, 53] {
            controller.configure(pin(n), Direction::Output, None).unwrap();
            controller.write(pin(n), Level::High).unwrap();
            assert_eq!(controller.read(pin(n)), Level::High);
            controller.write(pin(n), Level::Low).unwrap();
            assert_eq!(controller.read(pin(n)), Level::Low);
        }
        assert_eq!(controller.toggle(pin(32)).unwrap(), Level::High);
        assert_eq!(controller.read(pin(32)), Level::High);
    }

    #[test]
    fn test_write_on_input_is_rejected_without_side_effects() {
        let (mut mapper, registers) = mapped(Soc::Bcm2837);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        controller.configure(pin(22), Direction::Input, None).unwrap();
        let before = registers.write_count();

        assert_eq!(
            controller.write(pin(22), Level::High),
            Err(ControlError::WrongDirection {
                pin: 22,
                expected: Direction::Output,
                actual: Direction::Input,
            })
        );
        assert_eq!(registers.write_count(), before);
        assert_eq!(table.entry(pin(22)).direction, Direction::Input);
    }

    #[test]
    fn test_read_input_level() {
        let (mut mapper, registers) = mapped(Soc::Bcm2837);
        let mut table = PinStateTable::new();
        let controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        assert_eq!(controller.read(pin(40)), Level::Low);
        registers.drive_input(40, Level::High);
        assert_eq!(controller.read(pin(40)), Level::High);
    }

    #[test]
    fn test_configure_unset_is_rejected() {
        let (mut mapper, registers) = mapped(Soc::Bcm2837);
        let mut table = PinStateTable::new();
        let mut controller =
            PinController::new(mapper.mapped_mut().unwrap(), &mut table, Duration::ZERO);

        assert_eq!(
            controller.configure(pin(3), Direction::Unset, None),
            Err(ControlError::Unconfigured { pin: 3 })
        );
        assert_eq!(registers.write_count(), 0);
        assert!(!table.entry(pin(3)).exported);
    }
}
