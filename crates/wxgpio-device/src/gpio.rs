//! 进程级 GPIO 句柄
//!
//! 映射器、状态表和导出通道放在同一把互斥锁后面：功能选择寄存器一个字
//! 装 10 个引脚，所有读-改-写都必须串行。调用方通过 [`Gpio::global`]
//! 获得句柄，无需逐层传递。

use crate::cleanup::{self, CleanupReport};
use crate::controller::{self, PinController};
use crate::export::{ExportChannel, NoExport, SysfsExport};
use crate::hal::MemoryRegisters;
use crate::mapper::{MappingInfo, RegisterMapper, SetupState};
use crate::pin::PinIndex;
use crate::platform::Soc;
use crate::table::{PinState, PinStateTable};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use wxgpio_core::{ControlError, Direction, GpioConfig, Level, PullMode, SetupError};

static GLOBAL: OnceCell<Gpio> = OnceCell::new();

struct GpioInner {
    mapper: RegisterMapper,
    table: PinStateTable,
    export: Box<dyn ExportChannel>,
    pulse: Duration,
}

impl GpioInner {
    fn cleanup(&mut self, pins: Option<&BTreeSet<PinIndex>>) -> CleanupReport {
        let Self {
            mapper,
            table,
            export,
            pulse,
        } = self;
        cleanup::cleanup(mapper.mapped_mut(), table, export.as_ref(), pins, *pulse)
    }

    fn info(&self, pin: PinIndex) -> PinInfo {
        let state = self.table.entry(pin);
        PinInfo {
            pin,
            direction: state.direction,
            exported: state.exported,
            level: self.mapper.mapped().map(|m| controller::read_level(m, pin)),
        }
    }
}

pub struct Gpio {
    inner: Mutex<GpioInner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinInfo {
    pub pin: PinIndex,
    pub direction: Direction,
    pub exported: bool,
    /// 未映射时为 None
    pub level: Option<Level>,
}

impl Gpio {
    pub fn new(mapper: RegisterMapper, export: Box<dyn ExportChannel>, pulse: Duration) -> Self {
        Self {
            inner: Mutex::new(GpioInner {
                mapper,
                table: PinStateTable::new(),
                export,
                pulse,
            }),
        }
    }

    pub fn from_config(config: &GpioConfig) -> Self {
        let mapper = RegisterMapper::new(config.platform.clone(), config.memory.clone());
        Self::new(
            mapper,
            Self::export_channel(config),
            Duration::from_micros(config.pull.pulse_us),
        )
    }

    /// 内存模拟的句柄，返回的寄存器句柄与其共享状态
    pub fn simulated(soc: Soc, config: &GpioConfig) -> (Self, MemoryRegisters) {
        let registers = MemoryRegisters::new();
        let mapper = RegisterMapper::simulated(soc, registers.clone());
        let gpio = Self::new(
            mapper,
            Self::export_channel(config),
            Duration::from_micros(config.pull.pulse_us),
        );
        (gpio, registers)
    }

    fn export_channel(config: &GpioConfig) -> Box<dyn ExportChannel> {
        if config.sysfs.enabled {
            Box::new(SysfsExport::new(config.sysfs.root.clone()))
        } else {
            Box::new(NoExport)
        }
    }

    /// 进程级句柄，首次使用时按默认配置创建
    pub fn global() -> &'static Gpio {
        GLOBAL.get_or_init(|| Gpio::from_config(&GpioConfig::default()))
    }

    /// 安装进程级句柄。已存在时保留原句柄
    pub fn install(gpio: Gpio) -> &'static Gpio {
        if GLOBAL.set(gpio).is_err() {
            tracing::warn!("global GPIO handle already initialised, keeping the existing one");
        }
        Self::global()
    }

    // 清理必须在锁中毒后仍能进行
    fn lock(&self) -> MutexGuard<'_, GpioInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn setup(&self) -> Result<(), SetupError> {
        self.lock().mapper.ensure_mapped()
    }

    pub fn setup_state(&self) -> SetupState {
        self.lock().mapper.state()
    }

    pub fn mapping_info(&self) -> Option<MappingInfo> {
        self.lock().mapper.mapped().map(|m| m.info().clone())
    }

    pub fn configure(
        &self,
        pin: u32,
        direction: Direction,
        pull: Option<PullMode>,
    ) -> Result<(), ControlError> {
        let pin = PinIndex::new(pin)?;
        self.with_controller(|c| c.configure(pin, direction, pull))
    }

    pub fn write(&self, pin: u32, level: Level) -> Result<(), ControlError> {
        let pin = PinIndex::new(pin)?;
        self.with_controller(|c| c.write(pin, level))
    }

    pub fn toggle(&self, pin: u32) -> Result<Level, ControlError> {
        let pin = PinIndex::new(pin)?;
        self.with_controller(|c| c.toggle(pin))
    }

    pub fn read(&self, pin: u32) -> Result<Level, ControlError> {
        let pin = PinIndex::new(pin)?;
        let inner = self.lock();
        let mapped = inner.mapper.mapped().ok_or(ControlError::NotInitialized)?;
        Ok(controller::read_level(mapped, pin))
    }

    fn with_controller<T>(
        &self,
        f: impl FnOnce(&mut PinController<'_>) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        let mut inner = self.lock();
        let GpioInner {
            mapper,
            table,
            pulse,
            ..
        } = &mut *inner;
        let mapped = mapper.mapped_mut().ok_or(ControlError::NotInitialized)?;
        f(&mut PinController::new(mapped, table, *pulse))
    }

    pub fn cleanup(&self, pins: Option<&BTreeSet<PinIndex>>) -> CleanupReport {
        self.lock().cleanup(pins)
    }

    pub fn pin_state(&self, pin: u32) -> Result<PinState, ControlError> {
        self.lock().table.get(pin)
    }

    pub fn exported_pins(&self) -> Vec<PinIndex> {
        self.lock().table.exported_pins().collect()
    }

    pub fn pin_info(&self, pin: u32) -> Result<PinInfo, ControlError> {
        let pin = PinIndex::new(pin)?;
        Ok(self.lock().info(pin))
    }

    pub fn pins(&self) -> Vec<PinInfo> {
        let inner = self.lock();
        PinIndex::all().map(|pin| inner.info(pin)).collect()
    }

    /// 清理全部引脚后释放映射，之后无法重新映射
    pub fn shutdown(&self) -> CleanupReport {
        // 清理与解除映射之间不能插入其他引脚操作
        let mut inner = self.lock();
        let report = inner.cleanup(None);
        inner.mapper.shutdown();
        report
    }

    /// 作用域内占用引脚，离开作用域时自动清理
    pub fn session(&self) -> GpioSession<'_> {
        GpioSession {
            gpio: self,
            armed: true,
        }
    }
}

pub struct GpioSession<'a> {
    gpio: &'a Gpio,
    armed: bool,
}

impl GpioSession<'_> {
    /// 保留引脚当前状态，离开作用域时不再清理
    pub fn persist(mut self) {
        self.armed = false;
    }
}

impl Deref for GpioSession<'_> {
    type Target = Gpio;

    fn deref(&self) -> &Gpio {
        self.gpio
    }
}

impl Drop for GpioSession<'_> {
    fn drop(&mut self) {
        if self.armed {
            let report = self.gpio.cleanup(None);
            if !report.is_clean() {
                tracing::warn!("session cleanup left {} pin(s) unreverted", report.failures.len());
            }
        }
    }
}
