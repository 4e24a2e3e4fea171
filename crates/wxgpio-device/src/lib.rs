//! wxGPIO Device - 寄存器级 GPIO 访问
//!
//! 识别 SoC，映射 GPIO 寄存器块，维护引脚状态表并在退出时恢复引脚。

pub mod cleanup;
pub mod controller;
pub mod export;
pub mod gpio;
pub mod hal;
pub mod mapper;
pub mod pin;
pub mod platform;
pub mod table;

pub use cleanup::{CleanupReport, FailureStage, PinFailure};
pub use controller::PinController;
pub use export::{ExportChannel, NoExport, SysfsExport};
pub use gpio::{Gpio, GpioSession, PinInfo};
pub use hal::{MemoryRegisters, RegisterBlock};
pub use mapper::{MappedRegisters, MappingInfo, RegisterMapper, SetupState};
pub use pin::PinIndex;
pub use platform::{BoardInfo, PullStyle, Soc};
pub use table::{PinState, PinStateTable};

use wxgpio_core::GpioConfig;

/// 按配置安装进程级句柄
pub fn init_device(config: &GpioConfig) -> &'static Gpio {
    Gpio::install(Gpio::from_config(config))
}
