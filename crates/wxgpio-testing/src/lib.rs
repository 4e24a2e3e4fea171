pub mod export {
    use mockall::mock;
    use std::io;
    use wxgpio_device::{ExportChannel, PinIndex};

    mock! {
        pub Export {}

        impl ExportChannel for Export {
            fn unexport(&self, pin: PinIndex) -> io::Result<bool>;
        }
    }

    /// 接受任意引脚的导出通道
    pub fn permissive_export() -> MockExport {
        let mut export = MockExport::new();
        export.expect_unexport().returning(|_| Ok(true));
        export
    }
}

pub mod fixtures {
    use std::io;
    use std::path::Path;
    use std::time::Duration;
    use wxgpio_core::{GpioConfig, MemoryDevice};
    use wxgpio_device::{ExportChannel, Gpio, MemoryRegisters, NoExport, RegisterMapper, Soc};

    pub fn simulated_gpio(soc: Soc) -> (Gpio, MemoryRegisters) {
        with_export(soc, Box::new(NoExport))
    }

    pub fn with_export(soc: Soc, export: Box<dyn ExportChannel>) -> (Gpio, MemoryRegisters) {
        let registers = MemoryRegisters::new();
        let mapper = RegisterMapper::simulated(soc, registers.clone());
        (Gpio::new(mapper, export, Duration::ZERO), registers)
    }

    /// 在临时目录中伪造 cpuinfo、gpiomem 设备和 sysfs 根目录
    pub fn fake_board(dir: &Path, hardware: &str) -> io::Result<GpioConfig> {
        let cpuinfo = dir.join("cpuinfo");
        std::fs::write(&cpuinfo, format!("processor\t: 0\nHardware\t: {}\n", hardware))?;

        let device = dir.join("gpiomem");
        std::fs::write(&device, vec![0u8; 4096])?;

        let mut config = GpioConfig::default();
        config.platform.cpuinfo_path = cpuinfo;
        config.platform.device_tree_model_path = dir.join("model");
        config.memory.devices = vec![MemoryDevice::gpiomem(device)];
        config.sysfs.root = dir.join("gpio");
        config.pull.pulse_us = 0;
        Ok(config)
    }
}
