//! 寄存器映射器
//!
//! 每个进程只映射一次 GPIO 寄存器块。依次执行：识别开发板、打开内存设备、
//! 分配簿记结构、mmap。每一步失败对应 `SetupError` 的一个变体。
//! 成功后状态变为 `Setup` 并且不会再回到 `NotSetup`。

use crate::hal::{
    FSEL_REGISTERS, GPFSEL0, GPIO_OFFSET, MemoryRegisters, MmapRegisters, RegisterBlock,
};
use crate::platform::{BoardInfo, Soc};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use wxgpio_core::{MemoryDevice, MemoryDeviceKind, MemorySection, PlatformSection, SetupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    NotSetup,
    Setup,
}

/// 映射结果的诊断信息
#[derive(Debug, Clone, Serialize)]
pub struct MappingInfo {
    pub soc: Soc,
    /// 模拟后端为 None
    pub device: Option<PathBuf>,
    pub offset: u64,
    /// 映射时各 GPFSEL 寄存器的值
    pub function_select: Vec<u32>,
}

/// 已映射的寄存器块，只由映射器持有
pub struct MappedRegisters {
    block: Box<dyn RegisterBlock>,
    info: MappingInfo,
}

impl MappedRegisters {
    pub fn info(&self) -> &MappingInfo {
        &self.info
    }

    pub fn soc(&self) -> Soc {
        self.info.soc
    }

    pub(crate) fn block(&self) -> &dyn RegisterBlock {
        self.block.as_ref()
    }

    pub(crate) fn block_mut(&mut self) -> &mut dyn RegisterBlock {
        self.block.as_mut()
    }
}

impl std::fmt::Debug for MappedRegisters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegisters")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

enum Backend {
    Device {
        platform: PlatformSection,
        memory: MemorySection,
    },
    Simulated {
        soc: Soc,
        registers: MemoryRegisters,
    },
}

pub struct RegisterMapper {
    backend: Backend,
    state: SetupState,
    mapped: Option<MappedRegisters>,
}

impl RegisterMapper {
    pub fn new(platform: PlatformSection, memory: MemorySection) -> Self {
        Self {
            backend: Backend::Device { platform, memory },
            state: SetupState::NotSetup,
            mapped: None,
        }
    }

    /// 使用内存模拟寄存器，跳过开发板识别和设备打开
    pub fn simulated(soc: Soc, registers: MemoryRegisters) -> Self {
        Self {
            backend: Backend::Simulated { soc, registers },
            state: SetupState::NotSetup,
            mapped: None,
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn mapped(&self) -> Option<&MappedRegisters> {
        self.mapped.as_ref()
    }

    pub fn mapped_mut(&mut self) -> Option<&mut MappedRegisters> {
        self.mapped.as_mut()
    }

    pub fn ensure_mapped(&mut self) -> Result<(), SetupError> {
        if self.state == SetupState::Setup {
            return Ok(());
        }

        let (block, soc, device, offset, mut function_select) = match &self.backend {
            Backend::Device { platform, memory } => {
                let board = BoardInfo::detect(platform)?;
                let (file, device) = Self::open_memory_device(&memory.devices)?;
                let bookkeeping = Self::allocate_bookkeeping()?;

                let offset = match device.kind {
                    MemoryDeviceKind::Gpiomem => 0,
                    MemoryDeviceKind::Mem => memory
                        .peripheral_base
                        .unwrap_or_else(|| board.soc.peripheral_base())
                        .checked_add(GPIO_OFFSET)
                        .ok_or_else(|| SetupError::MappingFailed {
                            path: device.path.clone(),
                            source: io::Error::new(
                                io::ErrorKind::InvalidInput,
                                "peripheral base out of range",
                            ),
                        })?,
                };

                let registers = MmapRegisters::map(file, offset).map_err(|source| {
                    SetupError::MappingFailed {
                        path: device.path.clone(),
                        source,
                    }
                })?;

                let block: Box<dyn RegisterBlock> = Box::new(registers);
                (
                    block,
                    board.soc,
                    Some(device.path.clone()),
                    offset,
                    bookkeeping,
                )
            }
            Backend::Simulated { soc, registers } => {
                let bookkeeping = Self::allocate_bookkeeping()?;
                let block: Box<dyn RegisterBlock> = Box::new(registers.clone());
                (block, *soc, None, 0, bookkeeping)
            }
        };

        function_select.extend((0..FSEL_REGISTERS).map(|i| block.read(GPFSEL0 + i)));

        tracing::info!(
            soc = %soc,
            device = ?device,
            offset = %format!("{:#x}", offset),
            "GPIO registers mapped"
        );

        self.mapped = Some(MappedRegisters {
            block,
            info: MappingInfo {
                soc,
                device,
                offset,
                function_select,
            },
        });
        self.state = SetupState::Setup;

        Ok(())
    }

    /// 释放映射。状态保持 `Setup`，之后的引脚操作返回 `NotInitialized`
    pub fn shutdown(&mut self) -> bool {
        let released = self.mapped.take().is_some();
        if released {
            tracing::info!("GPIO registers unmapped");
        }
        released
    }

    fn open_memory_device(devices: &[MemoryDevice]) -> Result<(File, &MemoryDevice), SetupError> {
        let mut last_error = None;

        for device in devices {
            match MmapRegisters::open_device(&device.path) {
                Ok(file) => return Ok((file, device)),
                Err(e) => {
                    tracing::debug!("cannot open {}: {}", device.path.display(), e);
                    last_error = Some(SetupError::PhysicalMemoryAccessDenied {
                        path: device.path.clone(),
                        source: e,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SetupError::PhysicalMemoryAccessDenied {
            path: PathBuf::new(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no memory device configured",
            ),
        }))
    }

    fn allocate_bookkeeping() -> Result<Vec<u32>, SetupError> {
        let mut snapshot = Vec::new();
        snapshot.try_reserve_exact(FSEL_REGISTERS)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::BLOCK_SIZE;
    use std::path::Path;

    fn platform(dir: &Path) -> PlatformSection {
        let cpuinfo_path = dir.join("cpuinfo");
        std::fs::write(&cpuinfo_path, "Hardware\t: BCM2835\nRevision\t: a02082\n").unwrap();
        PlatformSection {
            cpuinfo_path,
            device_tree_model_path: dir.join("model"),
            allow_unknown_board: false,
        }
    }

    fn gpiomem_file(dir: &Path, len: u64) -> PathBuf {
        let path = dir.join("gpiomem");
        let file = File::create(&path).unwrap();
        file.set_len(len).unwrap();
        path
    }

    #[test]
    fn test_simulated_setup_is_idempotent() {
        let registers = MemoryRegisters::new();
        let mut mapper = RegisterMapper::simulated(Soc::Bcm2837, registers.clone());
        assert_eq!(mapper.state(), SetupState::NotSetup);
        assert!(mapper.mapped().is_none());

        mapper.ensure_mapped().unwrap();
        let first = mapper.mapped().unwrap().info().clone();
        mapper.ensure_mapped().unwrap();
        let second = mapper.mapped().unwrap().info().clone();

        assert_eq!(mapper.state(), SetupState::Setup);
        assert_eq!(first.function_select, second.function_select);
        assert_eq!(first.soc, second.soc);
        assert_eq!(registers.write_count(), 0);
    }

    #[test]
    fn test_gpiomem_device_is_mapped_at_offset_zero() {
        let dir = tempfile::tempdir().unwrap();
        let device = gpiomem_file(dir.path(), BLOCK_SIZE as u64);
        let memory = MemorySection {
            devices: vec![MemoryDevice::gpiomem(&device)],
            peripheral_base: None,
        };

        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        mapper.ensure_mapped().unwrap();

        let info = mapper.mapped().unwrap().info();
        // a02082 是 Pi 3 的新式修订码，优先于 Hardware 行
        assert_eq!(info.soc, Soc::Bcm2837);
        assert_eq!(info.device.as_deref(), Some(device.as_path()));
        assert_eq!(info.offset, 0);
        assert_eq!(info.function_select, vec![0; FSEL_REGISTERS]);
    }

    #[test]
    fn test_mem_device_uses_peripheral_base() {
        let dir = tempfile::tempdir().unwrap();
        let device = gpiomem_file(dir.path(), GPIO_OFFSET + BLOCK_SIZE as u64);
        let memory = MemorySection {
            devices: vec![MemoryDevice::mem(&device)],
            peripheral_base: Some(0),
        };

        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        mapper.ensure_mapped().unwrap();
        assert_eq!(mapper.mapped().unwrap().info().offset, GPIO_OFFSET);
    }

    #[test]
    fn test_overflowing_peripheral_base_is_mapping_failure() {
        let dir = tempfile::tempdir().unwrap();
        let device = gpiomem_file(dir.path(), BLOCK_SIZE as u64);
        let memory = MemorySection {
            devices: vec![MemoryDevice::mem(&device)],
            peripheral_base: Some(u64::MAX - 1),
        };

        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        let err = mapper.ensure_mapped().unwrap_err();
        assert!(matches!(err, SetupError::MappingFailed { .. }), "{err:?}");
        assert_eq!(mapper.state(), SetupState::NotSetup);
        assert!(mapper.mapped().is_none());
    }

    #[test]
    fn test_falls_through_to_next_device() {
        let dir = tempfile::tempdir().unwrap();
        let device = gpiomem_file(dir.path(), BLOCK_SIZE as u64);
        let memory = MemorySection {
            devices: vec![
                MemoryDevice::gpiomem(dir.path().join("missing")),
                MemoryDevice::gpiomem(&device),
            ],
            peripheral_base: None,
        };

        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        mapper.ensure_mapped().unwrap();
        assert_eq!(
            mapper.mapped().unwrap().info().device.as_deref(),
            Some(device.as_path())
        );
    }

    #[test]
    fn test_unsupported_platform() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = platform(dir.path());
        section.cpuinfo_path = dir.path().join("no-cpuinfo");

        let mut mapper = RegisterMapper::new(section, MemorySection::default());
        let err = mapper.ensure_mapped().unwrap_err();
        assert!(matches!(err, SetupError::NotSupportedPlatform { .. }));
        assert_eq!(mapper.state(), SetupState::NotSetup);
    }

    #[test]
    fn test_memory_access_denied() {
        let dir = tempfile::tempdir().unwrap();
        // 目录无法以读写方式打开
        let memory = MemorySection {
            devices: vec![MemoryDevice::mem(dir.path())],
            peripheral_base: None,
        };

        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        match mapper.ensure_mapped() {
            Err(SetupError::PhysicalMemoryAccessDenied { path, .. }) => {
                assert_eq!(path, dir.path())
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(mapper.state(), SetupState::NotSetup);
    }

    #[test]
    fn test_no_devices_configured() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemorySection {
            devices: vec![],
            peripheral_base: None,
        };
        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        assert!(matches!(
            mapper.ensure_mapped(),
            Err(SetupError::PhysicalMemoryAccessDenied { .. })
        ));
    }

    #[test]
    fn test_mapping_failed() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemorySection {
            devices: vec![MemoryDevice::gpiomem("/dev/null")],
            peripheral_base: None,
        };

        let mut mapper = RegisterMapper::new(platform(dir.path()), memory);
        assert!(matches!(
            mapper.ensure_mapped(),
            Err(SetupError::MappingFailed { .. })
        ));
        assert_eq!(mapper.state(), SetupState::NotSetup);
    }

    #[test]
    fn test_shutdown_does_not_remap() {
        let mut mapper = RegisterMapper::simulated(Soc::Bcm2711, MemoryRegisters::new());
        mapper.ensure_mapped().unwrap();
        assert!(mapper.shutdown());
        assert!(!mapper.shutdown());

        mapper.ensure_mapped().unwrap();
        assert_eq!(mapper.state(), SetupState::Setup);
        assert!(mapper.mapped().is_none());
    }
}
