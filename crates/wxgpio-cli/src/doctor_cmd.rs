//! 健康检查命令

use anyhow::Result;
use std::path::Path;
use wxgpio_core::{GpioConfig, SetupError};
use wxgpio_device::BoardInfo;
use wxgpio_device::hal::MmapRegisters;

/// 检查项结果
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub fix_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// 运行健康检查
pub fn run(config: &GpioConfig, config_path: &Path, fix: bool) -> Result<()> {
    println!("\n🏥 wxGPIO 健康检查\n");

    let results = collect(config, config_path);

    let mut ok_count = 0;
    let mut warn_count = 0;
    let mut error_count = 0;

    for result in &results {
        let icon = match result.status {
            CheckStatus::Ok => "✅",
            CheckStatus::Warning => "⚠️",
            CheckStatus::Error => "❌",
        };

        println!("{} {}: {}", icon, result.name, result.message);

        if let Some(hint) = &result.fix_hint {
            println!("   💡 提示: {}", hint);
        }

        match result.status {
            CheckStatus::Ok => ok_count += 1,
            CheckStatus::Warning => warn_count += 1,
            CheckStatus::Error => error_count += 1,
        }
    }

    println!("\n{}", "─".repeat(50));
    println!("检查完成: {} 通过, {} 警告, {} 错误\n", ok_count, warn_count, error_count);

    if fix && !config_path.exists() {
        config.save(config_path)?;
        println!("🔧 已写入默认配置: {}", config_path.display());
    }

    if error_count > 0 {
        println!("❌ 当前环境无法访问 GPIO，请先解决上述问题。");
    } else if warn_count > 0 {
        println!("⚠️  GPIO 可用，但建议处理上述警告。");
    } else {
        println!("✅ 一切正常！可以运行 `wxgpio setup`。");
    }

    Ok(())
}

pub fn collect(config: &GpioConfig, config_path: &Path) -> Vec<CheckResult> {
    vec![
        check_config_file(config_path),
        check_board(config),
        check_memory_devices(config),
        check_sysfs(config),
    ]
}

fn check_config_file(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult {
            name: "配置文件".to_string(),
            status: CheckStatus::Ok,
            message: path.display().to_string(),
            fix_hint: None,
        }
    } else {
        CheckResult {
            name: "配置文件".to_string(),
            status: CheckStatus::Warning,
            message: "未找到，使用默认配置".to_string(),
            fix_hint: Some("运行 `wxgpio doctor --fix` 写入默认配置".to_string()),
        }
    }
}

fn check_board(config: &GpioConfig) -> CheckResult {
    match BoardInfo::detect(&config.platform) {
        Ok(board) => CheckResult {
            name: "开发板".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "{} (外设基址 {:#x})",
                board.model.as_deref().unwrap_or(board.soc.name()),
                board.soc.peripheral_base()
            ),
            fix_hint: None,
        },
        Err(e) => CheckResult {
            name: "开发板".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
            fix_hint: Some(e.hint().to_string()),
        },
    }
}

fn check_memory_devices(config: &GpioConfig) -> CheckResult {
    let mut last_error = None;

    for device in &config.memory.devices {
        match MmapRegisters::open_device(&device.path) {
            Ok(_) => {
                return CheckResult {
                    name: "内存设备".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("{} 可读写", device.path.display()),
                    fix_hint: None,
                };
            }
            Err(source) => {
                last_error = Some(SetupError::PhysicalMemoryAccessDenied {
                    path: device.path.clone(),
                    source,
                });
            }
        }
    }

    match last_error {
        Some(e) => CheckResult {
            name: "内存设备".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
            fix_hint: Some(e.hint().to_string()),
        },
        None => CheckResult {
            name: "内存设备".to_string(),
            status: CheckStatus::Error,
            message: "未配置任何内存设备".to_string(),
            fix_hint: Some("在配置文件 memory.devices 中添加 /dev/gpiomem".to_string()),
        },
    }
}

fn check_sysfs(config: &GpioConfig) -> CheckResult {
    if !config.sysfs.enabled {
        return CheckResult {
            name: "sysfs".to_string(),
            status: CheckStatus::Ok,
            message: "已禁用".to_string(),
            fix_hint: None,
        };
    }

    if config.sysfs.root.is_dir() {
        CheckResult {
            name: "sysfs".to_string(),
            status: CheckStatus::Ok,
            message: config.sysfs.root.display().to_string(),
            fix_hint: None,
        }
    } else {
        CheckResult {
            name: "sysfs".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} 不存在", config.sysfs.root.display()),
            fix_hint: Some("新内核已移除 sysfs GPIO，可将 sysfs.enabled 设为 false".to_string()),
        }
    }
}
