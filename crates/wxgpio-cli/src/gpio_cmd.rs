//! 引脚操作命令

use anyhow::{Context, Result};
use std::time::Duration;
use wxgpio_core::{Direction, GpioConfig, Level, PullMode};
use wxgpio_device::{BoardInfo, Gpio, Soc};

/// 打印识别到的开发板
pub fn info(config: &GpioConfig, simulate: bool) -> Result<()> {
    let board = if simulate {
        BoardInfo {
            soc: Soc::Bcm2837,
            hardware: None,
            revision: None,
            model: Some("simulated".to_string()),
        }
    } else {
        BoardInfo::detect(&config.platform).map_err(|e| {
            anyhow::anyhow!("{}\n   💡 提示: {}", e, e.hint())
        })?
    };

    let report = serde_json::json!({
        "soc": board.soc,
        "hardware": board.hardware,
        "revision": board.revision,
        "model": board.model,
        "peripheral_base": format!("{:#x}", board.soc.peripheral_base()),
        "pull_registers": format!("{:?}", board.soc.pull_style()).to_lowercase(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn ensure_setup(gpio: &Gpio) -> Result<()> {
    gpio.setup()
        .map_err(|e| anyhow::anyhow!("{}\n   💡 提示: {}", e, e.hint()))
}

pub fn setup(gpio: &Gpio) -> Result<()> {
    ensure_setup(gpio)?;
    let info = gpio
        .mapping_info()
        .context("GPIO registers were released")?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub fn read(gpio: &Gpio, pin: u32, pull: Option<PullMode>) -> Result<Level> {
    ensure_setup(gpio)?;
    let session = gpio.session();
    session.configure(pin, Direction::Input, pull)?;
    let level = session.read(pin)?;
    println!("GPIO{}: {}", pin, level);
    Ok(level)
}

/// 没有 `--hold` 时保留输出电平退出
pub async fn write(gpio: &Gpio, pin: u32, level: Level, hold: bool) -> Result<()> {
    ensure_setup(gpio)?;
    let session = gpio.session();
    session.configure(pin, Direction::Output, None)?;
    session.write(pin, level)?;
    println!("GPIO{}: {}", pin, level);

    if hold {
        println!("按 Ctrl-C 释放引脚...");
        tokio::signal::ctrl_c().await?;
    } else {
        session.persist();
    }
    Ok(())
}

/// 返回实际翻转次数
pub async fn blink(
    gpio: &Gpio,
    pin: u32,
    interval_ms: u64,
    count: Option<u64>,
    cleanup: bool,
) -> Result<u64> {
    ensure_setup(gpio)?;
    let session = gpio.session();
    session.configure(pin, Direction::Output, None)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut toggles = 0;
    while count.is_none_or(|limit| toggles < limit) {
        tokio::select! {
            _ = ticker.tick() => {
                let level = session.toggle(pin)?;
                toggles += 1;
                tracing::debug!(pin, %level, toggles, "blink");
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted after {} toggles", toggles);
                break;
            }
        }
    }

    if !cleanup {
        session.persist();
    }
    Ok(toggles)
}
