//! wxGPIO CLI - 命令行工具

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wxgpio_core::{GpioConfig, Level, PullMode};
use wxgpio_device::{Gpio, Soc};

mod doctor_cmd;
mod gpio_cmd;
mod script;

#[derive(Parser)]
#[command(name = "wxgpio")]
#[command(about = "wxGPIO - Raspberry Pi GPIO control through memory-mapped registers", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ~/.wxgpio/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use an in-memory register file instead of real hardware
    #[arg(long, global = true)]
    simulate: bool,
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected board
    Info,
    /// Check GPIO access on this machine
    Doctor {
        /// Write a default config file if missing
        #[arg(short, long)]
        fix: bool,
    },
    /// Map the GPIO registers and print the mapping
    Setup,
    /// Configure a pin as input and print its level
    Read {
        pin: u32,
        /// Pull resistor (off, up, down)
        #[arg(long)]
        pull: Option<PullMode>,
    },
    /// Configure a pin as output and drive it
    Write {
        pin: u32,
        /// Level to drive (high, low, 1, 0)
        level: Level,
        /// Keep the level until Ctrl-C, then clean up
        #[arg(long)]
        hold: bool,
    },
    /// Toggle an output pin periodically
    Blink {
        pin: u32,
        #[arg(long, default_value = "500")]
        interval_ms: u64,
        /// Number of toggles (runs until Ctrl-C when omitted)
        #[arg(long)]
        count: Option<u64>,
    },
    /// Execute a JSON step script
    Run {
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let default_filter = if cli.verbose { "wxgpio=debug,info" } else { "wxgpio=info,warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.clone().unwrap_or_else(GpioConfig::default_path);
    let mut config = GpioConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let gpio = if cli.simulate {
        // 模拟模式不触碰真实的 sysfs
        config.sysfs.enabled = false;
        Gpio::install(Gpio::simulated(Soc::Bcm2837, &config).0)
    } else {
        wxgpio_device::init_device(&config)
    };

    match cli.command {
        Commands::Info => {
            gpio_cmd::info(&config, cli.simulate)?;
        }
        Commands::Doctor { fix } => {
            doctor_cmd::run(&config, &config_path, fix)?;
        }
        Commands::Setup => {
            gpio_cmd::setup(gpio)?;
        }
        Commands::Read { pin, pull } => {
            gpio_cmd::read(gpio, pin, pull)?;
        }
        Commands::Write { pin, level, hold } => {
            gpio_cmd::write(gpio, pin, level, hold).await?;
        }
        Commands::Blink {
            pin,
            interval_ms,
            count,
        } => {
            gpio_cmd::blink(gpio, pin, interval_ms, count, config.cleanup_on_exit).await?;
        }
        Commands::Run { script } => {
            let steps = script::load(&script)?;
            let outcome = script::execute(gpio, &steps, config.cleanup_on_exit).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
