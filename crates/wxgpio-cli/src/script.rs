//! JSON 步骤脚本
//!
//! ```json
//! [
//!   { "op": "configure", "pin": 17, "direction": "output" },
//!   { "op": "write", "pin": 17, "level": "high" },
//!   { "op": "sleep", "ms": 250 },
//!   { "op": "cleanup" }
//! ]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use wxgpio_core::{Direction, Level, PullMode};
use wxgpio_device::{CleanupReport, Gpio, PinIndex};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Configure {
        pin: u32,
        direction: Direction,
        #[serde(default)]
        pull: Option<PullMode>,
    },
    Write {
        pin: u32,
        level: Level,
    },
    Read {
        pin: u32,
    },
    Toggle {
        pin: u32,
    },
    Sleep {
        ms: u64,
    },
    Cleanup {
        /// 省略时清理全部已导出引脚
        #[serde(default)]
        pins: Option<Vec<u32>>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PinReading {
    pub step: usize,
    pub pin: u32,
    pub level: Level,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptOutcome {
    pub readings: Vec<PinReading>,
    /// 脚本结束时的清理结果，未清理时为 None
    pub cleanup: Option<CleanupReport>,
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid script {}", path.display()))
}

pub fn parse(content: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(content)?)
}

/// 任一步失败时立即返回，作用域内的引脚仍会被清理
pub async fn execute(gpio: &Gpio, steps: &[Step], cleanup: bool) -> Result<ScriptOutcome> {
    gpio.setup()
        .map_err(|e| anyhow::anyhow!("{}\n   💡 提示: {}", e, e.hint()))?;

    let session = gpio.session();
    let mut outcome = ScriptOutcome::default();

    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        tracing::debug!(step = number, ?step, "executing");

        match step {
            Step::Configure {
                pin,
                direction,
                pull,
            } => session.configure(*pin, *direction, *pull),
            Step::Write { pin, level } => session.write(*pin, *level),
            Step::Read { pin } => session.read(*pin).map(|level| {
                outcome.readings.push(PinReading {
                    step: number,
                    pin: *pin,
                    level,
                });
            }),
            Step::Toggle { pin } => session.toggle(*pin).map(|_| ()),
            Step::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            Step::Cleanup { pins } => pins
                .as_ref()
                .map(|pins| {
                    pins.iter()
                        .map(|pin| PinIndex::new(*pin))
                        .collect::<Result<BTreeSet<_>, _>>()
                })
                .transpose()
                .map(|selected| {
                    let report = session.cleanup(selected.as_ref());
                    tracing::info!(step = number, reverted = report.reverted_count(), "cleanup step");
                }),
        }
        .with_context(|| format!("step {} failed", number))?;
    }

    if cleanup {
        outcome.cleanup = Some(session.cleanup(None));
    } else {
        session.persist();
    }

    Ok(outcome)
}
