//! 清理协调器
//!
//! 把已导出的引脚恢复为输入、关闭上下拉，并清除导出标记。尽力而为：
//! 单个引脚失败只记录，不会中断其余引脚的处理。

use crate::controller::PinController;
use crate::export::ExportChannel;
use crate::mapper::MappedRegisters;
use crate::pin::PinIndex;
use crate::table::PinStateTable;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use wxgpio_core::{ControlError, Direction, PullMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// sysfs 导出撤销失败，寄存器仍已恢复
    Unexport,
    /// 寄存器恢复失败，引脚保持导出状态
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinFailure {
    pub pin: PinIndex,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub reverted: Vec<PinIndex>,
    /// 请求了但未导出的引脚
    pub skipped: Vec<PinIndex>,
    pub failures: Vec<PinFailure>,
}

impl CleanupReport {
    pub fn reverted_count(&self) -> usize {
        self.reverted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 恢复单个引脚的寄存器状态并清除导出标记
pub fn revert_pin(
    pin: PinIndex,
    table: &mut PinStateTable,
    mapped: Option<&mut MappedRegisters>,
    pulse: Duration,
) -> Result<(), ControlError> {
    let mapped = mapped.ok_or(ControlError::NotInitialized)?;
    PinController::new(mapped, table, pulse).configure(
        pin,
        Direction::Input,
        Some(PullMode::Off),
    )?;
    table.set_exported(pin, false)
}

/// `pins` 为 None 时清理全部已导出引脚，否则只清理其中已导出的部分
pub fn cleanup(
    mut mapped: Option<&mut MappedRegisters>,
    table: &mut PinStateTable,
    export: &dyn ExportChannel,
    pins: Option<&BTreeSet<PinIndex>>,
    pulse: Duration,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let targets: Vec<PinIndex> = match pins {
        None => table.exported_pins().collect(),
        Some(requested) => {
            let (targets, skipped): (Vec<PinIndex>, Vec<PinIndex>) = requested
                .iter()
                .copied()
                .partition(|pin| table.entry(*pin).exported);
            report.skipped = skipped;
            targets
        }
    };

    for pin in targets {
        if let Err(e) = export.unexport(pin) {
            tracing::warn!(pin = pin.number(), "failed to remove sysfs export: {}", e);
            report.failures.push(PinFailure {
                pin,
                stage: FailureStage::Unexport,
                message: e.to_string(),
            });
        }

        match revert_pin(pin, table, mapped.as_deref_mut(), pulse) {
            Ok(()) => report.reverted.push(pin),
            Err(e) => {
                tracing::warn!(pin = pin.number(), "failed to revert pin: {}", e);
                report.failures.push(PinFailure {
                    pin,
                    stage: FailureStage::Revert,
                    message: e.to_string(),
                });
            }
        }
    }

    if !report.reverted.is_empty() || !report.failures.is_empty() {
        tracing::info!(
            reverted = report.reverted_count(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "GPIO cleanup finished"
        );
    }

    report
}
