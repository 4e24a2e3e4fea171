//! 内存模拟后端
//!
//! 模拟 GPSET/GPCLR 只写寄存器对 GPLEV 的影响，并记录每次写入，
//! 用于无硬件环境（测试、命令行 `--simulate`）。

use super::{BLOCK_WORDS, GPCLR0, GPLEV0, GPSET0, RegisterBlock};
use std::sync::{Arc, Mutex, PoisonError};
use wxgpio_core::Level;

#[derive(Debug)]
struct MemoryState {
    words: Vec<u32>,
    writes: Vec<(usize, u32)>,
}

/// 可克隆的句柄，克隆体共享同一份寄存器内容
#[derive(Debug, Clone)]
pub struct MemoryRegisters {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegisters {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                words: vec![0; BLOCK_WORDS],
                writes: Vec::new(),
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// 不经过写日志直接读取一个字
    pub fn peek(&self, word: usize) -> u32 {
        self.with_state(|s| s.words[word])
    }

    /// 外部驱动一个输入引脚的电平
    pub fn drive_input(&self, pin: u32, level: Level) {
        let word = GPLEV0 + (pin / 32) as usize;
        let bit = 1 << (pin % 32);
        self.with_state(|s| match level {
            Level::High => s.words[word] |= bit,
            Level::Low => s.words[word] &= !bit,
        });
    }

    /// 到目前为止的写入记录（字索引，值）
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.with_state(|s| s.writes.clone())
    }

    pub fn write_count(&self) -> usize {
        self.with_state(|s| s.writes.len())
    }
}

impl RegisterBlock for MemoryRegisters {
    fn read(&self, word: usize) -> u32 {
        self.peek(word)
    }

    fn write(&mut self, word: usize, value: u32) {
        self.with_state(|s| {
            s.writes.push((word, value));
            match word {
                w if w == GPSET0 || w == GPSET0 + 1 => s.words[GPLEV0 + (w - GPSET0)] |= value,
                w if w == GPCLR0 || w == GPCLR0 + 1 => s.words[GPLEV0 + (w - GPCLR0)] &= !value,
                w => s.words[w] = value,
            }
        });
    }
}
