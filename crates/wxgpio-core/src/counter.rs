//! 命名计数器
//!
//! 宿主绑定暴露的简单对象：一个有符号 64 位值和一个名字。

use crate::error::CounterError;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug)]
pub struct Counter {
    name: String,
    value: AtomicI64,
}

impl Counter {
    pub fn new(start: i64, name: impl Into<String>) -> Result<Self, CounterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CounterError::EmptyName);
        }

        Ok(Self {
            name,
            value: AtomicI64::new(start),
        })
    }

    pub fn add(&self, amount: i64) {
        self.value.fetch_add(amount, Ordering::SeqCst);
    }

    pub fn subtract(&self, amount: i64) {
        self.value.fetch_sub(amount, Ordering::SeqCst);
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn decrement(&self) {
        self.subtract(1);
    }

    pub fn getval(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn getname(&self) -> &str {
        &self.name
    }

    /// 显式释放，返回最终值
    pub fn destroy(self) -> i64 {
        self.value.into_inner()
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.getval())
    }
}
