//! wxGPIO Core - 核心类型和抽象
//!
//! 提供引脚基础类型、错误分类、配置加载以及命名计数器对象。

pub mod config;
pub mod counter;
pub mod error;
pub mod types;

pub use config::*;
pub use counter::*;
pub use error::*;
pub use types::*;
