//! 寄存器访问层
//!
//! BCM283x/BCM2711 GPIO 寄存器块的布局常量，以及两种后端：
//! `/dev/gpiomem`、`/dev/mem` 的 mmap 映射和用于测试的内存模拟。

pub mod memory;
pub mod mmap;

pub use memory::MemoryRegisters;
pub use mmap::MmapRegisters;

/// GPIO 块相对外设基址的偏移
pub const GPIO_OFFSET: u64 = 0x20_0000;
/// 映射长度（字节）
pub const BLOCK_SIZE: usize = 4096;
/// 映射长度（32 位字）
pub const BLOCK_WORDS: usize = BLOCK_SIZE / 4;

// 以下均为 32 位字索引，而非字节偏移

/// GPFSEL0..5，每个寄存器 10 个引脚、每个引脚 3 位
pub const GPFSEL0: usize = 0x00 / 4;
pub const FSEL_REGISTERS: usize = 6;
/// GPSET0/1，只写，写 1 置高
pub const GPSET0: usize = 0x1C / 4;
/// GPCLR0/1，只写，写 1 拉低
pub const GPCLR0: usize = 0x28 / 4;
/// GPLEV0/1，只读
pub const GPLEV0: usize = 0x34 / 4;
/// 上下拉控制（BCM2835 系列）
pub const GPPUD: usize = 0x94 / 4;
pub const GPPUDCLK0: usize = 0x98 / 4;
/// 上下拉控制（BCM2711），每个寄存器 16 个引脚、每个引脚 2 位
pub const GPIO_PUP_PDN_CNTRL0: usize = 0xE4 / 4;

/// 功能选择字段的取值
pub const FSEL_INPUT: u32 = 0b000;
pub const FSEL_OUTPUT: u32 = 0b001;
pub const FSEL_MASK: u32 = 0b111;

/// 对已映射寄存器块的按字访问
///
/// 索引是 32 位字索引，调用方保证小于 [`BLOCK_WORDS`]。
pub trait RegisterBlock: Send {
    fn read(&self, word: usize) -> u32;

    fn write(&mut self, word: usize, value: u32);

    /// 读-改-写一个字中由 `mask` 选中的位
    fn modify(&mut self, word: usize, mask: u32, bits: u32) {
        let current = self.read(word);
        self.write(word, (current & !mask) | (bits & mask));
    }
}
