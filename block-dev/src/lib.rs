//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；
//! [`BlockDevice`] 就是对读写块设备的抽象，实现了此特质的类型称为**块设备驱动**。
//!
//! 块大小固定为 [`BLOCK_SIZE`]，文件系统与驱动双方共享这一常量。

#![no_std]

extern crate alloc;

mod ram_disk;

use core::any::Any;
use core::fmt;

pub use self::ram_disk::RamDisk;

/// 块的字节量
pub const BLOCK_SIZE: usize = 4096;

/// 块设备驱动特质
///
/// 块编号从0开始；`buf`的长度必须恰好为[`BLOCK_SIZE`]。
pub trait BlockDevice: Send + Sync + Any {
    /// 设备上的块总数
    fn num_blocks(&self) -> usize;

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError>;

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// 块编号越界
    OutOfRange { block_id: usize, num_blocks: usize },
    /// 缓冲区不是一个完整的块
    BadBuffer { len: usize },
    /// 底层设备读写失败
    Device,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                block_id,
                num_blocks,
            } => write!(f, "block {block_id} out of range (device has {num_blocks})"),
            Self::BadBuffer { len } => {
                write!(f, "buffer of {len} bytes is not a complete block")
            }
            Self::Device => f.write_str("device I/O failure"),
        }
    }
}

impl core::error::Error for BlockError {}

/// 检查块编号与缓冲区，供驱动实现复用。
pub fn check_access(block_id: usize, num_blocks: usize, len: usize) -> Result<(), BlockError> {
    if block_id >= num_blocks {
        return Err(BlockError::OutOfRange {
            block_id,
            num_blocks,
        });
    }
    if len != BLOCK_SIZE {
        return Err(BlockError::BadBuffer { len });
    }
    Ok(())
}
