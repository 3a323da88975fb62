//! 块的抽象：磁盘上的块号、分配表中的数据块号，以及对设备的整块读写。

use alloc::boxed::Box;

use block_dev::{BlockDevice, BLOCK_SIZE};
use derive_more::{Add, Display, From, Into};

use crate::Result;

/// 磁盘上的块号
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct BlockId(usize);

impl core::ops::Add<usize> for BlockId {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        self + Self(rhs)
    }
}

impl BlockId {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn read(self, dev: &dyn BlockDevice, buf: &mut [u8]) -> Result<()> {
        log::trace!("read block {self}");
        dev.read_block(self.0, buf)?;
        Ok(())
    }

    pub fn write(self, dev: &dyn BlockDevice, buf: &[u8]) -> Result<()> {
        log::trace!("write block {self}");
        dev.write_block(self.0, buf)?;
        Ok(())
    }
}

/// 数据区内的块编号，也是分配表的下标。
///
/// 分配表条目存放着下一个数据块的编号，
/// 其中`0`表示未分配，`0xFFFF`表示链表结束；
/// 0号条目保留，恒为[`DataBlock::EOC`]。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct DataBlock(u16);

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    /// 链表指向了未分配的块
    #[display(fmt = "chain runs into a free block")]
    Free,
    /// 链表指向了保留的0号块
    #[display(fmt = "chain runs into the reserved block")]
    Reserved,
    /// 编号超出数据区
    #[display(fmt = "block number beyond the data area")]
    OutOfRange,
    /// 链表成环
    #[display(fmt = "chain loops back on itself")]
    Cycle,
    /// 链表在到达目标块之前就结束了
    #[display(fmt = "chain ends before the file does")]
    Truncated,
}

impl DataBlock {
    pub const FREE: Self = Self(0);

    pub const EOC: Self = Self(0xFFFF);

    /// 最小的可用数据块编号
    pub const MIN: Self = Self(1);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 检查编号能否作为链表中的一环，`Ok(None)`表示链表结束。
    pub fn validate(self, data_blocks: usize) -> core::result::Result<Option<Self>, ChainError> {
        match self {
            Self::EOC => Ok(None),
            id if id < Self::MIN => Err(ChainError::Reserved),
            id if id.index() >= data_blocks => Err(ChainError::OutOfRange),
            id => Ok(Some(id)),
        }
    }
}

/// 一个块大小的缓冲区
pub fn scratch() -> Box<[u8]> {
    alloc::vec![0; BLOCK_SIZE].into_boxed_slice()
}
