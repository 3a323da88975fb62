//! 卷的布局
//!
//! 超级块 | 分配表 | 根目录 | 数据区
//!
//! 所有多字节字段均为小端序。

mod fat;
mod root_dir;
mod super_block;

use core::ops::Range;

use block_dev::{BlockDevice, BLOCK_SIZE};

pub use self::fat::{Chain, Fat};
pub use self::root_dir::{encode_name, DirEntry, RootDir};
pub use self::super_block::SuperBlock;
use crate::block::BlockId;
use crate::{Error, Result};

/// 超级块的签名
pub const SIGNATURE: [u8; 8] = *b"ECS150FS";

/// 文件名字段的字节量，包含结尾的NUL
pub const FILENAME_LEN: usize = 16;

/// 根目录的容量
pub const FILE_MAX_COUNT: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

pub const DIR_ENTRY_SIZE: usize = 32;

/// 一个块能容纳多少条分配表条目
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / 2;

/// 卷的几何参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub total_blocks: usize,
    pub fat_blocks: usize,
    pub data_blocks: usize,
}

impl Geometry {
    /// 为一个有`total_blocks`块的设备规划布局。
    ///
    /// 分配表与数据区平分超级块和根目录之外的空间：
    /// 每个数据块在分配表中占两个字节。
    pub fn for_blocks(total_blocks: usize) -> Result<Self> {
        if !(4..=u16::MAX as usize).contains(&total_blocks) {
            log::debug!("cannot lay out a volume on {total_blocks} blocks");
            return Err(Error::Format);
        }
        let rest = total_blocks - 2;
        let fat_blocks = (2 * rest).div_ceil(BLOCK_SIZE + 2);
        Ok(Self {
            total_blocks,
            fat_blocks,
            data_blocks: rest - fat_blocks,
        })
    }

    pub fn fat_area(&self) -> Range<BlockId> {
        BlockId::new(1)..self.root_dir()
    }

    pub fn root_dir(&self) -> BlockId {
        BlockId::new(1 + self.fat_blocks)
    }

    pub fn data_area(&self) -> BlockId {
        self.root_dir() + 1
    }
}

/// 在设备上写入一个空卷。
///
/// 数据区的内容保持原样。
pub fn format(dev: &dyn BlockDevice) -> Result<Geometry> {
    let geometry = Geometry::for_blocks(dev.num_blocks())?;

    SuperBlock::new(&geometry).store(dev)?;
    Fat::new(&geometry).store(dev, &geometry)?;
    RootDir::new().store(dev, geometry.root_dir())?;

    log::info!(
        "formatted {} blocks: {} FAT blocks, {} data blocks",
        geometry.total_blocks,
        geometry.fat_blocks,
        geometry.data_blocks
    );
    Ok(geometry)
}
