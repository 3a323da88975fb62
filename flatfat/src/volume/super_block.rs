use core::{mem, ptr};

use block_dev::{BlockDevice, BLOCK_SIZE};

use super::{Geometry, FAT_ENTRIES_PER_BLOCK, SIGNATURE};
use crate::block::{self, BlockId, DataBlock};
use crate::{Error, Result};

/// # 超级块
///
/// 位于0号块，记录卷的几何参数，挂载时读入，卸载时写回。
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct SuperBlock {
    /// [`SIGNATURE`]
    signature: [u8; 8],

    /// 卷的块总数，必须与设备一致
    total_blk: u16,

    /// 根目录所在块号
    rdir_blk: u16,

    /// 数据区起始块号
    data_blk: u16,

    /// 数据块数量
    data_blk_count: u16,

    /// 分配表占用的块数
    fat_blk_count: u8,

    _padding: [u8; 4079],
}

const _: () = assert!(mem::size_of::<SuperBlock>() == BLOCK_SIZE);

impl SuperBlock {
    pub const ID: BlockId = BlockId::new(0);

    pub fn new(geometry: &Geometry) -> Self {
        Self {
            signature: SIGNATURE,
            total_blk: (geometry.total_blocks as u16).to_le(),
            rdir_blk: (usize::from(geometry.root_dir()) as u16).to_le(),
            data_blk: (usize::from(geometry.data_area()) as u16).to_le(),
            data_blk_count: (geometry.data_blocks as u16).to_le(),
            fat_blk_count: geometry.fat_blocks as u8,
            _padding: [0; 4079],
        }
    }

    /// 读入并校验超级块。
    pub fn load(dev: &dyn BlockDevice) -> Result<Self> {
        let mut buf = block::scratch();
        Self::ID.read(dev, &mut buf)?;
        let sb: Self = unsafe { ptr::read_unaligned(buf.as_ptr().cast()) };
        sb.validate(dev.num_blocks())?;
        Ok(sb)
    }

    pub fn store(&self, dev: &dyn BlockDevice) -> Result<()> {
        let mut buf = block::scratch();
        unsafe { ptr::write_unaligned(buf.as_mut_ptr().cast(), *self) };
        Self::ID.write(dev, &buf)
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            total_blocks: u16::from_le(self.total_blk) as usize,
            fat_blocks: self.fat_blk_count as usize,
            data_blocks: u16::from_le(self.data_blk_count) as usize,
        }
    }

    fn validate(&self, num_blocks: usize) -> Result<()> {
        if self.signature != SIGNATURE {
            log::debug!("bad signature {:?}", { self.signature });
            return Err(Error::Format);
        }

        let geometry = self.geometry();
        if geometry.total_blocks != num_blocks {
            log::debug!(
                "volume claims {} blocks, device has {num_blocks}",
                geometry.total_blocks
            );
            return Err(Error::Format);
        }

        let consistent = geometry.fat_blocks > 0
            && geometry.data_blocks > 0
            && geometry.data_blocks < DataBlock::EOC.index()
            && geometry.data_blocks <= geometry.fat_blocks * FAT_ENTRIES_PER_BLOCK
            && u16::from_le(self.rdir_blk) as usize == usize::from(geometry.root_dir())
            && u16::from_le(self.data_blk) as usize == usize::from(geometry.data_area())
            && usize::from(geometry.data_area()) + geometry.data_blocks == geometry.total_blocks;
        if !consistent {
            log::debug!("inconsistent geometry {geometry:?}");
            return Err(Error::Format);
        }

        Ok(())
    }
}
