use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{check_access, BlockDevice, BlockError, BLOCK_SIZE};

/// 内存中的块设备，整个卷就是一段连续的字节。
#[derive(Debug)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    num_blocks: usize,
}

impl RamDisk {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; num_blocks * BLOCK_SIZE]),
            num_blocks,
        }
    }

    /// 以现成的磁盘映像构造，末尾不足一块的字节会被截掉。
    pub fn from_image(mut image: Vec<u8>) -> Self {
        let num_blocks = image.len() / BLOCK_SIZE;
        image.truncate(num_blocks * BLOCK_SIZE);
        Self {
            data: Mutex::new(image),
            num_blocks,
        }
    }

    /// 当前映像的拷贝
    pub fn image(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn into_image(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError> {
        check_access(block_id, self.num_blocks, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&self.data.lock()[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError> {
        check_access(block_id, self.num_blocks, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        self.data.lock()[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }
}
