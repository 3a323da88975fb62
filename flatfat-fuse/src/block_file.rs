use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use block_dev::{check_access, BlockDevice, BlockError, BLOCK_SIZE};
use send_wrapper::SendWrapper;

/// 以宿主文件充当的块设备，文件长度中不足一块的尾部被忽略。
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    num_blocks: usize,
}

impl BlockFile {
    pub fn new(fd: File) -> std::io::Result<Self> {
        let num_blocks = fd.metadata()?.len() as usize / BLOCK_SIZE;
        Ok(Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            num_blocks,
        })
    }
}

impl BlockDevice for BlockFile {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError> {
        check_access(block_id, self.num_blocks, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| file.read_exact(buf))
            .map_err(|e| {
                log::error!("reading block {block_id}: {e}");
                BlockError::Device
            })
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError> {
        check_access(block_id, self.num_blocks, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| file.write_all(buf))
            .map_err(|e| {
                log::error!("writing block {block_id}: {e}");
                BlockError::Device
            })
    }
}
