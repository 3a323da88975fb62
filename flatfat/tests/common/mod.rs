//! Common utilities for tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use block_dev::RamDisk;
use flatfat::{BlockDevice, BlockError, MountedVolume, BLOCK_SIZE};

/// 超级块 + 分配表 + 根目录之外恰好有`data_blocks`个数据块的设备
pub fn disk_with_data_blocks(data_blocks: usize) -> Arc<RamDisk> {
    let fat_blocks = (2 * data_blocks).div_ceil(BLOCK_SIZE);
    let disk = Arc::new(RamDisk::new(2 + fat_blocks + data_blocks));
    let geometry = flatfat::format(&*disk).unwrap();
    assert_eq!(data_blocks, geometry.data_blocks);
    disk
}

pub fn mounted(data_blocks: usize) -> (Arc<RamDisk>, MountedVolume) {
    let disk = disk_with_data_blocks(data_blocks);
    let vol = MountedVolume::mount(disk.clone() as Arc<dyn BlockDevice>).unwrap();
    (disk, vol)
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// 可以按需让读写失败的设备，数据实际存放在内层的[`RamDisk`]中
#[derive(Debug)]
pub struct FaultyDisk {
    pub inner: Arc<RamDisk>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// 对这一块的读写总是失败，`usize::MAX`表示没有
    bad_block: AtomicUsize,
    /// 失败的写入次数
    failed_writes: AtomicUsize,
}

impl FaultyDisk {
    pub fn new(inner: Arc<RamDisk>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            bad_block: AtomicUsize::new(usize::MAX),
            failed_writes: AtomicUsize::new(0),
        })
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_block(&self, block_id: Option<usize>) {
        self.bad_block
            .store(block_id.unwrap_or(usize::MAX), Ordering::SeqCst);
    }

    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    fn is_bad(&self, block_id: usize) -> bool {
        self.bad_block.load(Ordering::SeqCst) == block_id
    }
}

impl BlockDevice for FaultyDisk {
    fn num_blocks(&self) -> usize {
        self.inner.num_blocks()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError> {
        if self.fail_reads.load(Ordering::SeqCst) || self.is_bad(block_id) {
            return Err(BlockError::Device);
        }
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError> {
        if self.fail_writes.load(Ordering::SeqCst) || self.is_bad(block_id) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(BlockError::Device);
        }
        self.inner.write_block(block_id, buf)
    }
}

/// 挂载在[`FaultyDisk`]上的卷
pub fn mounted_faulty(data_blocks: usize) -> (Arc<FaultyDisk>, MountedVolume) {
    let disk = FaultyDisk::new(disk_with_data_blocks(data_blocks));
    let vol = MountedVolume::mount(disk.clone() as Arc<dyn BlockDevice>).unwrap();
    (disk, vol)
}
