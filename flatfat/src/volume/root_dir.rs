//! 根目录：一个块内固定容量的目录项数组，是卷上唯一的目录。

use alloc::boxed::Box;
use core::{mem, ptr};

use block_dev::BlockDevice;

use super::{DIR_ENTRY_SIZE, FILENAME_LEN, FILE_MAX_COUNT};
use crate::block::{self, BlockId, DataBlock};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct DirEntry {
    /// NUL结尾的文件名，首字节为NUL表示空目录项
    name: [u8; FILENAME_LEN],

    /// 文件的字节量
    size: u32,

    /// 首个数据块，空文件为[`DataBlock::EOC`]
    first_blk: u16,

    _padding: [u8; 10],
}

const _: () = assert!(mem::size_of::<DirEntry>() == DIR_ENTRY_SIZE);

impl DirEntry {
    pub const EMPTY: Self = Self {
        name: [0; FILENAME_LEN],
        size: 0,
        first_blk: 0,
        _padding: [0; 10],
    };

    fn new(name: [u8; FILENAME_LEN]) -> Self {
        Self {
            name,
            first_blk: u16::from(DataBlock::EOC).to_le(),
            ..Self::EMPTY
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name[0] == 0
    }

    /// 文件名，不含结尾的NUL
    pub fn name(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_LEN);
        &self.name[..len]
    }

    pub fn size(&self) -> usize {
        u32::from_le(self.size) as usize
    }

    pub fn resize(&mut self, size: usize) {
        self.size = (size as u32).to_le();
    }

    pub fn first_block(&self) -> DataBlock {
        DataBlock::new(u16::from_le(self.first_blk))
    }

    pub fn set_first_block(&mut self, id: DataBlock) {
        self.first_blk = u16::from(id).to_le();
    }
}

/// 把文件名编码为目录项的名称字段。
///
/// 合法的文件名非空、不含NUL，且连同结尾的NUL不超过[`FILENAME_LEN`]字节。
pub fn encode_name(name: &str) -> Result<[u8; FILENAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= FILENAME_LEN || bytes.contains(&0) {
        log::debug!("invalid file name {name:?}");
        return Err(Error::InvalidName);
    }

    let mut arr = [0; FILENAME_LEN];
    arr[..bytes.len()].copy_from_slice(bytes);
    Ok(arr)
}

#[derive(Debug)]
pub struct RootDir {
    entries: Box<[DirEntry; FILE_MAX_COUNT]>,
}

impl RootDir {
    pub fn new() -> Self {
        Self {
            entries: Box::new([DirEntry::EMPTY; FILE_MAX_COUNT]),
        }
    }

    pub fn load(dev: &dyn BlockDevice, id: BlockId) -> Result<Self> {
        let mut buf = block::scratch();
        id.read(dev, &mut buf)?;

        let mut dir = Self::new();
        for (entry, raw) in dir.entries.iter_mut().zip(buf.chunks_exact(DIR_ENTRY_SIZE)) {
            *entry = unsafe { ptr::read_unaligned(raw.as_ptr().cast()) };
        }
        Ok(dir)
    }

    pub fn store(&self, dev: &dyn BlockDevice, id: BlockId) -> Result<()> {
        let mut buf = block::scratch();
        for (entry, raw) in self.entries.iter().zip(buf.chunks_exact_mut(DIR_ENTRY_SIZE)) {
            unsafe { ptr::write_unaligned(raw.as_mut_ptr().cast(), *entry) };
        }
        id.write(dev, &buf)
    }

    /// 按名称查找目录项所在的槽位
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.is_empty() && entry.name() == name.as_bytes())
    }

    /// 占用第一个空槽位，新文件大小为0且没有数据块。
    pub fn claim(&mut self, name: &str) -> Result<usize> {
        let encoded = encode_name(name)?;
        if self.find(name).is_some() {
            log::debug!("{name:?} already exists");
            return Err(Error::InvalidName);
        }

        let slot = self
            .entries
            .iter()
            .position(DirEntry::is_empty)
            .ok_or(Error::Capacity)?;
        self.entries[slot] = DirEntry::new(encoded);
        Ok(slot)
    }

    pub fn clear(&mut self, slot: usize) {
        self.entries[slot] = DirEntry::EMPTY;
    }

    pub fn get(&self, slot: usize) -> &DirEntry {
        &self.entries[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut DirEntry {
        &mut self.entries[slot]
    }

    /// 非空的目录项
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|entry| !entry.is_empty())
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_empty()).count()
    }
}

impl Default for RootDir {
    fn default() -> Self {
        Self::new()
    }
}
