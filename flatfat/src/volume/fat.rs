//! 文件分配表
//!
//! 每个数据块对应一条16位的条目，存放链表中下一个块的编号。
//! 整张表在挂载期间常驻内存，卸载时写回。

use alloc::boxed::Box;
use alloc::vec;
use core::mem;

use block_dev::BlockDevice;

use super::{Geometry, FAT_ENTRIES_PER_BLOCK};
use crate::block::{self, ChainError, DataBlock};
use crate::{Error, Result};

#[derive(Debug)]
pub struct Fat {
    /// 长度为分配表块数的整数倍，超出数据区的部分不使用
    entries: Box<[DataBlock]>,
    data_blocks: usize,
}

impl Fat {
    /// 空表：0号条目为[`DataBlock::EOC`]，其余皆未分配。
    pub fn new(geometry: &Geometry) -> Self {
        let mut entries = vec![DataBlock::FREE; geometry.fat_blocks * FAT_ENTRIES_PER_BLOCK];
        entries[0] = DataBlock::EOC;
        Self {
            entries: entries.into(),
            data_blocks: geometry.data_blocks,
        }
    }

    pub fn load(dev: &dyn BlockDevice, geometry: &Geometry) -> Result<Self> {
        let mut entries = vec![DataBlock::FREE; geometry.fat_blocks * FAT_ENTRIES_PER_BLOCK];
        let mut buf = block::scratch();

        for (i, chunk) in entries.chunks_exact_mut(FAT_ENTRIES_PER_BLOCK).enumerate() {
            (geometry.fat_area().start + i).read(dev, &mut buf)?;
            for (entry, raw) in chunk.iter_mut().zip(buf.chunks_exact(2)) {
                *entry = DataBlock::new(u16::from_le_bytes([raw[0], raw[1]]));
            }
        }

        if entries[0] != DataBlock::EOC {
            log::debug!("FAT entry #0 is {}, expected end-of-chain", entries[0]);
            return Err(Error::Format);
        }

        Ok(Self {
            entries: entries.into(),
            data_blocks: geometry.data_blocks,
        })
    }

    /// 写回全部分配表块。
    ///
    /// 某块写入失败不会中止其余块的写入，返回遇到的第一个错误。
    pub fn store(&self, dev: &dyn BlockDevice, geometry: &Geometry) -> Result<()> {
        let mut buf = block::scratch();
        let mut result = Ok(());

        for (i, chunk) in self.entries.chunks_exact(FAT_ENTRIES_PER_BLOCK).enumerate() {
            for (raw, &entry) in buf.chunks_exact_mut(2).zip(chunk) {
                raw.copy_from_slice(&u16::from(entry).to_le_bytes());
            }
            let id = geometry.fat_area().start + i;
            if let Err(e) = id.write(dev, &buf) {
                log::warn!("failed to persist FAT block {id}: {e}");
                result = result.and(Err(e));
            }
        }

        result
    }

    /// 获取链表上的下一个块。
    /// `Ok(None)`表示`id`为链表上最后一个块。
    pub fn next(&self, id: DataBlock) -> core::result::Result<Option<DataBlock>, ChainError> {
        if id.validate(self.data_blocks)?.is_none() {
            return Err(ChainError::OutOfRange);
        }

        match self.entries[id.index()] {
            DataBlock::FREE => Err(ChainError::Free),
            next if next == id => Err(ChainError::Cycle),
            next => next.validate(self.data_blocks),
        }
    }

    /// 从`start`开始遍历链表，`start`可以是[`DataBlock::EOC`]（空链表）。
    pub fn chain(&self, start: DataBlock) -> Chain<'_> {
        let (next, error) = match start.validate(self.data_blocks) {
            Ok(next) => (next, None),
            Err(e) => (None, Some(e)),
        };
        Chain {
            fat: self,
            next,
            error,
            steps: 0,
        }
    }

    /// 链表上第`n`个块（0起），链表不够长时返回`Ok(None)`。
    pub fn nth(
        &self,
        start: DataBlock,
        n: usize,
    ) -> core::result::Result<Option<DataBlock>, ChainError> {
        let mut chain = self.chain(start);
        for _ in 0..n {
            if chain.next().transpose()?.is_none() {
                return Ok(None);
            }
        }
        chain.next().transpose()
    }

    /// 链表的长度与最后一个块
    pub fn tail(
        &self,
        start: DataBlock,
    ) -> core::result::Result<(usize, Option<DataBlock>), ChainError> {
        self.chain(start)
            .try_fold((0, None), |(len, _), id| id.map(|id| (len + 1, Some(id))))
    }

    /// 寻找未分配的块，将其标记为链表末尾。
    pub fn alloc(&mut self) -> Option<DataBlock> {
        let idx = self.entries[..self.data_blocks]
            .iter()
            .skip(DataBlock::MIN.index())
            .position(|&entry| entry == DataBlock::FREE)?
            + DataBlock::MIN.index();
        self.entries[idx] = DataBlock::EOC;
        log::trace!("allocated data block {idx}");
        Some(DataBlock::new(idx as u16))
    }

    /// 将`next`接到链表末尾`prev`之后。
    pub fn couple(&mut self, prev: DataBlock, next: DataBlock) {
        debug_assert_eq!(DataBlock::EOC, self.entries[prev.index()]);
        self.entries[prev.index()] = next;
    }

    /// 让`tail`成为链表末尾，返回原先接在它后面的块。
    pub fn cut(&mut self, tail: DataBlock) -> DataBlock {
        mem::replace(&mut self.entries[tail.index()], DataBlock::EOC)
    }

    /// 释放整个链表，返回释放的块数。
    ///
    /// 先完整校验链表，损坏的链表不会被部分释放。
    pub fn dealloc(&mut self, start: DataBlock) -> core::result::Result<usize, ChainError> {
        let (len, _) = self.tail(start)?;

        let mut id = start;
        for _ in 0..len {
            let next = self.entries[id.index()];
            self.entries[id.index()] = DataBlock::FREE;
            id = next;
        }

        log::trace!("freed {len} blocks from chain {start}");
        Ok(len)
    }

    /// 未分配的数据块数
    pub fn free_count(&self) -> usize {
        self.entries[..self.data_blocks]
            .iter()
            .filter(|&&entry| entry == DataBlock::FREE)
            .count()
    }
}

/// 链表迭代器，每一项都经过校验。
///
/// 遇到错误后迭代结束；步数超过数据块总数即视为成环。
#[derive(Debug)]
pub struct Chain<'a> {
    fat: &'a Fat,
    next: Option<DataBlock>,
    error: Option<ChainError>,
    steps: usize,
}

impl Iterator for Chain<'_> {
    type Item = core::result::Result<DataBlock, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            return Some(Err(e));
        }

        let id = self.next.take()?;
        if self.steps == self.fat.data_blocks {
            return Some(Err(ChainError::Cycle));
        }
        self.steps += 1;

        match self.fat.next(id) {
            Ok(next) => {
                self.next = next;
                Some(Ok(id))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn fat(data_blocks: usize) -> Fat {
        Fat::new(&Geometry {
            total_blocks: data_blocks + 3,
            fat_blocks: 1,
            data_blocks,
        })
    }

    fn chain_of(fat: &Fat, start: DataBlock) -> Vec<u16> {
        fat.chain(start).map(|id| id.unwrap().into()).collect()
    }

    #[test]
    fn alloc_links_and_frees() {
        let mut fat = fat(8);
        assert_eq!(7, fat.free_count());

        let a = fat.alloc().unwrap();
        let b = fat.alloc().unwrap();
        let c = fat.alloc().unwrap();
        assert_eq!([1, 2, 3], [a, b, c].map(u16::from));
        fat.couple(a, b);
        fat.couple(b, c);

        assert_eq!(vec![1, 2, 3], chain_of(&fat, a));
        assert_eq!(Ok((3, Some(c))), fat.tail(a));
        assert_eq!(Ok(Some(c)), fat.nth(a, 2));
        assert_eq!(Ok(None), fat.nth(a, 3));
        assert_eq!(4, fat.free_count());

        assert_eq!(Ok(3), fat.dealloc(a));
        assert_eq!(7, fat.free_count());
    }

    #[test]
    fn empty_chain() {
        let mut fat = fat(4);
        assert_eq!(Ok((0, None)), fat.tail(DataBlock::EOC));
        assert_eq!(Ok(None), fat.nth(DataBlock::EOC, 0));
        assert_eq!(Ok(0), fat.dealloc(DataBlock::EOC));
    }

    #[test]
    fn cut_detaches_the_rest() {
        let mut fat = fat(8);
        let a = fat.alloc().unwrap();
        let b = fat.alloc().unwrap();
        let c = fat.alloc().unwrap();
        fat.couple(a, b);
        fat.couple(b, c);

        assert_eq!(b, fat.cut(a));
        assert_eq!(vec![1], chain_of(&fat, a));
        assert_eq!(Ok(2), fat.dealloc(b));
        assert_eq!(DataBlock::EOC, fat.cut(a));
        assert_eq!(6, fat.free_count());
    }

    #[test]
    fn exhausted() {
        let mut fat = fat(3);
        assert!(fat.alloc().is_some());
        assert!(fat.alloc().is_some());
        assert_eq!(None, fat.alloc());
        assert_eq!(0, fat.free_count());
    }

    #[test]
    fn reuses_first_free() {
        let mut fat = fat(8);
        let a = fat.alloc().unwrap();
        let b = fat.alloc().unwrap();
        fat.dealloc(a).unwrap();
        assert_eq!(Some(a), fat.alloc());
        assert_eq!(Some(DataBlock::new(3)), fat.alloc());
        assert_ne!(a, b);
    }

    #[test]
    fn corrupted_chains() {
        let mut fat = fat(8);
        let a = fat.alloc().unwrap();
        let b = fat.alloc().unwrap();
        fat.couple(a, b);
        // b -> a 成环
        fat.entries[b.index()] = a;
        assert_eq!(Err(ChainError::Cycle), fat.tail(a));
        assert_eq!(Err(ChainError::Cycle), fat.dealloc(a));
        assert_eq!(5, fat.free_count());

        fat.entries[a.index()] = a;
        assert_eq!(Err(ChainError::Cycle), fat.next(a));

        fat.entries[a.index()] = DataBlock::new(5);
        assert_eq!(Err(ChainError::Free), fat.tail(a).map(|_| ()));

        fat.entries[a.index()] = DataBlock::new(100);
        assert_eq!(Err(ChainError::OutOfRange), fat.next(a));

        assert_eq!(Err(ChainError::Reserved), fat.tail(DataBlock::FREE).map(|_| ()));
    }
}
