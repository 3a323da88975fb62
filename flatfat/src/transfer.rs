//! # 读写引擎
//!
//! 把(描述符, 游标, 长度)换算成对链表上一串块的操作：
//! 首块可能从块中间开始，末块可能在块中间结束，中间的块总是完整的。
//!
//! 不完整的块需要经过缓冲区合并，完整的块直接与调用者的缓冲区交换数据。
//! 写入越过链表容量时，按需从分配表中申请新块接到链表末尾；
//! 空间耗尽时尽量多写，返回实际写入的字节数。

use block_dev::BLOCK_SIZE;

use crate::block::{ChainError, DataBlock};
use crate::handle::Fd;
use crate::{MountedVolume, Result};

impl MountedVolume {
    /// 从游标处读取至多`buf.len()`个字节，游标随之前进。
    ///
    /// 游标位于文件末尾时返回0。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let file = *self.files.get(fd)?;
        let (size, first) = {
            let entry = self.root.get(file.slot);
            (entry.size(), entry.first_block())
        };

        let len = buf.len().min(size.saturating_sub(file.offset));
        if len == 0 {
            return Ok(0);
        }

        self.load_range(first, file.offset, &mut buf[..len])?;

        self.files.get_mut(fd)?.offset += len;
        log::trace!("fd {fd}: read {len} bytes at {}", file.offset);
        Ok(len)
    }

    /// 从游标处写入`data`，必要时延长链表，游标随之前进。
    ///
    /// 空间不足时只写入放得下的部分，返回值可能小于`data.len()`，甚至为0。
    /// 设备出错时本次新分配的块全部归还，文件大小与游标保持不变。
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> Result<usize> {
        let file = *self.files.get(fd)?;
        if data.is_empty() {
            return Ok(0);
        }

        let (before, tail) = self.fat.tail(self.root.get(file.slot).first_block())?;
        let wanted = (file.offset + data.len()).div_ceil(BLOCK_SIZE);
        let blocks = self.extend(file.slot, before, tail, wanted);
        let len = data
            .len()
            .min((blocks * BLOCK_SIZE).saturating_sub(file.offset));
        if len == 0 {
            log::debug!("fd {fd}: no space left");
            return Ok(0);
        }

        let first = self.root.get(file.slot).first_block();
        if let Err(e) = self.store_range(first, file.offset, &data[..len]) {
            if blocks > before {
                self.release(file.slot, tail);
            }
            return Err(e);
        }

        let end = file.offset + len;
        let entry = self.root.get_mut(file.slot);
        if end > entry.size() {
            entry.resize(end);
        }
        self.files.get_mut(fd)?.offset = end;

        if len < data.len() {
            log::debug!("fd {fd}: short write, {len} of {} bytes", data.len());
        }
        Ok(len)
    }

    /// 把`slot`对应文件的链表从`blocks`块延长到`wanted`块，空闲块不够时能延长多少是多少。
    ///
    /// `blocks`与`tail`来自对链表的遍历，而不是由文件大小推算。
    /// 返回延长后的块数。
    fn extend(
        &mut self,
        slot: usize,
        mut blocks: usize,
        mut tail: Option<DataBlock>,
        wanted: usize,
    ) -> usize {
        while blocks < wanted {
            let Some(id) = self.fat.alloc() else {
                log::debug!("out of data blocks, chain stays at {blocks} block(s)");
                break;
            };
            match tail {
                Some(tail) => self.fat.couple(tail, id),
                None => self.root.get_mut(slot).set_first_block(id),
            }
            tail = Some(id);
            blocks += 1;
        }

        blocks
    }

    /// 撤销[`Self::extend`]：把`tail`之后的块从链表上摘下并释放；
    /// `tail`为`None`时整条链表都是新分配的。
    fn release(&mut self, slot: usize, tail: Option<DataBlock>) {
        let added = match tail {
            Some(tail) => self.fat.cut(tail),
            None => {
                let entry = self.root.get_mut(slot);
                let first = entry.first_block();
                entry.set_first_block(DataBlock::EOC);
                first
            }
        };

        match self.fat.dealloc(added) {
            Ok(freed) => log::debug!("write failed, {freed} new block(s) released"),
            Err(e) => log::warn!("failed to release new blocks: {e}"),
        }
    }

    /// 把链表上从字节偏移`offset`开始的内容读入`out`。
    fn load_range(&mut self, first: DataBlock, offset: usize, out: &mut [u8]) -> Result<()> {
        let mut id = self
            .fat
            .nth(first, offset / BLOCK_SIZE)?
            .ok_or(ChainError::Truncated)?;
        let mut at = offset % BLOCK_SIZE;
        let mut done = 0;
        loop {
            let n = (BLOCK_SIZE - at).min(out.len() - done);
            self.extract(id, at, &mut out[done..done + n])?;
            done += n;
            if done == out.len() {
                return Ok(());
            }
            id = self.fat.next(id)?.ok_or(ChainError::Truncated)?;
            at = 0;
        }
    }

    /// 把`data`写到链表上从字节偏移`offset`开始的位置，链表必须已经足够长。
    fn store_range(&mut self, first: DataBlock, offset: usize, data: &[u8]) -> Result<()> {
        let mut id = self
            .fat
            .nth(first, offset / BLOCK_SIZE)?
            .ok_or(ChainError::Truncated)?;
        let mut at = offset % BLOCK_SIZE;
        let mut done = 0;
        loop {
            let n = (BLOCK_SIZE - at).min(data.len() - done);
            self.overlay(id, at, &data[done..done + n])?;
            done += n;
            if done == data.len() {
                return Ok(());
            }
            id = self.fat.next(id)?.ok_or(ChainError::Truncated)?;
            at = 0;
        }
    }

    /// 把`data`覆盖到数据块`id`的`at`处。
    ///
    /// 完整的块直接写入；否则先读出整块，在缓冲区中合并后再写回，
    /// 保证范围之外的字节不受影响。
    fn overlay(&mut self, id: DataBlock, at: usize, data: &[u8]) -> Result<()> {
        debug_assert!(at + data.len() <= BLOCK_SIZE);
        let block = self.data_block(id);

        if data.len() == BLOCK_SIZE {
            return block.write(&*self.dev, data);
        }

        block.read(&*self.dev, &mut self.scratch)?;
        self.scratch[at..at + data.len()].copy_from_slice(data);
        block.write(&*self.dev, &self.scratch)
    }

    /// 从数据块`id`的`at`处取出`out.len()`个字节。
    fn extract(&mut self, id: DataBlock, at: usize, out: &mut [u8]) -> Result<()> {
        debug_assert!(at + out.len() <= BLOCK_SIZE);
        let block = self.data_block(id);

        if out.len() == BLOCK_SIZE {
            return block.read(&*self.dev, out);
        }

        block.read(&*self.dev, &mut self.scratch)?;
        out.copy_from_slice(&self.scratch[at..at + out.len()]);
        Ok(())
    }
}
