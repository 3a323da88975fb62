//! 打开文件表

use derive_more::{Display, From, Into};

use crate::{Error, Result};

/// 同时打开的文件数上限
pub const OPEN_MAX_COUNT: usize = 32;

/// 文件描述符
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, From, Into)]
#[repr(transparent)]
pub struct Fd(usize);

#[derive(Debug, Clone, Copy)]
pub struct OpenFile {
    /// 根目录中的槽位
    pub slot: usize,
    /// 读写游标，不会超过文件大小
    pub offset: usize,
}

#[derive(Debug)]
pub struct OpenFileTable {
    files: [Option<OpenFile>; OPEN_MAX_COUNT],
}

impl OpenFileTable {
    pub const fn new() -> Self {
        Self {
            files: [None; OPEN_MAX_COUNT],
        }
    }

    /// 占用编号最小的空闲描述符，游标置0。
    pub fn open(&mut self, slot: usize) -> Result<Fd> {
        let fd = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(Error::Capacity)?;
        self.files[fd] = Some(OpenFile { slot, offset: 0 });
        Ok(Fd(fd))
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(Error::InvalidHandle)
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.files
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    /// 是否有描述符引用了根目录中的`slot`
    pub fn is_open(&self, slot: usize) -> bool {
        self.files.iter().flatten().any(|file| file.slot == slot)
    }

    pub fn live(&self) -> usize {
        self.files.iter().flatten().count()
    }
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}
