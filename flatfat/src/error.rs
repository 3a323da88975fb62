use core::fmt;

use block_dev::BlockError;

use crate::block::ChainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 没有挂载的卷
    NotMounted,
    AlreadyMounted,
    /// 签名或卷的几何参数不符
    Format,
    /// 文件名为空、过长、重复或不存在
    InvalidName,
    /// 文件描述符越界或未打开
    InvalidHandle,
    /// 根目录已满或打开的文件过多
    Capacity,
    /// 偏移量超过文件大小
    InvalidOffset,
    /// 文件仍被打开
    Busy,
    /// 分配表中的链表损坏
    Corrupted(ChainError),
    Io(BlockError),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<BlockError> for Error {
    fn from(e: BlockError) -> Self {
        Self::Io(e)
    }
}

impl From<ChainError> for Error {
    fn from(e: ChainError) -> Self {
        Self::Corrupted(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted => f.write_str("no volume is mounted"),
            Self::AlreadyMounted => f.write_str("a volume is already mounted"),
            Self::Format => f.write_str("bad signature or volume geometry"),
            Self::InvalidName => f.write_str("invalid file name"),
            Self::InvalidHandle => f.write_str("invalid file descriptor"),
            Self::Capacity => f.write_str("too many files"),
            Self::InvalidOffset => f.write_str("offset beyond end of file"),
            Self::Busy => f.write_str("file is currently open"),
            Self::Corrupted(e) => write!(f, "corrupted allocation chain: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl core::error::Error for Error {}
