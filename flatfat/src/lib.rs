//! 一个扁平的类FAT文件系统，直接建立在定长块设备之上。
//!
//! 卷的布局见[`volume`]；读写引擎见[`MountedVolume::read`]与[`MountedVolume::write`]。

#![no_std]

extern crate alloc;

mod block;
mod control;
mod error;
mod handle;
mod mount;
mod transfer;
pub mod volume;

pub use block_dev::{BlockDevice, BlockError, BLOCK_SIZE};

pub use self::{
    block::{BlockId, ChainError, DataBlock},
    control::{FileEntry, MountedVolume, VolumeInfo},
    error::{Error, Result},
    handle::{Fd, OPEN_MAX_COUNT},
    mount::MountPoint,
    volume::{format, Geometry},
};
