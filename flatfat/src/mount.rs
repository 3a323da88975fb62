use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::handle::Fd;
use crate::{Error, FileEntry, MountedVolume, Result, VolumeInfo};

/// 挂载点
///
/// 进程内至多挂载一个卷。所有操作都经过同一把锁，
/// 分配表与根目录的修改因此不会交错，可以放进`static`里跨线程共享。
#[derive(Debug, Default)]
pub struct MountPoint {
    volume: Mutex<Option<MountedVolume>>,
}

impl MountPoint {
    pub const fn new() -> Self {
        Self {
            volume: Mutex::new(None),
        }
    }

    pub fn mount(&self, dev: Arc<dyn BlockDevice>) -> Result<()> {
        let mut volume = self.volume.lock();
        if volume.is_some() {
            return Err(Error::AlreadyMounted);
        }
        *volume = Some(MountedVolume::mount(dev)?);
        Ok(())
    }

    pub fn unmount(&self) -> Result<()> {
        let volume = self.volume.lock().take().ok_or(Error::NotMounted)?;
        volume.unmount()
    }

    pub fn is_mounted(&self) -> bool {
        self.volume.lock().is_some()
    }

    pub fn info(&self) -> Result<VolumeInfo> {
        self.with(|vol| Ok(vol.info()))
    }

    pub fn sync(&self) -> Result<()> {
        self.with(|vol| vol.sync())
    }

    pub fn create(&self, name: &str) -> Result<()> {
        self.with(|vol| vol.create(name))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.with(|vol| vol.delete(name))
    }

    /// 锁内无法交出惰性迭代器，这里收集成快照。
    pub fn ls(&self) -> Result<Vec<FileEntry>> {
        self.with(|vol| Ok(vol.ls().collect()))
    }

    pub fn open(&self, name: &str) -> Result<Fd> {
        self.with(|vol| vol.open(name))
    }

    pub fn close(&self, fd: Fd) -> Result<()> {
        self.with(|vol| vol.close(fd))
    }

    pub fn stat(&self, fd: Fd) -> Result<usize> {
        self.with(|vol| vol.stat(fd))
    }

    pub fn seek(&self, fd: Fd, offset: usize) -> Result<()> {
        self.with(|vol| vol.seek(fd, offset))
    }

    pub fn tell(&self, fd: Fd) -> Result<usize> {
        self.with(|vol| vol.tell(fd))
    }

    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.with(|vol| vol.read(fd, buf))
    }

    pub fn write(&self, fd: Fd, data: &[u8]) -> Result<usize> {
        self.with(|vol| vol.write(fd, data))
    }

    fn with<T>(&self, f: impl FnOnce(&mut MountedVolume) -> Result<T>) -> Result<T> {
        self.volume.lock().as_mut().ok_or(Error::NotMounted).and_then(f)
    }
}
