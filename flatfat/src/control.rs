use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use block_dev::BlockDevice;

use crate::block::{self, BlockId, DataBlock};
use crate::handle::{Fd, OpenFileTable};
use crate::volume::{encode_name, DirEntry, Fat, Geometry, RootDir, SuperBlock, FILE_MAX_COUNT};
use crate::{Error, Result};

/// 已挂载的卷
///
/// 超级块、分配表与根目录在挂载期间常驻内存，
/// 直到[`MountedVolume::unmount`]时才写回设备。
pub struct MountedVolume {
    pub(crate) dev: Arc<dyn BlockDevice>,
    pub(crate) sb: SuperBlock,
    pub(crate) fat: Fat,
    pub(crate) root: RootDir,
    pub(crate) files: OpenFileTable,
    /// 合并不完整块时使用的缓冲区
    pub(crate) scratch: Box<[u8]>,
}

impl MountedVolume {
    pub fn mount(dev: Arc<dyn BlockDevice>) -> Result<Self> {
        let sb = SuperBlock::load(&*dev)?;
        let geometry = sb.geometry();
        let fat = Fat::load(&*dev, &geometry)?;
        let root = RootDir::load(&*dev, geometry.root_dir())?;

        log::info!(
            "mounted volume of {} blocks, {} data blocks",
            geometry.total_blocks,
            geometry.data_blocks
        );
        Ok(Self {
            dev,
            sb,
            fat,
            root,
            files: OpenFileTable::new(),
            scratch: block::scratch(),
        })
    }

    /// 写回元数据并释放整个卷，所有文件描述符随之失效。
    pub fn unmount(self) -> Result<()> {
        let open = self.files.live();
        if open > 0 {
            log::warn!("unmounting with {open} open file(s)");
        }
        self.sync()?;
        log::info!("unmounted");
        Ok(())
    }

    /// 依次写回超级块、分配表和根目录。
    ///
    /// 尽力而为：某块写入失败不会阻止其余块的写入，已写入的块也不会回滚。
    pub fn sync(&self) -> Result<()> {
        let geometry = self.sb.geometry();
        let dev = &*self.dev;

        let results = [
            self.sb.store(dev),
            self.fat.store(dev, &geometry),
            self.root.store(dev, geometry.root_dir()),
        ];
        results.into_iter().fold(Ok(()), |acc, res| {
            if let Err(e) = res {
                log::warn!("failed to persist volume metadata: {e}");
            }
            acc.and(res)
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.sb.geometry()
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            geometry: self.geometry(),
            free_blocks: self.fat.free_count(),
            free_entries: self.root.free_count(),
        }
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        let slot = self.root.claim(name)?;
        log::debug!("created {name:?} at slot {slot}");
        Ok(())
    }

    /// 删除文件并释放它的整条链表。
    pub fn delete(&mut self, name: &str) -> Result<()> {
        encode_name(name)?;
        let slot = self.root.find(name).ok_or(Error::InvalidName)?;
        if self.files.is_open(slot) {
            log::debug!("{name:?} is still open");
            return Err(Error::Busy);
        }

        let freed = self.fat.dealloc(self.root.get(slot).first_block())?;
        self.root.clear(slot);
        log::debug!("deleted {name:?}, {freed} block(s) released");
        Ok(())
    }

    /// 列出根目录中的文件，每次调用都重新开始。
    pub fn ls(&self) -> impl Iterator<Item = FileEntry> + '_ {
        self.root.iter().map(FileEntry::from)
    }

    pub fn open(&mut self, name: &str) -> Result<Fd> {
        encode_name(name)?;
        let slot = self.root.find(name).ok_or(Error::InvalidName)?;
        let fd = self.files.open(slot)?;
        log::debug!("opened {name:?} as fd {fd}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files.close(fd)
    }

    /// 文件当前的大小
    pub fn stat(&self, fd: Fd) -> Result<usize> {
        let file = self.files.get(fd)?;
        Ok(self.root.get(file.slot).size())
    }

    pub fn seek(&mut self, fd: Fd, offset: usize) -> Result<()> {
        let size = self.stat(fd)?;
        if offset > size {
            log::debug!("seek to {offset} beyond size {size}");
            return Err(Error::InvalidOffset);
        }
        self.files.get_mut(fd)?.offset = offset;
        Ok(())
    }

    /// 文件描述符当前的游标
    pub fn tell(&self, fd: Fd) -> Result<usize> {
        Ok(self.files.get(fd)?.offset)
    }

    /// 数据块在磁盘上的块号
    pub(crate) fn data_block(&self, id: DataBlock) -> BlockId {
        self.geometry().data_area() + id.index()
    }
}

impl fmt::Debug for MountedVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedVolume")
            .field("geometry", &self.geometry())
            .field("open_files", &self.files.live())
            .finish_non_exhaustive()
    }
}

/// 卷的概况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    pub geometry: Geometry,
    /// 分配表中未分配的数据块数
    pub free_blocks: usize,
    /// 根目录中的空槽位数
    pub free_entries: usize,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.geometry;
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", g.total_blocks)?;
        writeln!(f, "fat_blk_count={}", g.fat_blocks)?;
        writeln!(f, "rdir_blk={}", g.root_dir())?;
        writeln!(f, "data_blk={}", g.data_area())?;
        writeln!(f, "data_blk_count={}", g.data_blocks)?;
        writeln!(f, "fat_free_ratio={}/{}", self.free_blocks, g.data_blocks)?;
        write!(f, "rdir_free_ratio={}/{FILE_MAX_COUNT}", self.free_entries)
    }
}

/// [`MountedVolume::ls`]列出的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: usize,
    pub first_block: DataBlock,
}

impl From<&DirEntry> for FileEntry {
    fn from(entry: &DirEntry) -> Self {
        Self {
            name: String::from_utf8_lossy(entry.name()).into_owned(),
            size: entry.size(),
            first_block: entry.first_block(),
        }
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name, self.size, self.first_block
        )
    }
}
