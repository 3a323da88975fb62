mod block_file;
mod cli;

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use flatfat::MountedVolume;
use typed_bytesize::ByteSizeIec;

pub use self::{
    block_file::BlockFile,
    cli::{Cli, Command},
};

type Result<T = ()> = std::result::Result<T, Box<dyn Error>>;

fn main() -> Result {
    env_logger::init();

    let cli = Cli::parse();
    log::debug!("image={:?}", cli.image);

    match cli.command {
        Command::Format { size } => format(&cli.image, size),
        Command::Info => with_volume(&cli.image, |vol| {
            println!("{}", vol.info());
            Ok(())
        }),
        Command::Ls => with_volume(&cli.image, |vol| {
            println!("FS Ls:");
            for entry in vol.ls() {
                println!("{entry}");
            }
            Ok(())
        }),
        Command::Add { host_file, name } => {
            let name = match name {
                Some(name) => name,
                None => host_file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or("host file name is not valid UTF-8")?
                    .to_owned(),
            };
            let data = fs::read(&host_file)?;

            with_volume(&cli.image, |vol| {
                vol.create(&name)?;
                let fd = vol.open(&name)?;
                let written = vol.write(fd, &data)?;
                vol.close(fd)?;
                if written < data.len() {
                    log::warn!("volume full: {written} of {} bytes written", data.len());
                }
                println!("{name}: {written} bytes");
                Ok(())
            })
        }
        Command::Cat { name } => with_volume(&cli.image, |vol| {
            let fd = vol.open(&name)?;
            let mut buf = vec![0; vol.stat(fd)?];
            let len = vol.read(fd, &mut buf)?;
            vol.close(fd)?;
            io::stdout().write_all(&buf[..len])?;
            Ok(())
        }),
        Command::Rm { name } => with_volume(&cli.image, |vol| Ok(vol.delete(&name)?)),
        Command::Stat { name } => with_volume(&cli.image, |vol| {
            let fd = vol.open(&name)?;
            println!("Size of file '{name}' is {} bytes", vol.stat(fd)?);
            vol.close(fd)?;
            Ok(())
        }),
    }
}

/// 创建`size` MiB的镜像并写入空卷
fn format(image: &Path, size: u64) -> Result {
    let disk_size = ByteSizeIec::mib(size).0;
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(image)?;
    fd.set_len(disk_size)?;

    let block_dev = BlockFile::new(fd)?;
    let geometry = flatfat::format(&block_dev)?;
    log::info!("formatted {image:?}: {geometry:?}");
    Ok(())
}

/// 挂载镜像执行`f`，成功后卸载写回元数据。
fn with_volume(image: &Path, f: impl FnOnce(&mut MountedVolume) -> Result) -> Result {
    let fd = OpenOptions::new().read(true).write(true).open(image)?;
    let block_dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd)?);
    let mut vol = MountedVolume::mount(block_dev)?;
    f(&mut vol)?;
    vol.unmount()?;
    Ok(())
}
