mod common;

use common::mounted;
use flatfat::volume::FILE_MAX_COUNT;
use flatfat::{DataBlock, Error, Fd, FileEntry, OPEN_MAX_COUNT};

#[test]
fn create_open_close_delete_restores_directory() {
    let (_, mut vol) = mounted(16);
    vol.create("keep").unwrap();
    let before: Vec<FileEntry> = vol.ls().collect();
    let info = vol.info();

    vol.create("tmp").unwrap();
    let fd = vol.open("tmp").unwrap();
    vol.close(fd).unwrap();
    vol.delete("tmp").unwrap();

    assert_eq!(before, vol.ls().collect::<Vec<_>>());
    assert_eq!(info, vol.info());
}

#[test]
fn create_rejects_bad_names() {
    let (_, mut vol) = mounted(16);
    assert_eq!(Err(Error::InvalidName), vol.create(""));
    assert_eq!(Err(Error::InvalidName), vol.create("a_name_much_too_long"));
    vol.create("dup").unwrap();
    assert_eq!(Err(Error::InvalidName), vol.create("dup"));
    assert_eq!(1, vol.ls().count());
}

#[test]
fn new_file_is_empty() {
    let (_, mut vol) = mounted(16);
    vol.create("a").unwrap();
    let entry = vol.ls().next().unwrap();
    assert_eq!(0, entry.size);
    assert_eq!(DataBlock::EOC, entry.first_block);
    assert_eq!("file: a, size: 0, data_blk: 65535", entry.to_string());
}

#[test]
fn directory_capacity() {
    let (_, mut vol) = mounted(16);
    for i in 0..FILE_MAX_COUNT {
        vol.create(&format!("file{i}")).unwrap();
    }
    assert_eq!(Err(Error::Capacity), vol.create("overflow"));
    assert_eq!(0, vol.info().free_entries);

    vol.delete("file7").unwrap();
    vol.create("overflow").unwrap();
}

#[test]
fn delete_open_file_is_busy() {
    let (_, mut vol) = mounted(16);
    vol.create("a").unwrap();
    let fd1 = vol.open("a").unwrap();
    let fd2 = vol.open("a").unwrap();

    assert_eq!(Err(Error::Busy), vol.delete("a"));
    vol.close(fd1).unwrap();
    assert_eq!(Err(Error::Busy), vol.delete("a"));
    vol.close(fd2).unwrap();
    vol.delete("a").unwrap();

    assert_eq!(Err(Error::InvalidName), vol.delete("a"));
    assert_eq!(Err(Error::InvalidName), vol.open("a").map(|_| ()));
}

#[test]
fn delete_releases_whole_chain() {
    let (_, mut vol) = mounted(64);
    vol.create("big").unwrap();
    let fd = vol.open("big").unwrap();
    let free = vol.info().free_blocks;

    let data = vec![1; 10 * flatfat::BLOCK_SIZE + 1];
    assert_eq!(data.len(), vol.write(fd, &data).unwrap());
    assert_eq!(free - 11, vol.info().free_blocks);

    vol.close(fd).unwrap();
    vol.delete("big").unwrap();
    assert_eq!(free, vol.info().free_blocks);
}

#[test]
fn handle_table_limit() {
    let (_, mut vol) = mounted(16);
    vol.create("a").unwrap();
    let fds: Vec<Fd> = (0..OPEN_MAX_COUNT).map(|_| vol.open("a").unwrap()).collect();
    assert_eq!(Fd::from(0), fds[0]);

    assert_eq!(Err(Error::Capacity), vol.open("a").map(|_| ()));
    // 失败的打开不影响已有的描述符
    for &fd in &fds {
        assert_eq!(Ok(0), vol.stat(fd));
    }

    vol.close(fds[3]).unwrap();
    assert_eq!(Ok(fds[3]), vol.open("a"));
}

#[test]
fn invalid_handles() {
    let (_, mut vol) = mounted(16);
    vol.create("a").unwrap();
    let fd = vol.open("a").unwrap();
    vol.close(fd).unwrap();

    let mut buf = [0; 4];
    assert_eq!(Err(Error::InvalidHandle), vol.close(fd));
    assert_eq!(Err(Error::InvalidHandle), vol.stat(fd));
    assert_eq!(Err(Error::InvalidHandle), vol.seek(fd, 0));
    assert_eq!(Err(Error::InvalidHandle), vol.read(fd, &mut buf));
    assert_eq!(Err(Error::InvalidHandle), vol.write(fd, b"x"));

    let out_of_range = Fd::from(OPEN_MAX_COUNT + 1);
    assert_eq!(Err(Error::InvalidHandle), vol.stat(out_of_range));
}

#[test]
fn seek_is_bounded_by_size() {
    let (_, mut vol) = mounted(16);
    vol.create("a").unwrap();
    let fd = vol.open("a").unwrap();
    assert_eq!(Err(Error::InvalidOffset), vol.seek(fd, 1));

    vol.write(fd, b"0123456789").unwrap();
    vol.seek(fd, 10).unwrap();
    assert_eq!(Err(Error::InvalidOffset), vol.seek(fd, 11));
    vol.seek(fd, 0).unwrap();
    assert_eq!(0, vol.tell(fd).unwrap());
}

#[test]
fn handles_have_independent_cursors() {
    let (_, mut vol) = mounted(16);
    vol.create("a").unwrap();
    let writer = vol.open("a").unwrap();
    let reader = vol.open("a").unwrap();

    vol.write(writer, b"hello world").unwrap();
    // 大小在写入后重新从目录读取
    assert_eq!(11, vol.stat(reader).unwrap());

    let mut buf = [0; 5];
    assert_eq!(5, vol.read(reader, &mut buf).unwrap());
    assert_eq!(b"hello", &buf);
    assert_eq!(11, vol.tell(writer).unwrap());
    assert_eq!(5, vol.tell(reader).unwrap());
}
