//! 临时文件与空目录清理。

use std::fs;
use std::io;
use std::path::Path;

/// 下载过程中临时文件的前缀，落盘成功后会被重命名为最终文件名。
pub const PARTIAL_PREFIX: &str = ".harvest-";

pub fn is_empty_dir(path: impl AsRef<Path>) -> io::Result<bool> {
    let mut entries = fs::read_dir(path.as_ref())?;
    Ok(entries.next().is_none())
}

/// 目录存在且为空时删除，返回是否删除。
pub fn remove_if_empty(path: impl AsRef<Path>) -> io::Result<bool> {
    let path = path.as_ref();
    if !path.is_dir() || !is_empty_dir(path)? {
        return Ok(false);
    }
    fs::remove_dir(path)?;
    Ok(true)
}

/// 清理上次异常退出遗留的临时下载文件，返回清理数量。
pub fn clean_partial_files(dir: impl AsRef<Path>) -> io::Result<usize> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_partial = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(PARTIAL_PREFIX));
        if is_partial && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_partials_and_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let course = dir.path().join("course");
        fs::create_dir(&course).unwrap();
        fs::write(course.join(format!("{PARTIAL_PREFIX}abc")), b"x").unwrap();
        fs::write(course.join("keep.mp4"), b"x").unwrap();

        assert_eq!(clean_partial_files(&course).unwrap(), 1);
        assert!(!remove_if_empty(&course).unwrap());

        fs::remove_file(course.join("keep.mp4")).unwrap();
        assert!(remove_if_empty(&course).unwrap());
        assert!(!course.exists());
        assert_eq!(clean_partial_files(&course).unwrap(), 0);
    }
}
