//! 资源获取：直接下载与内容截取。
//!
//! 两条路径都先写入目标目录下的临时文件，成功后再改名为最终文件名，
//! 中途失败不会留下半截文件。

pub mod capture;
pub mod data_url;
pub mod http;

use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::base_system::file_cleaner::PARTIAL_PREFIX;
use crate::download::error::HarvestError;
use crate::download::models::CaptureRegion;

/// 把单个地址保存为本地文件，返回写入的字节数。
pub trait ResourceFetcher {
    fn fetch(&self, source: &str, target: &Path) -> Result<u64, HarvestError>;
}

/// 把内容区域渲染为图片或文档并保存，返回写入的字节数。
pub trait Capturer {
    fn capture(&self, region: &CaptureRegion, target: &Path) -> Result<u64, HarvestError>;
}

/// 先写临时文件，`write` 成功后改名为 `target`。
pub(crate) fn write_atomically<F>(
    target: &Path,
    overwrite: bool,
    write: F,
) -> Result<u64, HarvestError>
where
    F: FnOnce(&mut File) -> Result<(), HarvestError>,
{
    if !overwrite && target.exists() {
        return Err(HarvestError::AlreadyExists(target.to_path_buf()));
    }
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| HarvestError::io(dir, e))?;

    let mut tmp: NamedTempFile = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| HarvestError::io(dir, e))?;

    write(tmp.as_file_mut())?;

    let file = tmp
        .persist(target)
        .map_err(|e| HarvestError::io(target, e.error))?;
    let len = file
        .metadata()
        .map_err(|e| HarvestError::io(target, e))?
        .len();
    Ok(len)
}
