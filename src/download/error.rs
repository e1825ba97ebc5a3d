use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 单个课时处理过程中可能出现的错误。遍历器记录后继续下一个课时。
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("fetch failed for {file_name}: {reason}")]
    Fetch { file_name: String, reason: String },
    #[error("capture failed for {file_name}: {reason}")]
    Capture { file_name: String, reason: String },
    #[error("capture is not available, skipped {file_name}")]
    CaptureUnavailable { file_name: String },
    #[error("page structure not found: {0}")]
    StructureNotFound(String),
    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl HarvestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarvestError::Io {
            path: path.into(),
            source,
        }
    }
}
