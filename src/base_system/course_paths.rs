use std::path::{Path, PathBuf};

use crate::base_system::context::{Config, safe_fs_name};

pub fn course_folder_name(course_name: &str) -> String {
    safe_fs_name(course_name, "_", 120)
}

/// 课程输出目录；`output` 优先于配置中的保存路径。
pub fn course_folder_path(config: &Config, course_name: &str, output: Option<&Path>) -> PathBuf {
    let base = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.default_save_dir());
    if config.folder_per_course {
        base.join(course_folder_name(course_name))
    } else {
        base
    }
}
