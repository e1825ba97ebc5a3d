//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息，以及文件名安全化工具。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use super::pacing::WaitPolicy;

/// 就绪等待退避倍数上限。
pub const MAX_SETTLE_BACKOFF: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 网络配置
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // 节奏配置
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_settle_poll_ms")]
    pub settle_poll_ms: u64,
    #[serde(default = "default_settle_backoff")]
    pub settle_backoff: f64,
    #[serde(default = "default_download_cooldown_ms")]
    pub download_cooldown_ms: u64,
    #[serde(default = "default_capture_cooldown_ms")]
    pub capture_cooldown_ms: u64,
    #[serde(default = "default_release_grace_ms")]
    pub release_grace_ms: u64,
    #[serde(default = "default_capture_grace_ms")]
    pub capture_grace_ms: u64,

    // 分类配置
    #[serde(default = "default_true")]
    pub enable_capture: bool,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    #[serde(default = "default_capture_markers")]
    pub capture_markers: Vec<String>,
    #[serde(default = "default_extension")]
    pub default_extension: String,

    // 保存配置
    #[serde(default)]
    pub save_path: String,
    #[serde(default = "default_true")]
    pub folder_per_course: bool,
    #[serde(default = "default_true")]
    pub allow_overwrite_files: bool,
    #[serde(default = "default_video_prefix")]
    pub page_video_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            settle_timeout_ms: default_settle_timeout_ms(),
            settle_poll_ms: default_settle_poll_ms(),
            settle_backoff: default_settle_backoff(),
            download_cooldown_ms: default_download_cooldown_ms(),
            capture_cooldown_ms: default_capture_cooldown_ms(),
            release_grace_ms: default_release_grace_ms(),
            capture_grace_ms: default_capture_grace_ms(),
            enable_capture: default_true(),
            video_extensions: default_video_extensions(),
            capture_markers: default_capture_markers(),
            default_extension: default_extension(),
            save_path: String::new(),
            folder_per_course: default_true(),
            allow_overwrite_files: default_true(),
            page_video_prefix: default_video_prefix(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 18] = [
            FieldMeta {
                name: "request_timeout",
                description: "单个资源下载的超时时间（秒），视频较大时请适当调高",
            },
            FieldMeta {
                name: "connect_timeout",
                description: "连接超时时间（秒）",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
            FieldMeta {
                name: "settle_timeout_ms",
                description: "切换课时后等待页面就绪的最长时间, 单位ms",
            },
            FieldMeta {
                name: "settle_poll_ms",
                description: "就绪检测的初始轮询间隔, 单位ms",
            },
            FieldMeta {
                name: "settle_backoff",
                description: "就绪检测轮询间隔的退避倍数（>= 1.0）",
            },
            FieldMeta {
                name: "download_cooldown_ms",
                description: "直接下载类课时处理完成后的冷却时间, 单位ms",
            },
            FieldMeta {
                name: "capture_cooldown_ms",
                description: "截图/文档类课时处理完成后的冷却时间, 单位ms",
            },
            FieldMeta {
                name: "release_grace_ms",
                description: "下载文件落盘后释放临时句柄前的等待时间, 单位ms",
            },
            FieldMeta {
                name: "capture_grace_ms",
                description: "截图/文档落盘后的等待时间, 单位ms",
            },
            FieldMeta {
                name: "enable_capture",
                description: "是否启用截图/文档保存（关闭后测验等课时会被跳过）",
            },
            FieldMeta {
                name: "video_extensions",
                description: "视为视频的扩展名",
            },
            FieldMeta {
                name: "capture_markers",
                description: "标题等于这些值的课时强制走截图路径（如 Chapter Quiz）",
            },
            FieldMeta {
                name: "default_extension",
                description: "无法从下载名推断扩展名时使用的扩展名",
            },
            FieldMeta {
                name: "save_path",
                description: "保存路径（留空为当前目录）",
            },
            FieldMeta {
                name: "folder_per_course",
                description: "是否为每门课程单独建立文件夹",
            },
            FieldMeta {
                name: "allow_overwrite_files",
                description: "是否允许覆盖已存在的文件",
            },
            FieldMeta {
                name: "page_video_prefix",
                description: "整页视频抓取模式下的文件名前缀",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), String> {
        if !(1.0..=MAX_SETTLE_BACKOFF).contains(&self.settle_backoff) {
            return Err(format!(
                "settle_backoff 必须在 1.0 到 {MAX_SETTLE_BACKOFF} 之间，当前为 {}",
                self.settle_backoff
            ));
        }
        if self.settle_poll_ms == 0 && self.settle_timeout_ms > 0 {
            return Err("settle_poll_ms 不能为 0".to_string());
        }
        if self.default_extension.trim().is_empty() {
            return Err("default_extension 不能为空".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    pub fn settle_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(self.settle_timeout_ms),
            poll_interval: Duration::from_millis(self.settle_poll_ms),
            backoff: self.settle_backoff,
            max_interval: Duration::from_millis(self.settle_timeout_ms.max(self.settle_poll_ms)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.max(1))
    }

    pub fn is_video_extension(&self, ext: &str) -> bool {
        self.video_extensions
            .iter()
            .any(|v| v.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn is_capture_marker(&self, title: &str) -> bool {
        let title = title.trim();
        self.capture_markers
            .iter()
            .any(|m| m.trim().eq_ignore_ascii_case(title))
    }
}

/// 将任意字符串转换为可在 Windows/Linux/macOS 上安全使用的文件名。
///
/// 非法字符替换为 `replacement` 的首字符，去掉结尾的空格和点，
/// 避开 Windows 保留名，并在 UTF-8 字符边界上截断到 `max_len` 字节。
pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let fill = replacement.chars().next().unwrap_or('_');
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => fill,
            c if (c as u32) < 32 => fill,
            _ => ch,
        })
        .collect();

    trim_trailing(&mut cleaned);

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    const RESERVED: [&str; 22] = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem_upper = cleaned
        .split('.')
        .next()
        .unwrap_or_default()
        .to_uppercase();
    if RESERVED.contains(&stem_upper.as_str()) {
        cleaned = format!("_{}", cleaned);
    }

    if cleaned.len() > max_len {
        // 避免在多字节 UTF-8 字符中间截断导致 panic
        let mut end = max_len;
        while end > 0 && !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
        trim_trailing(&mut cleaned);
        if cleaned.is_empty() {
            cleaned.push_str("unnamed");
        }
    }

    cleaned
}

fn trim_trailing(s: &mut String) {
    while s.ends_with(' ') || s.ends_with('.') {
        s.pop();
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string()
}

fn default_settle_timeout_ms() -> u64 {
    4000
}

fn default_settle_poll_ms() -> u64 {
    250
}

fn default_settle_backoff() -> f64 {
    1.5
}

fn default_download_cooldown_ms() -> u64 {
    2000
}

fn default_capture_cooldown_ms() -> u64 {
    4000
}

fn default_release_grace_ms() -> u64 {
    100
}

fn default_capture_grace_ms() -> u64 {
    500
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "webm", "mkv", "mov", "m4v", "avi"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_capture_markers() -> Vec<String> {
    vec!["Chapter Quiz".to_string()]
}

fn default_extension() -> String {
    "mp4".to_string()
}

fn default_video_prefix() -> String {
    "PageVideo".to_string()
}
