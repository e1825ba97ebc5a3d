//! 下载相关的数据模型定义。
//!
//! 包含课时引用、资源类型、下载描述、遍历计划、遍历结果与进度快照。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 课程目录中的一个课时。序号从 1 开始，按页面顺序编号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub ordinal: usize,
    pub group_index: usize,
    pub title: String,
}

/// 课时上的一个直接下载入口。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAffordance {
    pub url: String,
    /// 站点给出的原始下载名，用来推断扩展名。
    #[serde(default)]
    pub origin_name: Option<String>,
}

/// 可截取的内容区域。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRegion {
    /// 图片（http(s) 或 `data:` URL），保存为 PNG。
    Image { source: String },
    /// 内联 HTML 片段，保存为独立文档。
    DocumentHtml { html: String },
    /// 需要先拉取的 HTML 页面，保存为独立文档。
    DocumentUrl { url: String },
}

/// 页面在处理时刻报告的当前课时信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentItem {
    pub ordinal: usize,
    pub total: usize,
    /// 章节序号，沿用页面章节列表中的位置（从 0 开始）。
    pub group_index: usize,
    pub group_title: String,
    /// 在所属章节内的位置（从 1 开始）。
    pub position_in_group: usize,
    pub title: String,
    pub downloads: Vec<DownloadAffordance>,
    pub capture: Option<CaptureRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Video,
    GenericBinary,
    ImageCapture,
    DocumentCapture,
}

impl ResourceKind {
    pub fn is_capture(self) -> bool {
        matches!(self, ResourceKind::ImageCapture | ResourceKind::DocumentCapture)
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::GenericBinary => "file",
            ResourceKind::ImageCapture => "image",
            ResourceKind::DocumentCapture => "document",
        }
    }
}

/// 解析完成、待执行的一次保存。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSpec {
    pub source: SourceLocator,
    pub file_name: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Url(String),
    Region(CaptureRegion),
}

/// 按类型过滤：全部 / 仅直接下载 / 仅截图。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    #[default]
    All,
    Video,
    Capture,
}

impl KindFilter {
    pub fn allows(self, kind: ResourceKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Video => !kind.is_capture(),
            KindFilter::Capture => kind.is_capture(),
        }
    }
}

impl FromStr for KindFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(KindFilter::All),
            "video" | "videos" | "download" | "downloads" => Ok(KindFilter::Video),
            "capture" | "captures" | "quiz" | "quizzes" => Ok(KindFilter::Capture),
            other => Err(format!("unknown download type: {other} (all|video|capture)")),
        }
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KindFilter::All => "all",
            KindFilter::Video => "video",
            KindFilter::Capture => "capture",
        };
        f.write_str(s)
    }
}

/// 一次遍历的选择策略。
///
/// `only` 非空时完全决定处理集合，`start`/`count` 被忽略。
/// `start == 0` 表示只处理页面当前选中的课时。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkPlan {
    pub start: usize,
    pub count: Option<usize>,
    pub only: Vec<usize>,
    pub kind_filter: KindFilter,
}

impl Default for WalkPlan {
    fn default() -> Self {
        Self {
            start: 1,
            count: None,
            only: Vec::new(),
            kind_filter: KindFilter::All,
        }
    }
}

/// 遍历过程中的计数器，每次运行重置，仅由遍历器持有。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkState {
    pub processed: usize,
}

/// 单个课时的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub kind: ResourceKind,
    pub saved: Vec<PathBuf>,
    pub failed: usize,
    pub skipped: bool,
}

impl ItemOutcome {
    pub fn skipped(kind: ResourceKind) -> Self {
        Self {
            kind,
            saved: Vec::new(),
            failed: 0,
            skipped: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkResult {
    pub processed: Vec<usize>,
    pub success: u32,
    pub failed: u32,
    pub skipped: u32,
    pub canceled: bool,
    pub saved: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub done: usize,
    pub total: usize,
    pub saved_files: usize,
    pub failed: usize,
}
