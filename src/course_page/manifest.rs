//! 基于课程清单（YAML/JSON）的页面实现。
//!
//! 清单描述课程名、章节、课时以及每个课时的下载入口或截取区域。
//! 折叠的章节在展开前不出现在课时列表中，与真实站点的目录行为一致。

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::CoursePage;
use crate::download::error::HarvestError;
use crate::download::models::{CaptureRegion, CurrentItem, DownloadAffordance, ItemRef};
use crate::fetch::http::HttpFetcher;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid yaml manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid json manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to fetch manifest {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseManifest {
    pub course: String,
    /// 当前选中的课时（按全部课时计数，从 1 开始）。
    #[serde(default)]
    pub current: Option<usize>,
    #[serde(default)]
    pub sections: Vec<ManifestSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSection {
    pub title: String,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub lessons: Vec<ManifestLesson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestLesson {
    pub title: String,
    #[serde(default)]
    pub downloads: Vec<DownloadAffordance>,
    #[serde(default)]
    pub capture: Option<ManifestCapture>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestCapture {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ManifestCapture {
    fn region(&self) -> Option<CaptureRegion> {
        if let Some(source) = non_empty(&self.image) {
            return Some(CaptureRegion::Image { source });
        }
        if let Some(html) = non_empty(&self.html) {
            return Some(CaptureRegion::DocumentHtml { html });
        }
        non_empty(&self.url).map(|url| CaptureRegion::DocumentUrl { url })
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// (章节下标, 课时下标)
type Position = (usize, usize);

#[derive(Debug, Clone)]
pub struct ManifestPage {
    manifest: CourseManifest,
    expanded: Vec<bool>,
    current: Option<Position>,
}

impl ManifestPage {
    pub fn new(manifest: CourseManifest) -> Result<Self, ManifestError> {
        if manifest.course.trim().is_empty() {
            return Err(ManifestError::Invalid("course name is empty".to_string()));
        }
        let expanded = manifest.sections.iter().map(|s| !s.collapsed).collect();
        let current = match manifest.current {
            None => None,
            Some(ordinal) => Some(nth_position(&manifest, ordinal).ok_or_else(|| {
                ManifestError::Invalid(format!("current lesson {ordinal} does not exist"))
            })?),
        };
        Ok(Self {
            manifest,
            expanded,
            current,
        })
    }

    /// 解析清单文本；以 `{` 开头按 JSON 处理，否则按 YAML。
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        let manifest: CourseManifest = if raw.trim_start().starts_with('{') {
            serde_json::from_str(raw)?
        } else {
            serde_yaml::from_str(raw)?
        };
        Self::new(manifest)
    }

    /// 从本地路径或 http(s) 地址读取清单。
    pub fn load(source: &str, http: &HttpFetcher) -> Result<Self, ManifestError> {
        let raw = if is_remote(source) {
            info!(target: "page", url = source, "拉取课程清单");
            http.fetch_text(source)
                .map_err(|err| ManifestError::Fetch {
                    url: source.to_string(),
                    reason: err.to_string(),
                })?
        } else {
            let path = Path::new(source);
            fs::read_to_string(path).map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?
        };
        Self::parse(&raw)
    }

    fn visible(&self) -> Vec<Position> {
        self.manifest
            .sections
            .iter()
            .enumerate()
            .filter(|(s, _)| self.expanded[*s])
            .flat_map(|(s, section)| (0..section.lessons.len()).map(move |l| (s, l)))
            .collect()
    }

    fn lesson(&self, (s, l): Position) -> &ManifestLesson {
        &self.manifest.sections[s].lessons[l]
    }
}

fn is_remote(source: &str) -> bool {
    let lower = source.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn nth_position(manifest: &CourseManifest, ordinal: usize) -> Option<Position> {
    manifest
        .sections
        .iter()
        .enumerate()
        .flat_map(|(s, section)| (0..section.lessons.len()).map(move |l| (s, l)))
        .nth(ordinal.checked_sub(1)?)
}

impl CoursePage for ManifestPage {
    fn course_name(&self) -> String {
        self.manifest.course.clone()
    }

    fn expand_all(&mut self) -> usize {
        let mut opened = 0;
        for flag in self.expanded.iter_mut().filter(|f| !**f) {
            *flag = true;
            opened += 1;
        }
        if opened > 0 {
            debug!(target: "page", opened, "展开折叠章节");
        }
        opened
    }

    fn items(&self) -> Vec<ItemRef> {
        self.visible()
            .into_iter()
            .enumerate()
            .map(|(i, pos)| ItemRef {
                ordinal: i + 1,
                group_index: pos.0,
                title: self.lesson(pos).title.clone(),
            })
            .collect()
    }

    fn current_ordinal(&self) -> Option<usize> {
        let current = self.current?;
        self.visible()
            .iter()
            .position(|p| *p == current)
            .map(|i| i + 1)
    }

    fn activate(&mut self, ordinal: usize) -> Result<(), HarvestError> {
        let visible = self.visible();
        let pos = ordinal
            .checked_sub(1)
            .and_then(|i| visible.get(i).copied())
            .ok_or_else(|| {
                HarvestError::StructureNotFound(format!("no lesson at position {ordinal}"))
            })?;
        self.current = Some(pos);
        Ok(())
    }

    fn current_item(&self) -> Option<CurrentItem> {
        let ordinal = self.current_ordinal()?;
        let (s, l) = self.current?;
        let section = &self.manifest.sections[s];
        let lesson = &section.lessons[l];
        Some(CurrentItem {
            ordinal,
            total: self.visible().len(),
            group_index: s,
            group_title: section.title.clone(),
            position_in_group: l + 1,
            title: lesson.title.clone(),
            downloads: lesson.downloads.clone(),
            capture: lesson.capture.as_ref().and_then(ManifestCapture::region),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
course: Rust Basics
current: 4
sections:
  - title: Intro
    lessons:
      - title: Welcome (1:30)
        downloads:
          - url: https://cdn.example.com/v/welcome
            origin_name: welcome.mp4
      - title: Setup
        downloads:
          - url: https://cdn.example.com/a/setup.zip
          - url: https://cdn.example.com/a/notes.pdf
  - title: Ownership
    collapsed: true
    lessons:
      - title: Moves
        capture:
          html: "<p>moves</p>"
      - title: Chapter Quiz
        capture:
          image: "data:image/png;base64,AAAA"
"#;

    #[test]
    fn collapsed_sections_are_hidden_until_expanded() {
        let mut page = ManifestPage::parse(YAML).unwrap();
        assert_eq!(page.items().len(), 2);
        // 当前课时位于折叠章节中，页面上不可见
        assert_eq!(page.current_ordinal(), None);
        assert!(page.current_item().is_none());

        assert_eq!(page.expand_all(), 1);
        assert_eq!(page.expand_all(), 0);
        let items = page.items();
        assert_eq!(items.len(), 4);
        assert_eq!(items[2].group_index, 1);
        assert_eq!(page.current_ordinal(), Some(4));
    }

    #[test]
    fn activation_changes_current_item() {
        let mut page = ManifestPage::parse(YAML).unwrap();
        page.expand_all();
        page.activate(2).unwrap();
        assert!(page.is_ready(2));

        let item = page.current_item().unwrap();
        assert_eq!(item.title, "Setup");
        assert_eq!(item.group_index, 0);
        assert_eq!(item.position_in_group, 2);
        assert_eq!(item.total, 4);
        assert_eq!(item.downloads.len(), 2);
        assert_eq!(item.capture, None);

        page.activate(3).unwrap();
        let item = page.current_item().unwrap();
        assert_eq!(
            item.capture,
            Some(CaptureRegion::DocumentHtml {
                html: "<p>moves</p>".to_string()
            })
        );

        assert!(matches!(
            page.activate(9),
            Err(HarvestError::StructureNotFound(_))
        ));
        assert!(page.activate(0).is_err());
    }

    #[test]
    fn parses_json_and_validates() {
        let json = r#"{"course":"C","sections":[{"title":"S","lessons":[{"title":"L"}]}]}"#;
        let page = ManifestPage::parse(json).unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.current_ordinal(), None);

        let bad = r#"{"course":"C","current":3,"sections":[]}"#;
        assert!(matches!(
            ManifestPage::parse(bad),
            Err(ManifestError::Invalid(_))
        ));
        assert!(matches!(
            ManifestPage::parse("course: \"\"\n"),
            Err(ManifestError::Invalid(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.yml");
        fs::write(&path, YAML).unwrap();
        let http = HttpFetcher::new(&crate::base_system::context::Config::default()).unwrap();
        let page = ManifestPage::load(path.to_str().unwrap(), &http).unwrap();
        assert_eq!(page.course_name(), "Rust Basics");

        let missing = dir.path().join("missing.yml");
        assert!(matches!(
            ManifestPage::load(missing.to_str().unwrap(), &http),
            Err(ManifestError::Io { .. })
        ));
    }
}
