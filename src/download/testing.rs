//! 测试用的内存课程页面。

use std::collections::{HashMap, HashSet};

use super::error::HarvestError;
use super::models::{CaptureRegion, CurrentItem, DownloadAffordance, ItemRef};
use crate::course_page::CoursePage;

const GROUP_SIZE: usize = 5;

/// 每个课时默认带一个视频下载入口，每 5 个课时一个章节。
pub(crate) struct FakePage {
    total: usize,
    current: Option<usize>,
    downloads: HashMap<usize, Vec<String>>,
    captures: HashSet<usize>,
    expanded: bool,
    pub(crate) activations: Vec<usize>,
    pub(crate) broken: HashSet<usize>,
    pub(crate) never_ready: HashSet<usize>,
    pub(crate) hidden_until_expanded: bool,
}

impl FakePage {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            current: None,
            downloads: HashMap::new(),
            captures: HashSet::new(),
            expanded: false,
            activations: Vec::new(),
            broken: HashSet::new(),
            never_ready: HashSet::new(),
            hidden_until_expanded: false,
        }
    }

    pub(crate) fn select(&mut self, ordinal: usize) {
        self.current = Some(ordinal);
    }

    pub(crate) fn downloads_for(&mut self, ordinal: usize, urls: Vec<&str>) {
        self.downloads
            .insert(ordinal, urls.into_iter().map(str::to_string).collect());
    }

    /// 该课时没有下载入口，只有可截取的正文。
    pub(crate) fn capture_for(&mut self, ordinal: usize) {
        self.downloads.insert(ordinal, Vec::new());
        self.captures.insert(ordinal);
    }
}

impl CoursePage for FakePage {
    fn course_name(&self) -> String {
        "Fake Course".to_string()
    }

    fn expand_all(&mut self) -> usize {
        let newly = usize::from(self.hidden_until_expanded && !self.expanded);
        self.expanded = true;
        newly
    }

    fn items(&self) -> Vec<ItemRef> {
        if self.hidden_until_expanded && !self.expanded {
            return Vec::new();
        }
        (1..=self.total)
            .map(|n| ItemRef {
                ordinal: n,
                group_index: (n - 1) / GROUP_SIZE,
                title: format!("Lesson {n}"),
            })
            .collect()
    }

    fn current_ordinal(&self) -> Option<usize> {
        self.current
    }

    fn activate(&mut self, ordinal: usize) -> Result<(), HarvestError> {
        if self.broken.contains(&ordinal) || ordinal == 0 || ordinal > self.total {
            return Err(HarvestError::StructureNotFound(format!(
                "lesson {ordinal} is not clickable"
            )));
        }
        self.activations.push(ordinal);
        self.current = Some(ordinal);
        Ok(())
    }

    fn is_ready(&self, ordinal: usize) -> bool {
        self.current == Some(ordinal) && !self.never_ready.contains(&ordinal)
    }

    fn current_item(&self) -> Option<CurrentItem> {
        let n = self.current?;
        let downloads = self
            .downloads
            .get(&n)
            .cloned()
            .unwrap_or_else(|| vec![format!("https://cdn.test/{n}.mp4")]);
        Some(CurrentItem {
            ordinal: n,
            total: self.total,
            group_index: (n - 1) / GROUP_SIZE,
            group_title: format!("Group {}", (n - 1) / GROUP_SIZE),
            position_in_group: (n - 1) % GROUP_SIZE + 1,
            title: format!("Lesson {n}"),
            downloads: downloads
                .into_iter()
                .map(|url| DownloadAffordance {
                    url,
                    origin_name: None,
                })
                .collect(),
            capture: self.captures.contains(&n).then(|| CaptureRegion::DocumentHtml {
                html: format!("<p>Lesson {n}</p>"),
            }),
        })
    }
}
