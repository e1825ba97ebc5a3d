//! 单个课时的处理：读取页面元数据、判定资源类型、生成文件名并保存。
//!
//! 解析（`resolve`）与执行（`execute`）分开，前者是纯函数，便于单独测试。

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};

use super::error::HarvestError;
use super::models::{
    CaptureRegion, CurrentItem, DownloadSpec, ItemOutcome, KindFilter, ResourceKind,
    SourceLocator,
};
use super::naming;
use crate::base_system::context::Config;
use crate::base_system::pacing::Pacer;
use crate::course_page::CoursePage;
use crate::fetch::{Capturer, ResourceFetcher};

pub struct ItemProcessor<'a> {
    config: &'a Config,
    output_dir: PathBuf,
    fetcher: &'a dyn ResourceFetcher,
    capturer: Option<&'a dyn Capturer>,
    pacer: &'a dyn Pacer,
    kind_filter: KindFilter,
}

impl<'a> ItemProcessor<'a> {
    pub fn new(
        config: &'a Config,
        output_dir: impl Into<PathBuf>,
        fetcher: &'a dyn ResourceFetcher,
        capturer: Option<&'a dyn Capturer>,
        pacer: &'a dyn Pacer,
    ) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            fetcher,
            capturer,
            pacer,
            kind_filter: KindFilter::All,
        }
    }

    pub fn with_kind_filter(mut self, filter: KindFilter) -> Self {
        self.kind_filter = filter;
        self
    }

    /// 处理页面当前课时。`expected` 是遍历器刚切换到的序号，仅用于核对。
    pub fn process(
        &self,
        page: &dyn CoursePage,
        expected: usize,
    ) -> Result<ItemOutcome, HarvestError> {
        let item = page.current_item().ok_or_else(|| {
            HarvestError::StructureNotFound(format!("lesson {expected} is not selected"))
        })?;
        if item.ordinal != expected {
            warn!(
                target: "download",
                expected,
                actual = item.ordinal,
                "页面当前课时与预期不一致，以页面为准"
            );
        }

        let specs = self.resolve(&page.course_name(), &item)?;
        let kind = item_kind(&specs);

        if !self.kind_filter.allows(kind) {
            for spec in &specs {
                info!(
                    target: "download",
                    filter = %self.kind_filter,
                    "{} :: 已跳过（类型 {}）",
                    spec.file_name,
                    kind.label()
                );
            }
            return Ok(ItemOutcome::skipped(kind));
        }

        let mut outcome = ItemOutcome {
            kind,
            saved: Vec::new(),
            failed: 0,
            skipped: false,
        };
        let mut first_err = None;
        for spec in &specs {
            match self.execute(spec) {
                Ok(path) => {
                    info!(target: "download", kind = spec.kind.label(), "{}", spec.file_name);
                    outcome.saved.push(path);
                }
                Err(err) => {
                    error!(target: "download", error = %err, "{} :: 保存失败", spec.file_name);
                    outcome.failed += 1;
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) if outcome.saved.is_empty() => Err(err),
            _ => Ok(outcome),
        }
    }

    /// 从当前课时元数据生成待保存的资源描述。
    pub fn resolve(
        &self,
        course: &str,
        item: &CurrentItem,
    ) -> Result<Vec<DownloadSpec>, HarvestError> {
        let base = naming::base_name(course, item);

        let forced_capture = self.config.is_capture_marker(&item.title) && item.capture.is_some();
        if !item.downloads.is_empty() && !forced_capture {
            let mut used = HashSet::new();
            let specs = item
                .downloads
                .iter()
                .map(|d| {
                    let ext = naming::extension_for(d.origin_name.as_deref(), &d.url)
                        .unwrap_or_else(|| self.config.default_extension.clone());
                    let kind = if self.config.is_video_extension(&ext) {
                        ResourceKind::Video
                    } else {
                        ResourceKind::GenericBinary
                    };
                    DownloadSpec {
                        source: SourceLocator::Url(d.url.clone()),
                        file_name: unique_name(&mut used, &base, &ext),
                        kind,
                    }
                })
                .collect();
            return Ok(specs);
        }

        let Some(region) = item.capture.clone() else {
            return Err(HarvestError::StructureNotFound(format!(
                "lesson {} has neither a download link nor a content region",
                item.ordinal
            )));
        };
        let (kind, ext) = match region {
            CaptureRegion::Image { .. } => (ResourceKind::ImageCapture, "png"),
            CaptureRegion::DocumentHtml { .. } | CaptureRegion::DocumentUrl { .. } => {
                (ResourceKind::DocumentCapture, "html")
            }
        };
        Ok(vec![DownloadSpec {
            source: SourceLocator::Region(region),
            file_name: naming::file_name(&base, ext),
            kind,
        }])
    }

    fn execute(&self, spec: &DownloadSpec) -> Result<PathBuf, HarvestError> {
        let target = self.output_dir.join(&spec.file_name);
        match &spec.source {
            SourceLocator::Url(url) => {
                self.fetcher.fetch(url, &target)?;
                self.pacer
                    .sleep(Duration::from_millis(self.config.release_grace_ms));
            }
            SourceLocator::Region(region) => {
                let capturer = self.capturer.ok_or_else(|| HarvestError::CaptureUnavailable {
                    file_name: spec.file_name.clone(),
                })?;
                capturer.capture(region, &target)?;
                self.pacer
                    .sleep(Duration::from_millis(self.config.capture_grace_ms));
            }
        }
        Ok(target)
    }

    /// 整页视频抓取：把当前课时的所有下载入口保存为 `前缀-序号.扩展名`。
    pub fn grab_page_videos(
        &self,
        page: &dyn CoursePage,
        prefix: &str,
    ) -> Result<ItemOutcome, HarvestError> {
        let item = page
            .current_item()
            .ok_or_else(|| HarvestError::StructureNotFound("no lesson is selected".to_string()))?;
        if item.downloads.is_empty() {
            return Err(HarvestError::StructureNotFound(
                "current lesson has no video".to_string(),
            ));
        }

        let mut outcome = ItemOutcome {
            kind: ResourceKind::Video,
            saved: Vec::new(),
            failed: 0,
            skipped: false,
        };
        for (idx, d) in item.downloads.iter().enumerate() {
            let ext = naming::extension_for(d.origin_name.as_deref(), &d.url)
                .unwrap_or_else(|| self.config.default_extension.clone());
            let spec = DownloadSpec {
                source: SourceLocator::Url(d.url.clone()),
                file_name: naming::file_name(&format!("{prefix}-{}", idx + 1), &ext),
                kind: ResourceKind::Video,
            };
            match self.execute(&spec) {
                Ok(path) => {
                    info!(target: "download", "{}", spec.file_name);
                    outcome.saved.push(path);
                }
                Err(err) => {
                    error!(target: "download", error = %err, "{} :: 保存失败", spec.file_name);
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}

/// 课时整体类型：截图优先，其次只要有视频即为视频。
fn item_kind(specs: &[DownloadSpec]) -> ResourceKind {
    if let Some(capture) = specs.iter().find(|s| s.kind.is_capture()) {
        return capture.kind;
    }
    if specs.iter().any(|s| s.kind == ResourceKind::Video) {
        ResourceKind::Video
    } else {
        ResourceKind::GenericBinary
    }
}

fn unique_name(used: &mut HashSet<String>, base: &str, ext: &str) -> String {
    let mut name = naming::file_name(base, ext);
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = naming::file_name_with_suffix(base, &format!(" ({n})"), ext);
        n += 1;
    }
    name
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    use crate::download::error::HarvestError;
    use crate::download::models::CaptureRegion;
    use crate::fetch::{Capturer, ResourceFetcher};

    /// 记录请求；URL 含 `fail` 时返回下载错误，不写磁盘。
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pub(crate) calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl ResourceFetcher for FakeFetcher {
        fn fetch(&self, source: &str, target: &Path) -> Result<u64, HarvestError> {
            self.calls
                .borrow_mut()
                .push((source.to_string(), target.to_path_buf()));
            if source.contains("fail") {
                return Err(HarvestError::Fetch {
                    file_name: target.display().to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(1)
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeCapturer {
        pub(crate) calls: RefCell<Vec<PathBuf>>,
    }

    impl Capturer for FakeCapturer {
        fn capture(&self, _region: &CaptureRegion, target: &Path) -> Result<u64, HarvestError> {
            self.calls.borrow_mut().push(target.to_path_buf());
            Ok(1)
        }
    }
}
