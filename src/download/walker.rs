//! 顺序遍历器：逐个切换课时、等待页面就绪、交给处理器、冷却。
//!
//! 严格串行，不重试。单个课时的失败只记入结果，不影响后续课时；
//! 取消标志只在课时之间检查。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::error::HarvestError;
use super::models::{ItemOutcome, ItemRef, ResourceKind, WalkPlan, WalkResult, WalkState};
use super::plan::{count_limit, select_items};
use super::progress::{ProgressCallback, make_reporter};
use crate::base_system::context::Config;
use crate::base_system::pacing::{Pacer, WaitOutcome, WaitPolicy, wait_until};
use crate::course_page::CoursePage;

pub struct Walker<'a> {
    config: &'a Config,
    pacer: &'a dyn Pacer,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<ProgressCallback>,
    show_bar: bool,
}

impl<'a> Walker<'a> {
    pub fn new(config: &'a Config, pacer: &'a dyn Pacer) -> Self {
        Self {
            config,
            pacer,
            cancel: None,
            progress: None,
            show_bar: false,
        }
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_bar = show;
        self
    }

    fn canceled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn cooldown_for(&self, kind: Option<ResourceKind>) -> Duration {
        match kind {
            Some(k) if k.is_capture() => Duration::from_millis(self.config.capture_cooldown_ms),
            _ => Duration::from_millis(self.config.download_cooldown_ms),
        }
    }

    /// 按计划遍历页面。`process` 在目标课时成为当前课时之后调用。
    pub fn run<F>(
        mut self,
        page: &mut dyn CoursePage,
        plan: &WalkPlan,
        mut process: F,
    ) -> WalkResult
    where
        F: FnMut(&dyn CoursePage, &ItemRef) -> Result<ItemOutcome, HarvestError>,
    {
        let expanded = page.expand_all();
        if expanded > 0 {
            debug!(target: "download", expanded, "已展开折叠章节");
        }
        let items = page.items();
        let work = select_items(&items, plan, page.current_ordinal());
        let limit = count_limit(plan).unwrap_or(usize::MAX);
        let planned = work.len().min(limit);
        info!(
            target: "download",
            total = items.len(),
            planned,
            filter = %plan.kind_filter,
            "开始遍历课程"
        );

        let mut reporter = make_reporter(planned, self.progress.take(), self.show_bar);
        let mut state = WalkState::default();
        let mut result = WalkResult::default();
        let policy = self.config.settle_policy();

        for item in work.iter().take(planned) {
            if self.canceled() {
                warn!(target: "download", "收到取消请求，停止遍历");
                result.canceled = true;
                break;
            }
            if state.processed > 0 {
                // 切换课时后折叠状态可能被页面重置
                page.expand_all();
            }

            info!(
                target: "download",
                "[{}/{}] {}",
                state.processed + 1,
                planned,
                item.title
            );

            let mut kind = None;
            match self.enter(page, item.ordinal, &policy) {
                Ok(()) => match process(&*page, item) {
                    Ok(outcome) => {
                        kind = Some(outcome.kind);
                        if outcome.skipped {
                            result.skipped += 1;
                        } else if outcome.saved.is_empty() {
                            result.failed += 1;
                        } else {
                            result.success += 1;
                            if outcome.failed > 0 {
                                warn!(
                                    target: "download",
                                    ordinal = item.ordinal,
                                    failed = outcome.failed,
                                    "课时部分资源保存失败"
                                );
                            }
                        }
                        result.saved.extend(outcome.saved.iter().cloned());
                        reporter.record(Some(&outcome));
                    }
                    Err(HarvestError::CaptureUnavailable { file_name }) => {
                        kind = Some(ResourceKind::DocumentCapture);
                        warn!(target: "download", "{file_name} :: 截图不可用，已跳过");
                        result.skipped += 1;
                        reporter.record(Some(&ItemOutcome::skipped(ResourceKind::DocumentCapture)));
                    }
                    Err(err) => {
                        error!(target: "download", ordinal = item.ordinal, error = %err, "课时处理失败");
                        result.failed += 1;
                        reporter.record(None);
                    }
                },
                Err(err) => {
                    error!(target: "download", ordinal = item.ordinal, error = %err, "无法切换到课时");
                    result.failed += 1;
                    reporter.record(None);
                }
            }

            result.processed.push(item.ordinal);
            state.processed += 1;

            if state.processed < planned && !self.canceled() {
                self.pacer.sleep(self.cooldown_for(kind));
            }
        }

        reporter.finish();
        info!(
            target: "download",
            success = result.success,
            failed = result.failed,
            skipped = result.skipped,
            canceled = result.canceled,
            "遍历结束"
        );
        result
    }

    /// 使 `ordinal` 成为当前课时并等待页面就绪；已是当前课时则不点击。
    fn enter(
        &self,
        page: &mut dyn CoursePage,
        ordinal: usize,
        policy: &WaitPolicy,
    ) -> Result<(), HarvestError> {
        if page.current_ordinal() != Some(ordinal) {
            page.activate(ordinal)?;
        }
        let page: &dyn CoursePage = page;
        match wait_until(self.pacer, policy, || page.is_ready(ordinal)) {
            WaitOutcome::Ready { waited } => {
                debug!(target: "download", ordinal, waited_ms = waited.as_millis() as u64, "页面就绪");
            }
            WaitOutcome::TimedOut { waited } => {
                warn!(
                    target: "download",
                    ordinal,
                    waited_ms = waited.as_millis() as u64,
                    "等待页面就绪超时，继续处理"
                );
            }
        }
        Ok(())
    }
}
