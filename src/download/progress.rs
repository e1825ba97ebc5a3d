//! 进度上报与 CLI 进度条管理。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::{ItemOutcome, ProgressSnapshot};

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot) + Send>;

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    cb: Option<ProgressCallback>, // optional UI callback
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub(crate) fn emit(&mut self) {
        if let Some(cb) = self.cb.as_mut() {
            cb(self.snapshot);
        }
    }

    /// 一个课时处理完毕（不论成功、失败还是跳过）。
    pub(crate) fn record(&mut self, outcome: Option<&ItemOutcome>) {
        self.snapshot.done = (self.snapshot.done + 1).min(self.snapshot.total);
        match outcome {
            Some(o) => {
                self.snapshot.saved_files += o.saved.len();
                self.snapshot.failed += o.failed;
            }
            None => self.snapshot.failed += 1,
        }
        if let Some(bar) = self.bar.as_ref() {
            bar.set_position(self.snapshot.done as u64);
        }
        self.emit();
    }

    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// 有 UI 回调时只回调；否则在终端画一条进度条。
pub(crate) fn make_reporter(
    total: usize,
    progress: Option<ProgressCallback>,
    show_bar: bool,
) -> ProgressReporter {
    let bar = if progress.is_none() && show_bar && total > 0 {
        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(style);
        bar.set_prefix("课时处理");
        Some(bar)
    } else {
        None
    };

    let mut reporter = ProgressReporter {
        snapshot: ProgressSnapshot {
            total,
            ..ProgressSnapshot::default()
        },
        cb: progress,
        bar,
    };
    reporter.emit();
    reporter
}
