//! 下载主流程编排：准备输出目录、组装获取器与处理器、启动遍历。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::models::{ItemOutcome, ProgressSnapshot, WalkPlan, WalkResult};
use super::processor::ItemProcessor;
use super::walker::Walker;
use crate::base_system::context::Config;
use crate::base_system::course_paths::course_folder_path;
use crate::base_system::file_cleaner::{clean_partial_files, remove_if_empty};
use crate::base_system::pacing::ThreadPacer;
use crate::course_page::CoursePage;
use crate::fetch::Capturer;
use crate::fetch::capture::SnapshotCapturer;
use crate::fetch::http::HttpFetcher;

/// 一次下载请求：遍历计划加可选的输出目录覆盖。
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub plan: WalkPlan,
    pub output: Option<PathBuf>,
}

/// 输出目录及其是否由本次运行创建；只有本次创建的目录才允许在结束时删除。
struct OutputDir {
    path: PathBuf,
    created: bool,
}

fn prepare_output_dir(config: &Config, course: &str, output: Option<&Path>) -> Result<OutputDir> {
    let dir = course_folder_path(config, course, output);
    let created = !dir.exists();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create output dir {}", dir.display()))?;
    match clean_partial_files(&dir) {
        Ok(0) => {}
        Ok(n) => info!(target: "download", removed = n, "已清理上次遗留的临时文件"),
        Err(e) => warn!(target: "download", error = %e, "清理临时文件失败"),
    }
    Ok(OutputDir { path: dir, created })
}

/// 按计划遍历课程并保存每个课时的资源。
pub fn download(
    config: &Config,
    page: &mut dyn CoursePage,
    request: &DownloadRequest,
    progress: Option<Box<dyn FnMut(ProgressSnapshot) + Send>>,
    cancel_flag: Option<Arc<AtomicBool>>,
) -> Result<WalkResult> {
    let course = page.course_name();
    info!(target: "download", course = %course, "启动下载");
    let started = Instant::now();

    let output = prepare_output_dir(config, &course, request.output.as_deref())?;
    let out_dir = output.path;
    debug!(target: "download", dir = %out_dir.display(), "输出目录");

    let fetcher = HttpFetcher::new(config).context("init HttpFetcher")?;
    let capturer = SnapshotCapturer::new(fetcher.clone());
    let capturer: Option<&dyn Capturer> = if config.enable_capture {
        Some(&capturer)
    } else {
        None
    };
    let pacer = ThreadPacer;
    let processor = ItemProcessor::new(config, &out_dir, &fetcher, capturer, &pacer)
        .with_kind_filter(request.plan.kind_filter);

    let mut walker = Walker::new(config, &pacer);
    if let Some(flag) = cancel_flag {
        walker = walker.with_cancel(flag);
    }
    walker = match progress {
        Some(cb) => walker.with_progress(cb),
        None => walker.with_progress_bar(true),
    };

    let result = walker.run(page, &request.plan, |page, item| {
        processor.process(page, item.ordinal)
    });

    if output.created
        && let Ok(true) = remove_if_empty(&out_dir)
    {
        debug!(target: "download", dir = %out_dir.display(), "未保存任何文件，已删除空目录");
    }

    let elapsed = started.elapsed().as_secs_f32();
    info!(
        "下载完成：{} 成功 {} 个课时，失败 {} 个，跳过 {} 个，用时 {:.1}s",
        course, result.success, result.failed, result.skipped, elapsed
    );
    Ok(result)
}

/// 把当前课时页面上的所有视频按 `前缀-序号` 保存，不遍历课程。
pub fn grab_page_videos(
    config: &Config,
    page: &mut dyn CoursePage,
    output: Option<&Path>,
) -> Result<ItemOutcome> {
    // 当前课时可能位于折叠的章节中
    page.expand_all();
    let course = page.course_name();
    let out_dir = prepare_output_dir(config, &course, output)?.path;
    let fetcher = HttpFetcher::new(config).context("init HttpFetcher")?;
    let pacer = ThreadPacer;
    let processor = ItemProcessor::new(config, &out_dir, &fetcher, None, &pacer);

    let outcome = processor
        .grab_page_videos(&*page, &config.page_video_prefix)
        .context("grab page videos")?;
    info!(
        target: "download",
        saved = outcome.saved.len(),
        failed = outcome.failed,
        "整页视频保存完成"
    );
    Ok(outcome)
}
