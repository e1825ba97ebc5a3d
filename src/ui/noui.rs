//! 无交互命令行界面：打印课程概览与计划，执行下载后打印汇总。

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::base_system::context::Config;
use crate::base_system::course_paths::course_folder_path;
use crate::course_page::CoursePage;
use crate::download::models::{WalkPlan, WalkResult};
use crate::download::{self as dl, DownloadRequest};

pub fn run(
    config: &Config,
    page: &mut dyn CoursePage,
    request: &DownloadRequest,
    stop_flag: Arc<AtomicBool>,
) -> Result<WalkResult> {
    page.expand_all();
    let course = page.course_name();
    let total = page.items().len();
    println!("课程：{}（共 {} 个课时）", course, total);
    println!("计划：{}", describe_plan(&request.plan, page.current_ordinal()));
    println!("保存到：{}\n", destination(config, &course, request).display());

    let result = dl::download(config, page, request, None, Some(stop_flag))?;
    print_summary(&result);
    Ok(result)
}

/// `--all-videos`：只保存当前课时页面上的视频。
pub fn run_page_videos(
    config: &Config,
    page: &mut dyn CoursePage,
    request: &DownloadRequest,
) -> Result<()> {
    let outcome = dl::grab_page_videos(config, page, request.output.as_deref())?;
    for path in &outcome.saved {
        println!("  {}", path.display());
    }
    println!("已保存 {} 个视频，失败 {} 个", outcome.saved.len(), outcome.failed);
    Ok(())
}

/// 实际写入的目录（按配置可能是课程子目录）。
fn destination(config: &Config, course: &str, request: &DownloadRequest) -> PathBuf {
    course_folder_path(config, course, request.output.as_deref())
}

fn describe_plan(plan: &WalkPlan, current: Option<usize>) -> String {
    let scope = if !plan.only.is_empty() {
        let list: Vec<String> = plan.only.iter().map(usize::to_string).collect();
        format!("仅课时 {}", list.join(","))
    } else if plan.start == 0 {
        match current {
            Some(n) => format!("仅当前课时（第 {n} 个）"),
            None => "仅当前课时（页面未选中任何课时）".to_string(),
        }
    } else {
        match plan.count {
            Some(n) => format!("从第 {} 个开始，最多 {} 个", plan.start, n),
            None => format!("从第 {} 个开始到结束", plan.start),
        }
    };
    format!("{scope}，类型 {}", plan.kind_filter)
}

fn print_summary(result: &WalkResult) {
    println!();
    if result.canceled {
        println!("已取消：处理了 {} 个课时", result.processed.len());
    }
    println!(
        "完成：成功 {}，失败 {}，跳过 {}，共保存 {} 个文件",
        result.success,
        result.failed,
        result.skipped,
        result.saved.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::models::KindFilter;

    #[test]
    fn describes_each_plan_shape() {
        let only = WalkPlan {
            only: vec![3, 5],
            ..WalkPlan::default()
        };
        assert_eq!(describe_plan(&only, None), "仅课时 3,5，类型 all");

        let current = WalkPlan {
            start: 0,
            kind_filter: KindFilter::Capture,
            ..WalkPlan::default()
        };
        assert_eq!(describe_plan(&current, Some(4)), "仅当前课时（第 4 个），类型 capture");

        let window = WalkPlan {
            start: 5,
            count: Some(3),
            ..WalkPlan::default()
        };
        assert_eq!(describe_plan(&window, None), "从第 5 个开始，最多 3 个，类型 all");
    }

    #[test]
    fn destination_is_the_course_folder() {
        let mut cfg = Config::default();
        let request = DownloadRequest {
            output: Some(PathBuf::from("/tmp/out")),
            ..DownloadRequest::default()
        };
        assert_eq!(
            destination(&cfg, "Rust Basics", &request),
            PathBuf::from("/tmp/out/Rust Basics")
        );
        cfg.folder_per_course = false;
        assert_eq!(destination(&cfg, "Rust Basics", &request), PathBuf::from("/tmp/out"));
    }
}
