//! Course Harvest：按顺序遍历课程页面，逐个课时保存视频、附件与截图。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/节奏控制/路径等基础设施
//! - `course_page`：课程页面抽象与基于清单文件的实现
//! - `fetch`：直接下载与内容截取
//! - `download`：遍历计划、单课时处理、顺序遍历与流程编排
//! - `ui`：无交互命令行输出

use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::{Path, PathBuf};

mod base_system;
mod course_page;
mod download;
mod fetch;
mod ui;

use base_system::config::load_or_create_with_base;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use course_page::manifest::ManifestPage;
use download::DownloadRequest;
use download::models::{KindFilter, WalkPlan};
use download::plan::parse_ordinal_list;
use fetch::http::HttpFetcher;
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "course-harvest")]
#[command(about = "Walk a course page lesson by lesson and save every resource")]
struct Cli {
    /// 课程清单（本地 YAML/JSON 文件或 http(s) 地址）
    #[arg(long, required_unless_present = "version")]
    manifest: Option<String>,

    /// 起始课时（从 1 开始；0 表示只处理当前选中的课时）
    #[arg(long, default_value_t = 1)]
    start: usize,

    /// 最多处理的课时数
    #[arg(long)]
    count: Option<usize>,

    /// 只处理这些课时，例如 `3,5,7` 或 `10-12`；设置后忽略 start/count
    #[arg(long)]
    only: Option<String>,

    /// 资源类型过滤：all | video | capture
    #[arg(long = "type", default_value = "all")]
    kind: KindFilter,

    /// 只保存当前课时页面上的全部视频，不遍历课程
    #[arg(long, default_value_t = false)]
    all_videos: bool,

    /// 关闭内容截取（截图类课时将被跳过）
    #[arg(long, default_value_t = false)]
    no_capture: bool,

    /// 输出目录（默认使用配置中的 save_path）
    #[arg(long)]
    output: Option<PathBuf>,

    /// 数据目录路径（用于存放 config.yml 和 logs 等文件）
    #[arg(long)]
    data_dir: Option<String>,

    /// 配置文件路径（默认 数据目录/config.yml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("Course Harvest v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let log = init_logging(cli.debug, data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let mut config = load_or_create_with_base::<Config>(cli.config.as_deref(), data_dir)
        .map_err(|e| anyhow!(e.to_string()))?;
    if cli.no_capture {
        config.enable_capture = false;
    }

    let source = cli
        .manifest
        .as_deref()
        .ok_or_else(|| anyhow!("--manifest is required"))?;
    let http = HttpFetcher::new(&config)?;
    let mut page = ManifestPage::load(source, &http)?;

    let only = match cli.only.as_deref() {
        Some(raw) => parse_ordinal_list(raw).map_err(|e| anyhow!(e))?,
        None => Vec::new(),
    };
    if !only.is_empty() && (cli.start != 1 || cli.count.is_some()) {
        warn!(target: "startup", "已指定 --only，忽略 --start/--count");
    }
    let request = DownloadRequest {
        plan: WalkPlan {
            start: cli.start,
            count: cli.count,
            only,
            kind_filter: cli.kind,
        },
        output: cli.output,
    };

    if cli.all_videos {
        return ui::noui::run_page_videos(&config, &mut page, &request);
    }

    let result = ui::noui::run(&config, &mut page, &request, log.stop_flag())?;
    if result.canceled {
        log.safe_exit();
        std::process::exit(130);
    }
    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: true,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}
