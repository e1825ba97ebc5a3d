//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`     — 数据模型（ItemRef / WalkPlan / WalkResult / ProgressSnapshot 等）
//! - `error`      — 单个课时的错误类型
//! - `plan`       — 根据起点、数量与白名单选出要处理的课时
//! - `naming`     — 标题清洗与文件名构造
//! - `processor`  — 单个课时的解析与保存
//! - `walker`     — 顺序遍历、就绪等待与冷却
//! - `progress`   — 进度上报与 CLI 进度条
//! - `downloader` — 下载主流程编排

pub mod downloader;
pub mod error;
pub mod models;
pub mod naming;
pub mod plan;
pub mod processor;
pub mod progress;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use downloader::{DownloadRequest, download, grab_page_videos};
