//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`       — 数据模型（AlbumIdentity / AlbumMetadata / AudioItem）
//! - `error`        — 流水线错误类型
//! - `progress`     — CLI 下载进度条
//! - `executor`     — 带重试的单文件下载
//! - `album_detail` — 专辑下载流程编排

pub mod album_detail;
pub mod error;
pub mod executor;
pub mod models;
pub(crate) mod progress;
