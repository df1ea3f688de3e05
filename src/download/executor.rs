//! 带有限重试的单文件下载。

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::error::DlError;
use super::models::AudioItem;
use super::progress;
use crate::base_system::context::{Config, safe_fs_name};
use crate::network_parser::transport::{Agent, HttpResponse, HttpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// 最大尝试次数（含第一次）。
    pub max_attempts: u32,
    /// 两次尝试之间的等待，默认不等待。
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl From<&Config> for RetryOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: config.retry_delay(),
        }
    }
}

pub struct DownloadExecutor<'a> {
    transport: &'a dyn HttpTransport,
    retry: RetryOptions,
    show_progress: bool,
}

impl<'a> DownloadExecutor<'a> {
    pub fn new(transport: &'a dyn HttpTransport, retry: RetryOptions) -> Self {
        Self {
            transport,
            retry,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// 下载 `url` 到 `dest`，返回写入的字节数。
    ///
    /// 重试用尽时不会创建任何目录或文件。
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, DlError> {
        let mut resp = self.fetch_with_retry(url)?;

        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| DlError::fs("create dir", parent, e))?;
        }

        let file = File::create(dest).map_err(|e| DlError::fs("create file", dest, e))?;
        let mut writer = BufWriter::new(file);

        let label = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bar = progress::file_bar(self.show_progress, resp.content_length(), &label);
        let written = io::copy(&mut bar.wrap_read(resp.body_mut()), &mut writer)
            .and_then(|n| writer.flush().map(|_| n))
            .map_err(|e| DlError::fs("write file", dest, e))?;
        bar.finish_and_clear();

        info!("已下载: {}", dest.display());
        Ok(written)
    }

    fn fetch_with_retry(&self, url: &str) -> Result<HttpResponse, DlError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.transport.get(url, Agent::Desktop, None) {
                Ok(resp) if resp.is_ok() => return Ok(resp),
                // 失败的响应在这里 drop，连接随之释放。
                Ok(resp) => last_error = format!("status {}", resp.status()),
                Err(err) => last_error = err.to_string(),
            }
            warn!(
                "下载失败(第{}/{}次) {}: {}",
                attempt, attempts, url, last_error
            );
            if attempt < attempts && !self.retry.delay.is_zero() {
                thread::sleep(self.retry.delay);
            }
        }

        Err(DlError::DownloadExhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

/// `{title}.{ext}`，扩展名取自地址路径最后一段的最后一个 `.` 之后。
pub fn file_name_for(item: &AudioItem) -> String {
    let title = safe_fs_name(&item.title, "_", 200);
    match extension_of(&item.url) {
        Some(ext) => format!("{title}.{ext}"),
        None => title,
    }
}

pub fn destination_for(output: &Path, item: &AudioItem) -> PathBuf {
    output.join(file_name_for(item))
}

fn extension_of(raw: &str) -> Option<String> {
    let path = url::Url::parse(raw)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| raw.split(['?', '#']).next().unwrap_or_default().to_string());
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_string())
}
