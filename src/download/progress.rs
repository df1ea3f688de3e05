//! CLI 下载进度条。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// 单个文件的下载进度条；`visible` 为 false 时返回隐藏的进度条。
pub(crate) fn file_bar(visible: bool, total: Option<u64>, label: &str) -> ProgressBar {
    if !visible {
        return ProgressBar::with_draw_target(total, ProgressDrawTarget::hidden());
    }

    let bar = match total {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    let template = if total.is_some() {
        "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}"
    } else {
        "{spinner} {msg} {bytes} {bytes_per_sec}"
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.set_message(label.to_string());
    bar
}

/// 批量下载的总进度条。
pub(crate) fn batch_bar(visible: bool, total: usize) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("专辑进度 {pos}/{len} [{bar:30.green}]") {
        bar.set_style(style);
    }
    bar
}
