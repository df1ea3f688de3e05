//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `ximalaya-dl.yml` 的字段元信息。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4170.0 Safari/537.36 Edg/85.0.552.1";
pub const MOBILE_USER_AGENT: &str = "ting_6.3.60(sdk,Android16)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 保存配置
    #[serde(default = "default_save_path")]
    pub save_path: String,

    // 网络配置
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub request_timeout: u64,
    #[serde(default = "default_desktop_user_agent")]
    pub desktop_user_agent: String,
    #[serde(default = "default_mobile_user_agent")]
    pub mobile_user_agent: String,

    // VIP 配置
    #[serde(default)]
    pub cookie: String,
    #[serde(default = "default_vip_cipher_key")]
    pub vip_cipher_key: String,

    // 界面
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            max_retries: default_max_retries(),
            retry_delay_ms: 0,
            request_timeout: 0,
            desktop_user_agent: default_desktop_user_agent(),
            mobile_user_agent: default_mobile_user_agent(),
            cookie: String::new(),
            vip_cipher_key: default_vip_cipher_key(),
            show_progress: default_true(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "ximalaya-dl.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 9] = [
            FieldMeta {
                name: "save_path",
                description: "下载保存目录",
            },
            FieldMeta {
                name: "max_retries",
                description: "单个音频最大下载尝试次数",
            },
            FieldMeta {
                name: "retry_delay_ms",
                description: "两次下载尝试之间的等待时间（毫秒），0 为立即重试",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒），0 为使用 HTTP 客户端默认值",
            },
            FieldMeta {
                name: "desktop_user_agent",
                description: "抓取网页与下载音频使用的浏览器 UA",
            },
            FieldMeta {
                name: "mobile_user_agent",
                description: "调用 JSON 接口使用的客户端 UA",
            },
            FieldMeta {
                name: "cookie",
                description: "登录后的 Cookie，下载 VIP 音频时需要\n也可通过 --cookie 或环境变量 XIMALAYA_COOKIE 提供",
            },
            FieldMeta {
                name: "vip_cipher_key",
                description: "VIP 下载参数的解密密钥",
            },
            FieldMeta {
                name: "show_progress",
                description: "是否显示下载进度条",
            },
        ];
        &FIELDS
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        let trimmed = self.save_path.trim();
        if trimmed.is_empty() {
            PathBuf::from(default_save_path())
        } else {
            PathBuf::from(trimmed)
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout))
    }

    pub fn access_token(&self) -> Option<&str> {
        let token = self.cookie.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// 把标题转换为安全的文件名，不允许出现路径分隔符。
pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let mut cleaned: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            ':' => '：',
            '"' => '＂',
            '<' => '《',
            '>' => '》',
            '/' | '\\' => '、',
            '|' => '｜',
            '?' => '？',
            '*' => '＊',
            c if (c as u32) < 32 => replacement.chars().next().unwrap_or('_'),
            _ => ch,
        })
        .collect();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    if cleaned.len() > max_len {
        // 避免在多字节 UTF-8 字符（如中文）中间截断导致 panic
        let mut end = max_len;
        while !cleaned.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        cleaned.truncate(end);
    }

    cleaned
}

fn default_true() -> bool {
    true
}

fn default_save_path() -> String {
    "./downloads".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_desktop_user_agent() -> String {
    DESKTOP_USER_AGENT.to_string()
}

fn default_mobile_user_agent() -> String {
    MOBILE_USER_AGENT.to_string()
}

fn default_vip_cipher_key() -> String {
    crate::network_parser::cipher::DEFAULT_PARAMS_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_replaces_separators() {
        assert_eq!(safe_fs_name("第1集/上", "_", 120), "第1集、上");
        assert_eq!(safe_fs_name("  ...  ", "_", 120), "unnamed");
        assert_eq!(safe_fs_name("Ep1", "_", 120), "Ep1");
    }

    #[test]
    fn safe_name_truncates_on_char_boundary() {
        let name = "相声".repeat(10);
        let out = safe_fs_name(&name, "_", 7);
        assert_eq!(out, "相声");
    }

    #[test]
    fn blank_cookie_is_no_token() {
        let mut cfg = Config::default();
        assert_eq!(cfg.access_token(), None);
        cfg.cookie = "  1&_token=abc ".to_string();
        assert_eq!(cfg.access_token(), Some("1&_token=abc"));
        assert_eq!(cfg.request_timeout(), None);
    }
}
