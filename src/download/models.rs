//! 专辑 / 音频的数据模型。

use std::fmt;

/// 从链接解析出的专辑身份。`album_id` 解析失败时为 0。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumIdentity {
    pub category: String,
    pub album_id: u64,
    pub track_id: Option<u64>,
}

/// 从专辑页面 HTML 推断出的信息，并非接口给出的权威数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMetadata {
    pub title: String,
    pub audio_count: u32,
    pub page_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioItem {
    pub track_id: u64,
    pub url: String,
    pub title: String,
}

impl AudioItem {
    /// 列表接口对付费音频不返回播放地址，需要走 VIP 鉴权。
    pub fn requires_entitlement(&self) -> bool {
        self.url.trim().is_empty()
    }
}

impl fmt::Display for AudioItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requires_entitlement() {
            write!(f, "[{}] {} (VIP)", self.track_id, self.title)
        } else {
            write!(f, "[{}] {} {}", self.track_id, self.title, self.url)
        }
    }
}
