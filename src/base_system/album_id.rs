//! 专辑 / 音频链接解析。
//!
//! `https://www.ximalaya.com/{category}/{album_id}[/{track_id}]`

use tracing::warn;
use url::Url;

use crate::download::error::DlError;
use crate::download::models::AlbumIdentity;

/// 解析后的链接：身份信息 + 原始链接的 scheme/host（用于拼专辑页地址）。
#[derive(Debug, Clone)]
pub struct ResolvedUrl {
    pub identity: AlbumIdentity,
    origin: Url,
}

impl ResolvedUrl {
    pub fn album_page_url(&self) -> String {
        let host = self.origin.host_str().unwrap_or_default();
        let host = match self.origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        format!(
            "{}://{}/{}/{}",
            self.origin.scheme(),
            host,
            self.identity.category,
            self.identity.album_id
        )
    }
}

pub fn resolve_album_url(raw: &str) -> Result<ResolvedUrl, DlError> {
    let trimmed = raw.trim();
    let origin = Url::parse(trimmed).map_err(|e| DlError::MalformedUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let segments: Vec<&str> = origin
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return Err(DlError::MalformedUrl {
            url: trimmed.to_string(),
            reason: format!("expected /category/album_id, got {} segment(s)", segments.len()),
        });
    }

    let category = segments[0].to_string();
    let album_id = tolerant_id(segments[1]);
    if album_id == 0 {
        warn!("专辑ID '{}' 不是数字，按 0 处理", segments[1]);
    }
    let track_id = segments
        .get(2)
        .map(|s| tolerant_id(s))
        .filter(|id| *id != 0);

    Ok(ResolvedUrl {
        identity: AlbumIdentity {
            category,
            album_id,
            track_id,
        },
        origin,
    })
}

// 上游链接形态不一，解析失败降级为 0 而不是报错。
fn tolerant_id(segment: &str) -> u64 {
    segment.trim().parse::<u64>().unwrap_or(0)
}
