//! 分页拉取专辑音频列表。

use serde::Deserialize;
use tracing::{debug, warn};

use super::transport::{Agent, HttpTransport};
use crate::download::error::DlError;
use crate::download::models::AudioItem;

pub const PAGE_SIZE: u32 = 100;

const TRACK_PAGE_API: &str =
    "https://m.ximalaya.com/m-revision/common/album/queryAlbumTrackRecordsByPage";

#[derive(Debug, Deserialize)]
struct TrackPageEnvelope {
    #[serde(default)]
    data: Option<TrackPageData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackPageData {
    #[serde(default)]
    track_detail_infos: Vec<TrackDetailInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackDetailInfo {
    track_info: TrackInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackInfo {
    id: u64,
    #[serde(default)]
    play_path: Option<String>,
    #[serde(default)]
    title: String,
}

impl From<TrackInfo> for AudioItem {
    fn from(info: TrackInfo) -> Self {
        Self {
            track_id: info.id,
            url: info.play_path.unwrap_or_default(),
            title: info.title,
        }
    }
}

/// 聚合结果。`failure` 不为空时 `items` 只是已成功拉到的前几页。
#[derive(Debug, Default)]
pub struct TrackListing {
    pub items: Vec<AudioItem>,
    pub failure: Option<DlError>,
}

impl TrackListing {
    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }
}

pub fn page_total(audio_count: u32) -> u32 {
    audio_count.div_ceil(PAGE_SIZE)
}

pub fn track_page_url(album_id: u64, page: u32, page_size: u32) -> String {
    format!("{TRACK_PAGE_API}?albumId={album_id}&page={page}&pageSize={page_size}&asc=true")
}

pub fn fetch_track_page(
    transport: &dyn HttpTransport,
    album_id: u64,
    page: u32,
) -> Result<Vec<AudioItem>, DlError> {
    let url = track_page_url(album_id, page, PAGE_SIZE);
    debug!("获取音频列表: {}", url);

    let fail = |reason: String| DlError::TrackListPartial { page, reason };
    let resp = transport
        .get(&url, Agent::Mobile, None)
        .map_err(|e| fail(e.to_string()))?;
    if !resp.is_ok() {
        return Err(fail(format!("status {}", resp.status())));
    }
    let envelope: TrackPageEnvelope = resp.json().map_err(|e| fail(e.to_string()))?;

    Ok(envelope
        .data
        .map(|d| d.track_detail_infos)
        .unwrap_or_default()
        .into_iter()
        .map(|info| AudioItem::from(info.track_info))
        .collect())
}

/// 按页顺序拉取全部音频；任一页失败即停止，返回已拉到的部分。
pub fn aggregate_tracks(
    transport: &dyn HttpTransport,
    album_id: u64,
    audio_count: u32,
) -> TrackListing {
    let mut listing = TrackListing::default();
    for page in 1..=page_total(audio_count) {
        match fetch_track_page(transport, album_id, page) {
            Ok(items) => listing.items.extend(items),
            Err(err) => {
                warn!(
                    "音频列表不完整（已获取 {} 条）: {}",
                    listing.items.len(),
                    err
                );
                listing.failure = Some(err);
                break;
            }
        }
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network_parser::transport::fake::{FakeTransport, Reply};

    fn page_json(first_id: u64, count: u64) -> String {
        let infos: Vec<String> = (first_id..first_id + count)
            .map(|id| {
                format!(
                    r#"{{"trackInfo":{{"id":{id},"playPath":"https://aod.xmcdn.com/{id}.m4a","title":"第{id}集"}}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"ret":0,"data":{{"trackDetailInfos":[{}]}}}}"#,
            infos.join(",")
        )
    }

    #[test]
    fn page_math() {
        assert_eq!(page_total(0), 0);
        assert_eq!(page_total(100), 1);
        assert_eq!(page_total(101), 2);
        assert_eq!(page_total(250), 3);
    }

    #[test]
    fn aggregates_pages_in_order() {
        let t = FakeTransport::new()
            .on("page=1&", Reply::ok(page_json(1, 100)))
            .on("page=2&", Reply::ok(page_json(101, 100)))
            .on("page=3&", Reply::ok(page_json(201, 50)));

        let listing = aggregate_tracks(&t, 39725061, 250);
        assert!(!listing.is_partial());
        assert_eq!(listing.items.len(), 250);
        assert_eq!(listing.items[0].track_id, 1);
        assert_eq!(listing.items[249].track_id, 250);
        assert_eq!(listing.items[100].url, "https://aod.xmcdn.com/101.m4a");

        let reqs = t.requests();
        assert_eq!(reqs.len(), 3);
        for (i, r) in reqs.iter().enumerate() {
            assert!(r.url.contains(&format!("albumId=39725061&page={}&", i + 1)));
            assert!(r.url.ends_with("&pageSize=100&asc=true"));
            assert_eq!(r.agent, Agent::Mobile);
        }
    }

    #[test]
    fn failed_page_truncates() {
        let t = FakeTransport::new()
            .on("page=1&", Reply::ok(page_json(1, 100)))
            .on("page=2&", Reply::Fail("connection reset".to_string()))
            .on("page=3&", Reply::ok(page_json(201, 50)));

        let listing = aggregate_tracks(&t, 7, 250);
        assert_eq!(listing.items.len(), 100);
        assert!(matches!(
            listing.failure,
            Some(DlError::TrackListPartial { page: 2, .. })
        ));
        assert_eq!(t.hits("page=3&"), 0);
    }

    #[test]
    fn vip_track_without_play_path() {
        let body = r#"{"data":{"trackDetailInfos":[{"trackInfo":{"id":9,"playPath":null,"title":"付费"}}]}}"#;
        let t = FakeTransport::new().on("page=1&", Reply::ok(body));

        let items = fetch_track_page(&t, 7, 1).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].requires_entitlement());
    }

    #[test]
    fn bad_json_is_a_page_failure() {
        let t = FakeTransport::new().on("page=1&", Reply::ok("<html>"));
        let listing = aggregate_tracks(&t, 7, 10);
        assert!(listing.items.is_empty());
        assert!(listing.is_partial());
    }
}
