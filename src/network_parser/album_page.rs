//! 专辑网页解析：标题、音频数量、页数。

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::transport::{Agent, HttpTransport};
use crate::download::error::DlError;
use crate::download::models::AlbumMetadata;

fn re_digits() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\d+").expect("compile RE_DIGITS"))
}

fn selector(css: &'static str) -> Selector {
    // 常量选择器，解析失败属于编码错误。
    Selector::parse(css).expect("static css selector")
}

/// 请求专辑页并解析。非 200 或网络错误直接失败，本层不重试。
pub fn fetch_album_metadata(
    transport: &dyn HttpTransport,
    url: &str,
) -> Result<AlbumMetadata, DlError> {
    let fail = |reason: String| DlError::MetadataFetchFailed {
        url: url.to_string(),
        reason,
    };

    let resp = transport
        .get(url, Agent::Desktop, None)
        .map_err(|e| fail(e.to_string()))?;
    if !resp.is_ok() {
        return Err(fail(format!("status {}", resp.status())));
    }
    let html = resp.text().map_err(|e| fail(e.to_string()))?;

    let meta = parse_album_page(&html);
    debug!(
        "专辑信息: title={} audio_count={} page_count={}",
        meta.title, meta.audio_count, meta.page_count
    );
    Ok(meta)
}

pub fn parse_album_page(html: &str) -> AlbumMetadata {
    let doc = Html::parse_document(html);

    let title: String = doc
        .select(&selector("h1.title"))
        .flat_map(|e| e.text())
        .collect();

    let head_text: String = doc
        .select(&selector("div.head"))
        .flat_map(|e| e.text())
        .collect();
    let audio_count = re_digits()
        .find(&head_text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0);

    let pager: Vec<String> = doc
        .select(&selector("ul.pagination-page"))
        .flat_map(|ul| ul.children().filter_map(ElementRef::wrap))
        .map(|child| child.text().collect::<String>())
        .collect();

    AlbumMetadata {
        title: title.trim().to_string(),
        audio_count,
        page_count: page_count_from_pager(&pager),
    }
}

/// 由分页控件子元素推断页数：
/// 无分页为 1 页；不超过 6 个子元素时最后一个是“下一页”按钮；
/// 超过 6 个时页码被截断，倒数第二个子元素是末页页码。
pub fn page_count_from_pager<S: AsRef<str>>(children: &[S]) -> u32 {
    let n = children.len();
    let count = match n {
        0 => 1,
        1..=6 => (n - 1) as u32,
        _ => children[n - 2].as_ref().trim().parse::<u32>().unwrap_or(1),
    };
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network_parser::transport::fake::{FakeTransport, Reply};

    fn pager_html(items: &[&str]) -> String {
        let lis: String = items
            .iter()
            .map(|t| format!("<li class=\"page-item\"><a>{t}</a></li>"))
            .collect();
        format!(
            r#"<html><body>
            <h1 class="title">郭德纲相声精选</h1>
            <div class="head"><span>专辑里的声音</span><span>(250)</span></div>
            <ul class="pagination-page">{lis}</ul>
            </body></html>"#
        )
    }

    #[test]
    fn parses_title_and_count() {
        let meta = parse_album_page(&pager_html(&["1", "2", "3", "下一页"]));
        assert_eq!(meta.title, "郭德纲相声精选");
        assert_eq!(meta.audio_count, 250);
        assert_eq!(meta.page_count, 3);
    }

    #[test]
    fn pager_heuristic() {
        let empty: [&str; 0] = [];
        assert_eq!(page_count_from_pager(&empty), 1);
        assert_eq!(page_count_from_pager(&["1", "2", "3", "下一页"]), 3);
        assert_eq!(
            page_count_from_pager(&["1", "2", "3", "4", "5", "...", "17", "42", "下一页"]),
            42
        );
    }

    #[test]
    fn long_pager_from_html() {
        let html = pager_html(&["1", "2", "3", "4", "5", "...", "17", "42", "下一页"]);
        assert_eq!(parse_album_page(&html).page_count, 42);
    }

    #[test]
    fn missing_blocks_fall_back() {
        let meta = parse_album_page("<html><body><p>nothing</p></body></html>");
        assert_eq!(meta.title, "");
        assert_eq!(meta.audio_count, 0);
        assert_eq!(meta.page_count, 1);
    }

    #[test]
    fn non_200_is_fatal() {
        let t = FakeTransport::new().on("/xiangsheng/1", Reply::Status(503, Vec::new()));
        let err = fetch_album_metadata(&t, "https://www.ximalaya.com/xiangsheng/1").unwrap_err();
        assert!(matches!(err, DlError::MetadataFetchFailed { .. }));
        assert_eq!(t.hits("/xiangsheng/1"), 1);
    }

    #[test]
    fn uses_desktop_agent() {
        let t = FakeTransport::new().on("/xiangsheng/1", Reply::ok(pager_html(&[])));
        let meta = fetch_album_metadata(&t, "https://www.ximalaya.com/xiangsheng/1").unwrap();
        assert_eq!(meta.page_count, 1);
        assert_eq!(t.requests()[0].agent, Agent::Desktop);
    }
}
