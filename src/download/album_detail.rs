//! 专辑下载流程编排：解析链接 → 获取专辑信息 → 拉取音频列表 → 下载（全部 / 单个）。

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::error::DlError;
use super::executor::{DownloadExecutor, destination_for};
use super::models::{AlbumIdentity, AlbumMetadata, AudioItem};
use super::progress;
use crate::base_system::album_id::{ResolvedUrl, resolve_album_url};
use crate::network_parser::album_page::fetch_album_metadata;
use crate::network_parser::track_list::aggregate_tracks;
use crate::network_parser::transport::HttpTransport;
use crate::network_parser::vip::VipResolver;

const DISPLAY_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumState {
    Created,
    Resolved,
    Displayed,
    Downloading,
    Done,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub files: Vec<PathBuf>,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct AlbumDetail {
    resolved: ResolvedUrl,
    metadata: Option<AlbumMetadata>,
    audio_list: Vec<AudioItem>,
    list_partial: bool,
    output: PathBuf,
    start: Option<usize>,
    state: AlbumState,
}

impl AlbumDetail {
    pub fn new(raw_url: &str, output: impl Into<PathBuf>) -> Result<Self, DlError> {
        Ok(Self {
            resolved: resolve_album_url(raw_url)?,
            metadata: None,
            audio_list: Vec::new(),
            list_partial: false,
            output: output.into(),
            start: None,
            state: AlbumState::Created,
        })
    }

    /// 批量下载的起始位置（从 1 开始）。单个音频下载时忽略。
    pub fn set_start(&mut self, start: usize) {
        self.start = Some(start.max(1));
    }

    pub fn identity(&self) -> &AlbumIdentity {
        &self.resolved.identity
    }

    pub fn metadata(&self) -> Option<&AlbumMetadata> {
        self.metadata.as_ref()
    }

    pub fn audio_list(&self) -> &[AudioItem] {
        &self.audio_list
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn state(&self) -> AlbumState {
        self.state
    }

    pub fn album_url(&self) -> String {
        self.resolved.album_page_url()
    }

    pub fn fetch(&mut self, transport: &dyn HttpTransport) -> Result<(), DlError> {
        let metadata = fetch_album_metadata(transport, &self.album_url())?;
        let listing = aggregate_tracks(transport, self.identity().album_id, metadata.audio_count);

        info!(
            "专辑《{}》共 {} 条音频，已获取 {} 条",
            metadata.title,
            metadata.audio_count,
            listing.items.len()
        );

        self.list_partial = listing.is_partial();
        self.audio_list = listing.items;
        self.metadata = Some(metadata);
        self.state = AlbumState::Resolved;
        Ok(())
    }

    pub fn summary(&self) -> Result<String, DlError> {
        let meta = self.metadata.as_ref().ok_or(DlError::NotFetched)?;
        let id = self.identity();

        let mut out = String::new();
        let _ = writeln!(out, "Album Info:");
        let _ = writeln!(out, "Id: {}", id.album_id);
        let _ = writeln!(out, "TrackId: {}", id.track_id.unwrap_or(0));
        let _ = writeln!(out, "Classify: {}", id.category);
        let _ = writeln!(out, "Title: {}", meta.title);
        let _ = writeln!(out, "Amount: {}", meta.audio_count);
        if self.list_partial {
            let _ = writeln!(out, "(audio list incomplete: {} fetched)", self.audio_list.len());
        }
        let _ = writeln!(out, "Audio List:");
        for audio in self.audio_list.iter().take(DISPLAY_LIMIT) {
            let _ = writeln!(out, "{audio}");
        }
        if self.audio_list.len() > DISPLAY_LIMIT {
            let _ = writeln!(out, "...");
            let _ = writeln!(
                out,
                "Another {} audios skip.",
                self.audio_list.len() - DISPLAY_LIMIT
            );
        }
        Ok(out)
    }

    pub fn display(&mut self) -> Result<(), DlError> {
        print!("{}", self.summary()?);
        self.state = AlbumState::Displayed;
        Ok(())
    }

    /// 链接带音频 ID 时只下载该音频，否则按列表顺序下载全部，遇到第一个失败即停止。
    pub fn download(
        &mut self,
        executor: &DownloadExecutor<'_>,
        vip: Option<&VipResolver<'_>>,
    ) -> Result<DownloadReport, DlError> {
        if self.state == AlbumState::Created {
            return Err(DlError::NotFetched);
        }
        self.state = AlbumState::Downloading;

        let result = match self.identity().track_id {
            Some(track_id) => self.download_track(track_id, executor, vip),
            None => self.download_all(executor, vip),
        };
        if result.is_ok() {
            self.state = AlbumState::Done;
        }
        result
    }

    fn download_track(
        &self,
        track_id: u64,
        executor: &DownloadExecutor<'_>,
        vip: Option<&VipResolver<'_>>,
    ) -> Result<DownloadReport, DlError> {
        if self.start.is_some() {
            warn!("下载单个音频时忽略 --start");
        }

        let target = self
            .audio_list
            .iter()
            .find(|a| a.track_id == track_id)
            .ok_or(DlError::TrackNotFound { track_id })?;

        let mut report = DownloadReport::default();
        self.download_item(target, executor, vip, &mut report)?;
        Ok(report)
    }

    fn download_all(
        &self,
        executor: &DownloadExecutor<'_>,
        vip: Option<&VipResolver<'_>>,
    ) -> Result<DownloadReport, DlError> {
        let skip = self.start.map(|s| s - 1).unwrap_or(0);
        if skip > 0 {
            info!("从第 {} 条开始下载", skip + 1);
        }
        let pending = &self.audio_list[skip.min(self.audio_list.len())..];

        let bar = progress::batch_bar(executor.show_progress(), pending.len());
        let mut report = DownloadReport::default();
        for audio in pending {
            self.download_item(audio, executor, vip, &mut report)
                .map_err(|source| DlError::BatchDownloadFailed {
                    title: audio.title.clone(),
                    source: Box::new(source),
                })?;
            bar.inc(1);
        }
        bar.finish_and_clear();

        info!("下载完成，共 {} 个文件", report.files.len());
        Ok(report)
    }

    fn download_item(
        &self,
        audio: &AudioItem,
        executor: &DownloadExecutor<'_>,
        vip: Option<&VipResolver<'_>>,
        report: &mut DownloadReport,
    ) -> Result<(), DlError> {
        let item = playable(audio, vip)?;
        let dest = destination_for(&self.output, &item);
        report.bytes += executor.download(&item.url, &dest)?;
        report.files.push(dest);
        Ok(())
    }
}

/// 列表中没有播放地址的音频通过 VIP 鉴权换取下载地址。
fn playable<'a>(
    audio: &'a AudioItem,
    vip: Option<&VipResolver<'_>>,
) -> Result<Cow<'a, AudioItem>, DlError> {
    if !audio.requires_entitlement() {
        return Ok(Cow::Borrowed(audio));
    }
    match vip {
        Some(resolver) => resolver.resolve(audio.track_id).map(Cow::Owned),
        None => Err(DlError::EntitlementDenied {
            track_id: audio.track_id,
            message: "access token required (set --cookie)".to_string(),
        }),
    }
}
