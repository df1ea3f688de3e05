//! 下载流水线的错误类型。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::network_parser::cipher::CipherError;

#[derive(Debug, Error)]
pub enum DlError {
    #[error("malformed url '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("fetch album info from {url} failed: {reason}")]
    MetadataFetchFailed { url: String, reason: String },

    #[error("track list page {page} failed: {reason}")]
    TrackListPartial { page: u32, reason: String },

    #[error("entitlement denied for track {track_id}: {message}")]
    EntitlementDenied { track_id: u64, message: String },

    #[error("decode entitlement for track {track_id} failed: {source}")]
    EntitlementDecode {
        track_id: u64,
        #[source]
        source: CipherError,
    },

    #[error("track {track_id} not found in album")]
    TrackNotFound { track_id: u64 },

    #[error("download {url} failed after {attempts} attempts: {last_error}")]
    DownloadExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{action} {path} failed: {source}")]
    FileSystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download list stopped at '{title}': {source}")]
    BatchDownloadFailed {
        title: String,
        #[source]
        source: Box<DlError>,
    },

    #[error("album info not fetched yet, call fetch first")]
    NotFetched,
}

impl DlError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileSystem {
            action,
            path: path.into(),
            source,
        }
    }
}
