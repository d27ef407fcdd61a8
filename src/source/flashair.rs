//! HTTP client for FlashAir-style cards.

use std::time::Duration;

use bytes::Bytes;
use camino::Utf8Path;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use crate::config::FlashSyncConfig;
use crate::sync::{DirectoryListing, IoFuture, SyncError};

use super::listing::parse_file_list;
use super::{SourceFetcher, SourceLister, card_path, normalize_card_path};

const LIST_ENDPOINT: &str = "/command.cgi";
const LIST_OPERATION: &str = "100";

/// Lists and downloads files from the card over HTTP.
#[derive(Clone, Debug)]
pub struct FlashAirClient {
    http: Client,
    base_url: Url,
    root: String,
}

impl FlashAirClient {
    /// Builds a client for the card described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when the host and port do not form
    /// a valid URL, or [`SyncError::SourceUnreachable`] when the HTTP client
    /// cannot be initialised.
    pub fn new(config: &FlashSyncConfig) -> Result<Self, SyncError> {
        let base_url = format!("http://{}:{}/", config.sdcard_host.trim(), config.sdcard_port);
        Self::with_base_url(
            &base_url,
            &config.source_root,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Builds a client against an explicit base URL such as
    /// `http://127.0.0.1:8000/`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] for an unusable URL, or
    /// [`SyncError::SourceUnreachable`] when the HTTP client cannot be
    /// initialised.
    pub fn with_base_url(base_url: &str, root: &str, timeout: Duration) -> Result<Self, SyncError> {
        let parsed = Url::parse(base_url).map_err(|_| SyncError::InvalidConfig {
            field: String::from("sdcard_host"),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(SyncError::InvalidConfig {
                field: String::from("sdcard_host"),
            });
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| SyncError::SourceUnreachable {
                path: base_url.to_owned(),
                message: err.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: parsed,
            root: normalize_card_path(root),
        })
    }

    /// Card root that relative paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn listing_url(&self, card_dir: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(LIST_ENDPOINT);
        url.query_pairs_mut()
            .clear()
            .append_pair("op", LIST_OPERATION)
            .append_pair("DIR", card_dir);
        url
    }

    fn file_url(&self, card_file: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .clear()
                .extend(card_file.split('/').filter(|segment| !segment.is_empty()));
        }
        url
    }

    async fn get(&self, url: Url, card_path: &str) -> Result<Response, SyncError> {
        debug!(%url, "requesting card resource");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| unreachable(card_path, &err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::SourceNotFound {
                path: card_path.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(SyncError::SourceUnreachable {
                path: card_path.to_owned(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(response)
    }
}

impl SourceLister for FlashAirClient {
    fn list_directory<'a>(&'a self, dir: &'a Utf8Path) -> IoFuture<'a, DirectoryListing> {
        Box::pin(async move {
            let card_dir = card_path(&self.root, dir);
            let response = self.get(self.listing_url(&card_dir), &card_dir).await?;
            let body = response
                .text()
                .await
                .map_err(|err| unreachable(&card_dir, &err))?;
            let listing = parse_file_list(&body, &card_dir, dir).map_err(|message| {
                SyncError::SourceProtocolError {
                    path: card_dir.clone(),
                    message,
                }
            })?;
            debug!(dir = %card_dir, entries = listing.len(), "listed card directory");
            Ok(listing)
        })
    }
}

impl SourceFetcher for FlashAirClient {
    fn fetch_file<'a>(&'a self, path: &'a Utf8Path) -> IoFuture<'a, Bytes> {
        Box::pin(async move {
            let card_file = card_path(&self.root, path);
            let response = self.get(self.file_url(&card_file), &card_file).await?;
            response
                .bytes()
                .await
                .map_err(|err| unreachable(&card_file, &err))
        })
    }
}

fn unreachable(card_path: &str, err: &reqwest::Error) -> SyncError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    SyncError::SourceUnreachable {
        path: card_path.to_owned(),
        message,
    }
}
