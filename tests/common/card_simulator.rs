//! Minimal FlashAir card simulator serving a temporary directory over HTTP.
//!
//! Implements `GET /command.cgi?op=100&DIR=...` and plain file downloads.
//! Every entry reports the same FAT timestamp so listings are reproducible.
//! Individual card paths can be made to answer with HTTP 500 or with a
//! malformed listing.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::{DateTime, TimeZone, Utc};
use flashsync::source::{FILE_LIST_HEADER, decode_fat_timestamp, encode_fat_timestamp};
use serde::Deserialize;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Card directory mirrored by the behavioural tests.
pub const CARD_ROOT: &str = "/CSVFILES/LOG";

#[derive(Clone, Default)]
struct Faults {
    failing: Arc<Mutex<BTreeSet<String>>>,
    garbled: Arc<Mutex<BTreeSet<String>>>,
}

impl Faults {
    fn is_failing(&self, card_path: &str) -> bool {
        self.failing
            .lock()
            .expect("faults lock")
            .contains(card_path)
    }

    fn is_garbled(&self, card_path: &str) -> bool {
        self.garbled
            .lock()
            .expect("faults lock")
            .contains(card_path)
    }
}

#[derive(Clone)]
struct CardState {
    root: PathBuf,
    stamp: (u16, u16),
    faults: Faults,
}

#[derive(Deserialize)]
struct ListQuery {
    op: String,
    #[serde(rename = "DIR")]
    dir: String,
}

/// A running simulator; the server task stops with the test runtime.
pub struct CardSimulator {
    addr: SocketAddr,
    card: TempDir,
    stamp: (u16, u16),
    faults: Faults,
}

impl CardSimulator {
    /// Starts a simulator whose files all report `modified` (rounded to FAT
    /// resolution).
    pub async fn start(modified: DateTime<Utc>) -> Self {
        let card = TempDir::new().expect("create card dir");
        let stamp = encode_fat_timestamp(modified);
        let faults = Faults::default();
        let state = CardState {
            root: card.path().to_path_buf(),
            stamp,
            faults: faults.clone(),
        };
        let app = Router::new()
            .route("/command.cgi", get(list))
            .fallback(get(download))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind simulator");
        let addr = listener.local_addr().expect("simulator address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve simulator");
        });
        let simulator = Self {
            addr,
            card,
            stamp,
            faults,
        };
        simulator.mkdir("");
        simulator
    }

    /// Starts a simulator with [`default_time`] as the card timestamp.
    pub async fn start_default() -> Self {
        Self::start(default_time()).await
    }

    /// Base URL such as `http://127.0.0.1:49152/`.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Port the simulator listens on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Timestamp every entry reports, as seen by the client.
    pub fn modified(&self) -> DateTime<Utc> {
        decode_fat_timestamp(self.stamp.0, self.stamp.1)
    }

    fn host_path(&self, relative: &str) -> PathBuf {
        let mut path = self.card.path().join(CARD_ROOT.trim_start_matches('/'));
        if !relative.is_empty() {
            path.push(relative);
        }
        path
    }

    /// Creates a directory below the card root.
    pub fn mkdir(&self, relative: &str) {
        std::fs::create_dir_all(self.host_path(relative)).expect("create card directory");
    }

    /// Writes a file below the card root.
    pub fn write(&self, relative: &str, content: &[u8]) {
        std::fs::write(self.host_path(relative), content).expect("write card file");
    }

    /// Deletes a file below the card root.
    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.host_path(relative)).expect("remove card file");
    }

    /// Makes requests for `card_path` answer HTTP 500.
    pub fn fail(&self, card_path: &str) {
        self.faults
            .failing
            .lock()
            .expect("faults lock")
            .insert(card_path.to_owned());
    }

    /// Makes listings of `card_path` return a body without the header.
    pub fn garble(&self, card_path: &str) {
        self.faults
            .garbled
            .lock()
            .expect("faults lock")
            .insert(card_path.to_owned());
    }

    /// Clears all injected faults.
    pub fn heal(&self) {
        self.faults.failing.lock().expect("faults lock").clear();
        self.faults.garbled.lock().expect("faults lock").clear();
    }
}

/// Timestamp used by [`CardSimulator::start_default`].
pub fn default_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 6, 42, 18)
        .single()
        .expect("valid timestamp")
}

async fn list(State(state): State<CardState>, Query(query): Query<ListQuery>) -> Response {
    let trimmed = query.dir.trim_end_matches('/');
    let dir = if trimmed.is_empty() { "/" } else { trimmed };
    if query.op != "100" {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if state.faults.is_failing(dir) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if state.faults.is_garbled(dir) {
        return "<html>busy</html>".into_response();
    }

    let Ok(entries) = std::fs::read_dir(state.root.join(dir.trim_start_matches('/'))) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut body = format!("{FILE_LIST_HEADER}\r\n");
    let (date, time) = state.stamp;
    for item in entries {
        let entry = item.expect("read card entry");
        let metadata = entry.metadata().expect("card entry metadata");
        let name = entry.file_name().into_string().expect("utf8 card name");
        let (size, attribute) = if metadata.is_dir() {
            (0, 0x10)
        } else {
            (metadata.len(), 0x20)
        };
        write!(body, "{dir},{name},{size},{attribute},{date},{time}\r\n").expect("format entry");
    }
    body.into_response()
}

async fn download(State(state): State<CardState>, uri: Uri) -> Response {
    let card_path = percent_decode(uri.path());
    if state.faults.is_failing(&card_path) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let host_path = state.root.join(card_path.trim_start_matches('/'));
    if !host_path.is_file() {
        return StatusCode::NOT_FOUND.into_response();
    }
    match std::fs::read(&host_path) {
        Ok(content) => content.into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn percent_decode(raw: &str) -> String {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut bytes = raw.bytes();
    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let hex = [bytes.next(), bytes.next()]
                .map(|digit| char::from(digit.expect("complete escape")));
            let text = String::from_iter(hex);
            decoded.push(u8::from_str_radix(&text, 16).expect("hex escape"));
        } else {
            decoded.push(byte);
        }
    }
    String::from_utf8(decoded).expect("utf8 path")
}
