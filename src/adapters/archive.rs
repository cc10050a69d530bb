//! Content-addressed archive adapters.
//!
//! | Adapter        | Stores to                                     |
//! |----------------|-----------------------------------------------|
//! | `HttpArchive`  | upload gateway, `POST {indexer}{upload_path}`  |
//! | `LocalArchive` | `<dir>/<sha256>.json` (dry run)                |
//!
//! Both address content by the SHA-256 of the artifact bytes.  The HTTP
//! upload carries that digest in `X-Content-Sha256` and, when a signing key
//! is configured, an HMAC-SHA256 of the body in `X-Signature`.  The gateway
//! answers `{"root": "…"}` on success or `{"error": "…"}` otherwise.
//!
//! `HttpArchive` therefore needs an upload gateway that speaks this
//! protocol in front of the storage network.  A stock storage indexer does
//! not, which is why [`ArchiveMode::Local`] is the default.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::app::ports::{ArchiveError, ArchivePort};
use crate::app::records::ContentRef;
use crate::config::{ArchiveConfig, ArchiveMode};

use super::offload::run_blocking;
use super::utils::join_url;

const CONTENT_HASH_HEADER: &str = "X-Content-Sha256";
const SIGNATURE_HEADER: &str = "X-Signature";

/// Hex SHA-256 of `bytes`, the content address used by both backends.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(hmac_sha256::Hash::hash(bytes))
}

/// Hex HMAC-SHA256 of `body` under `key`.
pub fn sign_body(body: &[u8], key: &[u8]) -> String {
    hex::encode(hmac_sha256::HMAC::mac(body, key))
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    std::fs::read(path).map_err(|e| ArchiveError::Artifact(format!("read {}: {e}", path.display())))
}

// ───────────────────────────────────────────────────────────────
// HTTP indexer
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UploadResponse {
    root: Option<String>,
    error: Option<String>,
}

struct Uploader {
    http: Client,
    url: String,
    signing_key: Option<Vec<u8>>,
}

impl Uploader {
    fn upload(&self, body: Vec<u8>) -> Result<ContentRef, ArchiveError> {
        let digest = content_digest(&body);
        let mut req = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(CONTENT_HASH_HEADER, digest.as_str());
        if let Some(key) = &self.signing_key {
            req = req.header(SIGNATURE_HEADER, sign_body(&body, key));
        }

        let resp = req
            .body(body)
            .send()
            .map_err(|e| ArchiveError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .map_err(|e| ArchiveError::Transport(e.to_string()))?;
        interpret_upload_response(status, &text)
    }
}

/// Map an indexer reply to a content reference.
fn interpret_upload_response(status: u16, text: &str) -> Result<ContentRef, ArchiveError> {
    let parsed: Option<UploadResponse> = serde_json::from_str(text).ok();
    if !(200..300).contains(&status) {
        let message = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(ArchiveError::Rejected { status, message });
    }
    match parsed {
        Some(UploadResponse { root: Some(root), .. }) if !root.is_empty() => Ok(ContentRef(root)),
        Some(UploadResponse { error: Some(message), .. }) => Err(ArchiveError::Rejected { status, message }),
        _ => Err(ArchiveError::BadResponse("upload reply has no root")),
    }
}

/// [`ArchivePort`] backed by an HTTP upload gateway.
pub struct HttpArchive {
    uploader: Arc<Uploader>,
}

impl HttpArchive {
    pub fn new(cfg: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(u64::from(cfg.request_timeout_secs)))
            .build()
            .map_err(|e| ArchiveError::Transport(e.to_string()))?;
        Ok(Self {
            uploader: Arc::new(Uploader {
                http,
                url: join_url(&cfg.indexer_url, &cfg.upload_path),
                signing_key: cfg.signing_key.as_ref().map(|k| k.as_bytes().to_vec()),
            }),
        })
    }
}

impl ArchivePort for HttpArchive {
    async fn upload(&self, artifact: &Path) -> Result<ContentRef, ArchiveError> {
        let path = artifact.to_path_buf();
        let uploader = Arc::clone(&self.uploader);
        debug!("ARCHIVE | uploading {}", path.display());
        run_blocking("archive-upload", move || {
            let body = read_artifact(&path)?;
            uploader.upload(body)
        })
        .await
        .map_err(|e| ArchiveError::Transport(e.to_string()))?
    }
}

// ───────────────────────────────────────────────────────────────
// Local directory (dry run)
// ───────────────────────────────────────────────────────────────

/// [`ArchivePort`] that copies artifacts into a directory, named by digest.
pub struct LocalArchive {
    dir: PathBuf,
}

impl LocalArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArchivePort for LocalArchive {
    async fn upload(&self, artifact: &Path) -> Result<ContentRef, ArchiveError> {
        let body = read_artifact(artifact)?;
        let digest = content_digest(&body);
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ArchiveError::Transport(format!("create {}: {e}", self.dir.display())))?;
        let dest = self.dir.join(format!("{digest}.json"));
        std::fs::write(&dest, &body)
            .map_err(|e| ArchiveError::Transport(format!("write {}: {e}", dest.display())))?;
        info!("ARCHIVE | stored locally at {}", dest.display());
        Ok(ContentRef(digest))
    }
}

// ───────────────────────────────────────────────────────────────
// Backend selection
// ───────────────────────────────────────────────────────────────

/// The archive chosen by [`ArchiveConfig::mode`].
pub enum ArchiveBackend {
    Http(HttpArchive),
    Local(LocalArchive),
}

impl ArchiveBackend {
    pub fn from_config(cfg: &ArchiveConfig) -> Result<Self, ArchiveError> {
        Ok(match cfg.mode {
            ArchiveMode::Http => Self::Http(HttpArchive::new(cfg)?),
            ArchiveMode::Local => Self::Local(LocalArchive::new(&cfg.local_dir)),
        })
    }
}

impl ArchivePort for ArchiveBackend {
    async fn upload(&self, artifact: &Path) -> Result<ContentRef, ArchiveError> {
        match self {
            Self::Http(a) => a.upload(artifact).await,
            Self::Local(a) => a.upload(artifact).await,
        }
    }
}
