//! Localizes GitHub-hosted attachments referenced from issue and PR text.
//!
//! Image assets only download through the signed
//! `private-user-images.githubusercontent.com` URLs that appear in rendered
//! HTML, while the markdown body carries the canonical
//! `github.com/user-attachments/assets/<id>` form. Canonical and signed URLs
//! are paired by order of appearance. File links and legacy
//! `user-images.githubusercontent.com` images are fetched as written.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use warden_core::write_bytes_atomic;

use crate::transport_helpers::redact_url_query;

pub const DEFAULT_ATTACHMENT_MAX_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_ATTACHMENT_TIMEOUT_MS: u64 = 30_000;

const ATTACHMENT_DIGEST_PREFIX_LEN: usize = 12;

const ATTACHMENT_DENIED_CONTENT_TYPES: &[&str] = &[
    "application/x-msdownload",
    "application/x-dosexec",
    "application/vnd.microsoft.portable-executable",
    "application/x-executable",
    "application/x-bat",
    "application/x-msdos-program",
    "application/x-sh",
];

#[derive(Debug, Error)]
/// Failure of a single attachment. Never aborts the pipeline.
pub enum AttachmentError {
    #[error("failed to build attachment client: {0}")]
    Client(String),
    #[error("attachment {url} fetch failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("attachment {url} fetch failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("attachment {url} rejected: {reason}")]
    Rejected { url: String, reason: String },
    #[error("failed to store attachment {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
    #[error("no download url paired with {url}")]
    Unpaired { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    File,
    LegacyImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `AttachmentReference` used across Warden components.
pub struct AttachmentReference {
    pub kind: AttachmentKind,
    /// URL as written in the markdown body; replaced in-text once stored.
    pub canonical_url: String,
    /// URL to download from. `None` when no signed URL could be paired.
    pub fetch_url: Option<String>,
}

fn authorized_url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"https://private-user-images\.githubusercontent\.com/[^\s"'<>)]+"#)
            .expect("valid regex")
    })
}

fn img_tag_asset_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["'](https://github\.com/user-attachments/assets/[A-Za-z0-9-]+)["']"#,
        )
        .expect("valid regex")
    })
}

fn markdown_image_asset_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"!\[[^\]]*\]\((https://github\.com/user-attachments/assets/[A-Za-z0-9-]+)\)")
            .expect("valid regex")
    })
}

fn markdown_file_link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\[[^\]]*\]\((https://github\.com/user-attachments/files/\d+/[^\s)]+)\)")
            .expect("valid regex")
    })
}

fn legacy_image_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"https://user-images\.githubusercontent\.com/[^\s"'<>)]+"#)
            .expect("valid regex")
    })
}

fn html_comment_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

/// Signed download URLs in document order, `&amp;` decoded.
pub fn extract_authorized_urls(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    authorized_url_regex()
        .find_iter(html)
        .map(|found| found.as_str().replace("&amp;", "&"))
        .filter(|url| seen.insert(redact_url_query(url).to_string()))
        .collect()
}

fn push_unique(urls: &mut Vec<String>, seen: &mut HashSet<String>, url: &str) {
    if seen.insert(url.to_string()) {
        urls.push(url.to_string());
    }
}

/// Canonical image asset URLs from `<img>` tags and markdown images,
/// ordered by position in `body`.
pub fn extract_canonical_image_urls(body: &str) -> Vec<String> {
    let mut positioned = img_tag_asset_regex()
        .captures_iter(body)
        .chain(markdown_image_asset_regex().captures_iter(body))
        .filter_map(|captures| captures.get(1))
        .map(|found| (found.start(), found.as_str()))
        .collect::<Vec<_>>();
    positioned.sort_by_key(|(start, _)| *start);
    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    for (_, url) in positioned {
        push_unique(&mut urls, &mut seen, url);
    }
    urls
}

/// Attachment references in the visible part of `body`. HTML comments are
/// removed first: GitHub never renders them, so their URLs have no signed
/// counterpart and would shift positional pairing.
pub fn collect_attachment_references(html: &str, body: &str) -> Vec<AttachmentReference> {
    let visible = html_comment_regex().replace_all(body, "");
    let body = visible.as_ref();
    let canonical_images = extract_canonical_image_urls(body);
    let authorized = extract_authorized_urls(html);
    if !canonical_images.is_empty() && canonical_images.len() != authorized.len() {
        warn!(
            canonical = canonical_images.len(),
            authorized = authorized.len(),
            "attachment url counts differ; positional pairing may be incomplete"
        );
    }

    let mut references = canonical_images
        .into_iter()
        .enumerate()
        .map(|(index, canonical_url)| AttachmentReference {
            kind: AttachmentKind::Image,
            canonical_url,
            fetch_url: authorized.get(index).cloned(),
        })
        .collect::<Vec<_>>();

    let mut seen = HashSet::new();
    for captures in markdown_file_link_regex().captures_iter(body) {
        if let Some(found) = captures.get(1) {
            if seen.insert(found.as_str()) {
                references.push(AttachmentReference {
                    kind: AttachmentKind::File,
                    canonical_url: found.as_str().to_string(),
                    fetch_url: Some(found.as_str().to_string()),
                });
            }
        }
    }
    for found in legacy_image_regex().find_iter(body) {
        if seen.insert(found.as_str()) {
            references.push(AttachmentReference {
                kind: AttachmentKind::LegacyImage,
                canonical_url: found.as_str().to_string(),
                fetch_url: Some(found.as_str().to_string()),
            });
        }
    }
    references
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAttachment {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait AttachmentFetch: Send + Sync {
    async fn fetch_attachment(&self, url: &str) -> Result<FetchedAttachment, AttachmentError>;
}

pub fn is_denied_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return false;
    };
    let normalized = content_type.to_ascii_lowercase();
    let base = normalized
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or(normalized.as_str());
    ATTACHMENT_DENIED_CONTENT_TYPES.contains(&base)
}

/// Plain HTTP fetcher. Signed URLs carry their own token, so no
/// credentials are attached.
#[derive(Clone)]
pub struct HttpAttachmentFetcher {
    http: reqwest::Client,
    max_bytes: usize,
}

impl HttpAttachmentFetcher {
    pub fn new(request_timeout_ms: u64, max_bytes: usize) -> Result<Self, AttachmentError> {
        Self::with_headers(reqwest::header::HeaderMap::new(), request_timeout_ms, max_bytes)
    }

    pub(crate) fn with_headers(
        mut headers: reqwest::header::HeaderMap,
        request_timeout_ms: u64,
        max_bytes: usize,
    ) -> Result<Self, AttachmentError> {
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("warden-context-pipeline"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .map_err(|error| AttachmentError::Client(error.to_string()))?;
        Ok(Self {
            http,
            max_bytes: max_bytes.max(1),
        })
    }
}

#[async_trait]
impl AttachmentFetch for HttpAttachmentFetcher {
    async fn fetch_attachment(&self, url: &str) -> Result<FetchedAttachment, AttachmentError> {
        let display_url = redact_url_query(url).to_string();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| AttachmentError::Transport {
                url: display_url.clone(),
                source: source.without_url(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttachmentError::Status {
                url: display_url,
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        if is_denied_content_type(content_type.as_deref()) {
            return Err(AttachmentError::Rejected {
                url: display_url,
                reason: format!(
                    "content type {} is not allowed",
                    content_type.as_deref().unwrap_or("unknown")
                ),
            });
        }
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes as u64)
        {
            return Err(AttachmentError::Rejected {
                url: display_url,
                reason: format!("declared size exceeds {} bytes", self.max_bytes),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| AttachmentError::Transport {
                url: display_url.clone(),
                source: source.without_url(),
            })?;
        if bytes.len() > self.max_bytes {
            return Err(AttachmentError::Rejected {
                url: display_url,
                reason: format!("body exceeds {} bytes", self.max_bytes),
            });
        }
        Ok(FetchedAttachment {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

pub fn sanitize_for_path(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn extension_for_mime(content_type: Option<&str>) -> &'static str {
    let base = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match base.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/json" => "json",
        "text/plain" => "txt",
        "text/markdown" => "md",
        "text/csv" => "csv",
        _ => "bin",
    }
}

/// File name from the last URL segment, with a MIME-derived extension
/// when the segment has none. A short digest of the canonical URL prefixes
/// the name so distinct URLs sharing a tail never share a local path.
pub fn attachment_filename(canonical_url: &str, content_type: Option<&str>) -> String {
    let digest = sha256_hex(canonical_url.as_bytes());
    let prefix = &digest[..ATTACHMENT_DIGEST_PREFIX_LEN];
    let Some(tail) = redact_url_query(canonical_url)
        .rsplit('/')
        .next()
        .map(sanitize_for_path)
        .filter(|name| !name.trim_matches(['.', '_']).is_empty())
    else {
        return format!("{prefix}.{}", extension_for_mime(content_type));
    };
    let has_extension = tail
        .rsplit_once('.')
        .is_some_and(|(stem, extension)| !stem.is_empty() && !extension.is_empty());
    if has_extension {
        format!("{prefix}-{tail}")
    } else {
        format!("{prefix}-{tail}.{}", extension_for_mime(content_type))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[derive(Debug, Clone)]
/// Fixed local directory that receives downloaded attachments.
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(
        &self,
        filename: &str,
        attachment: &FetchedAttachment,
    ) -> Result<PathBuf, AttachmentError> {
        let path = self.dir.join(filename);
        write_bytes_atomic(&path, &attachment.bytes).map_err(|error| AttachmentError::Io {
            path: path.clone(),
            message: format!("{error:#}"),
        })?;
        info!(
            path = %path.display(),
            bytes = attachment.bytes.len(),
            sha256 = %sha256_hex(&attachment.bytes),
            "stored attachment"
        );
        Ok(path)
    }
}

/// Downloads referenced attachments and rewrites canonical URLs to local
/// paths. Each canonical URL is fetched at most once per resolver.
pub struct AttachmentResolver {
    fetcher: Arc<dyn AttachmentFetch>,
    store: AttachmentStore,
    resolved: Mutex<HashMap<String, PathBuf>>,
}

impl AttachmentResolver {
    pub fn new(fetcher: Arc<dyn AttachmentFetch>, store: AttachmentStore) -> Self {
        Self {
            fetcher,
            store,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    fn cached(&self, canonical_url: &str) -> Option<PathBuf> {
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(canonical_url)
            .cloned()
    }

    fn remember(&self, canonical_url: &str, path: &Path) {
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(canonical_url.to_string(), path.to_path_buf());
    }

    async fn localize(&self, reference: &AttachmentReference) -> Result<PathBuf, AttachmentError> {
        if let Some(path) = self.cached(&reference.canonical_url) {
            return Ok(path);
        }
        let fetch_url = reference
            .fetch_url
            .as_deref()
            .ok_or_else(|| AttachmentError::Unpaired {
                url: reference.canonical_url.clone(),
            })?;
        let attachment = self.fetcher.fetch_attachment(fetch_url).await?;
        let filename =
            attachment_filename(&reference.canonical_url, attachment.content_type.as_deref());
        let path = self.store.store(&filename, &attachment)?;
        self.remember(&reference.canonical_url, &path);
        Ok(path)
    }

    /// Returns `body` with every successfully stored attachment pointing at
    /// its local path. Failed references stay as written.
    pub async fn resolve(&self, html: &str, body: &str) -> String {
        let references = collect_attachment_references(html, body);
        let mut text = body.to_string();
        for reference in &references {
            match self.localize(reference).await {
                Ok(path) => {
                    text = text.replace(&reference.canonical_url, &path.display().to_string());
                }
                Err(error) => {
                    warn!(
                        url = %redact_url_query(&reference.canonical_url),
                        error = %error,
                        "attachment left unresolved"
                    );
                }
            }
        }
        text
    }
}
