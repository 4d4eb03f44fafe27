//! Ticket-tracker attachment markup (`!name!` / `!name|opts!`).
//!
//! References are matched by exact filename against the attachment list
//! shipped with the ticket; there is no URL pairing here.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::warn;
use warden_events::TicketAttachment;

use crate::attachments::{
    sanitize_for_path, AttachmentError, AttachmentFetch, AttachmentStore, FetchedAttachment,
    HttpAttachmentFetcher,
};

fn wiki_attachment_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"!([^!|\n]+)(?:\|[^!\n]*)?!").expect("valid regex"))
}

/// Filenames referenced through wiki attachment markup, in order.
pub fn referenced_ticket_files(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    for captures in wiki_attachment_regex().captures_iter(text) {
        if let Some(name) = captures.get(1).map(|found| found.as_str().to_string()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn render_local_reference(attachment: &TicketAttachment, path: &str) -> String {
    if attachment.mime_type.to_ascii_lowercase().starts_with("image/") {
        format!("![{}]({path})", attachment.filename)
    } else {
        format!("[{}]({path})", attachment.filename)
    }
}

/// Authenticated client for the tracker's attachment download endpoint.
pub struct TicketTrackerClient {
    inner: HttpAttachmentFetcher,
}

impl TicketTrackerClient {
    pub fn new(
        token: &str,
        request_timeout_ms: u64,
        max_bytes: usize,
    ) -> Result<Self, AttachmentError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth_value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| AttachmentError::Client("invalid ticket tracker token".into()))?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);
        Ok(Self {
            inner: HttpAttachmentFetcher::with_headers(headers, request_timeout_ms, max_bytes)?,
        })
    }
}

#[async_trait]
impl AttachmentFetch for TicketTrackerClient {
    async fn fetch_attachment(&self, url: &str) -> Result<FetchedAttachment, AttachmentError> {
        self.inner.fetch_attachment(url).await
    }
}

pub struct TicketAttachmentResolver {
    fetcher: Arc<dyn AttachmentFetch>,
    store: AttachmentStore,
}

impl TicketAttachmentResolver {
    pub fn new(fetcher: Arc<dyn AttachmentFetch>, store: AttachmentStore) -> Self {
        Self { fetcher, store }
    }

    async fn download(
        &self,
        attachment: &TicketAttachment,
        index: usize,
    ) -> Result<PathBuf, AttachmentError> {
        let fetched = self.fetcher.fetch_attachment(&attachment.content_url).await?;
        let mut filename = sanitize_for_path(&attachment.filename);
        if filename.trim_matches(['.', '_']).is_empty() {
            filename = format!("ticket-attachment-{index}.bin");
        }
        self.store.store(&filename, &fetched)
    }

    /// Rewrites wiki attachment markup in every text to local links. Each
    /// referenced attachment is downloaded once; unknown names and failed
    /// downloads keep their original markup.
    pub async fn resolve_all(
        &self,
        texts: &[&str],
        attachments: &[TicketAttachment],
    ) -> Vec<String> {
        let mut local_paths: HashMap<String, String> = HashMap::new();
        for text in texts {
            for name in referenced_ticket_files(text) {
                if local_paths.contains_key(&name) {
                    continue;
                }
                let Some((index, attachment)) = attachments
                    .iter()
                    .enumerate()
                    .find(|(_, attachment)| attachment.filename == name)
                else {
                    continue;
                };
                match self.download(attachment, index).await {
                    Ok(path) => {
                        local_paths.insert(name, path.display().to_string());
                    }
                    Err(error) => {
                        warn!(filename = %name, error = %error, "ticket attachment left unresolved");
                    }
                }
            }
        }

        texts
            .iter()
            .map(|text| {
                wiki_attachment_regex()
                    .replace_all(text, |captures: &Captures<'_>| {
                        let whole = captures
                            .get(0)
                            .map(|found| found.as_str())
                            .unwrap_or_default();
                        let Some(name) = captures.get(1).map(|found| found.as_str()) else {
                            return whole.to_string();
                        };
                        match (
                            local_paths.get(name),
                            attachments.iter().find(|attachment| attachment.filename == name),
                        ) {
                            (Some(path), Some(attachment)) => {
                                render_local_reference(attachment, path)
                            }
                            _ => whole.to_string(),
                        }
                    })
                    .into_owned()
            })
            .collect()
    }
}
