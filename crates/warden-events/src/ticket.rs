//! External ticket-tracker payload carried by a `workflow_dispatch` run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketComment {
    pub author: String,
    pub body: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketAttachment {
    pub filename: String,
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    pub content_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Ticket fields consumed downstream. Comment and attachment order is the
/// order the tracker reported.
pub struct TicketPayload {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub comments: Vec<TicketComment>,
    pub attachments: Vec<TicketAttachment>,
}

impl TicketPayload {
    pub fn attachment_named(&self, filename: &str) -> Option<&TicketAttachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.filename == filename)
    }
}
