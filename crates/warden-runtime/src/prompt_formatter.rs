//! Renders the final instruction text.
//!
//! Sections always appear in this order and are skipped when their source
//! is empty: repository, summary, commits, timeline, reviews, changed
//! files, trigger. Every text reaching this module has already been
//! fenced, localized and sanitized; only the user prompt is sanitized here.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use warden_events::{ExecutionContext, SecondaryIntent, TicketPayload};
use warden_github::{FetchedEntity, Review, ReviewComment, TimelineItem};
use warden_safety::sanitize_content;

pub const MAX_COMMENT_CHARS: usize = 20_000;
pub const BODY_FENCED_NOTICE: &str =
    "(description omitted: it was edited after the run was triggered)";
pub const CODE_REVIEW_INSTRUCTION: &str = "Review the changes in this pull request. Point out \
bugs, risky behavior changes and missing tests, and suggest concrete fixes. Do not push commits.";

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Caps one comment body at [`MAX_COMMENT_CHARS`] characters.
pub fn cap_comment_body(body: &str) -> String {
    let total = body.chars().count();
    if total <= MAX_COMMENT_CHARS {
        return body.to_string();
    }
    let mut capped = body.chars().take(MAX_COMMENT_CHARS).collect::<String>();
    capped.push_str(&format!(
        "\n[truncated: {} more characters]",
        total - MAX_COMMENT_CHARS
    ));
    capped
}

fn push_indented(out: &mut String, text: &str, indent: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
    }
}

fn push_section(sections: &mut Vec<String>, title: &str, body: String) {
    let body = body.trim_end();
    if !body.is_empty() {
        sections.push(format!("### {title}\n{body}"));
    }
}

fn repository_section(context: &ExecutionContext) -> String {
    context.repository().slug()
}

fn summary_section(entity: &FetchedEntity) -> (String, String) {
    let title = format!(
        "{} #{}: {}",
        if entity.is_pull_request() {
            "Pull request"
        } else {
            "Issue"
        },
        entity.number,
        entity.title.trim()
    );
    let mut out = format!("State: {}\nAuthor: @{}\n", entity.state, entity.author);
    if let Some(details) = &entity.pull_request {
        out.push_str(&format!(
            "Branch: {} -> {}\nChanges: +{} -{}\n",
            details.head_branch, details.base_branch, details.additions, details.deletions
        ));
    }
    out.push('\n');
    if !entity.body_safe {
        out.push_str(BODY_FENCED_NOTICE);
    } else if entity.body.trim().is_empty() {
        out.push_str("(no description)");
    } else {
        out.push_str(entity.body.trim());
    }
    (title, out)
}

fn commits_section(entity: &FetchedEntity) -> String {
    let mut out = String::new();
    for commit in &entity.commits {
        let short = commit.oid.get(..7).unwrap_or(&commit.oid);
        out.push_str(&format!("- {short} {}", commit.headline.trim()));
        if let Some(author) = commit.author_name.as_deref() {
            out.push_str(&format!(" ({author})"));
        }
        out.push('\n');
    }
    out
}

fn timeline_section(entity: &FetchedEntity) -> String {
    let mut out = String::new();
    for item in &entity.timeline {
        match item {
            TimelineItem::Comment(comment) => {
                out.push_str(&format!(
                    "- @{} commented at {}:\n",
                    comment.author,
                    timestamp(comment.created_at)
                ));
                push_indented(&mut out, &cap_comment_body(&comment.body), "  ");
            }
            TimelineItem::CrossReference {
                actor,
                created_at,
                source,
            } => {
                let kind = if source.is_pull_request {
                    "pull request"
                } else {
                    "issue"
                };
                let number = source
                    .number
                    .map(|number| format!(" #{number}"))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "- @{actor} referenced this from {kind}{number} \"{}\" at {}\n",
                    source.title.trim(),
                    timestamp(*created_at)
                ));
            }
            TimelineItem::CommitReference {
                actor,
                created_at,
                oid,
                message_headline,
            } => {
                let short = oid.get(..7).unwrap_or(oid);
                out.push_str(&format!(
                    "- @{actor} referenced this in commit {short} \"{}\" at {}\n",
                    message_headline.trim(),
                    timestamp(*created_at)
                ));
            }
        }
    }
    out
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum ThreadKey {
    ReplyTo(u64),
    Location(String, Option<u64>),
}

#[derive(Debug)]
struct Thread<'a> {
    path: &'a str,
    position: Option<u64>,
    comments: Vec<&'a ReviewComment>,
}

/// Groups review comments into threads. A reply joins its parent's thread;
/// other comments group by reply target, else by file path and diff
/// position. Input order (chronological) is kept inside each thread.
fn group_threads(comments: &[ReviewComment]) -> Vec<Thread<'_>> {
    let mut threads: Vec<Thread<'_>> = Vec::new();
    let mut by_key: HashMap<ThreadKey, usize> = HashMap::new();
    let mut by_comment: HashMap<u64, usize> = HashMap::new();
    for comment in comments {
        let parent_thread = comment
            .reply_to
            .and_then(|parent| by_comment.get(&parent).copied());
        let key = match comment.reply_to {
            Some(parent) => ThreadKey::ReplyTo(parent),
            None => ThreadKey::Location(comment.path.clone(), comment.position),
        };
        let index = match parent_thread.or_else(|| by_key.get(&key).copied()) {
            Some(index) => index,
            None => {
                threads.push(Thread {
                    path: &comment.path,
                    position: comment.position,
                    comments: Vec::new(),
                });
                threads.len() - 1
            }
        };
        by_key.entry(key).or_insert(index);
        if let Some(id) = comment.database_id {
            by_comment.insert(id, index);
        }
        threads[index].comments.push(comment);
    }
    threads
}

fn review_section(reviews: &[Review]) -> String {
    let mut ordered = reviews.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|review| review.submission_time());
    let mut out = String::new();
    for review in ordered {
        if review.body.trim().is_empty() && review.comments.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "#### Review by @{} ({}) at {}\n",
            review.author,
            review.state,
            timestamp(review.submission_time())
        ));
        if !review.body.trim().is_empty() {
            push_indented(&mut out, &cap_comment_body(review.body.trim()), "");
        }
        for thread in group_threads(&review.comments) {
            let position = thread
                .position
                .map(|position| format!(" (diff position {position})"))
                .unwrap_or_default();
            out.push_str(&format!("- Thread on {}{position}:\n", thread.path));
            if let Some(hunk) = thread
                .comments
                .first()
                .map(|comment| comment.diff_hunk.trim())
                .filter(|hunk| !hunk.is_empty())
            {
                out.push_str("  ```diff\n");
                push_indented(&mut out, hunk, "  ");
                out.push_str("  ```\n");
            }
            for comment in thread.comments {
                out.push_str(&format!(
                    "  - @{} at {}:\n",
                    comment.author,
                    timestamp(comment.created_at)
                ));
                push_indented(&mut out, &cap_comment_body(&comment.body), "    ");
            }
        }
        out.push('\n');
    }
    out
}

fn files_section(entity: &FetchedEntity) -> String {
    let mut out = String::new();
    for file in &entity.files {
        out.push_str(&format!(
            "- {} ({}, +{} -{})\n",
            file.path,
            file.change_type.to_ascii_lowercase(),
            file.additions,
            file.deletions
        ));
    }
    out
}

fn trigger_section(context: &ExecutionContext) -> String {
    let mut out = format!("@{} via {}", context.actor(), context.kind().as_str());
    if let Some(trigger_time) = context.trigger_time() {
        out.push_str(&format!(" at {}", timestamp(trigger_time)));
    }
    out
}

fn intents_section(intents: &[SecondaryIntent]) -> String {
    intents
        .iter()
        .map(|intent| format!("- {} ({})\n", intent.phrase(), intent.as_str()))
        .collect()
}

fn instruction_section(instruction: Option<&str>) -> String {
    instruction
        .map(sanitize_content)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// Full prompt for an issue or pull request.
///
/// With a user prompt and context attachment disabled only the sanitized
/// prompt is returned.
pub fn format_entity_prompt(
    context: &ExecutionContext,
    entity: &FetchedEntity,
    instruction: Option<&str>,
    intents: &[SecondaryIntent],
) -> String {
    if let Some(prompt) = instruction {
        if !context.inputs().attach_github_context {
            return sanitize_content(prompt).trim().to_string();
        }
    }
    let mut sections = Vec::new();
    push_section(&mut sections, "Repository", repository_section(context));
    let (summary_title, summary) = summary_section(entity);
    push_section(&mut sections, &summary_title, summary);
    push_section(&mut sections, "Commits", commits_section(entity));
    push_section(&mut sections, "Timeline", timeline_section(entity));
    push_section(&mut sections, "Reviews", review_section(&entity.reviews));
    push_section(&mut sections, "Changed files", files_section(entity));
    push_section(&mut sections, "Triggered by", trigger_section(context));
    push_section(&mut sections, "Requested actions", intents_section(intents));
    push_section(&mut sections, "Instructions", instruction_section(instruction));
    sections.join("\n\n")
}

/// Prompt for a ticket-tracker dispatch. Texts are already localized and
/// sanitized; comments keep the tracker's order.
pub fn format_ticket_prompt(
    context: &ExecutionContext,
    ticket: &TicketPayload,
    instruction: Option<&str>,
) -> String {
    if let Some(prompt) = instruction {
        if !context.inputs().attach_github_context {
            return sanitize_content(prompt).trim().to_string();
        }
    }
    let mut sections = Vec::new();
    push_section(&mut sections, "Repository", repository_section(context));
    let description = if ticket.description.trim().is_empty() {
        "(no description)".to_string()
    } else {
        ticket.description.trim().to_string()
    };
    push_section(
        &mut sections,
        &format!("Ticket {}: {}", ticket.key.trim(), ticket.summary.trim()),
        description,
    );
    let mut comments = String::new();
    for comment in &ticket.comments {
        comments.push_str(&format!("- {} at {}:\n", comment.author, comment.created));
        push_indented(&mut comments, &cap_comment_body(&comment.body), "  ");
    }
    push_section(&mut sections, "Ticket comments", comments);
    push_section(&mut sections, "Triggered by", trigger_section(context));
    push_section(&mut sections, "Instructions", instruction_section(instruction));
    sections.join("\n\n")
}

/// Prompt for runs without an issue or pull request (push, schedule,
/// plain dispatch).
pub fn format_prompt_only(context: &ExecutionContext, prompt: &str) -> String {
    if !context.inputs().attach_github_context {
        return sanitize_content(prompt).trim().to_string();
    }
    let mut sections = Vec::new();
    push_section(&mut sections, "Repository", repository_section(context));
    push_section(&mut sections, "Triggered by", trigger_section(context));
    push_section(&mut sections, "Instructions", instruction_section(Some(prompt)));
    sections.join("\n\n")
}
