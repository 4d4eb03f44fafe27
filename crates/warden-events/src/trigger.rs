//! Trigger detection.
//!
//! Rules are evaluated in a fixed order and the first match wins. Phrase
//! rules use the whole-token matcher from `warden-safety`.

use tracing::info;
use warden_safety::contains_whole_token;

use crate::execution_context::{EventPayload, ExecutionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    ForcedIntent,
    Assigned,
    Labeled,
    PhraseInEntity,
    PhraseInComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event actor is the login behind the acting token.
    SelfAuthored,
    NoTrigger,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfAuthored => "event was produced by the agent's own credential",
            Self::NoTrigger => "no trigger phrase, label, assignment or forced prompt found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    Run(RunReason),
    Skip(SkipReason),
}

impl RunDecision {
    pub fn should_run(&self) -> bool {
        matches!(self, Self::Run(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Extra action requested inside a comment or review body.
pub enum SecondaryIntent {
    ResolveConflicts,
    FixCi,
    CodeReview,
    MinorFix,
}

impl SecondaryIntent {
    pub const ALL: [SecondaryIntent; 4] = [
        Self::ResolveConflicts,
        Self::FixCi,
        Self::CodeReview,
        Self::MinorFix,
    ];

    pub fn phrase(&self) -> &'static str {
        match self {
            Self::ResolveConflicts => "/resolve-conflicts",
            Self::FixCi => "/fix-ci",
            Self::CodeReview => "/code-review",
            Self::MinorFix => "/minor-fix",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveConflicts => "resolve_conflicts",
            Self::FixCi => "fix_ci",
            Self::CodeReview => "code_review",
            Self::MinorFix => "minor_fix",
        }
    }
}

fn is_self_authored(context: &ExecutionContext) -> bool {
    context
        .token_login()
        .map(|login| login.trim_end_matches("[bot]"))
        .filter(|login| !login.is_empty())
        .is_some_and(|login| {
            context
                .actor()
                .trim_end_matches("[bot]")
                .eq_ignore_ascii_case(login)
        })
}

fn assignment_matches(context: &ExecutionContext) -> bool {
    let (action, assignee) = match context.payload() {
        EventPayload::Issues(event) => (event.action.as_str(), event.assignee.as_deref()),
        EventPayload::PullRequest(event) => (event.action.as_str(), event.assignee.as_deref()),
        _ => return false,
    };
    let expected = context.inputs().effective_assignee();
    action == "assigned"
        && !expected.is_empty()
        && assignee.is_some_and(|login| {
            login.trim_start_matches('@').eq_ignore_ascii_case(expected)
        })
}

fn label_matches(context: &ExecutionContext) -> bool {
    let (action, label) = match context.payload() {
        EventPayload::Issues(event) => (event.action.as_str(), event.label.as_deref()),
        EventPayload::PullRequest(event) => (event.action.as_str(), event.label.as_deref()),
        _ => return false,
    };
    let expected = context.inputs().trigger_label.as_str();
    action == "labeled" && !expected.is_empty() && label == Some(expected)
}

fn entity_creation_mentions_phrase(context: &ExecutionContext) -> bool {
    let phrase = context.inputs().trigger_phrase.trim();
    let (action, title, body) = match context.payload() {
        EventPayload::Issues(event) => (event.action.as_str(), &event.title, &event.body),
        EventPayload::PullRequest(event) => (event.action.as_str(), &event.title, &event.body),
        _ => return false,
    };
    action == "opened" && (contains_whole_token(phrase, body) || contains_whole_token(phrase, title))
}

fn comment_mentions_phrase(context: &ExecutionContext) -> bool {
    let action = match context.payload() {
        EventPayload::IssueComment(event) => event.action.as_str(),
        EventPayload::PullRequestReview(event) => event.action.as_str(),
        EventPayload::PullRequestReviewComment(event) => event.action.as_str(),
        _ => return false,
    };
    if action == "deleted" {
        return false;
    }
    let phrase = context.inputs().trigger_phrase.trim();
    context
        .comment_body()
        .is_some_and(|body| contains_whole_token(phrase, body))
}

/// Decides whether the agent runs for `context`.
pub fn evaluate_trigger(context: &ExecutionContext) -> RunDecision {
    let decision = if context.forced_intent() {
        RunDecision::Run(RunReason::ForcedIntent)
    } else if is_self_authored(context) {
        RunDecision::Skip(SkipReason::SelfAuthored)
    } else if assignment_matches(context) {
        RunDecision::Run(RunReason::Assigned)
    } else if label_matches(context) {
        RunDecision::Run(RunReason::Labeled)
    } else if entity_creation_mentions_phrase(context) {
        RunDecision::Run(RunReason::PhraseInEntity)
    } else if comment_mentions_phrase(context) {
        RunDecision::Run(RunReason::PhraseInComment)
    } else {
        RunDecision::Skip(SkipReason::NoTrigger)
    };
    info!(event = context.kind().as_str(), ?decision, "evaluated trigger");
    decision
}

pub fn should_run(context: &ExecutionContext) -> bool {
    evaluate_trigger(context).should_run()
}

/// Secondary intents found in the triggering comment or review body,
/// independent of the primary trigger.
pub fn detect_secondary_intents(context: &ExecutionContext) -> Vec<SecondaryIntent> {
    let Some(body) = context.comment_body() else {
        return Vec::new();
    };
    SecondaryIntent::ALL
        .into_iter()
        .filter(|intent| contains_whole_token(intent.phrase(), body))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{
        detect_secondary_intents, evaluate_trigger, should_run, RunDecision, RunReason,
        SecondaryIntent, SkipReason,
    };
    use crate::execution_context::{ExecutionContext, RunnerIdentity, UserInputs};

    fn context_with(
        event: &str,
        payload: Value,
        actor: &str,
        inputs: UserInputs,
    ) -> ExecutionContext {
        let identity = RunnerIdentity {
            actor: actor.to_string(),
            token_login: Some("junie-bot[bot]".to_string()),
            repository_slug: Some("owner/repo".to_string()),
        };
        ExecutionContext::resolve(event, &payload, identity, inputs).expect("context")
    }

    fn issues_payload(action: &str, title: &str, body: &str, extra: Value) -> Value {
        let mut payload = json!({
            "action": action,
            "issue": {
                "number": 3,
                "title": title,
                "body": body,
                "user": { "login": "alice" },
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z"
            }
        });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }
        payload
    }

    fn comment_payload(body: &str) -> Value {
        json!({
            "action": "created",
            "issue": {
                "number": 3,
                "title": "t",
                "user": { "login": "alice" },
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z"
            },
            "comment": {
                "id": 1,
                "body": body,
                "user": { "login": "carol" },
                "created_at": "2026-01-01T00:00:01Z",
                "updated_at": "2026-01-01T00:00:01Z"
            }
        })
    }

    #[test]
    fn unit_issue_body_with_whole_token_phrase_triggers() {
        let context = context_with(
            "issues",
            issues_payload("opened", "Bug", "@junie-agent, please help", json!({})),
            "alice",
            UserInputs::default(),
        );
        assert_eq!(
            evaluate_trigger(&context),
            RunDecision::Run(RunReason::PhraseInEntity)
        );
    }

    #[test]
    fn unit_issue_body_with_email_like_phrase_does_not_trigger() {
        let context = context_with(
            "issues",
            issues_payload("opened", "Bug", "email@junie-agent.io", json!({})),
            "alice",
            UserInputs::default(),
        );
        assert_eq!(
            evaluate_trigger(&context),
            RunDecision::Skip(SkipReason::NoTrigger)
        );
    }

    #[test]
    fn functional_phrase_in_title_only_counts_on_creation() {
        let opened = context_with(
            "issues",
            issues_payload("opened", "@junie-agent fix login", "", json!({})),
            "alice",
            UserInputs::default(),
        );
        assert!(should_run(&opened));
        let edited = context_with(
            "issues",
            issues_payload("edited", "@junie-agent fix login", "", json!({})),
            "alice",
            UserInputs::default(),
        );
        assert!(!should_run(&edited));
    }

    #[test]
    fn functional_assignment_compares_handle_without_at_prefix() {
        let inputs = UserInputs {
            trigger_assignee: Some("@junie-agent".to_string()),
            ..UserInputs::default()
        };
        let context = context_with(
            "issues",
            issues_payload(
                "assigned",
                "Bug",
                "",
                json!({ "assignee": { "login": "junie-agent" } }),
            ),
            "alice",
            inputs,
        );
        assert_eq!(evaluate_trigger(&context), RunDecision::Run(RunReason::Assigned));
    }

    #[test]
    fn functional_label_requires_exact_match() {
        let labeled = context_with(
            "issues",
            issues_payload("labeled", "Bug", "", json!({ "label": { "name": "junie" } })),
            "alice",
            UserInputs::default(),
        );
        assert_eq!(evaluate_trigger(&labeled), RunDecision::Run(RunReason::Labeled));
        let other = context_with(
            "issues",
            issues_payload("labeled", "Bug", "", json!({ "label": { "name": "Junie" } })),
            "alice",
            UserInputs::default(),
        );
        assert!(!should_run(&other));
    }

    #[test]
    fn functional_comment_phrase_triggers() {
        let context = context_with(
            "issue_comment",
            comment_payload("@junie-agent: please look"),
            "carol",
            UserInputs::default(),
        );
        assert_eq!(
            evaluate_trigger(&context),
            RunDecision::Run(RunReason::PhraseInComment)
        );
    }

    #[test]
    fn integration_forced_prompt_wins_over_everything() {
        let inputs = UserInputs {
            prompt: Some("Update the changelog".to_string()),
            ..UserInputs::default()
        };
        let context = context_with(
            "issue_comment",
            comment_payload("nothing relevant"),
            "junie-bot[bot]",
            inputs,
        );
        assert_eq!(
            evaluate_trigger(&context),
            RunDecision::Run(RunReason::ForcedIntent)
        );
    }

    #[test]
    fn integration_self_authored_comment_is_skipped() {
        let context = context_with(
            "issue_comment",
            comment_payload("@junie-agent again"),
            "junie-bot[bot]",
            UserInputs::default(),
        );
        assert_eq!(
            evaluate_trigger(&context),
            RunDecision::Skip(SkipReason::SelfAuthored)
        );
    }

    #[test]
    fn regression_secondary_intents_are_independent_of_primary_trigger() {
        let context = context_with(
            "issue_comment",
            comment_payload("please /fix-ci and then /minor-fix. not a/code-review"),
            "carol",
            UserInputs::default(),
        );
        assert!(!should_run(&context));
        assert_eq!(
            detect_secondary_intents(&context),
            vec![SecondaryIntent::FixCi, SecondaryIntent::MinorFix]
        );
    }

    #[test]
    fn regression_secondary_intents_ignore_issue_bodies() {
        let context = context_with(
            "issues",
            issues_payload("opened", "Bug", "/resolve-conflicts", json!({})),
            "alice",
            UserInputs::default(),
        );
        assert!(detect_secondary_intents(&context).is_empty());
    }
}
