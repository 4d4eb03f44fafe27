//! GraphQL documents. One batched query per entity kind.

const TIMELINE_SELECTION: &str = r#"
      timelineItems(first: 100, itemTypes: [ISSUE_COMMENT, CROSS_REFERENCED_EVENT, REFERENCED_EVENT]) {
        nodes {
          __typename
          ... on IssueComment {
            id
            databaseId
            body
            bodyHTML
            createdAt
            lastEditedAt
            author { login }
          }
          ... on CrossReferencedEvent {
            createdAt
            actor { login }
            source {
              __typename
              ... on Issue { number title url }
              ... on PullRequest { number title url }
            }
          }
          ... on ReferencedEvent {
            createdAt
            actor { login }
            commit { oid messageHeadline }
          }
        }
      }"#;

const REVIEWS_SELECTION: &str = r#"
      reviews(first: 100) {
        nodes {
          id
          databaseId
          body
          bodyHTML
          state
          submittedAt
          createdAt
          lastEditedAt
          author { login }
          comments(first: 100) {
            nodes {
              id
              databaseId
              body
              bodyHTML
              path
              diffHunk
              position
              line
              createdAt
              lastEditedAt
              author { login }
              replyTo { databaseId }
            }
          }
        }
      }"#;

pub fn issue_query() -> String {
    format!(
        r#"query($owner: String!, $repo: String!, $number: Int!) {{
  repository(owner: $owner, name: $repo) {{
    issue(number: $number) {{
      number
      title
      body
      bodyHTML
      state
      createdAt
      updatedAt
      lastEditedAt
      author {{ login }}
{TIMELINE_SELECTION}
    }}
  }}
}}"#
    )
}

pub fn pull_request_query() -> String {
    format!(
        r#"query($owner: String!, $repo: String!, $number: Int!) {{
  repository(owner: $owner, name: $repo) {{
    pullRequest(number: $number) {{
      number
      title
      body
      bodyHTML
      state
      createdAt
      updatedAt
      lastEditedAt
      author {{ login }}
      headRefName
      baseRefName
      headRefOid
      additions
      deletions
      commits(first: 100) {{
        nodes {{
          commit {{
            oid
            messageHeadline
            committedDate
            author {{ name }}
          }}
        }}
      }}
      files(first: 100) {{
        nodes {{ path additions deletions changeType }}
      }}
{TIMELINE_SELECTION}
{REVIEWS_SELECTION}
    }}
  }}
}}"#
    )
}

pub const VIEWER_QUERY: &str = "query { viewer { login } }";

pub const MERGEABLE_QUERY: &str = r#"query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $number) {
      mergeable
      headRefName
    }
  }
}"#;

#[cfg(test)]
mod tests {
    use super::{issue_query, pull_request_query};

    #[test]
    fn unit_issue_query_requests_timeline_but_not_reviews() {
        let query = issue_query();
        assert!(query.contains("issue(number: $number)"));
        assert!(query.contains("timelineItems"));
        assert!(!query.contains("reviews(first"));
    }

    #[test]
    fn unit_pull_request_query_batches_every_collection() {
        let query = pull_request_query();
        for selection in ["commits(first", "files(first", "timelineItems", "reviews(first", "replyTo"] {
            assert!(query.contains(selection), "{selection}");
        }
    }
}
