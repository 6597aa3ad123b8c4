use chrono::{DateTime, Utc};
use thiserror::Error;

// Domain data structures shared across modules.

#[derive(Clone, Debug)]
pub struct GitHubAccount {
    pub login: String,
    pub token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    PullRequest,
    Issue,
    Mention,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::PullRequest, ItemKind::Issue, ItemKind::Mention];

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::PullRequest => "Pull requests",
            ItemKind::Issue => "Issues",
            ItemKind::Mention => "Mentions",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    /// Anything other than `open` (closed, merged, unknown) counts as not open.
    pub fn from_wire(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("open") {
            ItemState::Open
        } else {
            ItemState::Closed
        }
    }
}

/// An item as handed over by a source, before classification.
///
/// Timestamps are already normalized to UTC; everything else that a source
/// may legitimately omit is optional here and checked downstream.
#[derive(Clone, Debug, PartialEq)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub repository: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<String>,
    pub draft: Option<bool>,
    pub state: Option<ItemState>,
    pub reason: Option<String>,
}

#[cfg(test)]
impl RawItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            repository: None,
            updated_at,
            author: None,
            draft: None,
            state: None,
            reason: None,
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = Some(draft);
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Per-kind payload carried alongside the common item fields.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemDetail {
    PullRequest { draft: bool },
    Issue,
    Mention { reason: String },
}

impl ItemDetail {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemDetail::PullRequest { .. } => ItemKind::PullRequest,
            ItemDetail::Issue => ItemKind::Issue,
            ItemDetail::Mention { .. } => ItemKind::Mention,
        }
    }
}

/// A normalized, in-scope pull request, issue or mention.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub repository: String,
    pub updated_at: DateTime<Utc>,
    pub author: Option<String>,
    pub detail: ItemDetail,
}

impl ActivityItem {
    pub fn from_raw(raw: RawItem, kind: ItemKind) -> Result<Self, MalformedItem> {
        let repository = match raw.repository {
            Some(repo) if !repo.trim().is_empty() => repo,
            _ => return Err(MalformedItem::MissingRepository { id: raw.id }),
        };

        let detail = match kind {
            ItemKind::PullRequest => ItemDetail::PullRequest {
                draft: raw.draft.unwrap_or(false),
            },
            ItemKind::Issue => ItemDetail::Issue,
            ItemKind::Mention => ItemDetail::Mention {
                reason: raw.reason.unwrap_or_default(),
            },
        };

        Ok(Self {
            id: raw.id,
            title: raw.title,
            url: raw.url,
            repository,
            updated_at: raw.updated_at,
            author: raw.author,
            detail,
        })
    }

    pub fn kind(&self) -> ItemKind {
        self.detail.kind()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MalformedItem {
    #[error("item {id} has no repository")]
    MissingRepository { id: String },
}


#[cfg(test)]
mod tests {
    use super::fixtures::raw;
    use super::*;

    #[test]
    fn from_raw_builds_kind_specific_detail() {
        let pr = ActivityItem::from_raw(raw("1", 5).with_draft(false), ItemKind::PullRequest)
            .expect("pr");
        assert_eq!(pr.detail, ItemDetail::PullRequest { draft: false });
        assert_eq!(pr.kind(), ItemKind::PullRequest);

        let mention =
            ActivityItem::from_raw(raw("2", 5).with_reason("mention"), ItemKind::Mention)
                .expect("mention");
        assert_eq!(
            mention.detail,
            ItemDetail::Mention {
                reason: "mention".into()
            }
        );
    }

    #[test]
    fn from_raw_rejects_missing_or_blank_repository() {
        let mut item = raw("7", 5);
        item.repository = None;
        assert_eq!(
            ActivityItem::from_raw(item, ItemKind::Issue),
            Err(MalformedItem::MissingRepository { id: "7".into() })
        );

        let blank = raw("8", 5).with_repository("  ");
        assert!(ActivityItem::from_raw(blank, ItemKind::Issue).is_err());
    }

    #[test]
    fn item_state_treats_everything_but_open_as_closed() {
        assert_eq!(ItemState::from_wire("open"), ItemState::Open);
        assert_eq!(ItemState::from_wire("OPEN"), ItemState::Open);
        assert_eq!(ItemState::from_wire("closed"), ItemState::Closed);
        assert_eq!(ItemState::from_wire("merged"), ItemState::Closed);
    }
}
