use chrono::{DateTime, Utc};

use crate::{
    config::PipelineConfig,
    domain::{ItemKind, ItemState, RawItem},
};

const MENTION_REASON: &str = "mention";

/// Why an item was kept out of the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exclusion {
    BotAuthor,
    Draft,
    NotOpen,
    NotMention,
    Stale,
}

impl Exclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::BotAuthor => "bot author",
            Exclusion::Draft => "draft",
            Exclusion::NotOpen => "not open",
            Exclusion::NotMention => "not a mention",
            Exclusion::Stale => "outside activity window",
        }
    }
}

/// Returns `true` when the item belongs in the snapshot.
pub fn classify(
    raw: &RawItem,
    kind: ItemKind,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> bool {
    exclusion(raw, kind, config, now).is_none()
}

/// First rule the item trips, in precedence order: bot, draft, state,
/// reason, age.
pub fn exclusion(
    raw: &RawItem,
    kind: ItemKind,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Option<Exclusion> {
    let is_work_item = matches!(kind, ItemKind::PullRequest | ItemKind::Issue);

    if is_work_item && raw.author.as_deref() == Some(config.bot_login.as_str()) {
        return Some(Exclusion::BotAuthor);
    }

    if kind == ItemKind::PullRequest && raw.draft == Some(true) {
        return Some(Exclusion::Draft);
    }

    if is_work_item && matches!(raw.state, Some(state) if state != ItemState::Open) {
        return Some(Exclusion::NotOpen);
    }

    if kind == ItemKind::Mention {
        if raw.reason.as_deref() != Some(MENTION_REASON) {
            return Some(Exclusion::NotMention);
        }
        if raw.updated_at < now - config.activity_window {
            return Some(Exclusion::Stale);
        }
    }

    None
}
