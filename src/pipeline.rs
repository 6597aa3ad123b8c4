use std::thread;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    config::PipelineConfig,
    dedupe::dedupe,
    domain::{ActivityItem, ItemKind, RawItem},
    summary::{ActivityLevel, summarize},
    timeline::{Timeline, bucket_and_group, bucket_for},
};

/// Where raw items come from.
///
/// Pull requests and issues must be open-only and may repeat across the
/// source's own sub-queries. Notifications are unread items updated since
/// `since`, fetched without marking anything read.
pub trait ItemSource: Sync {
    type Error: std::error::Error + Send;

    fn fetch_pull_requests(&self) -> Result<Vec<RawItem>, Self::Error>;
    fn fetch_issues(&self) -> Result<Vec<RawItem>, Self::Error>;
    fn fetch_notifications(&self, since: DateTime<Utc>) -> Result<Vec<RawItem>, Self::Error>;
}

/// A source that could not be read this cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFailure {
    pub kind: ItemKind,
    pub message: String,
}

/// In-window items of one kind, both flat and bucketed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KindView {
    pub items: Vec<ActivityItem>,
    pub timeline: Timeline,
}

impl KindView {
    fn build(
        kind: ItemKind,
        items: Vec<ActivityItem>,
        config: &PipelineConfig,
        now: DateTime<Utc>,
    ) -> Self {
        debug_assert!(items.iter().all(|item| item.kind() == kind));
        let items: Vec<_> = items
            .into_iter()
            .filter(|item| bucket_for(item.updated_at, now, config).is_some())
            .collect();
        let timeline = bucket_and_group(items.iter().cloned(), now, config);
        Self { items, timeline }
    }
}

#[derive(Clone, Debug)]
pub struct ActivitySnapshot {
    pub pull_requests: KindView,
    pub issues: KindView,
    pub mentions: KindView,
    pub total_count: usize,
    pub activity_level: ActivityLevel,
    pub failures: Vec<SourceFailure>,
    pub generated_at: DateTime<Utc>,
}

impl ActivitySnapshot {
    pub fn view(&self, kind: ItemKind) -> &KindView {
        match kind {
            ItemKind::PullRequest => &self.pull_requests,
            ItemKind::Issue => &self.issues,
            ItemKind::Mention => &self.mentions,
        }
    }

    pub fn all_failed(&self) -> bool {
        ItemKind::ALL
            .iter()
            .all(|kind| self.failures.iter().any(|failure| failure.kind == *kind))
    }
}

type SourceOutcome = Result<Vec<RawItem>, String>;

/// Runs one poll cycle against `source`.
///
/// The three sources are fetched concurrently and joined before anything is
/// deduplicated. A failing source yields an empty list and a
/// [`SourceFailure`] instead of aborting the cycle.
pub fn run_cycle<S: ItemSource>(
    source: &S,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> ActivitySnapshot {
    let since = now - config.activity_window;

    let (pull_requests, issues, notifications) = thread::scope(|scope| {
        let pull_requests = scope.spawn(|| source.fetch_pull_requests());
        let issues = scope.spawn(|| source.fetch_issues());
        let notifications = scope.spawn(|| source.fetch_notifications(since));
        (
            settle(pull_requests.join()),
            settle(issues.join()),
            settle(notifications.join()),
        )
    });

    let mut failures = Vec::new();
    let mut collect = |kind: ItemKind, outcome: SourceOutcome| -> KindView {
        let raws = match outcome {
            Ok(raws) => raws,
            Err(message) => {
                warn!(kind = kind.label(), "source failed: {message}");
                failures.push(SourceFailure { kind, message });
                Vec::new()
            }
        };
        let fetched = raws.len();
        let view = KindView::build(kind, dedupe(raws, kind, config, now), config, now);
        debug!(
            kind = kind.label(),
            fetched,
            kept = view.timeline.item_count(),
            "source aggregated"
        );
        view
    };

    let pull_requests = collect(ItemKind::PullRequest, pull_requests);
    let issues = collect(ItemKind::Issue, issues);
    let mentions = collect(ItemKind::Mention, notifications);

    let (total_count, activity_level) =
        summarize(&pull_requests.items, &issues.items, &mentions.items);

    ActivitySnapshot {
        pull_requests,
        issues,
        mentions,
        total_count,
        activity_level,
        failures,
        generated_at: now,
    }
}

fn settle<E: std::error::Error>(joined: thread::Result<Result<Vec<RawItem>, E>>) -> SourceOutcome {
    match joined {
        Ok(result) => result.map_err(|err| err.to_string()),
        Err(_) => Err("background worker stopped before returning a result".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use thiserror::Error;

    use super::*;
    use crate::{
        domain::fixtures::{now, raw},
        timeline::Bucket,
    };

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct FakeError(String);

    #[derive(Default)]
    struct FakeSource {
        pull_requests: Option<Vec<RawItem>>,
        issues: Option<Vec<RawItem>>,
        notifications: Option<Vec<RawItem>>,
        since: Mutex<Option<DateTime<Utc>>>,
    }

    fn answer(batch: &Option<Vec<RawItem>>, what: &str) -> Result<Vec<RawItem>, FakeError> {
        batch
            .clone()
            .ok_or_else(|| FakeError(format!("{what} unavailable")))
    }

    impl ItemSource for FakeSource {
        type Error = FakeError;

        fn fetch_pull_requests(&self) -> Result<Vec<RawItem>, FakeError> {
            answer(&self.pull_requests, "pull requests")
        }

        fn fetch_issues(&self) -> Result<Vec<RawItem>, FakeError> {
            answer(&self.issues, "issues")
        }

        fn fetch_notifications(&self, since: DateTime<Utc>) -> Result<Vec<RawItem>, FakeError> {
            *self.since.lock().unwrap() = Some(since);
            answer(&self.notifications, "notifications")
        }
    }

    fn cycle(source: &FakeSource) -> ActivitySnapshot {
        run_cycle(source, &PipelineConfig::default(), now())
    }

    fn mention(id: &str, minutes: i64) -> RawItem {
        raw(id, minutes).with_reason("mention")
    }

    #[test]
    fn overlapping_pull_request_queries_collapse_to_one_item() {
        let pr = raw("123", 10).with_draft(false).with_author("alice");
        let source = FakeSource {
            pull_requests: Some(vec![pr.clone(), pr.clone(), pr]),
            issues: Some(Vec::new()),
            notifications: Some(Vec::new()),
            ..Default::default()
        };

        let snapshot = cycle(&source);

        assert_eq!(snapshot.pull_requests.items.len(), 1);
        assert_eq!(snapshot.pull_requests.items[0].id, "123");
        assert_eq!(snapshot.total_count, 1);
        assert_eq!(snapshot.activity_level, ActivityLevel::Low);
    }

    #[test]
    fn kinds_are_bucketed_independently() {
        let source = FakeSource {
            pull_requests: Some(vec![raw("1", 30).with_repository("owner/repo")]),
            issues: Some(vec![raw("1", 12 * 60).with_repository("owner/repo")]),
            notifications: Some(Vec::new()),
            ..Default::default()
        };

        let snapshot = cycle(&source);

        let prs = &snapshot.pull_requests.timeline;
        assert_eq!(prs.bucket(Bucket::LastHour).item_count(), 1);
        assert!(prs.bucket(Bucket::LastDay).is_empty());

        let issues = &snapshot.issues.timeline;
        assert!(issues.bucket(Bucket::LastHour).is_empty());
        assert_eq!(issues.last_day.get("owner/repo").map(<[_]>::len), Some(1));
    }

    #[test]
    fn stale_work_items_are_not_counted() {
        let source = FakeSource {
            pull_requests: Some(vec![raw("1", 36 * 60), raw("2", 5)]),
            issues: Some(vec![raw("3", 36 * 60)]),
            notifications: Some(Vec::new()),
            ..Default::default()
        };

        let snapshot = cycle(&source);

        assert_eq!(snapshot.pull_requests.items.len(), 1);
        assert!(snapshot.issues.items.is_empty());
        assert!(snapshot.issues.timeline.is_empty());
        assert_eq!(snapshot.total_count, 1);
    }

    #[test]
    fn activity_level_follows_the_total() {
        let six = FakeSource {
            pull_requests: Some(vec![raw("1", 5), raw("2", 5)]),
            issues: Some(vec![raw("1", 5), raw("2", 5)]),
            notifications: Some(vec![mention("a", 5), mention("b", 5)]),
            ..Default::default()
        };
        let snapshot = cycle(&six);
        assert_eq!(snapshot.total_count, 6);
        assert_eq!(snapshot.activity_level, ActivityLevel::High);

        let five = FakeSource {
            notifications: Some(vec![mention("a", 5)]),
            ..six
        };
        assert_eq!(cycle(&five).activity_level, ActivityLevel::Low);

        let none = FakeSource {
            pull_requests: Some(Vec::new()),
            issues: Some(Vec::new()),
            notifications: Some(Vec::new()),
            ..Default::default()
        };
        let snapshot = cycle(&none);
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.activity_level, ActivityLevel::None);
    }

    #[test]
    fn one_failing_source_does_not_sink_the_others() {
        let source = FakeSource {
            pull_requests: Some(vec![raw("1", 5)]),
            issues: None,
            notifications: Some(vec![mention("a", 5)]),
            ..Default::default()
        };

        let snapshot = cycle(&source);

        assert_eq!(
            snapshot.failures,
            vec![SourceFailure {
                kind: ItemKind::Issue,
                message: "issues unavailable".into(),
            }]
        );
        assert_eq!(snapshot.pull_requests.items.len(), 1);
        assert_eq!(snapshot.mentions.items.len(), 1);
        assert_eq!(snapshot.total_count, 2);
        assert!(!snapshot.all_failed());
    }

    #[test]
    fn all_sources_failing_is_reported() {
        let snapshot = cycle(&FakeSource::default());
        assert_eq!(snapshot.failures.len(), 3);
        assert!(snapshot.all_failed());
        assert_eq!(snapshot.activity_level, ActivityLevel::None);
    }

    #[test]
    fn notifications_are_requested_for_the_activity_window() {
        let source = FakeSource {
            pull_requests: Some(Vec::new()),
            issues: Some(Vec::new()),
            notifications: Some(Vec::new()),
            ..Default::default()
        };

        let snapshot = cycle(&source);

        assert_eq!(
            *source.since.lock().unwrap(),
            Some(now() - chrono::Duration::hours(24))
        );
        assert_eq!(snapshot.generated_at, now());
    }

    #[test]
    fn view_selects_by_kind() {
        let source = FakeSource {
            pull_requests: Some(Vec::new()),
            issues: Some(Vec::new()),
            notifications: Some(vec![mention("a", 5)]),
            ..Default::default()
        };

        let snapshot = cycle(&source);

        assert_eq!(snapshot.view(ItemKind::Mention).items.len(), 1);
        assert!(snapshot.view(ItemKind::PullRequest).items.is_empty());
    }
}
