use chrono::Duration;

pub const DEFAULT_BOT_LOGIN: &str = "dependabot[bot]";
pub const DEFAULT_TITLE_WIDTH: usize = 50;

/// Settings the aggregation pipeline runs under.
///
/// Built once at startup and passed by reference; nothing in the pipeline
/// mutates it.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Author login whose pull requests and issues are ignored. Matched exactly.
    pub bot_login: String,
    /// Items updated within this window land in the "last hour" bucket.
    pub recent_window: Duration,
    /// Items older than this are dropped; also the notification `since` cutoff.
    pub activity_window: Duration,
}

impl PipelineConfig {
    pub fn new(bot_login: impl Into<String>) -> Self {
        Self {
            bot_login: bot_login.into(),
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bot_login: DEFAULT_BOT_LOGIN.to_owned(),
            recent_window: Duration::hours(1),
            activity_window: Duration::hours(24),
        }
    }
}
