use chrono::{DateTime, Utc};

use crate::{
    domain::{ActivityItem, ItemKind},
    format::{format_age, truncate},
    pipeline::ActivitySnapshot,
    summary::ActivityLevel,
    timeline::Bucket,
};

const ICON_NO_ACTIVITY: &str = "🔵";
const ICON_FEW_ACTIVITY: &str = "🟡";
const ICON_LOTS_ACTIVITY: &str = "🔴";
const ICON_DEGRADED: &str = "⚠️";
const CONSOLE_TITLE: &str = "GitHub Activity Monitor";
const CONSOLE_RULE_WIDTH: usize = 50;

pub fn status_icon(level: ActivityLevel) -> &'static str {
    match level {
        ActivityLevel::None => ICON_NO_ACTIVITY,
        ActivityLevel::Low => ICON_FEW_ACTIVITY,
        ActivityLevel::High => ICON_LOTS_ACTIVITY,
    }
}

/// Menu-bar markup in the xbar/SwiftBar plugin format.
pub fn render_widget(snapshot: &ActivitySnapshot, max_title: usize) -> String {
    let mut lines = Vec::new();

    let mut header = format!(
        "{} {}",
        status_icon(snapshot.activity_level),
        snapshot.total_count
    );
    if !snapshot.failures.is_empty() {
        header.push(' ');
        header.push_str(ICON_DEGRADED);
    }
    lines.push(header);
    lines.push("---".to_owned());

    for failure in &snapshot.failures {
        lines.push(format!(
            "{ICON_DEGRADED} {}: {} | color=red",
            failure.kind.label(),
            markup_safe(&failure.message)
        ));
    }

    if snapshot.total_count == 0 {
        lines.push("No activity".to_owned());
    }

    for kind in ItemKind::ALL {
        let view = snapshot.view(kind);
        if view.items.is_empty() {
            continue;
        }
        lines.push(format!("{} ({})", kind.label(), view.items.len()));
        for bucket in Bucket::ALL {
            let groups = view.timeline.bucket(bucket);
            if groups.is_empty() {
                continue;
            }
            lines.push(format!("{} | color=gray size=12", bucket.label()));
            for group in groups.iter() {
                lines.push(markup_safe(&group.repository));
                for item in &group.items {
                    lines.push(format!(
                        "--{} | href={}",
                        markup_safe(&item_line(item, snapshot.generated_at, max_title)),
                        item.url
                    ));
                }
            }
        }
        lines.push("---".to_owned());
    }

    lines.push("Refresh | refresh=true".to_owned());
    lines.join("\n")
}

/// Widget shown when no cycle could run, e.g. the token was rejected.
pub fn render_widget_error(message: &str) -> String {
    [
        format!("{ICON_LOTS_ACTIVITY} Error"),
        "---".to_owned(),
        format!("Error: {} | color=red", markup_safe(message)),
        "Refresh | refresh=true".to_owned(),
    ]
    .join("\n")
}

/// Plain-text report for terminals.
pub fn render_console(snapshot: &ActivitySnapshot, max_title: usize) -> String {
    let mut lines = vec![
        CONSOLE_TITLE.to_owned(),
        "=".repeat(CONSOLE_RULE_WIDTH),
    ];

    for failure in &snapshot.failures {
        lines.push(format!(
            "Warning: {} unavailable: {}",
            failure.kind.label(),
            failure.message
        ));
    }

    if snapshot.total_count == 0 {
        lines.push("No activity to display".to_owned());
        return lines.join("\n");
    }

    lines.push(format!(
        "{} {} item(s), activity {}",
        status_icon(snapshot.activity_level),
        snapshot.total_count,
        snapshot.activity_level.as_str()
    ));

    for kind in ItemKind::ALL {
        let view = snapshot.view(kind);
        if view.items.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{} ({})", kind.label(), view.items.len()));
        for bucket in Bucket::ALL {
            let groups = view.timeline.bucket(bucket);
            if groups.is_empty() {
                continue;
            }
            lines.push(format!("  {}", bucket.label()));
            for group in groups.iter() {
                lines.push(format!("    {}", group.repository));
                for item in &group.items {
                    lines.push(format!(
                        "      {}  {}",
                        item_line(item, snapshot.generated_at, max_title),
                        item.url
                    ));
                }
            }
        }
    }

    lines.join("\n")
}

fn item_line(item: &ActivityItem, now: DateTime<Utc>, max_title: usize) -> String {
    format!(
        "{} ({})",
        truncate(&item.title, max_title),
        format_age(item.updated_at, now)
    )
}

// xbar treats `|` as the start of the parameter list.
fn markup_safe(text: &str) -> String {
    text.replace('|', "/").replace('\n', " ")
}
