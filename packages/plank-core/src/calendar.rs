/// Calendar view of the board catalogue: boards grouped by when they were
/// last updated, relative to a given "now".
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::types::BoardSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DateBucket {
    Today,
    Yesterday,
    /// Same ISO week (Monday start), before yesterday
    EarlierThisWeek,
    EarlierThisMonth,
    Month { year: i32, month: u32 },
}

impl DateBucket {
    pub fn label(&self) -> String {
        match self {
            DateBucket::Today => "Today".to_string(),
            DateBucket::Yesterday => "Yesterday".to_string(),
            DateBucket::EarlierThisWeek => "Earlier this week".to_string(),
            DateBucket::EarlierThisMonth => "Earlier this month".to_string(),
            DateBucket::Month { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| format!("{:04}-{:02}", year, month)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketGroup {
    pub bucket: DateBucket,
    pub boards: Vec<BoardSummary>,
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Bucket for a calendar day. Days after `today` count as today.
pub fn bucket_for(day: NaiveDate, today: NaiveDate) -> DateBucket {
    if day >= today {
        return DateBucket::Today;
    }
    if Some(day) == today.pred_opt() {
        return DateBucket::Yesterday;
    }
    if week_start(day) == week_start(today) {
        return DateBucket::EarlierThisWeek;
    }
    if day.year() == today.year() && day.month() == today.month() {
        return DateBucket::EarlierThisMonth;
    }
    DateBucket::Month {
        year: day.year(),
        month: day.month(),
    }
}

/// Group summaries by `updated_at`, days taken in the time zone of `now`.
/// Buckets come newest first, boards inside a bucket most recent first.
pub fn group_by_updated<Tz: TimeZone>(
    mut summaries: Vec<BoardSummary>,
    now: &DateTime<Tz>,
) -> Vec<BucketGroup> {
    let tz = now.timezone();
    let today = now.date_naive();
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.slug.cmp(&b.slug)));

    let mut groups: Vec<BucketGroup> = Vec::new();
    for summary in summaries {
        let day = summary.updated_at.with_timezone(&tz).date_naive();
        let bucket = bucket_for(day, today);
        match groups.last_mut() {
            Some(group) if group.bucket == bucket => group.boards.push(summary),
            _ => groups.push(BucketGroup {
                bucket,
                boards: vec![summary],
            }),
        }
    }
    groups
}

/// `group_by_updated` relative to the local clock.
pub fn group_by_updated_local(summaries: Vec<BoardSummary>) -> Vec<BucketGroup> {
    group_by_updated(summaries, &Local::now())
}
