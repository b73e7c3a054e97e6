use crate::metrics::{Bucket, ValueField, DAY_MILLIS};
use crate::models::DailyPoint;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use std::collections::BTreeMap;

pub const SERIES_DAYS: usize = 7;

pub fn build_daily_series(buckets: &[Bucket], field: ValueField) -> Vec<DailyPoint> {
    build_daily_series_at(&Local::now(), buckets, field)
}

/// Seven points ending on `now`'s date. Each bucket is assigned to the local
/// day containing its start plus half a day, so a bucket that starts an hour
/// off midnight after a clock change still lands on the day it covers. Days
/// without a bucket read 0.
pub fn build_daily_series_at<Tz: TimeZone>(
    now: &DateTime<Tz>,
    buckets: &[Bucket],
    field: ValueField,
) -> Vec<DailyPoint> {
    let tz = now.timezone();
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for bucket in buckets {
        let Some(day) = bucket
            .start_millis()
            .and_then(|millis| tz.timestamp_millis_opt(millis + DAY_MILLIS / 2).single())
            .map(|midday| midday.date_naive())
        else {
            continue;
        };
        *totals.entry(day).or_default() += bucket.total(field);
    }

    let today = now.date_naive();
    let mut points = Vec::with_capacity(SERIES_DAYS);
    for offset in (0..SERIES_DAYS).rev() {
        let date = today - Duration::days(offset as i64);
        points.push(DailyPoint {
            date: date_key(date),
            label: short_label(date),
            value: totals.get(&date).copied().unwrap_or_default(),
        });
    }
    points
}

/// Rounds every value to a whole number, as the calories chart shows them.
pub fn round_values(points: &mut [DailyPoint]) {
    for point in points {
        point.value = point.value.round();
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn short_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}
