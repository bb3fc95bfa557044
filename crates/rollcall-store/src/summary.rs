use crate::model::{AttendanceEvent, DailySummary, EventKind};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Group events by identity and UTC date, keeping the latest check-in and
/// check-out of each group. Output is newest date first; groups sharing a
/// date keep the order in which they were first seen.
pub fn daily_summaries(events: &[AttendanceEvent]) -> Vec<DailySummary> {
    let mut index: HashMap<(String, NaiveDate), usize> = HashMap::new();
    let mut summaries: Vec<DailySummary> = Vec::new();

    for event in events {
        let key = (event.identity_id.clone(), event.date());
        let slot = *index.entry(key).or_insert_with(|| {
            summaries.push(DailySummary {
                identity_id: event.identity_id.clone(),
                identity_name: event.identity_name.clone(),
                date: event.date(),
                check_in: None,
                check_out: None,
                total_hours: None,
            });
            summaries.len() - 1
        });

        let summary = &mut summaries[slot];
        let latest = match event.kind {
            EventKind::CheckIn => &mut summary.check_in,
            EventKind::CheckOut => &mut summary.check_out,
        };
        if latest.map_or(true, |seen| event.timestamp > seen) {
            *latest = Some(event.timestamp);
        }
    }

    for summary in &mut summaries {
        if let (Some(check_in), Some(check_out)) = (summary.check_in, summary.check_out) {
            let hours = (check_out - check_in).num_milliseconds() as f64 / 3_600_000.0;
            summary.total_hours = Some((hours * 100.0).round() / 100.0);
        }
    }

    summaries.sort_by(|a, b| b.date.cmp(&a.date));
    summaries
}
