use std::cmp::Reverse;

use ahash::AHashMap as HashMap;

use crate::domain::{LogEntry, SearchQuery, StatsReport, StatsRow};

struct Group<'a> {
    latest: &'a LogEntry,
    count: u64,
}

/// One row per logical search. The representative of each group is its most
/// recent entry; on equal timestamps the later-written entry wins.
fn group_by_query(entries: &[LogEntry]) -> Vec<StatsRow> {
    let mut groups: HashMap<&SearchQuery, Group<'_>> = HashMap::new();

    for entry in entries {
        groups
            .entry(&entry.search_query)
            .and_modify(|group| {
                group.count += 1;
                if entry.timestamp >= group.latest.timestamp {
                    group.latest = entry;
                }
            })
            .or_insert(Group {
                latest: entry,
                count: 1,
            });
    }

    groups
        .into_values()
        .map(|group| StatsRow {
            search_query: group.latest.search_query.clone(),
            count: group.count,
            results_count: group.latest.results_count,
            timestamp: group.latest.timestamp.clone(),
        })
        .collect()
}

/// Most frequent searches: count descending, then most recent first.
pub fn top_by_frequency(entries: &[LogEntry], k: usize) -> Vec<StatsRow> {
    let mut rows = group_by_query(entries);
    rows.sort_by(|a, b| {
        (Reverse(a.count), Reverse(&a.timestamp), &a.search_query).cmp(&(
            Reverse(b.count),
            Reverse(&b.timestamp),
            &b.search_query,
        ))
    });
    rows.truncate(k);
    rows
}

/// Most recent distinct searches, each shown at its latest occurrence.
pub fn last_unique(entries: &[LogEntry], k: usize) -> Vec<StatsRow> {
    let mut rows = group_by_query(entries);
    rows.sort_by(|a, b| {
        (Reverse(&a.timestamp), &a.search_query).cmp(&(Reverse(&b.timestamp), &b.search_query))
    });
    rows.truncate(k);
    rows
}

pub fn build_report(entries: &[LogEntry], k: usize) -> StatsReport {
    StatsReport {
        top_by_frequency: top_by_frequency(entries, k),
        last_unique: last_unique(entries, k),
    }
}
