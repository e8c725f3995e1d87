use anyhow::Result as AnyResult;
use async_trait::async_trait;
use marquee_clickhouse::ClickHouseClient;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::{normalize_timestamp, LogEntry, SearchQuery};
use crate::error::{RepoError, RepoResult};
use crate::repo::QueryLog;

/// Query log kept in a ClickHouse table, one JSON row per search.
#[derive(Clone)]
pub struct ClickHouseQueryLog {
    ch: ClickHouseClient,
}

#[derive(Debug, Deserialize)]
struct LogRow {
    ts: String,
    search_type: String,
    params_json: String,
    results_count: u64,
}

impl ClickHouseQueryLog {
    pub fn new(ch: ClickHouseClient) -> Self {
        Self { ch }
    }

    fn table(&self) -> &str {
        &self.ch.config().log_table
    }

    fn map_backend<T>(&self, result: AnyResult<T>) -> RepoResult<T> {
        result.map_err(|err| RepoError::backend(format!("{err:#}")))
    }
}

fn entry_to_row(entry: &LogEntry) -> Value {
    json!({
        "ts": entry.timestamp,
        "search_type": entry.search_query.kind().as_str(),
        "params_json": entry.search_query.params_json(),
        "results_count": entry.results_count,
    })
}

fn row_to_entry(row: LogRow) -> RepoResult<LogEntry> {
    let params: Value = serde_json::from_str(&row.params_json).map_err(|err| {
        RepoError::invalid_argument(format!("invalid params_json `{}`: {err}", row.params_json))
    })?;
    Ok(LogEntry {
        timestamp: normalize_timestamp(&row.ts)?,
        search_query: SearchQuery::from_logged(&row.search_type, &params)?,
        results_count: row.results_count,
    })
}

#[async_trait]
impl QueryLog for ClickHouseQueryLog {
    async fn append(&self, entry: &LogEntry) -> RepoResult<()> {
        let row = entry_to_row(entry);
        self.map_backend(self.ch.insert_json_rows(self.table(), &[row]).await)
    }

    async fn read_all(&self) -> RepoResult<Vec<LogEntry>> {
        let query = format!(
            "SELECT ts, search_type, params_json, results_count
FROM {}
ORDER BY ts ASC
FORMAT JSONEachRow",
            self.ch.table_ref(self.table())
        );
        let rows: Vec<LogRow> = self.map_backend(self.ch.query_json_each_row(&query, None).await)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match row_to_entry(row) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("skipping unreadable search log row: {}", err),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GenreSelection, YearRange};

    #[test]
    fn rows_round_trip_through_log_encoding() {
        let entry = LogEntry {
            timestamp: "2026-01-21T12:00:00.000000Z".to_string(),
            search_query: SearchQuery::genre_years(
                GenreSelection::Named("Comedy".to_string()),
                YearRange::new(2005, 2012),
            ),
            results_count: 14,
        };
        let value = entry_to_row(&entry);
        assert_eq!(value["search_type"], "genre__years_range");
        assert_eq!(
            value["params_json"],
            r#"{"genre":"Comedy","years_range":"2005-2012"}"#
        );

        let row: LogRow = serde_json::from_value(value).expect("decode row");
        assert_eq!(row_to_entry(row).expect("entry"), entry);
    }

    #[test]
    fn legacy_rows_are_normalized() {
        let row = LogRow {
            ts: "2026-01-20T00:00:00+00:00".to_string(),
            search_type: "genre_years".to_string(),
            params_json: r#"{"years_range":"1990-2025","genre":"All"}"#.to_string(),
            results_count: 10,
        };
        let entry = row_to_entry(row).expect("legacy row decodes");
        assert_eq!(entry.timestamp, "2026-01-20T00:00:00.000000Z");
        assert_eq!(
            entry.search_query,
            SearchQuery::genre_years(GenreSelection::All, YearRange::new(1990, 2025))
        );
    }
}
