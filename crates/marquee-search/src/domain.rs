use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

pub const PAGE_SIZE: u32 = 10;
pub const ALL_GENRES: &str = "All";

pub const KEYWORD_SEARCH_TYPE: &str = "keyword";
pub const GENRE_YEARS_SEARCH_TYPE: &str = "genre__years_range";
const LEGACY_GENRE_YEARS_SEARCH_TYPE: &str = "genre_years";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchKind {
    Keyword,
    GenreYears,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => KEYWORD_SEARCH_TYPE,
            Self::GenreYears => GENRE_YEARS_SEARCH_TYPE,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            KEYWORD_SEARCH_TYPE => Some(Self::Keyword),
            GENRE_YEARS_SEARCH_TYPE | LEGACY_GENRE_YEARS_SEARCH_TYPE => Some(Self::GenreYears),
            _ => None,
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenreSelection {
    All,
    Named(String),
}

impl GenreSelection {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed == ALL_GENRES {
            Self::All
        } else {
            Self::Named(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_GENRES,
            Self::Named(name) => name,
        }
    }
}

/// Inclusive release-year range with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearRange {
    from: i32,
    to: i32,
}

impl YearRange {
    pub fn new(a: i32, b: i32) -> Self {
        if a > b {
            Self { from: b, to: a }
        } else {
            Self { from: a, to: b }
        }
    }

    pub fn from(self) -> i32 {
        self.from
    }

    pub fn to(self) -> i32 {
        self.to
    }

    fn parse_logged(value: &str) -> Option<Self> {
        let (left, right) = value.split_once('-')?;
        let a = left.trim().parse::<i32>().ok()?;
        let b = right.trim().parse::<i32>().ok()?;
        Some(Self::new(a, b))
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// A logical search. Two values are equal exactly when they describe the same
/// search, which is what the stats views group by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchQuery {
    Keyword {
        keyword: String,
    },
    GenreYears {
        genre: GenreSelection,
        years: YearRange,
    },
}

impl SearchQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self::Keyword {
            keyword: keyword.into(),
        }
    }

    pub fn genre_years(genre: GenreSelection, years: YearRange) -> Self {
        Self::GenreYears { genre, years }
    }

    pub fn kind(&self) -> SearchKind {
        match self {
            Self::Keyword { .. } => SearchKind::Keyword,
            Self::GenreYears { .. } => SearchKind::GenreYears,
        }
    }

    /// Parameter mapping as it is written to the query log.
    pub fn params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        match self {
            Self::Keyword { keyword } => {
                params.insert("keyword", keyword.clone());
            }
            Self::GenreYears { genre, years } => {
                params.insert("genre", genre.as_str().to_string());
                params.insert("years_range", years.to_string());
            }
        }
        params
    }

    pub fn params_json(&self) -> String {
        serde_json::to_string(&self.params()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Stable identity string: search type plus sorted-key params.
    pub fn canonical_key(&self) -> String {
        format!("{}|{}", self.kind(), self.params_json())
    }

    pub fn from_logged(search_type: &str, params: &serde_json::Value) -> RepoResult<Self> {
        let kind = SearchKind::parse(search_type).ok_or_else(|| {
            RepoError::invalid_argument(format!("unknown search type `{search_type}`"))
        })?;
        let field = |name: &str| -> RepoResult<String> {
            params
                .get(name)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    RepoError::invalid_argument(format!("missing `{name}` in {kind} params"))
                })
        };

        match kind {
            SearchKind::Keyword => Ok(Self::keyword(field("keyword")?)),
            SearchKind::GenreYears => {
                let raw_years = field("years_range")?;
                let years = YearRange::parse_logged(&raw_years).ok_or_else(|| {
                    RepoError::invalid_argument(format!("invalid years_range `{raw_years}`"))
                })?;
                Ok(Self::genre_years(GenreSelection::parse(&field("genre")?), years))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub film_id: i64,
    pub title: String,
    pub release_year: i32,
    #[serde(default)]
    pub genre: Option<String>,
}

pub type Page = Vec<MovieRecord>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub search_query: SearchQuery,
    pub results_count: u64,
}

impl LogEntry {
    pub fn new(search_query: SearchQuery, results_count: u64, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: format_timestamp(at),
            search_query,
            results_count,
        }
    }

    pub fn now(search_query: SearchQuery, results_count: u64) -> Self {
        Self::new(search_query, results_count, Utc::now())
    }
}

/// Fixed-width UTC rendering; lexical order equals chronological order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Re-renders any RFC 3339 timestamp (e.g. `+00:00` offsets) in the
/// canonical form.
pub fn normalize_timestamp(raw: &str) -> RepoResult<String> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|err| RepoError::invalid_argument(format!("invalid timestamp `{raw}`: {err}")))?;
    Ok(format_timestamp(parsed.with_timezone(&Utc)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRow {
    pub search_query: SearchQuery,
    pub count: u64,
    pub results_count: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub top_by_frequency: Vec<StatsRow>,
    pub last_unique: Vec<StatsRow>,
}
