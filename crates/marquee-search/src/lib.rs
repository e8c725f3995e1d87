mod clickhouse_log;
mod domain;
mod error;
pub mod memory;
mod mysql_repo;
mod paging;
mod repo;
mod service;
mod stats;
mod years;

pub use clickhouse_log::ClickHouseQueryLog;
pub use domain::{
    format_timestamp, normalize_timestamp, GenreSelection, LogEntry, MovieRecord, Page,
    SearchKind, SearchQuery, StatsReport, StatsRow, YearRange, ALL_GENRES,
    GENRE_YEARS_SEARCH_TYPE, KEYWORD_SEARCH_TYPE, PAGE_SIZE,
};
pub use error::{RepoError, RepoResult, SearchError, YearRangeError};
pub use mysql_repo::{like_pattern, MySqlCatalog};
pub use paging::{run_paged_search, CatalogSource, PageSource, Pager, SearchState, SinglePage};
pub use repo::{MovieCatalog, QueryLog};
pub use service::{resolve_genre, SearchService};
pub use stats::{build_report, last_unique, top_by_frequency};
pub use years::parse_year_range;
