use async_trait::async_trait;

use crate::domain::{GenreSelection, LogEntry, Page, YearRange};
use crate::error::RepoResult;

/// Read-only access to the relational movie catalog.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Genre names in alphabetical order.
    async fn fetch_genres(&self) -> RepoResult<Vec<String>>;

    async fn fetch_year_bounds(&self) -> RepoResult<(i32, i32)>;

    async fn search_by_keyword(&self, keyword: &str, limit: u32, offset: u64) -> RepoResult<Page>;

    async fn search_by_genre_and_years(
        &self,
        genre: &GenreSelection,
        years: YearRange,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Page>;

    async fn count_by_keyword(&self, keyword: &str) -> RepoResult<u64>;

    async fn count_by_genre_and_years(
        &self,
        genre: &GenreSelection,
        years: YearRange,
    ) -> RepoResult<u64>;
}

/// Append-only store of past searches.
#[async_trait]
pub trait QueryLog: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> RepoResult<()>;

    async fn read_all(&self) -> RepoResult<Vec<LogEntry>>;
}
