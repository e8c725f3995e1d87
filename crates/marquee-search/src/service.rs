use std::sync::Arc;

use marquee_config::SearchConfig;

use crate::domain::{GenreSelection, SearchQuery, StatsReport, StatsRow, ALL_GENRES};
use crate::error::{RepoResult, SearchError};
use crate::paging::{run_paged_search, CatalogSource, Pager, SearchState};
use crate::repo::{MovieCatalog, QueryLog};
use crate::stats;

/// Store handles plus paging settings shared by the console and web front-ends.
#[derive(Clone)]
pub struct SearchService {
    catalog: Arc<dyn MovieCatalog>,
    log: Arc<dyn QueryLog>,
    page_size: u32,
    stats_limit: usize,
}

impl SearchService {
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        log: Arc<dyn QueryLog>,
        cfg: &SearchConfig,
    ) -> Self {
        Self {
            catalog,
            log,
            page_size: cfg.page_size.max(1),
            stats_limit: cfg.stats_limit.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn stats_limit(&self) -> usize {
        self.stats_limit
    }

    pub async fn genres(&self) -> RepoResult<Vec<String>> {
        self.catalog.fetch_genres().await
    }

    /// Genre choices offered to users: `All` followed by the catalog genres.
    pub async fn genre_choices(&self) -> RepoResult<Vec<String>> {
        let mut choices = vec![ALL_GENRES.to_string()];
        choices.extend(self.genres().await?);
        Ok(choices)
    }

    pub async fn year_bounds(&self) -> RepoResult<(i32, i32)> {
        self.catalog.fetch_year_bounds().await
    }

    /// Runs `query` starting at the 1-indexed `page`.
    pub async fn run<P>(
        &self,
        query: &SearchQuery,
        page: u32,
        pager: &mut P,
    ) -> Result<SearchState, SearchError>
    where
        P: Pager + ?Sized,
    {
        let start_offset = u64::from(page.max(1) - 1) * u64::from(self.page_size);
        let source = CatalogSource::new(self.catalog.as_ref(), query);
        run_paged_search(
            query,
            &source,
            pager,
            self.log.as_ref(),
            self.page_size,
            start_offset,
        )
        .await
    }

    pub async fn stats(&self) -> RepoResult<StatsReport> {
        let entries = self.log.read_all().await?;
        Ok(stats::build_report(&entries, self.stats_limit))
    }

    pub async fn top_by_frequency(&self) -> RepoResult<Vec<StatsRow>> {
        let entries = self.log.read_all().await?;
        Ok(stats::top_by_frequency(&entries, self.stats_limit))
    }

    pub async fn last_unique(&self) -> RepoResult<Vec<StatsRow>> {
        let entries = self.log.read_all().await?;
        Ok(stats::last_unique(&entries, self.stats_limit))
    }
}

/// Exact-match lookup of user input against the offered genre choices.
pub fn resolve_genre(input: &str, choices: &[String]) -> Option<GenreSelection> {
    let input = input.trim();
    choices
        .iter()
        .any(|choice| choice == input)
        .then(|| GenreSelection::parse(input))
}
