use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::{LogEntry, MovieRecord, Page, SearchQuery};
use crate::error::{RepoResult, SearchError};
use crate::repo::{MovieCatalog, QueryLog};

/// A bounded, offset-addressable result set.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, limit: u32, offset: u64) -> RepoResult<Page>;

    /// Authoritative number of matches, used only for the log entry.
    async fn total(&self) -> RepoResult<u64>;
}

/// Receives fetched pages and decides whether paging goes on.
pub trait Pager {
    fn show_page(&mut self, rows: &[MovieRecord]) -> std::io::Result<()>;

    fn should_continue(&mut self) -> std::io::Result<bool>;
}

/// A `SearchQuery` bound to the catalog it runs against.
pub struct CatalogSource<'a> {
    catalog: &'a dyn MovieCatalog,
    query: &'a SearchQuery,
}

impl<'a> CatalogSource<'a> {
    pub fn new(catalog: &'a dyn MovieCatalog, query: &'a SearchQuery) -> Self {
        Self { catalog, query }
    }
}

#[async_trait]
impl PageSource for CatalogSource<'_> {
    async fn fetch_page(&self, limit: u32, offset: u64) -> RepoResult<Page> {
        match self.query {
            SearchQuery::Keyword { keyword } => {
                self.catalog.search_by_keyword(keyword, limit, offset).await
            }
            SearchQuery::GenreYears { genre, years } => {
                self.catalog
                    .search_by_genre_and_years(genre, *years, limit, offset)
                    .await
            }
        }
    }

    async fn total(&self) -> RepoResult<u64> {
        match self.query {
            SearchQuery::Keyword { keyword } => self.catalog.count_by_keyword(keyword).await,
            SearchQuery::GenreYears { genre, years } => {
                self.catalog.count_by_genre_and_years(genre, *years).await
            }
        }
    }
}

/// Collects a single page and never asks for more; used by request/response callers.
#[derive(Debug, Default)]
pub struct SinglePage {
    pub rows: Vec<MovieRecord>,
}

impl Pager for SinglePage {
    fn show_page(&mut self, rows: &[MovieRecord]) -> std::io::Result<()> {
        self.rows = rows.to_vec();
        Ok(())
    }

    fn should_continue(&mut self) -> std::io::Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchState {
    /// Offset of the last page fetched.
    pub offset: u64,
    pub accumulated_count: u64,
    pub logged: bool,
    /// The last page came back short, so no further pages exist.
    pub exhausted: bool,
}

impl SearchState {
    fn starting_at(offset: u64) -> Self {
        Self {
            offset,
            accumulated_count: 0,
            logged: false,
            exhausted: false,
        }
    }

    /// More results may exist past the last fetched page.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }
}

/// Pages through `source` from `start_offset`, `page_size` rows at a time.
///
/// A session that starts at offset 0 writes exactly one log entry, right after
/// its first page, carrying the authoritative total from `source.total()`.
/// Sessions that start further in never log. Failures of the count or of the
/// log write are reported and swallowed; page fetch failures propagate before
/// anything further is logged.
pub async fn run_paged_search<S, P>(
    query: &SearchQuery,
    source: &S,
    pager: &mut P,
    log: &dyn QueryLog,
    page_size: u32,
    start_offset: u64,
) -> Result<SearchState, SearchError>
where
    S: PageSource + ?Sized,
    P: Pager + ?Sized,
{
    let page_size = page_size.max(1);
    let mut state = SearchState::starting_at(start_offset);
    let logs_this_session = start_offset == 0;

    loop {
        let page = source.fetch_page(page_size, state.offset).await?;
        debug!(
            "fetched {} rows at offset {} for {}",
            page.len(),
            state.offset,
            query.canonical_key()
        );

        state.accumulated_count += page.len() as u64;
        pager.show_page(&page)?;

        if logs_this_session && state.offset == 0 {
            state.logged = log_search(query, source, log).await;
        }

        if page.len() < page_size as usize {
            state.exhausted = true;
            break;
        }
        if !pager.should_continue()? {
            break;
        }

        state.offset += u64::from(page_size);
    }

    Ok(state)
}

async fn log_search<S>(query: &SearchQuery, source: &S, log: &dyn QueryLog) -> bool
where
    S: PageSource + ?Sized,
{
    let total = match source.total().await {
        Ok(total) => total,
        Err(err) => {
            warn!(
                "failed to count results for search log ({}): {}",
                query.canonical_key(),
                err
            );
            return false;
        }
    };

    let entry = LogEntry::now(query.clone(), total);
    match log.append(&entry).await {
        Ok(()) => {
            info!(
                "logged {} search {} with {} results",
                query.kind(),
                query.params_json(),
                total
            );
            true
        }
        Err(err) => {
            warn!("failed to write search log: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PAGE_SIZE;
    use crate::error::RepoError;
    use crate::memory::InMemoryQueryLog;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        total_rows: usize,
        total: RepoResult<u64>,
        fail_at_offset: Option<u64>,
        fetches: Mutex<Vec<(u32, u64)>>,
        count_calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn with_rows(total_rows: usize) -> Self {
            Self {
                total_rows,
                total: Ok(total_rows as u64),
                fail_at_offset: None,
                fetches: Mutex::new(Vec::new()),
                count_calls: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> Vec<(u32, u64)> {
            self.fetches.lock().expect("fetch lock").clone()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, limit: u32, offset: u64) -> RepoResult<Page> {
            self.fetches
                .lock()
                .expect("fetch lock")
                .push((limit, offset));
            if self.fail_at_offset == Some(offset) {
                return Err(RepoError::backend("connection reset"));
            }
            let start = (offset as usize).min(self.total_rows);
            let end = (start + limit as usize).min(self.total_rows);
            Ok((start..end)
                .map(|idx| MovieRecord {
                    film_id: idx as i64 + 1,
                    title: format!("FILM {idx:03}"),
                    release_year: 2006,
                    genre: None,
                })
                .collect())
        }

        async fn total(&self) -> RepoResult<u64> {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            match &self.total {
                Ok(total) => Ok(*total),
                Err(err) => Err(RepoError::backend(err.to_string())),
            }
        }
    }

    struct ScriptedPager {
        answers: Vec<bool>,
        pages: Vec<usize>,
        prompts: usize,
    }

    impl ScriptedPager {
        fn answering(answers: &[bool]) -> Self {
            Self {
                answers: answers.to_vec(),
                pages: Vec::new(),
                prompts: 0,
            }
        }
    }

    impl Pager for ScriptedPager {
        fn show_page(&mut self, rows: &[MovieRecord]) -> std::io::Result<()> {
            self.pages.push(rows.len());
            Ok(())
        }

        fn should_continue(&mut self) -> std::io::Result<bool> {
            let answer = self.answers.get(self.prompts).copied().unwrap_or(false);
            self.prompts += 1;
            Ok(answer)
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::keyword("academy")
    }

    #[tokio::test]
    async fn drains_all_pages_when_caller_keeps_going() {
        let source = ScriptedSource::with_rows(2 * PAGE_SIZE as usize + 3);
        let log = InMemoryQueryLog::default();
        let mut pager = ScriptedPager::answering(&[true, true, true]);

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect("search");

        assert_eq!(source.fetches(), vec![(10, 0), (10, 10), (10, 20)]);
        assert_eq!(state.accumulated_count, 23);
        assert_eq!(pager.pages, vec![10, 10, 3]);
        // The short page ends the loop without prompting.
        assert_eq!(pager.prompts, 2);
        assert!(state.exhausted);
        assert!(!state.has_more());
    }

    #[tokio::test]
    async fn logs_exactly_once_with_authoritative_total() {
        let source = ScriptedSource::with_rows(35);
        let log = InMemoryQueryLog::default();
        let mut pager = ScriptedPager::answering(&[true, true, true]);

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect("search");

        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].results_count, 35);
        assert_eq!(entries[0].search_query, query());
        assert_eq!(source.count_calls.load(Ordering::SeqCst), 1);
        assert!(state.logged);
    }

    #[tokio::test]
    async fn abandoned_session_still_logs_total_not_shown_count() {
        let source = ScriptedSource::with_rows(42);
        let log = InMemoryQueryLog::default();
        let mut pager = ScriptedPager::answering(&[false]);

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect("search");

        assert_eq!(state.accumulated_count, 10);
        assert!(state.has_more());
        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].results_count, 42);
    }

    #[tokio::test]
    async fn empty_first_page_logs_zero() {
        let source = ScriptedSource::with_rows(0);
        let log = InMemoryQueryLog::default();
        let mut pager = ScriptedPager::answering(&[]);

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect("search");

        assert_eq!(state.accumulated_count, 0);
        assert_eq!(pager.prompts, 0);
        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].results_count, 0);
    }

    #[tokio::test]
    async fn later_start_offset_never_logs() {
        let source = ScriptedSource::with_rows(25);
        let log = InMemoryQueryLog::default();
        let mut pager = SinglePage::default();

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 10)
            .await
            .expect("search");

        assert_eq!(source.fetches(), vec![(10, 10)]);
        assert_eq!(pager.rows.len(), 10);
        assert!(state.has_more());
        assert!(!state.logged);
        assert!(log.entries().await.is_empty());
        assert_eq!(source.count_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_on_first_page_propagates_without_logging() {
        let mut source = ScriptedSource::with_rows(25);
        source.fail_at_offset = Some(0);
        let log = InMemoryQueryLog::default();
        let mut pager = ScriptedPager::answering(&[true]);

        let err = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect_err("backend failure");

        assert!(matches!(err, SearchError::Repo(RepoError::Backend(_))));
        assert!(log.entries().await.is_empty());
    }

    #[tokio::test]
    async fn failed_count_skips_log_but_keeps_results() {
        let mut source = ScriptedSource::with_rows(5);
        source.total = Err(RepoError::backend("count timed out"));
        let log = InMemoryQueryLog::default();
        let mut pager = SinglePage::default();

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect("search succeeds");

        assert_eq!(pager.rows.len(), 5);
        assert!(!state.logged);
        assert!(log.entries().await.is_empty());
    }

    #[tokio::test]
    async fn failed_log_write_does_not_fail_search() {
        let source = ScriptedSource::with_rows(3);
        let log = InMemoryQueryLog::failing();
        let mut pager = SinglePage::default();

        let state = run_paged_search(&query(), &source, &mut pager, &log, PAGE_SIZE, 0)
            .await
            .expect("search succeeds");

        assert_eq!(state.accumulated_count, 3);
        assert!(!state.logged);
    }
}
