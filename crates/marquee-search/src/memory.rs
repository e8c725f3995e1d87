//! In-process stores, for tests and for running the front-ends without a
//! database.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{GenreSelection, LogEntry, MovieRecord, Page, YearRange};
use crate::error::{RepoError, RepoResult};
use crate::repo::{MovieCatalog, QueryLog};

#[derive(Debug, Default)]
pub struct InMemoryQueryLog {
    entries: RwLock<Vec<LogEntry>>,
    fail_writes: bool,
}

impl InMemoryQueryLog {
    pub fn with_entries(entries: Vec<LogEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            fail_writes: false,
        }
    }

    /// A log whose writes always fail.
    pub fn failing() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl QueryLog for InMemoryQueryLog {
    async fn append(&self, entry: &LogEntry) -> RepoResult<()> {
        if self.fail_writes {
            return Err(RepoError::backend("query log is unavailable"));
        }
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn read_all(&self) -> RepoResult<Vec<LogEntry>> {
        Ok(self.entries.read().await.clone())
    }
}

/// Catalog over a fixed list of movies, each carrying its genre.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    movies: Vec<MovieRecord>,
}

impl InMemoryCatalog {
    pub fn new(movies: Vec<MovieRecord>) -> Self {
        Self { movies }
    }

    fn keyword_matches(&self, keyword: &str) -> Vec<&MovieRecord> {
        let needle = keyword.to_lowercase();
        let mut hits: Vec<&MovieRecord> = self
            .movies
            .iter()
            .filter(|movie| movie.title.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| a.title.cmp(&b.title));
        hits
    }

    fn genre_matches(&self, genre: &GenreSelection, years: YearRange) -> Vec<&MovieRecord> {
        let mut hits: Vec<&MovieRecord> = self
            .movies
            .iter()
            .filter(|movie| movie.release_year >= years.from() && movie.release_year <= years.to())
            .filter(|movie| match genre {
                GenreSelection::All => true,
                GenreSelection::Named(name) => movie.genre.as_deref() == Some(name.as_str()),
            })
            .collect();
        hits.sort_by(|a, b| {
            a.release_year
                .cmp(&b.release_year)
                .then_with(|| a.title.cmp(&b.title))
        });
        hits
    }
}

fn slice_page(rows: Vec<&MovieRecord>, limit: u32, offset: u64, strip_genre: bool) -> Page {
    rows.into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|movie| {
            let mut movie = movie.clone();
            if strip_genre {
                movie.genre = None;
            }
            movie
        })
        .collect()
}

#[async_trait]
impl MovieCatalog for InMemoryCatalog {
    async fn fetch_genres(&self) -> RepoResult<Vec<String>> {
        let mut genres: Vec<String> = self
            .movies
            .iter()
            .filter_map(|movie| movie.genre.clone())
            .collect();
        genres.sort();
        genres.dedup();
        Ok(genres)
    }

    async fn fetch_year_bounds(&self) -> RepoResult<(i32, i32)> {
        let min = self.movies.iter().map(|movie| movie.release_year).min();
        let max = self.movies.iter().map(|movie| movie.release_year).max();
        match (min, max) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(RepoError::backend("catalog has no films")),
        }
    }

    async fn search_by_keyword(&self, keyword: &str, limit: u32, offset: u64) -> RepoResult<Page> {
        Ok(slice_page(self.keyword_matches(keyword), limit, offset, true))
    }

    async fn search_by_genre_and_years(
        &self,
        genre: &GenreSelection,
        years: YearRange,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Page> {
        Ok(slice_page(
            self.genre_matches(genre, years),
            limit,
            offset,
            false,
        ))
    }

    async fn count_by_keyword(&self, keyword: &str) -> RepoResult<u64> {
        Ok(self.keyword_matches(keyword).len() as u64)
    }

    async fn count_by_genre_and_years(
        &self,
        genre: &GenreSelection,
        years: YearRange,
    ) -> RepoResult<u64> {
        Ok(self.genre_matches(genre, years).len() as u64)
    }
}
