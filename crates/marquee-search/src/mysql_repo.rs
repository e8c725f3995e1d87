use std::time::Duration;

use async_trait::async_trait;
use marquee_config::MySqlConfig;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::domain::{GenreSelection, MovieRecord, Page, YearRange};
use crate::error::{RepoError, RepoResult};
use crate::repo::MovieCatalog;

pub const SHOW_GENRES: &str = "
SELECT name
FROM category
ORDER BY name";

pub const MIN_MAX_YEAR: &str = "
SELECT
    CAST(MIN(release_year) AS SIGNED) AS min_y,
    CAST(MAX(release_year) AS SIGNED) AS max_y
FROM film";

pub const SEARCH_BY_KEYWORD: &str = "
SELECT
    CAST(film_id AS SIGNED) AS film_id,
    title,
    CAST(release_year AS SIGNED) AS release_year,
    CAST(NULL AS CHAR) AS genre
FROM film
WHERE LOWER(title) LIKE ?
ORDER BY title
LIMIT ? OFFSET ?";

pub const SEARCH_BY_GENRE_YEARS: &str = "
SELECT
    CAST(f.film_id AS SIGNED) AS film_id,
    f.title,
    CAST(f.release_year AS SIGNED) AS release_year,
    c.name AS genre
FROM film f
JOIN film_category fc ON fc.film_id = f.film_id
JOIN category c ON c.category_id = fc.category_id
WHERE c.name = ?
    AND f.release_year BETWEEN ? AND ?
ORDER BY f.release_year, f.title
LIMIT ? OFFSET ?";

pub const SEARCH_BY_YEARS_ALL_GENRES: &str = "
SELECT
    CAST(f.film_id AS SIGNED) AS film_id,
    f.title,
    CAST(f.release_year AS SIGNED) AS release_year,
    c.name AS genre
FROM film f
JOIN film_category fc ON fc.film_id = f.film_id
JOIN category c ON c.category_id = fc.category_id
WHERE f.release_year BETWEEN ? AND ?
ORDER BY f.release_year, f.title
LIMIT ? OFFSET ?";

pub const COUNT_BY_KEYWORD: &str = "
SELECT COUNT(*) AS cnt
FROM film
WHERE LOWER(title) LIKE ?";

// DISTINCT: the joins can repeat a film.
pub const COUNT_BY_GENRE_YEARS: &str = "
SELECT COUNT(DISTINCT f.film_id) AS cnt
FROM film f
JOIN film_category fc ON fc.film_id = f.film_id
JOIN category c ON c.category_id = fc.category_id
WHERE c.name = ?
    AND f.release_year BETWEEN ? AND ?";

pub const COUNT_BY_YEARS_ALL_GENRES: &str = "
SELECT COUNT(DISTINCT f.film_id) AS cnt
FROM film f
JOIN film_category fc ON fc.film_id = f.film_id
JOIN category c ON c.category_id = fc.category_id
WHERE f.release_year BETWEEN ? AND ?";

#[derive(Debug, sqlx::FromRow)]
struct FilmRow {
    film_id: i64,
    title: String,
    release_year: i64,
    genre: Option<String>,
}

impl From<FilmRow> for MovieRecord {
    fn from(row: FilmRow) -> Self {
        Self {
            film_id: row.film_id,
            title: row.title,
            release_year: row.release_year as i32,
            genre: row.genre,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct YearBoundsRow {
    min_y: Option<i64>,
    max_y: Option<i64>,
}

/// `%keyword%` for a case-insensitive substring match, with LIKE
/// metacharacters in the keyword matched literally.
pub fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for ch in keyword.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(Clone)]
pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Builds a lazily connecting pool; connections are acquired per query.
    pub fn connect_lazy(cfg: &MySqlConfig) -> RepoResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs_f64(cfg.acquire_timeout_seconds.max(1.0)))
            .connect_lazy(&cfg.url)
            .map_err(|err| RepoError::invalid_argument(format!("invalid MySQL url: {err}")))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MovieCatalog for MySqlCatalog {
    async fn fetch_genres(&self) -> RepoResult<Vec<String>> {
        let genres = sqlx::query_scalar::<_, String>(SHOW_GENRES)
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    async fn fetch_year_bounds(&self) -> RepoResult<(i32, i32)> {
        let row = sqlx::query_as::<_, YearBoundsRow>(MIN_MAX_YEAR)
            .fetch_one(&self.pool)
            .await?;
        match (row.min_y, row.max_y) {
            (Some(min), Some(max)) => Ok((min as i32, max as i32)),
            _ => Err(RepoError::backend("film table has no release years")),
        }
    }

    async fn search_by_keyword(&self, keyword: &str, limit: u32, offset: u64) -> RepoResult<Page> {
        let rows = sqlx::query_as::<_, FilmRow>(SEARCH_BY_KEYWORD)
            .bind(like_pattern(keyword))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(MovieRecord::from).collect())
    }

    async fn search_by_genre_and_years(
        &self,
        genre: &GenreSelection,
        years: YearRange,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Page> {
        let query = match genre {
            GenreSelection::All => sqlx::query_as::<_, FilmRow>(SEARCH_BY_YEARS_ALL_GENRES),
            GenreSelection::Named(name) => {
                sqlx::query_as::<_, FilmRow>(SEARCH_BY_GENRE_YEARS).bind(name.clone())
            }
        };
        let rows = query
            .bind(years.from())
            .bind(years.to())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(MovieRecord::from).collect())
    }

    async fn count_by_keyword(&self, keyword: &str) -> RepoResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(COUNT_BY_KEYWORD)
            .bind(like_pattern(keyword))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn count_by_genre_and_years(
        &self,
        genre: &GenreSelection,
        years: YearRange,
    ) -> RepoResult<u64> {
        let query = match genre {
            GenreSelection::All => sqlx::query_scalar::<_, i64>(COUNT_BY_YEARS_ALL_GENRES),
            GenreSelection::Named(name) => {
                sqlx::query_scalar::<_, i64>(COUNT_BY_GENRE_YEARS).bind(name.clone())
            }
        };
        let count = query
            .bind(years.from())
            .bind(years.to())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
