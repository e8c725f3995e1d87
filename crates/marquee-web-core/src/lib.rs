mod render;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use marquee_clickhouse::ClickHouseClient;
use marquee_config::AppConfig;
use marquee_search::{
    parse_year_range, resolve_genre, ClickHouseQueryLog, MySqlCatalog, SearchQuery, SearchService,
    SinglePage, YearRange,
};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::render::ResultsView;

#[derive(Clone)]
struct AppState {
    service: SearchService,
}

/// Query strings are read as raw text so malformed numbers fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
struct KeywordParams {
    keyword: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenreParams {
    genre: Option<String>,
    year_from: Option<String>,
    year_to: Option<String>,
    page: Option<String>,
}

pub async fn run_server(cfg: AppConfig, host: String, port: u16) -> Result<()> {
    let catalog = MySqlCatalog::connect_lazy(&cfg.mysql)?;
    let log = ClickHouseQueryLog::new(ClickHouseClient::new(cfg.clickhouse)?);
    let service = SearchService::new(Arc::new(catalog), Arc::new(log), &cfg.search);

    let app = build_router(service);

    let bind = format!("{}:{}", host, port)
        .parse::<SocketAddr>()
        .map_err(|err| anyhow!("invalid bind address: {err}"))?;

    let listener = tokio::net::TcpListener::bind(bind).await.map_err(|error| {
        if error.kind() == ErrorKind::AddrInUse {
            anyhow!(
                "failed to bind {bind}: address already in use. stop the other server or rerun with `--port <free-port>`"
            )
        } else {
            anyhow!("failed to bind {bind}: {error}")
        }
    })?;

    info!("marquee-web running at http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(service: SearchService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/search/keyword", get(search_keyword))
        .route("/search/genre", get(search_genre))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .with_state(AppState { service })
}

fn html_response(body: String, status: StatusCode) -> Response {
    let mut response = Html(body).into_response();
    *response.status_mut() = status;
    response
}

/// Logs the full error; the page only names what failed.
fn server_error(context: &str, err: impl std::fmt::Display) -> Response {
    error!("{context}: {err}");
    html_response(render::error_page(context), StatusCode::INTERNAL_SERVER_ERROR)
}

fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map(|page| page.clamp(1, i64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

fn parse_year(raw: Option<&str>) -> i32 {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(0)
}

fn next_url(path: &str, pairs: &[(&str, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    format!("{path}?{}", serializer.finish())
}

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Response {
    let genres = match state.service.genre_choices().await {
        Ok(genres) => genres,
        Err(err) => return server_error("failed to load genres", err),
    };
    let (min_year, max_year) = match state.service.year_bounds().await {
        Ok(bounds) => bounds,
        Err(err) => return server_error("failed to load year bounds", err),
    };
    html_response(
        render::index_page(&genres, min_year, max_year),
        StatusCode::OK,
    )
}

/// Runs one page of `query`; `None` renders an empty result set without
/// touching the stores.
async fn run_page(
    state: &AppState,
    query: Option<SearchQuery>,
    page: u32,
) -> Result<(SinglePage, bool), Response> {
    let mut collected = SinglePage::default();
    let Some(query) = query else {
        return Ok((collected, false));
    };

    match state.service.run(&query, page, &mut collected).await {
        Ok(search) => Ok((collected, search.has_more())),
        Err(err) => Err(server_error("search failed", err)),
    }
}

async fn search_keyword(
    State(state): State<AppState>,
    Query(params): Query<KeywordParams>,
) -> Response {
    let keyword = params.keyword.as_deref().unwrap_or("").trim().to_string();
    let page = parse_page(params.page.as_deref());

    let query = (!keyword.is_empty()).then(|| SearchQuery::keyword(keyword.clone()));
    let (collected, has_more) = match run_page(&state, query, page).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    let view = ResultsView {
        title: "Search by keyword",
        rows: &collected.rows,
        page,
        has_more,
        next_url: next_url(
            "/search/keyword",
            &[("keyword", keyword), ("page", page.saturating_add(1).to_string())],
        ),
    };
    html_response(render::results_page(&view), StatusCode::OK)
}

/// Builds the genre search only when the genre is offered and the years fall
/// inside the catalog bounds; anything else renders an empty page.
async fn genre_query(
    state: &AppState,
    genre: &str,
    year_from: i32,
    year_to: i32,
) -> Result<Option<SearchQuery>, Response> {
    if genre.is_empty() || year_from <= 0 || year_to <= 0 {
        return Ok(None);
    }

    let choices = match state.service.genre_choices().await {
        Ok(choices) => choices,
        Err(err) => return Err(server_error("failed to load genres", err)),
    };
    let Some(selection) = resolve_genre(genre, &choices) else {
        debug!("ignoring unknown genre {genre:?}");
        return Ok(None);
    };

    let (min_y, max_y) = match state.service.year_bounds().await {
        Ok(bounds) => bounds,
        Err(err) => return Err(server_error("failed to load year bounds", err)),
    };
    match parse_year_range(&format!("{year_from}-{year_to}"), min_y, max_y) {
        Ok((from, to)) => Ok(Some(SearchQuery::genre_years(
            selection,
            YearRange::new(from, to),
        ))),
        Err(err) => {
            debug!("ignoring genre search years {year_from}-{year_to}: {err}");
            Ok(None)
        }
    }
}

async fn search_genre(
    State(state): State<AppState>,
    Query(params): Query<GenreParams>,
) -> Response {
    let genre = params.genre.as_deref().unwrap_or("").trim().to_string();
    let year_from = parse_year(params.year_from.as_deref());
    let year_to = parse_year(params.year_to.as_deref());
    let page = parse_page(params.page.as_deref());

    let query = match genre_query(&state, &genre, year_from, year_to).await {
        Ok(query) => query,
        Err(response) => return response,
    };
    let (collected, has_more) = match run_page(&state, query, page).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    let view = ResultsView {
        title: "Search by genre & years",
        rows: &collected.rows,
        page,
        has_more,
        next_url: next_url(
            "/search/genre",
            &[
                ("genre", genre),
                ("year_from", year_from.to_string()),
                ("year_to", year_to.to_string()),
                ("page", page.saturating_add(1).to_string()),
            ],
        ),
    };
    html_response(render::results_page(&view), StatusCode::OK)
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.service.stats().await {
        Ok(report) => html_response(render::stats_page(&report), StatusCode::OK),
        Err(err) => server_error("failed to load search statistics", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parameter_is_lenient() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some(" 2 ")), 2);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-4")), 1);
        assert_eq!(parse_page(Some("two")), 1);
    }

    #[test]
    fn year_parameter_defaults_to_zero() {
        assert_eq!(parse_year(Some("2005")), 2005);
        assert_eq!(parse_year(Some("20aa")), 0);
        assert_eq!(parse_year(Some("")), 0);
        assert_eq!(parse_year(None), 0);
    }

    #[test]
    fn next_url_encodes_user_text() {
        assert_eq!(
            next_url(
                "/search/keyword",
                &[("keyword", "r&b blues".to_string()), ("page", "2".to_string())]
            ),
            "/search/keyword?keyword=r%26b+blues&page=2"
        );
    }
}
