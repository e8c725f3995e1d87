use std::sync::Arc;

use marquee_config::SearchConfig;
use marquee_search::{
    memory::{InMemoryCatalog, InMemoryQueryLog},
    LogEntry, MovieRecord, SearchQuery, SearchService,
};
use marquee_web_core::build_router;

fn film(id: i64, title: &str, year: i32, genre: &str) -> MovieRecord {
    MovieRecord {
        film_id: id,
        title: title.to_string(),
        release_year: year,
        genre: Some(genre.to_string()),
    }
}

fn sample_catalog() -> InMemoryCatalog {
    let mut movies: Vec<MovieRecord> = (0..25)
        .map(|idx| film(idx, &format!("ACADEMY {idx:02}"), 2006, "Documentary"))
        .collect();
    movies.push(film(100, "ZORRO ARK", 1999, "Comedy"));
    movies.push(film(101, "ALIEN CENTER", 2003, "Comedy"));
    InMemoryCatalog::new(movies)
}

async fn spawn_app(catalog: InMemoryCatalog, log: Arc<InMemoryQueryLog>) -> String {
    let service = SearchService::new(Arc::new(catalog), log, &SearchConfig::default());
    let app = build_router(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

async fn get(url: String) -> (u16, String) {
    let response = reqwest::get(url).await.expect("request");
    let status = response.status().as_u16();
    let body = response.text().await.expect("body");
    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn health_and_index_render() {
    let base = spawn_app(sample_catalog(), Arc::new(InMemoryQueryLog::default())).await;

    let (status, body) = get(format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");

    let (status, body) = get(format!("{base}/")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<option value=\"All\">All</option>"));
    assert!(body.contains("<option value=\"Comedy\">Comedy</option>"));
    assert!(body.contains("Years in DB: 1999-2006"));
}

#[tokio::test(flavor = "multi_thread")]
async fn keyword_search_logs_only_first_page() {
    let log = Arc::new(InMemoryQueryLog::default());
    let base = spawn_app(sample_catalog(), log.clone()).await;

    let (status, body) = get(format!("{base}/search/keyword?keyword=academy&page=1")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<li>ACADEMY 00 (2006)</li>"));
    assert!(body.contains("href=\"/search/keyword?keyword=academy&amp;page=2\""));

    let (status, body) = get(format!("{base}/search/keyword?keyword=academy&page=3")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<li>ACADEMY 24 (2006)</li>"));
    assert!(!body.contains(">Next<"));

    let entries = log.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].search_query, SearchQuery::keyword("academy"));
    assert_eq!(entries[0].results_count, 25);
}

#[tokio::test(flavor = "multi_thread")]
async fn genre_search_accepts_reversed_years_and_all_genres() {
    let log = Arc::new(InMemoryQueryLog::default());
    let base = spawn_app(sample_catalog(), log.clone()).await;

    let (status, body) =
        get(format!("{base}/search/genre?genre=Comedy&year_from=2005&year_to=1999")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<li>ZORRO ARK (1999) | Comedy</li>"));
    assert!(body.contains("<li>ALIEN CENTER (2003) | Comedy</li>"));

    let (status, _) =
        get(format!("{base}/search/genre?genre=All&year_from=1999&year_to=2006&page=1")).await;
    assert_eq!(status, 200);

    let entries = log.entries().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].search_query.params_json(), r#"{"genre":"Comedy","years_range":"1999-2005"}"#);
    assert_eq!(entries[0].results_count, 2);
    assert_eq!(entries[1].search_query.params_json(), r#"{"genre":"All","years_range":"1999-2006"}"#);
    assert_eq!(entries[1].results_count, 27);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_parameters_yield_empty_results_without_logging() {
    let log = Arc::new(InMemoryQueryLog::default());
    let base = spawn_app(sample_catalog(), log.clone()).await;

    let (status, body) =
        get(format!("{base}/search/genre?genre=Comedy&year_from=19aa&year_to=2005&page=x")).await;
    assert_eq!(status, 200);
    assert!(body.contains("No results."));

    let (status, body) = get(format!("{base}/search/keyword?keyword=%20%20")).await;
    assert_eq!(status, 200);
    assert!(body.contains("No results."));

    assert!(log.entries().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn stats_page_lists_logged_searches() {
    let entries = vec![
        LogEntry {
            timestamp: "2026-01-21T00:00:00.000000Z".to_string(),
            search_query: SearchQuery::keyword("academy"),
            results_count: 2,
        },
        LogEntry {
            timestamp: "2026-01-21T12:00:00.000000Z".to_string(),
            search_query: SearchQuery::keyword("academy"),
            results_count: 2,
        },
    ];
    let log = Arc::new(InMemoryQueryLog::with_entries(entries));
    let base = spawn_app(sample_catalog(), log).await;

    let (status, body) = get(format!("{base}/stats")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<td>2</td><td>keyword</td>"));
    assert!(body.contains("2026-01-21T12:00:00.000000Z"));
    assert!(!body.contains("2026-01-21T00:00:00.000000Z"));
}

#[tokio::test(flavor = "multi_thread")]
async fn backend_failure_renders_server_error() {
    let base = spawn_app(
        InMemoryCatalog::default(),
        Arc::new(InMemoryQueryLog::default()),
    )
    .await;

    let (status, body) = get(format!("{base}/")).await;
    assert_eq!(status, 500);
    assert!(body.contains("failed to load year bounds"));
    assert!(!body.contains("catalog has no films"));
}

#[tokio::test(flavor = "multi_thread")]
async fn out_of_range_years_and_unknown_genres_skip_the_search() {
    let log = Arc::new(InMemoryQueryLog::default());
    let base = spawn_app(sample_catalog(), log.clone()).await;

    for query in [
        "genre=Comedy&year_from=1800&year_to=1900",
        "genre=Comedy&year_from=1999&year_to=2030",
        "genre=comedy&year_from=1999&year_to=2006",
        "genre=Horror&year_from=1999&year_to=2006",
    ] {
        let (status, body) = get(format!("{base}/search/genre?{query}")).await;
        assert_eq!(status, 200, "{query}");
        assert!(body.contains("No results."), "{query}");
        assert!(!body.contains(">Next<"), "{query}");
    }

    assert!(log.entries().await.is_empty());
}
