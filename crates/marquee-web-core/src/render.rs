use std::fmt::Write as _;

use marquee_search::{MovieRecord, StatsReport, StatsRow};

pub(crate) struct ResultsView<'a> {
    pub title: &'a str,
    pub rows: &'a [MovieRecord],
    pub page: u32,
    pub has_more: bool,
    pub next_url: String,
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<title>{title}</title>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
",
        title = escape_html(title),
        body = body
    )
}

pub(crate) fn index_page(genres: &[String], min_year: i32, max_year: i32) -> String {
    let mut body = String::new();

    body.push_str("<h2>Search by keyword</h2>\n");
    body.push_str("<form action=\"/search/keyword\" method=\"get\">\n");
    body.push_str("<input type=\"text\" name=\"keyword\" placeholder=\"Title contains\">\n");
    body.push_str("<input type=\"hidden\" name=\"page\" value=\"1\">\n");
    body.push_str("<button type=\"submit\">Search</button>\n</form>\n");

    body.push_str("<h2>Search by genre &amp; years</h2>\n");
    body.push_str("<form action=\"/search/genre\" method=\"get\">\n<select name=\"genre\">\n");
    for genre in genres {
        let escaped = escape_html(genre);
        let _ = writeln!(body, "<option value=\"{escaped}\">{escaped}</option>");
    }
    body.push_str("</select>\n");
    let _ = writeln!(
        body,
        "<input type=\"number\" name=\"year_from\" min=\"{min_year}\" max=\"{max_year}\" value=\"{min_year}\">"
    );
    let _ = writeln!(
        body,
        "<input type=\"number\" name=\"year_to\" min=\"{min_year}\" max=\"{max_year}\" value=\"{max_year}\">"
    );
    body.push_str("<input type=\"hidden\" name=\"page\" value=\"1\">\n");
    body.push_str("<button type=\"submit\">Search</button>\n</form>\n");
    let _ = writeln!(body, "<p>Years in DB: {min_year}-{max_year}</p>");

    body.push_str("<p><a href=\"/stats\">Search statistics</a></p>\n");
    layout("Movies Search", &body)
}

pub(crate) fn results_page(view: &ResultsView<'_>) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<p>Page {}</p>", view.page);

    if view.rows.is_empty() {
        body.push_str("<p>No results.</p>\n");
    } else {
        body.push_str("<ol>\n");
        for movie in view.rows {
            let _ = write!(
                body,
                "<li>{} ({})",
                escape_html(&movie.title),
                movie.release_year
            );
            if let Some(genre) = &movie.genre {
                let _ = write!(body, " | {}", escape_html(genre));
            }
            body.push_str("</li>\n");
        }
        body.push_str("</ol>\n");
    }

    if view.has_more {
        let _ = writeln!(
            body,
            "<p><a href=\"{}\">Next</a></p>",
            escape_html(&view.next_url)
        );
    }
    body.push_str("<p><a href=\"/\">Back</a></p>\n");
    layout(view.title, &body)
}

fn stats_table(body: &mut String, heading: &str, rows: &[StatsRow], with_count: bool) {
    let _ = writeln!(body, "<h2>{}</h2>", escape_html(heading));
    if rows.is_empty() {
        body.push_str("<p>No searches logged yet.</p>\n");
        return;
    }

    body.push_str("<table>\n<tr>");
    if with_count {
        body.push_str("<th>Count</th>");
    }
    body.push_str("<th>Type</th><th>Params</th><th>Rows</th><th>Last run</th></tr>\n");
    for row in rows {
        body.push_str("<tr>");
        if with_count {
            let _ = write!(body, "<td>{}</td>", row.count);
        }
        let _ = writeln!(
            body,
            "<td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.search_query.kind(),
            escape_html(&row.search_query.params_json()),
            row.results_count,
            escape_html(&row.timestamp)
        );
    }
    body.push_str("</table>\n");
}

pub(crate) fn stats_page(report: &StatsReport) -> String {
    let mut body = String::new();
    stats_table(
        &mut body,
        "Top searches by frequency",
        &report.top_by_frequency,
        true,
    );
    stats_table(&mut body, "Last unique searches", &report.last_unique, false);
    body.push_str("<p><a href=\"/\">Back</a></p>\n");
    layout("Search statistics", &body)
}

pub(crate) fn error_page(message: &str) -> String {
    let body = format!(
        "<p>{}</p>\n<p><a href=\"/\">Back</a></p>\n",
        escape_html(message)
    );
    layout("Something went wrong", &body)
}
