use std::io::{self, BufRead, Write};

use marquee_search::{
    parse_year_range, resolve_genre, MovieRecord, Pager, SearchError, SearchQuery, SearchService,
    StatsRow, YearRange,
};

const MAIN_CHOICES: &[&str] = &["0", "1", "2", "3"];
const STATS_CHOICES: &[&str] = &["0", "1", "2"];
const YES_ANSWERS: &[&str] = &["y", "yes", "да", "д"];

/// Whether the session should keep reading menu choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Menu,
    Quit,
}

/// Interactive menu over a line-oriented input and an output sink.
pub struct Console<R, W> {
    service: SearchService,
    input: R,
    out: W,
}

fn read_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    YES_ANSWERS.contains(&answer.as_str())
}

fn format_movie(movie: &MovieRecord) -> String {
    match &movie.genre {
        Some(genre) => format!("{} ({}) | {}", movie.title, movie.release_year, genre),
        None => format!("{} ({})", movie.title, movie.release_year),
    }
}

fn format_top_row(row: &StatsRow) -> String {
    format!("{}x | {}", row.count, format_last_row(row))
}

fn format_last_row(row: &StatsRow) -> String {
    format!(
        "{} | {} | rows={} | {}",
        row.search_query.kind(),
        row.search_query.params_json(),
        row.results_count,
        row.timestamp
    )
}

struct ConsolePager<'a, R, W> {
    input: &'a mut R,
    out: &'a mut W,
    page_size: u32,
    shown: usize,
}

impl<R: BufRead, W: Write> Pager for ConsolePager<'_, R, W> {
    fn show_page(&mut self, rows: &[MovieRecord]) -> io::Result<()> {
        if rows.is_empty() {
            let message = if self.shown == 0 { "No results." } else { "No more results." };
            writeln!(self.out, "{message}")?;
        }
        for movie in rows {
            writeln!(self.out, "{}", format_movie(movie))?;
        }
        self.shown += rows.len();
        Ok(())
    }

    fn should_continue(&mut self) -> io::Result<bool> {
        let prompt = format!("Show next {}? (y/n): ", self.page_size);
        Ok(read_line(&mut *self.input, &mut *self.out, &prompt)?
            .map(|answer| is_yes(&answer))
            .unwrap_or(false))
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(service: SearchService, input: R, out: W) -> Self {
        Self {
            service,
            input,
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        read_line(&mut self.input, &mut self.out, prompt)
    }

    fn read_choice(&mut self, allowed: &[&str]) -> io::Result<Option<String>> {
        loop {
            let Some(value) = self.prompt("Your choice: ")? else {
                return Ok(None);
            };
            if allowed.contains(&value.as_str()) {
                return Ok(Some(value));
            }
            writeln!(self.out, "Wrong input. Allowed: {}", allowed.join(", "))?;
        }
    }

    /// Runs the main menu until `0` or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(
                self.out,
                "\n=== Movies Search ===
Please input 1, 2, 3 or 0:
1: Search by keyword (title)
2: Search by genre and years range
3: View statistics
0: Exit"
            )?;

            let outcome = match self.read_choice(MAIN_CHOICES)?.as_deref() {
                Some("1") => self.keyword_flow().await,
                Some("2") => self.genre_years_flow().await,
                Some("3") => self.stats_flow().await,
                _ => Ok(Flow::Quit),
            };

            match outcome {
                Ok(Flow::Menu) => {}
                Ok(Flow::Quit) => break,
                Err(SearchError::Repo(err)) => writeln!(self.out, "Error: {err}")?,
                Err(SearchError::Io(err)) => return Err(err),
            }
        }

        writeln!(self.out, "Bye!")?;
        self.out.flush()
    }

    async fn run_search(&mut self, query: SearchQuery) -> Result<Flow, SearchError> {
        let Self {
            service,
            input,
            out,
        } = self;
        let mut pager = ConsolePager {
            input,
            out,
            page_size: service.page_size(),
            shown: 0,
        };
        service.run(&query, 1, &mut pager).await?;
        Ok(Flow::Menu)
    }

    async fn keyword_flow(&mut self) -> Result<Flow, SearchError> {
        let Some(keyword) = self.prompt("Enter keyword: ")? else {
            return Ok(Flow::Quit);
        };
        if keyword.is_empty() {
            writeln!(self.out, "Empty keyword. Back to menu.")?;
            return Ok(Flow::Menu);
        }

        self.run_search(SearchQuery::keyword(keyword)).await
    }

    async fn genre_years_flow(&mut self) -> Result<Flow, SearchError> {
        let choices = self.service.genre_choices().await?;
        let (min_y, max_y) = self.service.year_bounds().await?;

        writeln!(self.out, "Genres:")?;
        writeln!(self.out, "{}", choices.join(", "))?;
        writeln!(self.out, "Years in DB: {min_y}-{max_y}")?;

        let Some(raw_genre) = self.prompt("Enter genre exactly: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(genre) = resolve_genre(&raw_genre, &choices) else {
            writeln!(self.out, "Genre not found. Back to menu.")?;
            return Ok(Flow::Menu);
        };

        let years = loop {
            let Some(raw) = self.prompt("Enter year or range (e.g. 2005-2012): ")? else {
                return Ok(Flow::Quit);
            };
            match parse_year_range(&raw, min_y, max_y) {
                Ok((from, to)) => break YearRange::new(from, to),
                Err(err) => writeln!(self.out, "Error: {err}")?,
            }
        };

        self.run_search(SearchQuery::genre_years(genre, years)).await
    }

    async fn stats_flow(&mut self) -> Result<Flow, SearchError> {
        let limit = self.service.stats_limit();
        loop {
            writeln!(
                self.out,
                "\n=== Statistics ===\n1: Top {limit} by frequency\n2: Last {limit} unique searches\n0: Back"
            )?;

            let rows = match self.read_choice(STATS_CHOICES)?.as_deref() {
                Some("1") => self
                    .service
                    .top_by_frequency()
                    .await?
                    .iter()
                    .map(format_top_row)
                    .collect::<Vec<_>>(),
                Some("2") => self
                    .service
                    .last_unique()
                    .await?
                    .iter()
                    .map(format_last_row)
                    .collect(),
                Some(_) => return Ok(Flow::Menu),
                None => return Ok(Flow::Quit),
            };

            if rows.is_empty() {
                writeln!(self.out, "No searches logged yet.")?;
            }
            for line in rows {
                writeln!(self.out, "{line}")?;
            }
        }
    }
}
