use crate::error::YearRangeError;

/// Parses `YYYY` or `YYYY-YYYY` into an ordered, bounds-checked pair.
pub fn parse_year_range(raw: &str, min_y: i32, max_y: i32) -> Result<(i32, i32), YearRangeError> {
    let raw = raw.trim();
    let (a, b) = match raw.split_once('-') {
        Some((left, right)) => (parse_year(left)?, parse_year(right)?),
        None => {
            let year = parse_year(raw)?;
            (year, year)
        }
    };

    let (from, to) = if a > b { (b, a) } else { (a, b) };

    if from < min_y || to > max_y {
        return Err(YearRangeError::Range {
            min: min_y,
            max: max_y,
        });
    }

    Ok((from, to))
}

fn parse_year(token: &str) -> Result<i32, YearRangeError> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(YearRangeError::Format(format!(
            "`{token}` is not a year; expected YYYY or YYYY-YYYY"
        )));
    }
    token
        .parse::<i32>()
        .map_err(|_| YearRangeError::Format(format!("`{token}` is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_year_expands_to_pair() {
        assert_eq!(parse_year_range("2010", 1990, 2025), Ok((2010, 2010)));
    }

    #[test]
    fn range_is_returned_as_is() {
        assert_eq!(parse_year_range("2005-2012", 1990, 2025), Ok((2005, 2012)));
    }

    #[test]
    fn swapped_range_is_normalized() {
        assert_eq!(parse_year_range("2012-2005", 1990, 2025), Ok((2005, 2012)));
    }

    #[test]
    fn whitespace_around_tokens_is_ignored() {
        assert_eq!(
            parse_year_range("  2005 -  2012 ", 1990, 2025),
            Ok((2005, 2012))
        );
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        assert_eq!(
            parse_year_range("1800-1900", 1990, 2025),
            Err(YearRangeError::Range {
                min: 1990,
                max: 2025
            })
        );
        assert!(matches!(
            parse_year_range("2020-2030", 1990, 2025),
            Err(YearRangeError::Range { .. })
        ));
    }

    #[test]
    fn malformed_tokens_are_format_errors() {
        for raw in ["20aa-2012", "", "-", "2010-", "+2010", "-2010", "2005-2010-2012", "twenty"] {
            assert!(
                matches!(
                    parse_year_range(raw, 1990, 2025),
                    Err(YearRangeError::Format(_))
                ),
                "expected format error for {raw:?}"
            );
        }
    }

    #[test]
    fn range_error_message_names_bounds() {
        let err = parse_year_range("1800", 1990, 2025).expect_err("out of range");
        assert_eq!(err.to_string(), "Years must be within 1990-2025");
    }
}
