//! Filters and functions available to every template set.
//!
//! | name          | kind     | use                                     |
//! |---------------|----------|-----------------------------------------|
//! | `md5`         | filter   | `{{ id|md5 }}`                          |
//! | `substr`      | filter   | `{{ id|md5|substr(0, 2) }}`             |
//! | `tex`         | filter   | `{{ title|tex }}`                       |
//! | `flickr_date` | function | `{{ flickr_date(taken.date, taken.granularity_code) }}` |

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use minijinja::{Environment, ErrorKind, Value};
use regex::{Captures, Regex};

use crate::checksum::{hash_str, HashAlgorithm};
use crate::contract::Granularity;
use crate::error::RenderError;

pub fn register(env: &mut Environment<'static>) {
    env.add_filter("md5", md5_filter);
    env.add_filter("substr", substr);
    env.add_filter("tex", tex_escape);
    env.add_function("flickr_date", flickr_date);
}

fn md5_filter(value: Value) -> String {
    hash_str(&value.to_string(), HashAlgorithm::Md5)
}

/// Character substring with negative-index semantics: a negative `start` counts from the
/// end, a negative `length` stops that many characters before the end.
pub fn substr(value: &str, start: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len() as i64;

    let begin = if start < 0 { (len + start).max(0) } else { start };
    if begin >= len {
        return String::new();
    }
    let end = match length {
        None => len,
        Some(l) if l < 0 => len + l,
        Some(l) => (begin + l).min(len),
    };
    if end <= begin {
        return String::new();
    }
    chars[begin as usize..end as usize].iter().collect()
}

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup regex"))
}

fn tex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\\(\s)?|"(\s)?|>>|[&%$_^#]"#).expect("valid tex regex"))
}

/// Escape text for LaTeX output.
///
/// Markup is stripped first. All substitutions then happen in a single pass, so the
/// backslashes introduced by one rule are never seen by another.
pub fn tex_escape(value: &str) -> String {
    let stripped = markup_re().replace_all(value, "");
    tex_re()
        .replace_all(&stripped, |caps: &Captures| {
            let matched = &caps[0];
            if matched.starts_with('\\') {
                return match caps.get(1) {
                    Some(ws) => format!("\\textbackslash\\ {}", ws.as_str()),
                    None => "\\textbackslash ".to_string(),
                };
            }
            if matched.starts_with('"') {
                return match caps.get(2) {
                    Some(ws) => format!("\\textquotedbl\\ {}", ws.as_str()),
                    None => "\\textquotedbl ".to_string(),
                };
            }
            match matched {
                ">>" => "\\textgreater\\textgreater ",
                "&" => "\\&",
                "%" => "\\%",
                "$" => "\\textdollar ",
                "_" => "\\_",
                "^" => "\\^",
                "#" => "\\#",
                other => other,
            }
            .to_string()
        })
        .into_owned()
}

fn parse_taken(time: &str) -> Result<NaiveDateTime, RenderError> {
    let time = time.trim();
    NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(time, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map_err(|_| RenderError::InvalidDate(time.to_string()))
}

/// Format a taken date at the precision its granularity allows.
pub fn format_taken_date(time: &str, granularity: Granularity) -> Result<String, RenderError> {
    let taken = parse_taken(time)?;
    let pattern = match granularity {
        Granularity::Exact => "%Y %b %-d %-I:%M %P",
        Granularity::Month => "%Y %b",
        Granularity::Year => "%Y",
        Granularity::Circa => "c.~%Y",
    };
    Ok(taken.format(pattern).to_string())
}

/// Template function form of [`format_taken_date`], taking the numeric granularity code.
pub fn flickr_date(time: &str, granularity: i64) -> Result<String, minijinja::Error> {
    let granularity = Granularity::from_code(granularity).ok_or_else(|| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            RenderError::UnknownGranularity(granularity).to_string(),
        )
    })?;
    format_taken_date(time, granularity)
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substr_follows_negative_index_rules() {
        assert_eq!(substr("202cb962", 0, Some(2)), "20");
        assert_eq!(substr("202cb962", 2, Some(2)), "2c");
        assert_eq!(substr("202cb962", -3, None), "962");
        assert_eq!(substr("202cb962", 1, Some(-5)), "02");
        assert_eq!(substr("abc", 5, Some(1)), "");
    }

    #[test]
    fn tex_escapes_specials_once() {
        assert_eq!(
            tex_escape("50% of $5 & more_stuff #1 ^2"),
            "50\\% of \\textdollar 5 \\& more\\_stuff \\#1 \\^2"
        );
        assert_eq!(tex_escape("a >> b"), "a \\textgreater\\textgreater  b");
    }

    #[test]
    fn tex_distinguishes_following_whitespace() {
        assert_eq!(tex_escape("a\\b"), "a\\textbackslash b");
        assert_eq!(tex_escape("a\\ b"), "a\\textbackslash\\  b");
        assert_eq!(tex_escape("say \"hi"), "say \\textquotedbl hi");
        assert_eq!(tex_escape("x\" y"), "x\\textquotedbl\\  y");
    }

    #[test]
    fn tex_does_not_reescape_its_own_output() {
        // A single pass: the backslash rule must not touch the `\_` produced for `_`.
        assert_eq!(tex_escape("\\_"), "\\textbackslash \\_");
    }

    #[test]
    fn tex_strips_markup() {
        assert_eq!(tex_escape("<b>bold</b> & <i>it</i>"), "bold \\& it");
    }

    #[test]
    fn formats_each_granularity() {
        assert_eq!(
            format_taken_date("2019-01-01 13:45:00", Granularity::Exact).unwrap(),
            "2019 Jan 1 1:45 pm"
        );
        assert_eq!(
            format_taken_date("2019-07-14 00:00:00", Granularity::Month).unwrap(),
            "2019 Jul"
        );
        assert_eq!(
            format_taken_date("2019-07-14 00:00:00", Granularity::Year).unwrap(),
            "2019"
        );
        assert_eq!(
            format_taken_date("1975-01-01 00:00:00", Granularity::Circa).unwrap(),
            "c.~1975"
        );
    }

    #[test]
    fn year_granularity_ignores_month_and_day() {
        for date in ["2019-01-01 00:00:00", "2019-12-31 23:59:59", "2019-06-15"] {
            assert_eq!(format_taken_date(date, Granularity::Year).unwrap(), "2019");
        }
    }

    #[test]
    fn unknown_granularity_is_rejected() {
        let err = flickr_date("2019-01-01 13:45:00", 3).unwrap_err();
        assert!(err.to_string().contains("unknown date granularity 3"));
    }

    #[test]
    fn month_code_two_formats_as_month() {
        assert_eq!(flickr_date("2019-07-14 00:00:00", 2).unwrap(), "2019 Jul");
    }

    #[test]
    fn unparsable_date_is_rejected() {
        assert!(matches!(
            format_taken_date("last tuesday", Granularity::Exact),
            Err(RenderError::InvalidDate(_))
        ));
    }
}
