//! Date patterns.
//!
//! Patterns use the familiar letter syntax (`yyyy-MM-dd`, `dd/MM/yy`, `d MMM yyyy`) and are
//! compiled once into a `chrono` format string.

use chrono::{Datelike, NaiveDate};

use crate::error::{ConvertError, ConvertResult};

use super::ValueError;

/// Default pattern for date fields.
pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd";

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A compiled date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    format: String,
    /// Shape of each pattern element, checked before `chrono` parses the text.
    shape: Vec<Element>,
}

/// One element of a compiled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    /// A numeric field of `min..=max` digits.
    Digits { min: usize, max: usize },
    /// A month or weekday name.
    Word,
    Literal(char),
}

/// Widest year `chrono` reads without an explicit sign.
const MAX_YEAR_DIGITS: usize = 4;

impl DatePattern {
    /// Compile a letter pattern.
    ///
    /// Supported letters: `y`/`u` (year; `yy` is two-digit), `M`/`L` (month; `MMM` abbreviated
    /// name, `MMMM` full name), `d` (day of month), `D` (day of year), `E` (weekday name).
    /// Text inside single quotes is literal; `''` is a quote.
    pub fn compile(pattern: &str) -> ConvertResult<Self> {
        if pattern.trim().is_empty() {
            return Err(ConvertError::config("date pattern is empty"));
        }

        let chars: Vec<char> = pattern.chars().collect();
        let mut format = String::with_capacity(pattern.len() * 2);
        let mut shape = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                if chars.get(i + 1) == Some(&'\'') {
                    format.push('\'');
                    shape.push(Element::Literal('\''));
                    i += 2;
                    continue;
                }
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '\'')
                    .ok_or_else(|| {
                        ConvertError::config(format!("unterminated quote in date pattern '{pattern}'"))
                    })?;
                for &ch in &chars[i + 1..i + 1 + close] {
                    push_literal(&mut format, ch);
                    shape.push(Element::Literal(ch));
                }
                i += close + 2;
                continue;
            }
            if !c.is_ascii_alphabetic() {
                push_literal(&mut format, c);
                shape.push(Element::Literal(c));
                i += 1;
                continue;
            }

            let run = chars[i..].iter().take_while(|&&ch| ch == c).count();
            let digits = |min, max| Element::Digits { min, max };
            let (spec, element) = match (c, run) {
                ('y' | 'u', 2) => ("%y", digits(2, 2)),
                ('y' | 'u', _) => ("%Y", digits(run, MAX_YEAR_DIGITS.max(run))),
                ('M' | 'L', 1) => ("%m", digits(1, 2)),
                ('M' | 'L', 2) => ("%m", digits(2, 2)),
                ('M' | 'L', 3) => ("%b", Element::Word),
                ('M' | 'L', _) => ("%B", Element::Word),
                ('d', 1) => ("%d", digits(1, 2)),
                ('d', 2) => ("%d", digits(2, 2)),
                ('D', 1..=3) => ("%j", digits(run, 3)),
                ('E', 1..=3) => ("%a", Element::Word),
                ('E', _) => ("%A", Element::Word),
                _ => {
                    return Err(ConvertError::config(format!(
                        "unsupported date pattern letter '{}' (x{run}) in '{pattern}'",
                        c
                    )));
                }
            };
            format.push_str(spec);
            shape.push(element);
            i += run;
        }

        Ok(Self {
            source: pattern.to_string(),
            format,
            shape,
        })
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parse text into a calendar date.
    ///
    /// Numeric fields must have the width the pattern gives them: `MM` takes exactly two digits,
    /// `yyyy` exactly four, while `M` and `d` take one or two.
    pub fn parse(&self, text: &str) -> Result<NaiveDate, ValueError> {
        let text = text.trim();
        if !self.shape_matches(text) {
            return Err(ValueError::Parse(format!(
                "expected a date matching '{}'",
                self.source
            )));
        }
        NaiveDate::parse_from_str(text, &self.format).map_err(|e| {
            ValueError::Parse(format!("expected a date matching '{}': {e}", self.source))
        })
    }

    fn shape_matches(&self, text: &str) -> bool {
        let mut rest = text;
        for element in &self.shape {
            let taken = match *element {
                Element::Digits { min, max } => {
                    let n = rest.bytes().take(max).take_while(u8::is_ascii_digit).count();
                    if n < min {
                        return false;
                    }
                    n
                }
                Element::Word => {
                    let n = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
                    if n == 0 {
                        return false;
                    }
                    n
                }
                Element::Literal(c) if c.is_whitespace() => {
                    let n = rest.len() - rest.trim_start().len();
                    if n == 0 {
                        return false;
                    }
                    n
                }
                Element::Literal(c) => {
                    if !rest.starts_with(c) {
                        return false;
                    }
                    c.len_utf8()
                }
            };
            rest = &rest[taken..];
        }
        rest.is_empty()
    }

    /// Parse text into days since 1970-01-01.
    pub fn parse_days(&self, text: &str) -> Result<i32, ValueError> {
        self.parse(text).map(days_since_epoch)
    }

    /// Render a date in this pattern.
    pub fn format(&self, date: NaiveDate) -> String {
        date.format(&self.format).to_string()
    }
}

impl Default for DatePattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_DATE_PATTERN.to_string(),
            format: "%Y-%m-%d".to_string(),
            shape: vec![
                Element::Digits { min: 4, max: MAX_YEAR_DIGITS },
                Element::Literal('-'),
                Element::Digits { min: 2, max: 2 },
                Element::Literal('-'),
                Element::Digits { min: 2, max: 2 },
            ],
        }
    }
}

/// Days between 1970-01-01 and `date` (negative before the epoch).
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn push_literal(format: &mut String, c: char) {
    if c == '%' {
        format.push_str("%%");
    } else {
        format.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_matches_compiled_iso_pattern() {
        assert_eq!(DatePattern::compile(DEFAULT_DATE_PATTERN).unwrap(), DatePattern::default());
    }

    #[test]
    fn iso_dates_encode_as_epoch_days() {
        let p = DatePattern::default();
        assert_eq!(p.parse_days("1970-01-01").unwrap(), 0);
        assert_eq!(p.parse_days("1969-12-31").unwrap(), -1);
        assert_eq!(p.parse_days("2023-01-02").unwrap(), 19_359);
        assert_eq!(p.parse_days("2023-06-15").unwrap(), 19_523);
    }

    #[test]
    fn mismatched_text_is_parse_error() {
        let p = DatePattern::default();
        assert!(matches!(p.parse_days("15/06/2023"), Err(ValueError::Parse(_))));
        assert!(matches!(p.parse_days("2023-02-30"), Err(ValueError::Parse(_))));
    }

    #[test]
    fn numeric_fields_keep_their_width() {
        let p = DatePattern::default();
        assert!(matches!(p.parse_days("23-06-15"), Err(ValueError::Parse(_))));
        assert!(matches!(p.parse_days("2023-6-5"), Err(ValueError::Parse(_))));
        assert!(matches!(p.parse_days("2023-006-15"), Err(ValueError::Parse(_))));
        assert_eq!(p.parse_days(" 2023-06-15 ").unwrap(), 19_523);

        let p = DatePattern::compile("d/M/yyyy").unwrap();
        assert_eq!(p.parse_days("5/6/2023").unwrap(), 19_513);
        assert_eq!(p.parse_days("05/06/2023").unwrap(), 19_513);
        assert!(p.parse_days("5/6/23").is_err());

        let p = DatePattern::compile("yyyyMMdd").unwrap();
        assert_eq!(p.parse_days("20230615").unwrap(), 19_523);
        assert!(p.parse_days("2023615").is_err());
    }

    #[test]
    fn custom_patterns_translate() {
        let p = DatePattern::compile("dd/MM/yyyy").unwrap();
        assert_eq!(p.parse_days("15/06/2023").unwrap(), 19_523);

        let p = DatePattern::compile("d MMM yyyy").unwrap();
        assert_eq!(p.parse_days("2 Jan 2023").unwrap(), 19_359);

        let p = DatePattern::compile("yyyy'T'MMdd").unwrap();
        assert_eq!(p.parse_days("2023T0615").unwrap(), 19_523);
        assert_eq!(p.format(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()), "2023T0102");
    }

    #[test]
    fn rejects_unknown_letters_and_bad_quotes() {
        assert!(DatePattern::compile("yyyy-MM-dd HH:mm").is_err());
        assert!(DatePattern::compile("yyyy'oops").is_err());
        assert!(DatePattern::compile("  ").is_err());
    }
}
