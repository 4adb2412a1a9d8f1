//! Datalogger timestamp parsing and time zone conversion.
//!
//! Two raw encodings are supported:
//!
//! - **Legacy** (CR10X mixed arrays): separate year, day-of-year and a
//!   compact hour-minute column, e.g. `2020,45,830` for 2020-02-14 08:30.
//! - **Modern** (CR1000 tables): a single, usually quoted,
//!   `YYYY-MM-DD HH:MM:SS` string.
//!
//! Naive timestamps are localised to the logger's configured time zone and
//! optionally converted to UTC. A value that cannot be parsed never fails
//! the file: it is replaced by the UNIX epoch and a warning is logged.

use crate::constants::{LEGACY_TIME_FORMAT_LIBRARY, MODERN_TIME_FORMAT};
use crate::error::{FormatterError, Result};
use crate::models::{ColumnKey, Dataset, Row, Value};
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use tracing::warn;

/// Raw time encoding, selected by logger model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    Legacy,
    Modern,
}

/// One element of a time format library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeToken {
    Year,
    DayOfYear,
    HourMinute,
    DateTime,
}

impl TimeToken {
    fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "%Y" => Some(TimeToken::Year),
            "%j" => Some(TimeToken::DayOfYear),
            "%H%M" | "HourMinute" | "hourminute" => Some(TimeToken::HourMinute),
            MODERN_TIME_FORMAT => Some(TimeToken::DateTime),
            _ => None,
        }
    }

    fn format_code(self) -> &'static str {
        match self {
            TimeToken::Year => "%Y",
            TimeToken::DayOfYear => "%j",
            TimeToken::HourMinute => "%H:%M",
            TimeToken::DateTime => MODERN_TIME_FORMAT,
        }
    }
}

/// Ordered time tokens, paired positionally with raw column values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormatSpec {
    format: TimeFormat,
    tokens: Vec<TimeToken>,
}

/// A raw time value that did not match its expected format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unparseable {
    pub value: String,
    pub format: String,
}

impl fmt::Display for Unparseable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' does not match format '{}'", self.value, self.format)
    }
}

impl TimeFormatSpec {
    /// Build a spec from a configured library, or the format's default library
    pub fn resolve(format: TimeFormat, library: Option<&[String]>) -> Result<Self> {
        let tokens = match library {
            Some(library) => library
                .iter()
                .map(|t| {
                    TimeToken::parse(t).ok_or_else(|| FormatterError::InvalidTimeFormat {
                        reason: format!("unknown time format token '{}'", t),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => match format {
                TimeFormat::Legacy => LEGACY_TIME_FORMAT_LIBRARY
                    .iter()
                    .filter_map(|t| TimeToken::parse(t))
                    .collect(),
                TimeFormat::Modern => vec![TimeToken::DateTime],
            },
        };

        match format {
            TimeFormat::Legacy => {
                if tokens.first() != Some(&TimeToken::Year)
                    || tokens.len() > 3
                    || tokens.contains(&TimeToken::DateTime)
                {
                    return Err(FormatterError::InvalidTimeFormat {
                        reason: format!(
                            "legacy time format must be a prefix of [%Y, %j, %H%M], got {:?}",
                            library.unwrap_or_default()
                        ),
                    });
                }
            }
            TimeFormat::Modern => {
                if tokens != [TimeToken::DateTime] {
                    return Err(FormatterError::InvalidTimeFormat {
                        reason: format!(
                            "modern time format must be ['{}'], got {:?}",
                            MODERN_TIME_FORMAT,
                            library.unwrap_or_default()
                        ),
                    });
                }
            }
        }

        Ok(Self { format, tokens })
    }

    pub fn legacy() -> Self {
        Self {
            format: TimeFormat::Legacy,
            tokens: vec![TimeToken::Year, TimeToken::DayOfYear, TimeToken::HourMinute],
        }
    }

    pub fn modern() -> Self {
        Self {
            format: TimeFormat::Modern,
            tokens: vec![TimeToken::DateTime],
        }
    }

    pub fn format(&self) -> TimeFormat {
        self.format
    }

    /// Parse raw column values into a naive timestamp
    pub fn parse_naive(&self, values: &[&str]) -> std::result::Result<NaiveDateTime, Unparseable> {
        match self.format {
            TimeFormat::Legacy => self.parse_legacy(values),
            TimeFormat::Modern => parse_modern(values),
        }
    }

    fn parse_legacy(&self, values: &[&str]) -> std::result::Result<NaiveDateTime, Unparseable> {
        let unparseable = || Unparseable {
            value: values.join(","),
            format: self
                .tokens
                .iter()
                .map(|t| t.format_code())
                .collect::<Vec<_>>()
                .join(","),
        };

        if values.is_empty() || values.len() > self.tokens.len() {
            return Err(unparseable());
        }

        let mut formats = Vec::with_capacity(3);
        let mut parts = Vec::with_capacity(3);
        let mut next_day = false;

        for (token, value) in self.tokens.iter().zip(values) {
            let value = value.trim();
            match token {
                TimeToken::HourMinute => {
                    let (hour_minute, rollover) =
                        decode_hour_minute(value).ok_or_else(unparseable)?;
                    next_day = rollover;
                    parts.push(hour_minute);
                }
                _ => parts.push(value.to_string()),
            }
            formats.push(token.format_code());
        }

        if !formats.contains(&"%H:%M") {
            formats.push("%H:%M");
            parts.push("00:00".to_string());
        }

        let format = formats.join(",");
        let text = parts.join(",");
        let parsed = NaiveDateTime::parse_from_str(&text, &format).map_err(|_| unparseable())?;

        Ok(if next_day {
            parsed + Duration::days(1)
        } else {
            parsed
        })
    }
}

fn parse_modern(values: &[&str]) -> std::result::Result<NaiveDateTime, Unparseable> {
    let raw = values.first().copied().unwrap_or_default();
    let text = raw.trim().trim_matches('"');
    NaiveDateTime::parse_from_str(text, MODERN_TIME_FORMAT).map_err(|_| Unparseable {
        value: text.to_string(),
        format: MODERN_TIME_FORMAT.to_string(),
    })
}

/// Expand the compact hour-minute token by its length
///
/// The logger drops leading zeros, so `5` is 00:05, `30` is 00:30, `830`
/// is 08:30 and `1245` is 12:45. `2400` marks midnight at the end of the
/// day and is returned as `00:00` with the rollover flag set.
pub fn decode_hour_minute(raw: &str) -> Option<(String, bool)> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let decoded = match raw.len() {
        1 => format!("00:0{}", raw),
        2 => format!("00:{}", raw),
        3 => format!("0{}:{}", &raw[..1], &raw[1..]),
        4 => format!("{}:{}", &raw[..2], &raw[2..]),
        _ => return None,
    };

    if decoded == "24:00" {
        Some(("00:00".to_string(), true))
    } else {
        Some((decoded, false))
    }
}

/// Attach a time zone to a naive local timestamp
///
/// Ambiguous wall-clock times (the repeated hour when clocks go back)
/// resolve to standard time. Times skipped by a forward shift are moved
/// one hour later.
pub fn localize(naive: NaiveDateTime, time_zone: Tz) -> Option<DateTime<Tz>> {
    match time_zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(_, standard) => Some(standard),
        LocalResult::None => time_zone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// UNIX epoch expressed in the given time zone
pub fn epoch_sentinel(time_zone: Tz) -> DateTime<Tz> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&time_zone)
}

/// Parses raw time columns for one logger
#[derive(Debug, Clone)]
pub struct TimeParser {
    spec: TimeFormatSpec,
    time_zone: Tz,
    to_utc: bool,
}

impl TimeParser {
    pub fn new(spec: TimeFormatSpec, time_zone: Tz, to_utc: bool) -> Self {
        Self {
            spec,
            time_zone,
            to_utc,
        }
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Parse, localise and optionally convert to UTC
    pub fn try_parse(&self, values: &[&str]) -> std::result::Result<DateTime<Tz>, Unparseable> {
        let naive = self.spec.parse_naive(values)?;
        let local = localize(naive, self.time_zone).ok_or_else(|| Unparseable {
            value: naive.to_string(),
            format: format!("local time in {}", self.time_zone),
        })?;
        Ok(self.finish(local))
    }

    /// Like [`try_parse`](Self::try_parse) but substitutes the epoch on failure
    pub fn parse(&self, values: &[&str]) -> DateTime<Tz> {
        match self.try_parse(values) {
            Ok(dt) => dt,
            Err(err) => {
                warn!("Unable to parse time: {}; substituting epoch", err);
                self.finish(epoch_sentinel(self.time_zone))
            }
        }
    }

    fn finish(&self, dt: DateTime<Tz>) -> DateTime<Tz> {
        if self.to_utc {
            dt.with_timezone(&Tz::UTC)
        } else {
            dt
        }
    }

    /// Parse the time columns of every row into `parsed_column`
    ///
    /// An existing `parsed_column` is replaced where it stands; otherwise
    /// the timestamp is inserted in front of the first time column. Raw
    /// time columns are left untouched.
    pub fn parse_dataset(
        &self,
        data: Dataset,
        time_columns: &[ColumnKey],
        parsed_column: &str,
    ) -> Dataset {
        data.into_iter()
            .map(|row| self.parse_row(row, time_columns, parsed_column))
            .collect()
    }

    /// Parse the timestamp held by `time_columns` of one row
    pub fn parse_columns(&self, row: &Row, time_columns: &[ColumnKey]) -> DateTime<Tz> {
        let raw: Vec<String> = time_columns
            .iter()
            .map(|key| match row.get(key) {
                Some(Value::Text(text)) => text.clone(),
                Some(Value::Float(v)) => v.to_string(),
                Some(Value::Timestamp(ts)) => ts.naive_local().format(MODERN_TIME_FORMAT).to_string(),
                None => String::new(),
            })
            .collect();
        let values: Vec<&str> = raw.iter().map(String::as_str).collect();
        self.parse(&values)
    }

    fn parse_row(&self, mut row: Row, time_columns: &[ColumnKey], parsed_column: &str) -> Row {
        let parsed = Value::Timestamp(self.parse_columns(&row, time_columns));

        let position = time_columns
            .iter()
            .find_map(|key| row.position(key))
            .unwrap_or(row.len());
        row.insert_at(position, ColumnKey::from(parsed_column), parsed);
        row
    }
}
