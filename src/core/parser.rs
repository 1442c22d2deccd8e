use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Field bundle produced from one well-formed CSV line. The ingestion loop
/// turns this into a registered alert by assigning an id, a sequence code
/// and a dispatch decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAlert {
    pub name: String,
    pub serial: String,
    pub timestamp: DateTime<Utc>,
    pub position: String,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected 6 fields, got {count} in line {line:?}")]
    FieldCount { count: usize, line: String },
    #[error("unparseable timestamp {time:?} {date:?} in line {line:?}")]
    BadTimestamp {
        time: String,
        date: String,
        line: String,
    },
}

const DATE_FORMAT: &str = "%d/%m/%Y";

lazy_static! {
    // Sensor reports wrap the classification in boilerplate, e.g.
    // `LABELLED AS "INTRUDER"`.
    static ref LABEL_MARKER: Regex = Regex::new(r#"(?i)\s*\bLABELLED\s+AS\b\s*"#).unwrap();
}

fn scrub_label(raw: &str) -> String {
    let stripped = LABEL_MARKER.replace_all(raw, " ");
    stripped.replace(['"', '\''], "").trim().to_string()
}

fn combine_timestamp(time: &str, date: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(time, "%H%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Parse one raw log line into its six fields:
/// name, serial, time-of-day, date, position, label.
///
/// The position is a `lat,long` pair in real sensor output, so a seven-part
/// comma split is accepted by rejoining the two position halves. Anything
/// else off six fields is an error; the caller skips the line and continues.
pub fn parse_line(line: &str) -> Result<ParsedAlert, ParseError> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();

    let (position, label) = match parts.len() {
        6 => (parts[4].to_string(), parts[5]),
        7 => (format!("{},{}", parts[4], parts[5]), parts[6]),
        count => {
            return Err(ParseError::FieldCount {
                count,
                line: line.to_string(),
            })
        }
    };

    let (time, date) = (parts[2], parts[3]);
    let timestamp = combine_timestamp(time, date).ok_or_else(|| ParseError::BadTimestamp {
        time: time.to_string(),
        date: date.to_string(),
        line: line.to_string(),
    })?;

    Ok(ParsedAlert {
        name: parts[0].to_string(),
        serial: parts[1].to_string(),
        timestamp,
        position,
        label: scrub_label(label),
    })
}
