//! CSV price loading.
//!
//! Expected format: a header row `timestamp,<symbol1>,<symbol2>` followed
//! by one row per bar. Timestamps are RFC 3339 or `YYYY-MM-DD`; the two
//! header symbol names label the legs in logs and reports. Malformed rows
//! are skipped with a warning; price validity is enforced by
//! `PricePair::validate` after the file is read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use common::{PriceObservation, PricePair};

/// Load an aligned price pair from a CSV file.
pub fn load_price_pair<P: AsRef<Path>>(path: P) -> anyhow::Result<PricePair> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .transpose()?
        .with_context(|| format!("{} is empty", path.display()))?;
    let mut pair = parse_header(&header)?;

    for (i, line) in lines.enumerate() {
        // Row i sits on file line i + 2: one-based, after the header.
        let line_number = i + 2;
        let line = line.with_context(|| format!("failed to read line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(&line) {
            Some(obs) => pair.observations.push(obs),
            None => warn!(line = line_number, file = %path.display(), "skipping malformed row"),
        }
    }

    pair.validate()?;
    info!(
        file = %path.display(),
        pair = %format!("{}/{}", pair.symbol1, pair.symbol2),
        bars = pair.len(),
        "loaded price series"
    );
    Ok(pair)
}

fn parse_header(header: &str) -> anyhow::Result<PricePair> {
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns.len() != 3 || !columns[0].eq_ignore_ascii_case("timestamp") {
        bail!("expected header 'timestamp,<symbol1>,<symbol2>', got '{header}'");
    }
    Ok(PricePair::new(columns[1], columns[2]))
}

fn parse_row(line: &str) -> Option<PriceObservation> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }
    Some(PriceObservation {
        timestamp: parse_timestamp(parts[0])?,
        price1: parts[1].parse().ok()?,
        price2: parts[2].parse().ok()?,
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
