use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::config::symbol_from_path;
use crate::error::{ClusterError, Result};
use crate::types::{PriceBar, PriceMap, PriceSeries};

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const CLOSE_COLUMN: &str = "close";

/// Integer epochs below this are seconds, at or above are milliseconds.
const EPOCH_MS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

// ─── Discovery ───

/// Files in `dir` whose name ends in `suffix`, as (symbol, path), sorted by symbol.
pub fn discover_files(dir: &Path, suffix: &str) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| ClusterError::io(dir, e))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ClusterError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match symbol_from_path(&path, suffix) {
            Some(symbol) => found.push((symbol, path)),
            None => debug!(path = %path.display(), "skipping, name does not match *{}", suffix),
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

// ─── Parsing ───

/// Parse a timestamp cell into UTC milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(if n.abs() < EPOCH_MS_THRESHOLD { n * 1000 } else { n });
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.timestamp_millis());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc().timestamp_millis());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

fn parse_close(raw: &str) -> std::result::Result<f64, String> {
    let v: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("unparseable close '{}'", raw))?;
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("close must be a positive number, got {}", raw));
    }
    Ok(v)
}

/// Read one asset file. Requires `timestamp` and `close` headers; any other columns are ignored.
pub fn load_price_file(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path).map_err(|e| ClusterError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = rdr
        .headers()
        .map_err(|e| ClusterError::csv(path, e))?
        .clone();
    let col = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ClusterError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
    };
    let i_ts = col(TIMESTAMP_COLUMN)?;
    let i_close = col(CLOSE_COLUMN)?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| ClusterError::csv(path, e))?;
        // header is line 1
        let line = record.position().map_or(i as u64 + 2, |p| p.line());
        let malformed = |reason: String| ClusterError::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let ts_raw = record
            .get(i_ts)
            .ok_or_else(|| malformed("missing timestamp field".into()))?;
        let close_raw = record
            .get(i_close)
            .ok_or_else(|| malformed("missing close field".into()))?;

        let ts_ms = parse_timestamp(ts_raw)
            .ok_or_else(|| malformed(format!("unparseable timestamp '{}'", ts_raw)))?;
        let close = parse_close(close_raw).map_err(malformed)?;
        bars.push(PriceBar { ts_ms, close });
    }

    let series = PriceSeries::new(bars);
    if let Some(w) = series.bars.windows(2).find(|w| w[0].ts_ms == w[1].ts_ms) {
        return Err(ClusterError::DuplicateTimestamp {
            path: path.to_path_buf(),
            ts_ms: w[0].ts_ms,
        });
    }
    Ok(series)
}

/// Discover and load every asset file in `dir`. An empty directory is an error.
pub fn load_prices(dir: &Path, suffix: &str) -> Result<PriceMap> {
    let files = discover_files(dir, suffix)?;
    if files.is_empty() {
        return Err(ClusterError::NoInputFiles {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
        });
    }
    info!("found {} asset files in {}", files.len(), dir.display());

    let mut prices = PriceMap::new();
    for (symbol, path) in files {
        let series = load_price_file(&path)?;
        debug!(asset = %symbol, rows = series.len(), "loaded {}", path.display());
        prices.insert(symbol, series);
    }
    Ok(prices)
}
