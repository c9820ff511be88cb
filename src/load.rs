//! Time series loading from the CSV profiles.

mod timestamp;

use std::{fs::File, io::Read, path::Path};

use chrono::TimeDelta;
use itertools::Itertools;

use self::timestamp::TimestampFormat;
use crate::{
    core::{
        series::{ResampleHourly, Series},
        spot::last_full_years,
    },
    prelude::*,
    quantity::price::KilowattHourPrice,
};

/// Number of the leading timestamps checked when detecting the format.
const N_FORMAT_SAMPLES: usize = 20;

/// Load the series from the CSV file.
pub fn load_series<V: From<f64>>(path: &Path) -> Result<Series<V>> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    read_series(file, &path.display().to_string())
        .with_context(|| format!("failed to load `{}`", path.display()))
}

/// Load the spot price history, optionally keeping only the last complete years.
pub fn load_spot_prices(
    path: &Path,
    analysis_years: Option<usize>,
) -> Result<Series<KilowattHourPrice>> {
    let prices = load_series(path)?;
    match analysis_years {
        Some(n_years) => {
            let prices = last_full_years(&prices, n_years)?;
            info!(n_years, len = prices.len(), start = ?prices.start(), "selected the spot history");
            Ok(prices)
        }
        None => Ok(prices),
    }
}

/// Read a two-column CSV: timestamp and value.
///
/// The delimiter is either `,` or `;`, the latter allows decimal commas. A header row is skipped.
/// Quarter-hourly series get resampled to hourly means.
#[instrument(skip_all, fields(name = name))]
pub fn read_series<V: From<f64>>(mut reader: impl Read, name: &str) -> Result<Series<V>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let delimiter = sniff_delimiter(&text);

    let rows: Vec<(String, String)> = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(text.as_bytes())
        .records()
        .map_ok(|record| {
            (
                record.get(0).unwrap_or_default().to_string(),
                record.get(1).unwrap_or_default().to_string(),
            )
        })
        .filter_ok(|(timestamp, _)| !timestamp.is_empty())
        .try_collect()
        .context("failed to read the CSV records")?;

    let mut rows = rows.as_slice();
    if let Some(((header, value), tail)) = rows.split_first()
        && parse_value(value, delimiter).is_err()
    {
        debug!(%header, "skipping the header");
        rows = tail;
    }
    ensure!(!rows.is_empty(), "`{name}` contains no rows");

    let samples =
        rows.iter().take(N_FORMAT_SAMPLES).map(|(timestamp, _)| timestamp.as_str()).collect_vec();
    let format = TimestampFormat::detect(&samples)
        .with_context(|| format!("unknown timestamp format: `{}`", samples[0]))?;
    debug!(%format, "detected the timestamp format");

    let points = rows
        .iter()
        .enumerate()
        .map(|(index, (timestamp, value))| {
            let timestamp = format
                .parse(timestamp)
                .with_context(|| format!("row #{}: invalid timestamp `{timestamp}`", index + 1))?;
            let value = parse_value(value, delimiter)
                .with_context(|| format!("row #{}: invalid value `{value}`", index + 1))?;
            Ok((timestamp, value))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut series = Series::try_new(points)?;

    if series.has_step(TimeDelta::minutes(15)) {
        let n_quarters = series.len();
        series = Series::try_new(series.mean_hourly())?;
        info!(n_quarters, n_hours = series.len(), "resampled the quarter-hours to hourly");
    }
    info!(len = series.len(), start = ?series.start(), "loaded");
    Ok(series.map_values(V::from))
}

fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or_default();
    if first_line.contains(';') { b';' } else { b',' }
}

fn parse_value(text: &str, delimiter: u8) -> Result<f64, std::num::ParseFloatError> {
    if delimiter == b';' { text.replace(',', ".").parse() } else { text.parse() }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    use super::{timestamp::REFERENCE_YEAR, *};
    use crate::quantity::energy::KilowattHours;

    #[test]
    fn test_headed_iso() -> Result {
        let csv = "date,value\n2023-01-01T00:00:00.000Z,1.5\n2023-01-01T01:00:00.000Z,2.5\n";
        let series: Series<f64> = read_series(csv.as_bytes(), "spot")?;
        assert_eq!(series.len(), 2);
        assert_eq!(series.start(), Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single());
        assert_abs_diff_eq!(series[1].1, 2.5);
        Ok(())
    }

    #[test]
    fn test_headless_pvsol_with_decimal_commas() -> Result {
        let csv = "01.01. 00:00;0,25\n01.01. 01:00;1,75\n";
        let series: Series<KilowattHours> = read_series(csv.as_bytes(), "production")?;
        assert_eq!(series.start(), Utc.with_ymd_and_hms(REFERENCE_YEAR, 1, 1, 0, 0, 0).single());
        assert_eq!(series[1].1, KilowattHours(1.75));
        Ok(())
    }

    #[test]
    fn test_quarter_hours_resampled() -> Result {
        let csv = "\
            2023-03-01 10:00:00,1\n\
            2023-03-01 10:15:00,2\n\
            2023-03-01 10:30:00,3\n\
            2023-03-01 10:45:00,6\n\
            2023-03-01 11:00:00,4\n";
        let series: Series<f64> = read_series(csv.as_bytes(), "company")?;
        assert_eq!(series.len(), 2);
        assert_abs_diff_eq!(series[0].1, 3.0);
        assert_abs_diff_eq!(series[1].1, 4.0);
        Ok(())
    }

    #[test]
    fn test_invalid_value() {
        let csv = "2023-03-01 10:00:00,1\n2023-03-01 11:00:00,oops\n";
        assert!(read_series::<f64>(csv.as_bytes(), "company").is_err());
    }

    #[test]
    fn test_unordered_timestamps() {
        let csv = "2023-03-01 11:00:00,1\n2023-03-01 10:00:00,1\n";
        assert!(read_series::<f64>(csv.as_bytes(), "company").is_err());
    }

    #[test]
    fn test_empty() {
        assert!(read_series::<f64>("date,value\n".as_bytes(), "company").is_err());
    }
}
