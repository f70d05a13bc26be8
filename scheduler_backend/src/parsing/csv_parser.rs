//! Request-table row parser.
//!
//! The table is plain comma-separated text, one request per line:
//!
//! ```text
//! directoryName,priority,ra,dec,alt,az,startTime,endTime,obsDuration,exposureTime,filter,binning,completion
//! M42,3,83.82,-5.39,,,2024-02-28T01:00:00Z,2024-02-28T05:00:00Z,30,60,1,2,0
//! ```
//!
//! Cells follow RFC 4180 quoting, so a directory name may contain a comma when
//! it is quoted. Empty `ra`/`dec` or `alt`/`az` cells mean the pair was not
//! supplied; when both pairs are present the horizontal pair wins.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use qtty::{Degrees, Minutes, Seconds};

use crate::error::{ParseError, RowParseError};
use crate::models::{Binning, CsvIndex, FrameFilter, ObservationRequest, Target};
use crate::time::utc_to_julian_date;

/// Column positions of the request table.
pub mod columns {
    pub const DIRECTORY_NAME: usize = 0;
    pub const PRIORITY: usize = 1;
    pub const RA: usize = 2;
    pub const DEC: usize = 3;
    pub const ALT: usize = 4;
    pub const AZ: usize = 5;
    pub const START_TIME: usize = 6;
    pub const END_TIME: usize = 7;
    pub const OBS_DURATION: usize = 8;
    pub const EXPOSURE_TIME: usize = 9;
    pub const FILTER: usize = 10;
    pub const BINNING: usize = 11;
    pub const COMPLETION: usize = 12;

    /// Number of columns a row must have.
    pub const COUNT: usize = 13;

    pub const HEADER: &str = "directoryName,priority,ra,dec,alt,az,startTime,endTime,obsDuration,exposureTime,filter,binning,completion";
}

/// Requests parsed from a table, plus the rows that had to be skipped.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub requests: Vec<ObservationRequest>,
    pub rejected: Vec<RowParseError>,
    /// Rows already marked completed.
    pub completed: usize,
}

/// Split a raw row into its cells. Cell text is not trimmed.
///
/// A blank line yields an empty record.
pub fn split_row(line: &str) -> Result<StringRecord, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    reader
        .read_record(&mut record)
        .map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(record)
}

/// Render cells back into a single row, quoting only the cells that need it.
pub fn join_row<I, T>(cells: I) -> Result<String, ParseError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());
    writer
        .write_record(cells)
        .map_err(|e| ParseError::Malformed(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ParseError::Malformed(e.to_string()))?;
    let line = String::from_utf8(bytes).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read the completion cell. An empty cell counts as not completed.
pub fn parse_completion(cell: &str) -> Result<bool, ParseError> {
    match cell.trim() {
        "" | "0" => Ok(false),
        "1" => Ok(true),
        other => Err(ParseError::field("completion", other)),
    }
}

fn required<'a>(fields: &[&'a str], column: usize, name: &'static str) -> Result<&'a str, ParseError> {
    match fields.get(column).map(|s| s.trim()) {
        Some(cell) if !cell.is_empty() => Ok(cell),
        _ => Err(ParseError::MissingField(name)),
    }
}

fn optional_f64(fields: &[&str], column: usize, name: &'static str) -> Result<Option<f64>, ParseError> {
    match fields.get(column).map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(cell) => cell
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ParseError::field(name, cell)),
    }
}

fn positive_f64(fields: &[&str], column: usize, name: &'static str) -> Result<f64, ParseError> {
    let cell = required(fields, column, name)?;
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| ParseError::field(name, cell))
}

fn in_range(value: f64, range: std::ops::RangeInclusive<f64>, name: &'static str) -> Result<f64, ParseError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ParseError::field(name, value.to_string()))
    }
}

fn parse_target(fields: &[&str]) -> Result<Target, ParseError> {
    let alt = optional_f64(fields, columns::ALT, "alt")?;
    let az = optional_f64(fields, columns::AZ, "az")?;
    if let (Some(alt), Some(az)) = (alt, az) {
        let alt = in_range(alt, -90.0..=90.0, "alt")?;
        return Ok(Target::Horizontal {
            alt: Degrees::new(alt),
            az: Degrees::new(az).wrap_pos(),
        });
    }

    let ra = optional_f64(fields, columns::RA, "ra")?;
    let dec = optional_f64(fields, columns::DEC, "dec")?;
    match (ra, dec) {
        (Some(ra), Some(dec)) => {
            if !(0.0..360.0).contains(&ra) {
                return Err(ParseError::field("ra", ra.to_string()));
            }
            let dec = in_range(dec, -90.0..=90.0, "dec")?;
            Ok(Target::Equatorial {
                ra: Degrees::new(ra),
                dec: Degrees::new(dec),
            })
        }
        _ => Err(ParseError::MissingField("ra/dec or alt/az")),
    }
}

fn parse_fields(fields: &[&str], index: CsvIndex) -> Result<ObservationRequest, ParseError> {
    if fields.len() < columns::COUNT {
        return Err(ParseError::ColumnCount {
            expected: columns::COUNT,
            found: fields.len(),
        });
    }

    let directory_name = required(fields, columns::DIRECTORY_NAME, "directoryName")?.to_string();
    let priority_cell = required(fields, columns::PRIORITY, "priority")?;
    let priority = priority_cell
        .parse::<u32>()
        .map_err(|_| ParseError::field("priority", priority_cell))?;

    let target = parse_target(fields)?;

    let start_utc = required(fields, columns::START_TIME, "startTime")?.to_string();
    let end_utc = required(fields, columns::END_TIME, "endTime")?.to_string();
    let start_jd = utc_to_julian_date(&start_utc)?;
    let end_jd = utc_to_julian_date(&end_utc)?;
    if start_jd > end_jd {
        return Err(ParseError::InvertedWindow {
            start_jd: start_jd.value(),
            end_jd: end_jd.value(),
        });
    }

    let obs_duration = positive_f64(fields, columns::OBS_DURATION, "obsDuration")?;
    let exposure_time = positive_f64(fields, columns::EXPOSURE_TIME, "exposureTime")?;
    let filter: FrameFilter = required(fields, columns::FILTER, "filter")?.parse()?;
    let binning: Binning = required(fields, columns::BINNING, "binning")?.parse()?;

    Ok(ObservationRequest {
        csv_index: index,
        directory_name,
        priority,
        target,
        start_utc,
        end_utc,
        start_jd,
        end_jd,
        obs_duration: Minutes::new(obs_duration),
        exposure_time: Seconds::new(exposure_time),
        filter,
        binning,
    })
}

/// Parse one data row.
///
/// Returns `Ok(None)` for rows already marked completed; those are not
/// validated any further.
pub fn parse_request_row(line: &str, index: CsvIndex) -> Result<Option<ObservationRequest>, RowParseError> {
    let record = split_row(line).map_err(|e| RowParseError::new(index.value(), "<unnamed>", e))?;
    let fields: Vec<&str> = record.iter().collect();
    let label = fields
        .first()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("<unnamed>");
    let reject = |source| RowParseError::new(index.value(), label, source);

    let completed = parse_completion(fields.get(columns::COMPLETION).copied().unwrap_or(""))
        .map_err(reject)?;
    if completed {
        return Ok(None);
    }

    parse_fields(&fields, index).map(Some).map_err(reject)
}

/// Parse every data row, collecting the rows that could not be read instead of
/// failing the whole table.
pub fn parse_request_rows<'a, I>(rows: I) -> ParsedRows
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed = ParsedRows::default();
    for (i, line) in rows.into_iter().enumerate() {
        match parse_request_row(line, CsvIndex::new(i)) {
            Ok(Some(request)) => parsed.requests.push(request),
            Ok(None) => parsed.completed += 1,
            Err(err) => parsed.rejected.push(err),
        }
    }
    parsed
}
