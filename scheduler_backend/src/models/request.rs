use std::fmt;
use std::str::FromStr;

use qtty::{Degrees, Minutes, Seconds};
use serde::{Deserialize, Serialize};

use crate::define_id_type;
use crate::error::ParseError;
use crate::time::JulianDate;

// Position of a data row in the request table (header excluded).
define_id_type!(usize, CsvIndex);

/// Where the telescope should point.
///
/// Horizontal targets are resolved to equatorial coordinates with the site
/// latitude and the sidereal time of each selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Target {
    Equatorial { ra: Degrees, dec: Degrees },
    Horizontal { alt: Degrees, az: Degrees },
}

/// Kind of frame the request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFilter {
    Normal,
    Dark,
    Bias,
}

impl FrameFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFilter::Normal => "normal",
            FrameFilter::Dark => "dark",
            FrameFilter::Bias => "bias",
        }
    }
}

impl FromStr for FrameFilter {
    type Err = ParseError;

    /// Accepts the numeric codes of the request table (`1` normal, `2` dark,
    /// `3` bias) as well as the names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "normal" | "light" => Ok(FrameFilter::Normal),
            "2" | "dark" => Ok(FrameFilter::Dark),
            "3" | "bias" => Ok(FrameFilter::Bias),
            _ => Err(ParseError::field("filter", s)),
        }
    }
}

impl fmt::Display for FrameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-chip binning factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Binning {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl Binning {
    pub fn factor(&self) -> u8 {
        match self {
            Binning::One => 1,
            Binning::Two => 2,
        }
    }
}

impl FromStr for Binning {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Binning::One),
            "2" => Ok(Binning::Two),
            _ => Err(ParseError::field("binning", s)),
        }
    }
}

/// One pending piece of telescope work.
///
/// Built by the row parser; never mutated by the selection stages. Per-pass
/// values (resolved coordinates, altitude, Moon angle, score) live on
/// [`AnnotatedRequest`](super::AnnotatedRequest) and
/// [`ScoredRequest`](super::ScoredRequest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRequest {
    pub csv_index: CsvIndex,
    pub directory_name: String,
    pub priority: u32,
    pub target: Target,
    /// Window bounds as written in the table.
    pub start_utc: String,
    pub end_utc: String,
    pub start_jd: JulianDate,
    pub end_jd: JulianDate,
    pub obs_duration: Minutes,
    pub exposure_time: Seconds,
    pub filter: FrameFilter,
    pub binning: Binning,
}

impl ObservationRequest {
    /// Length of the observing window in minutes, floored at zero.
    pub fn window_minutes(&self) -> f64 {
        (self.end_jd.days_after(self.start_jd) * 1440.0).max(0.0)
    }

    /// Instant a run started at `now` would finish.
    pub fn finishes_at(&self, now: JulianDate) -> JulianDate {
        now.plus_minutes(self.obs_duration)
    }

    /// Whether the window has already closed at `now`.
    pub fn has_expired(&self, now: JulianDate) -> bool {
        now > self.end_jd
    }
}
