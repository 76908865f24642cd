//! Validated run parameters for the two pipelines.

use crate::table::TableOptions;
use anyhow::bail;
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_OUT_DIR: &str = "output_graphs";

/// Bin width of the protocols chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
    Picoseconds,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Seconds,
        Resolution::Milliseconds,
        Resolution::Microseconds,
        Resolution::Picoseconds,
    ];

    /// Bins per second.
    pub fn multiplier(self) -> f64 {
        match self {
            Resolution::Seconds => 1.0,
            Resolution::Milliseconds => 1e3,
            Resolution::Microseconds => 1e6,
            Resolution::Picoseconds => 1e12,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Resolution::Seconds => "s",
            Resolution::Milliseconds => "ms",
            Resolution::Microseconds => "us",
            Resolution::Picoseconds => "ps",
        }
    }

    /// Strict parse of a token (trimmed, case-insensitive).
    pub fn parse_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        Self::ALL.into_iter().find(|r| r.token() == token)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Result of reading a user-supplied resolution token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionChoice {
    pub resolution: Resolution,
    /// True when the token was not recognized and seconds were substituted.
    pub defaulted: bool,
}

impl ResolutionChoice {
    /// Unknown tokens fall back to seconds instead of failing the run.
    pub fn from_token(token: &str) -> Self {
        match Resolution::parse_token(token) {
            Some(resolution) => Self {
                resolution,
                defaulted: false,
            },
            None => {
                warn!(token = %token, "unrecognized resolution, using seconds");
                Self {
                    resolution: Resolution::Seconds,
                    defaulted: true,
                }
            }
        }
    }
}

/// Maximum offset (seconds since the first event) to keep. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeWindow(f64);

impl TimeWindow {
    pub fn new(seconds: f64) -> anyhow::Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            bail!("maximum time must be a positive number of seconds, got {}", seconds);
        }
        Ok(Self(seconds))
    }

    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn contains(self, offset: f64) -> bool {
        offset <= self.0
    }
}

impl fmt::Display for TimeWindow {
    /// Float style with a mandatory fraction: `10.0`, `0.5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// clap value parser for `--max-time`.
pub fn parse_time_window(s: &str) -> Result<TimeWindow, String> {
    let seconds: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {:?}", s))?;
    TimeWindow::new(seconds).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImageFormat {
    /// Axis text is only rasterized when built with the `ttf` feature.
    Png,
    #[default]
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Where and how charts are written.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: ImageFormat,
    /// Also write an HTML index page for the run.
    pub html: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUT_DIR),
            format: ImageFormat::default(),
            html: false,
        }
    }
}

/// Events-per-second run over a whole table.
#[derive(Debug, Clone)]
pub struct EventsConfig {
    pub input: PathBuf,
    pub table: TableOptions,
    pub output: OutputConfig,
    pub title: String,
}

impl EventsConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            table: TableOptions::default(),
            output: OutputConfig::default(),
            title: "Events per Second".to_string(),
        }
    }
}

/// Per-protocol packets-per-bin run.
#[derive(Debug, Clone)]
pub struct ProtocolsConfig {
    pub input: PathBuf,
    pub table: TableOptions,
    pub output: OutputConfig,
    pub resolution: Resolution,
    pub window: TimeWindow,
}

impl ProtocolsConfig {
    pub fn new(input: impl Into<PathBuf>, resolution: Resolution, window: TimeWindow) -> Self {
        Self {
            input: input.into(),
            table: TableOptions {
                protocol_column: Some("Protocol".to_string()),
                ..TableOptions::default()
            },
            output: OutputConfig::default(),
            resolution,
            window,
        }
    }
}
