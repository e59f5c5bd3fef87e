use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings for driving the card creator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Where the creator drops exported images; also checked when resuming.
    pub output_dir: PathBuf,
    /// Artwork named `<seq>.<ext>`.
    pub art_dir: PathBuf,
    pub artist: String,
    /// Extension of exported images.
    pub output_extension: String,
    pub step_timeout: Duration,
    pub asset_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("cards"),
            art_dir: PathBuf::from("art"),
            artist: "Unknown Artist".to_string(),
            output_extension: "png".to_string(),
            step_timeout: Duration::from_secs(10),
            asset_timeout: Duration::from_secs(15),
            download_timeout: Duration::from_secs(60),
        }
    }
}

/// Physical and pixel geometry for print sheets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetConfig {
    pub dpi: u32,
    /// Card width in inches, without bleed.
    pub card_width: f64,
    pub card_height: f64,
    /// Bleed added on every side, in inches.
    pub bleed: f64,
    pub columns: u32,
    pub rows: u32,
    pub chunk_size: usize,
    pub cut_marks: bool,
    pub background: [u8; 4],
    pub output_dir: PathBuf,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            card_width: 2.5,
            card_height: 3.5,
            bleed: 0.125,
            columns: 4,
            rows: 5,
            chunk_size: 20,
            cut_marks: false,
            background: [0xff, 0xff, 0xff, 0xff],
            output_dir: PathBuf::from("sheets"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForgeConfig {
    pub render: RenderConfig,
    pub sheet: SheetConfig,
    /// Crate log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            sheet: SheetConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ForgeConfig {
    /// Defaults overridden by `CARDSMITH_*` variables (a `.env` file is honored).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ForgeConfig::default();
        let render = &mut config.render;
        let sheet = &mut config.sheet;

        if let Some(level) = lookup("CARDSMITH_LOG") {
            config.log_level = level.trim().to_string();
        }

        if let Some(dir) = lookup("CARDSMITH_OUTPUT_DIR") {
            render.output_dir = dir.into();
        }
        if let Some(dir) = lookup("CARDSMITH_ART_DIR") {
            render.art_dir = dir.into();
        }
        if let Some(artist) = lookup("CARDSMITH_ARTIST") {
            render.artist = artist;
        }
        if let Some(ext) = lookup("CARDSMITH_OUTPUT_EXTENSION") {
            render.output_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CARDSMITH_STEP_TIMEOUT_SECS")? {
            render.step_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CARDSMITH_ASSET_TIMEOUT_SECS")? {
            render.asset_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CARDSMITH_DOWNLOAD_TIMEOUT_SECS")? {
            render.download_timeout = Duration::from_secs(secs);
        }

        if let Some(dpi) = parse_var(&lookup, "CARDSMITH_DPI")? {
            sheet.dpi = dpi;
        }
        if let Some(bleed) = parse_var(&lookup, "CARDSMITH_BLEED")? {
            sheet.bleed = bleed;
        }
        if let Some(columns) = parse_var(&lookup, "CARDSMITH_SHEET_COLUMNS")? {
            sheet.columns = columns;
        }
        if let Some(rows) = parse_var(&lookup, "CARDSMITH_SHEET_ROWS")? {
            sheet.rows = rows;
        }
        if let Some(chunk) = parse_var(&lookup, "CARDSMITH_CHUNK_SIZE")? {
            sheet.chunk_size = chunk;
        }
        if let Some(dir) = lookup("CARDSMITH_SHEET_DIR") {
            sheet.output_dir = dir.into();
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
        })
        .transpose()
}
