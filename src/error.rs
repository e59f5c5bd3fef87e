use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::PairKind;

/// Errors raised while resolving, rendering or packing cards.
///
/// Per-unit variants are logged and the batch moves on; see [`ForgeError::is_fatal`].
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("{kind} group '{key}' on card #{seq} has {matches} partner(s), expected exactly 1")]
    Pairing {
        kind: PairKind,
        key: String,
        seq: u32,
        matches: usize,
    },

    #[error("card #{seq} carries both split group '{split}' and fuse group '{fuse}'")]
    ConflictingGroups { seq: u32, split: String, fuse: String },

    #[error("unknown color '{token}' on card #{seq}")]
    UnknownColor { token: String, seq: u32 },

    #[error("unknown rarity '{token}' on card #{seq}")]
    UnknownRarity { token: String, seq: u32 },

    #[error("color '{color}' on card #{seq} has no power/toughness frame")]
    MissingPowerToughnessFrame { color: String, seq: u32 },

    #[error("timed out after {waited:?} waiting for {what}")]
    SurfaceTimeout { what: String, waited: Duration },

    #[error("download of '{name}' was canceled by the surface")]
    DownloadCanceled { name: String },

    #[error("render surface error: {0}")]
    Surface(String),

    #[error("invalid step transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::render::UnitState,
        to: crate::render::UnitState,
    },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sheet layout: {0}")]
    Layout(String),
}

impl ForgeError {
    /// Setup-time failures abort the whole run; everything else only fails one unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ForgeError::Io { .. } | ForgeError::Layout(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForgeError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;
