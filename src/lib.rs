//! Batch card rendering against a remote card creator, and print-sheet
//! packing of the rendered images.
//!
//! Rows become [`CardRecord`]s, records are grouped into [`RenderUnit`]s
//! (split and fuse cards pair two rows), the [`Orchestrator`] drives a
//! [`RenderSurface`] through each unit, and [`pack_sheets`] tiles the exports
//! onto printable pages.

pub mod config;
pub mod core;
pub mod error;
pub mod image;
pub mod logging;
pub mod render;

pub use crate::config::{ForgeConfig, RenderConfig, SheetConfig};
pub use crate::core::{
    CardRecord, CardRow, PairKind, RenderUnit, Resolution, SkipReason, records_from_rows,
    resolve_units,
};
pub use crate::error::{ForgeError, ForgeResult};
pub use crate::image::{
    CardFootprint, Compositor, PackingPlan, PaperLayout, PaperSize, RasterCompositor,
    compose_sheets, pack_sheets, select_paper, sheets_needed,
};
pub use crate::render::{BatchReport, Orchestrator, RenderSurface, UnitOutcome, UnitState};
