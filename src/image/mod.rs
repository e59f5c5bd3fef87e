//! Print-sheet packing: paper selection, pixel geometry and compositing of
//! rendered cards into sheet images.

mod layout;
mod paint;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::SheetConfig;

pub use layout::{
    CardFootprint, PackingPlan, PaperLayout, PaperSize, page_name, select_paper, sheets_needed,
};
pub use paint::{Compositor, RasterCompositor, compose_sheets};

/// Tile `images` into sheets under the configured output directory.
pub fn pack_sheets(config: &SheetConfig, images: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let plan = PackingPlan::new(config)?;
    let compositor = RasterCompositor::from_config(config);
    compose_sheets(&plan, images, &config.output_dir, &compositor)
}
