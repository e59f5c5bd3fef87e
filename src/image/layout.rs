use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::SheetConfig;
use crate::error::{ForgeError, ForgeResult};

// Guards floor() against quotients like 4.999999 that are exactly 5 on paper.
const FIT_EPSILON: f64 = 1e-9;

/// Physical paper dimensions in inches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaperSize {
    pub width: f64,
    pub height: f64,
}

impl PaperSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rotated(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Tabloid-extra and super-B, portrait then landscape.
    pub fn standard_candidates() -> Vec<PaperSize> {
        let portrait = [PaperSize::new(12.0, 18.0), PaperSize::new(13.0, 19.0)];
        portrait
            .iter()
            .copied()
            .chain(portrait.iter().map(PaperSize::rotated))
            .collect()
    }
}

/// Card size in inches with the bleed added on every side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CardFootprint {
    pub width: f64,
    pub height: f64,
    pub bleed: f64,
}

impl CardFootprint {
    pub fn bled_width(&self) -> f64 {
        self.width + 2.0 * self.bleed
    }

    pub fn bled_height(&self) -> f64 {
        self.height + 2.0 * self.bleed
    }
}

impl From<&SheetConfig> for CardFootprint {
    fn from(config: &SheetConfig) -> Self {
        Self {
            width: config.card_width,
            height: config.card_height,
            bleed: config.bleed,
        }
    }
}

/// How many bled cards fit on one sheet of paper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaperLayout {
    pub paper: PaperSize,
    pub columns: u32,
    pub rows: u32,
}

impl PaperLayout {
    pub fn fit(paper: PaperSize, card: &CardFootprint) -> Self {
        Self {
            paper,
            columns: whole_fits(paper.width, card.bled_width()),
            rows: whole_fits(paper.height, card.bled_height()),
        }
    }

    pub fn cards_per_sheet(&self) -> u32 {
        self.columns * self.rows
    }
}

fn whole_fits(space: f64, item: f64) -> u32 {
    if item <= 0.0 || space <= 0.0 {
        return 0;
    }
    (space / item + FIT_EPSILON).floor() as u32
}

/// Pick the candidate holding the most cards; ties keep the first listed.
pub fn select_paper(card: &CardFootprint, candidates: &[PaperSize]) -> Option<PaperLayout> {
    let mut best: Option<PaperLayout> = None;
    for paper in candidates {
        let layout = PaperLayout::fit(*paper, card);
        tracing::debug!(
            width = paper.width,
            height = paper.height,
            columns = layout.columns,
            rows = layout.rows,
            "paper candidate"
        );
        match best {
            Some(current) if current.cards_per_sheet() >= layout.cards_per_sheet() => {}
            _ => best = Some(layout),
        }
    }
    best
}

/// Sheets required to print `total_copies` cards with `layout`.
pub fn sheets_needed(total_copies: u32, layout: &PaperLayout) -> ForgeResult<u32> {
    let per_sheet = layout.cards_per_sheet();
    if per_sheet == 0 {
        return Err(ForgeError::Layout(format!(
            "no card fits on {}x{} paper",
            layout.paper.width, layout.paper.height
        )));
    }
    Ok(total_copies.div_ceil(per_sheet))
}

/// Pixel geometry for tiling rendered cards into sheet images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackingPlan {
    pub dpi: u32,
    pub card_width_px: u32,
    pub card_height_px: u32,
    /// Bleed per side in pixels; fractional values are kept until rounding the canvas.
    pub bleed_px: f64,
    pub columns: u32,
    pub rows: u32,
    pub sheet_width_px: u32,
    pub sheet_height_px: u32,
    pub chunk_size: usize,
}

impl PackingPlan {
    pub fn new(config: &SheetConfig) -> ForgeResult<Self> {
        if config.dpi == 0 {
            return Err(ForgeError::Layout("dpi must be positive".into()));
        }
        if config.card_width <= 0.0 || config.card_height <= 0.0 || config.bleed < 0.0 {
            return Err(ForgeError::Layout(format!(
                "card size {}x{} with bleed {} is not printable",
                config.card_width, config.card_height, config.bleed
            )));
        }
        if config.columns == 0 || config.rows == 0 {
            return Err(ForgeError::Layout("sheet grid must have at least one cell".into()));
        }
        let cells = (config.columns * config.rows) as usize;
        if config.chunk_size == 0 || config.chunk_size > cells {
            return Err(ForgeError::Layout(format!(
                "chunk size {} does not fit a {}x{} grid",
                config.chunk_size, config.columns, config.rows
            )));
        }
        if cells % config.chunk_size != 0 {
            tracing::warn!(
                chunk_size = config.chunk_size,
                cells,
                "chunk size leaves cells unused on every sheet"
            );
        }

        let dpi = config.dpi as f64;
        let card_width_px = inches_to_px(config.card_width, config.dpi);
        let card_height_px = inches_to_px(config.card_height, config.dpi);
        let bleed_px = dpi * config.bleed;
        let sheet_width_px =
            (config.columns as f64 * (card_width_px as f64 + 2.0 * bleed_px)).ceil() as u32;
        let sheet_height_px =
            (config.rows as f64 * (card_height_px as f64 + 2.0 * bleed_px)).ceil() as u32;

        Ok(Self {
            dpi: config.dpi,
            card_width_px,
            card_height_px,
            bleed_px,
            columns: config.columns,
            rows: config.rows,
            sheet_width_px,
            sheet_height_px,
            chunk_size: config.chunk_size,
        })
    }

    pub fn cells(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Top-left pixel of the card (inside its bleed gutter) for grid slot `index`.
    pub fn cell_origin(&self, index: usize) -> (i64, i64) {
        let col = (index % self.columns as usize) as f64;
        let row = (index / self.columns as usize) as f64;
        let cell_w = self.card_width_px as f64 + 2.0 * self.bleed_px;
        let cell_h = self.card_height_px as f64 + 2.0 * self.bleed_px;
        (
            (col * cell_w + self.bleed_px).round() as i64,
            (row * cell_h + self.bleed_px).round() as i64,
        )
    }

    /// Split the image list into per-sheet groups, in order.
    pub fn chunks<'a>(&self, images: &'a [PathBuf]) -> std::slice::Chunks<'a, PathBuf> {
        images.chunks(self.chunk_size)
    }
}

fn inches_to_px(inches: f64, dpi: u32) -> u32 {
    (inches * dpi as f64).ceil() as u32
}

/// File name for the `index`-th sheet.
pub fn page_name(index: usize) -> String {
    format!("page-{}.png", index)
}
