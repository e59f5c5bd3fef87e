use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use image::imageops::{FilterType, overlay};
use image::{DynamicImage, ImageBuffer, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SheetConfig;
use crate::image::layout::{PackingPlan, page_name};

/// Writes one sheet image from a group of card images.
pub trait Compositor: Sync {
    fn compose(&self, plan: &PackingPlan, images: &[PathBuf], target: &Path) -> Result<()>;
}

/// Default compositor: decode, scale each card to the plan's pixel size and
/// overlay it in its grid cell on a solid canvas.
#[derive(Debug, Clone, Copy)]
pub struct RasterCompositor {
    pub background: Rgba<u8>,
    /// Outline every card's trim edge inside the bleed gutter.
    pub cut_marks: bool,
    pub mark_color: Rgba<u8>,
}

impl Default for RasterCompositor {
    fn default() -> Self {
        Self {
            background: rgba(0xff, 0xff, 0xff, 0xff),
            cut_marks: false,
            mark_color: rgba(0x7d, 0x7d, 0x7d, 0xff),
        }
    }
}

impl RasterCompositor {
    pub fn from_config(config: &SheetConfig) -> Self {
        Self {
            background: Rgba(config.background),
            cut_marks: config.cut_marks,
            ..Self::default()
        }
    }
}

impl Compositor for RasterCompositor {
    fn compose(&self, plan: &PackingPlan, images: &[PathBuf], target: &Path) -> Result<()> {
        if images.len() > plan.cells() {
            return Err(anyhow!(
                "{} images do not fit a {}x{} sheet",
                images.len(),
                plan.columns,
                plan.rows
            ));
        }
        let mut page =
            ImageBuffer::from_pixel(plan.sheet_width_px, plan.sheet_height_px, self.background);

        for (idx, path) in images.iter().enumerate() {
            let card = image::open(path)
                .with_context(|| format!("failed to read card image {}", path.display()))?
                .resize_exact(plan.card_width_px, plan.card_height_px, FilterType::Lanczos3)
                .to_rgba8();
            let (x, y) = plan.cell_origin(idx);
            overlay(&mut page, &card, x, y);
            if self.cut_marks {
                let trim = Rect::at(x as i32, y as i32)
                    .of_size(plan.card_width_px, plan.card_height_px);
                draw_hollow_rect_mut(&mut page, trim, self.mark_color);
            }
        }

        DynamicImage::ImageRgba8(page)
            .save(target)
            .with_context(|| format!("failed to write {}", target.display()))
    }
}

fn rgba(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
    Rgba([r, g, b, a])
}

/// Compose every chunk of `images` into `page-<n>.png` under `out_dir`.
///
/// Chunks are composed in parallel; the returned paths are in page order.
pub fn compose_sheets<C: Compositor>(
    plan: &PackingPlan,
    images: &[PathBuf],
    out_dir: &Path,
    compositor: &C,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create sheet directory {}", out_dir.display()))?;

    let chunks: Vec<&[PathBuf]> = plan.chunks(images).collect();
    let pages = chunks
        .par_iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let target = out_dir.join(page_name(idx));
            debug!(page = idx, cards = chunk.len(), "composing sheet");
            compositor.compose(plan, chunk, &target)?;
            Ok(target)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        sheets = pages.len(),
        cards = images.len(),
        dir = %out_dir.display(),
        "sheets written"
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Mutex;

    fn small_plan() -> PackingPlan {
        PackingPlan::new(&SheetConfig {
            dpi: 10,
            bleed: 0.1,
            columns: 2,
            rows: 2,
            chunk_size: 4,
            ..SheetConfig::default()
        })
        .unwrap()
    }

    fn write_cards(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("card-{i}.png"));
                RgbaImage::from_pixel(10, 14, Rgba([0xff, 0, 0, 0xff]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn small_plan_geometry() {
        let plan = small_plan();
        assert_eq!((plan.card_width_px, plan.card_height_px), (25, 35));
        assert_eq!((plan.sheet_width_px, plan.sheet_height_px), (54, 74));
        assert_eq!(plan.cell_origin(1), (28, 1));
    }

    #[test]
    fn sheets_are_tiled_and_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let cards = write_cards(dir.path(), 5);
        let out = dir.path().join("sheets");
        let plan = small_plan();

        let pages = compose_sheets(&plan, &cards, &out, &RasterCompositor::default()).unwrap();
        assert_eq!(pages, vec![out.join("page-0.png"), out.join("page-1.png")]);

        let first = image::open(&pages[0]).unwrap().to_rgba8();
        assert_eq!(first.dimensions(), (54, 74));
        let (x, y) = plan.cell_origin(3);
        let px = first.get_pixel(x as u32 + 12, y as u32 + 17);
        assert!(px[0] > 200 && px[1] < 50);

        // The short last sheet keeps the full canvas with empty cells.
        let last = image::open(&pages[1]).unwrap().to_rgba8();
        assert_eq!(last.dimensions(), (54, 74));
        let (x, y) = plan.cell_origin(1);
        assert_eq!(
            *last.get_pixel(x as u32 + 12, y as u32 + 17),
            Rgba([0xff, 0xff, 0xff, 0xff])
        );
        // Bleed gutter stays background.
        assert_eq!(*last.get_pixel(0, 0), Rgba([0xff, 0xff, 0xff, 0xff]));
    }

    #[test]
    fn cut_marks_outline_the_trim_edge() {
        let dir = tempfile::tempdir().unwrap();
        let cards = write_cards(dir.path(), 1);
        let target = dir.path().join("page.png");
        let plan = small_plan();
        let compositor = RasterCompositor {
            cut_marks: true,
            mark_color: Rgba([0, 0, 0xff, 0xff]),
            ..RasterCompositor::default()
        };
        compositor.compose(&plan, &cards, &target).unwrap();

        let page = image::open(&target).unwrap().to_rgba8();
        let (x, y) = plan.cell_origin(0);
        assert_eq!(*page.get_pixel(x as u32, y as u32), Rgba([0, 0, 0xff, 0xff]));
    }

    #[test]
    fn unreadable_card_fails_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = vec![dir.path().join("nope.png")];
        let err = RasterCompositor::default()
            .compose(&small_plan(), &missing, &dir.path().join("p.png"))
            .unwrap_err();
        assert!(err.to_string().contains("nope.png"));
    }

    /// Records which chunk landed on which page without touching pixels.
    struct Recorder(Mutex<Vec<(PathBuf, Vec<PathBuf>)>>);

    impl Compositor for Recorder {
        fn compose(&self, _plan: &PackingPlan, images: &[PathBuf], target: &Path) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((target.to_path_buf(), images.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn page_numbering_follows_chunk_order_under_parallelism() {
        let dir = tempfile::tempdir().unwrap();
        let plan = PackingPlan::new(&SheetConfig::default()).unwrap();
        let images: Vec<PathBuf> = (0..83).map(|i| PathBuf::from(format!("{i}.png"))).collect();
        let recorder = Recorder(Mutex::new(Vec::new()));

        let pages = compose_sheets(&plan, &images, dir.path(), &recorder).unwrap();
        assert_eq!(pages.len(), 5);

        let mut seen = recorder.0.into_inner().unwrap();
        seen.sort();
        for (idx, (target, chunk)) in seen.iter().enumerate() {
            assert_eq!(*target, dir.path().join(page_name(idx)));
            assert_eq!(chunk[0], images[idx * 20]);
        }
        assert_eq!(seen[4].1.len(), 3);
    }
}
