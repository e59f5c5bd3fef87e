use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::core::{
    CardRecord, FramePlan, Rarity, RenderUnit, plan_paired, plan_single, resolve_units,
};
use crate::error::{ForgeError, ForgeResult};
use crate::render::art::ArtLibrary;
use crate::render::context::{UnitContext, UnitState};
use crate::render::report::{BatchReport, SkippedRecord, UnitOutcome};
use crate::render::surface::{
    CollectorField, Control, EntryMode, Half, Input, RenderSurface, Tab, TextSlot, await_download,
    bounded,
};

/// Lookups resolved before the surface is touched.
#[derive(Debug, Clone)]
struct UnitJob {
    frames: FramePlan,
    rarity: Rarity,
}

impl UnitJob {
    fn plan(unit: &RenderUnit) -> ForgeResult<Self> {
        let frames = match unit {
            RenderUnit::Single(card) => plan_single(card)?,
            RenderUnit::Paired { top, bottom, .. } => plan_paired(top, bottom)?,
        };
        let rarity = Rarity::for_card(unit.top())?;
        Ok(Self { frames, rarity })
    }
}

/// Drives one render surface through a batch of units, one unit at a time.
pub struct Orchestrator<S> {
    surface: S,
    config: RenderConfig,
    art: ArtLibrary,
    /// A reset failed; the next unit must get a clean session first.
    needs_reset: bool,
}

impl<S: RenderSurface> Orchestrator<S> {
    pub fn new(surface: S, config: RenderConfig) -> Self {
        let art = ArtLibrary::new(config.art_dir.clone());
        Self {
            surface,
            config,
            art,
            needs_reset: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Where the exported image for `unit` is expected.
    pub fn output_path(&self, unit: &RenderUnit) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}.{}", unit.file_stem(), self.config.output_extension))
    }

    /// Group records into units and render them, reporting pairing problems
    /// and skipped rows alongside unit outcomes.
    pub async fn render_records(&mut self, records: &[CardRecord]) -> ForgeResult<BatchReport> {
        let resolution = resolve_units(records);
        let mut report = BatchReport::new();
        report.pairing_errors = resolution.errors.iter().map(ToString::to_string).collect();
        report.skipped = resolution
            .skipped
            .into_iter()
            .map(|(seq, reason)| SkippedRecord { seq, reason })
            .collect();
        self.drive(&resolution.units, std::future::pending(), &mut report)
            .await?;
        Ok(report)
    }

    pub async fn run(&mut self, units: &[RenderUnit]) -> ForgeResult<BatchReport> {
        self.run_until(units, std::future::pending()).await
    }

    /// Like [`Orchestrator::run`], but stops once `shutdown` resolves. The
    /// unit in flight is abandoned; finished images stay on disk.
    pub async fn run_until<F>(&mut self, units: &[RenderUnit], shutdown: F) -> ForgeResult<BatchReport>
    where
        F: Future<Output = ()>,
    {
        let mut report = BatchReport::new();
        self.drive(units, shutdown, &mut report).await?;
        Ok(report)
    }

    async fn drive<F>(
        &mut self,
        units: &[RenderUnit],
        shutdown: F,
        report: &mut BatchReport,
    ) -> ForgeResult<()>
    where
        F: Future<Output = ()>,
    {
        let dir = self.config.output_dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| ForgeError::io(&dir, err))?;
        warn_on_name_collisions(units);

        info!(units = units.len(), output = %dir.display(), "starting batch");
        tokio::pin!(shutdown);
        for (idx, unit) in units.iter().enumerate() {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(remaining = units.len() - idx, "batch interrupted");
                    report.interrupted = true;
                    break;
                }
                outcome = self.process(unit) => outcome,
            };
            report.record(unit, outcome);
        }
        report.finish();
        info!(
            rendered = report.rendered(),
            resumed = report.already_rendered(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(())
    }

    async fn process(&mut self, unit: &RenderUnit) -> UnitOutcome {
        let seq = unit.seq();
        let name = unit.name();
        let target = self.output_path(unit);
        match tokio::fs::try_exists(&target).await {
            Ok(true) => {
                info!(seq, name, "already rendered, skipping");
                return UnitOutcome::AlreadyRendered { path: target };
            }
            Ok(false) => {}
            Err(err) => warn!(seq, name, error = %err, "could not check for existing output"),
        }

        let job = match UnitJob::plan(unit) {
            Ok(job) => job,
            Err(err) => {
                warn!(seq, name, error = %err, "skipping unit");
                return UnitOutcome::Rejected {
                    error: err.to_string(),
                };
            }
        };

        if self.needs_reset {
            if let Err(err) = self.reset().await {
                warn!(seq, name, error = %err, "render surface could not be reset");
                return UnitOutcome::Failed {
                    after: UnitState::Idle,
                    error: format!("session reset failed: {err}"),
                };
            }
            self.needs_reset = false;
        }

        let mut ctx = UnitContext::new(seq);
        let outcome = match self.render_unit(unit, &job, &mut ctx).await {
            Ok(path) => {
                let path = settle_artifact(path, target).await;
                info!(seq, name, path = %path.display(), "rendered");
                UnitOutcome::Rendered { path }
            }
            Err(err) => {
                let after = ctx.fail();
                warn!(seq, name, after = ?after, error = %err, "render failed");
                UnitOutcome::Failed {
                    after,
                    error: err.to_string(),
                }
            }
        };

        if let Err(err) = self.reset().await {
            warn!(seq, error = %err, "failed to reset render surface, retrying before the next unit");
            self.needs_reset = true;
        }
        outcome
    }

    async fn render_unit(
        &mut self,
        unit: &RenderUnit,
        job: &UnitJob,
        ctx: &mut UnitContext,
    ) -> ForgeResult<PathBuf> {
        self.set_frames(ctx, &job.frames).await?;
        ctx.advance(UnitState::FrameSet)?;

        self.open_tab(ctx, Tab::Text).await?;
        self.enter_card_text(Half::Top, unit.top(), true).await?;
        if let Some(bottom) = unit.bottom() {
            self.enter_card_text(Half::Bottom, bottom, false).await?;
        }
        ctx.advance(UnitState::TextSet)?;

        if let Some(art) = self.art.find(unit.seq()).await {
            self.set_art(ctx, &art).await?;
            ctx.advance(UnitState::ArtSet)?;
        }

        self.set_rarity(ctx, job.rarity).await?;
        ctx.advance(UnitState::RaritySet)?;

        self.set_collector_info(ctx, unit.top(), job.rarity).await?;
        ctx.advance(UnitState::CollectorInfoSet)?;

        let limit = self.config.step_timeout;
        bounded(limit, || "download trigger".to_string(), self.surface.trigger_download()).await?;
        ctx.advance(UnitState::Submitted)?;

        let limit = self.config.download_timeout;
        let path = await_download(&mut self.surface, unit.name(), limit).await?;
        ctx.advance(UnitState::Completed)?;
        Ok(path)
    }

    async fn set_frames(&mut self, ctx: &mut UnitContext, plan: &FramePlan) -> ForgeResult<()> {
        self.open_tab(ctx, Tab::Frame).await?;
        self.select(Control::FramePack(plan.template)).await?;
        for placement in &plan.placements {
            self.select(Control::FrameOption(placement.option)).await?;
            self.select(Control::AddFrame(placement.mask)).await?;
        }
        Ok(())
    }

    async fn enter_card_text(
        &mut self,
        half: Half,
        card: &CardRecord,
        with_power_toughness: bool,
    ) -> ForgeResult<()> {
        if let Some(cost) = &card.cost {
            self.fill_slot(half, TextSlot::ManaCost, cost, EntryMode::Append)
                .await?;
        }
        // The title slot ships with placeholder text.
        self.fill_slot(half, TextSlot::Title, &card.name, EntryMode::Replace)
            .await?;
        self.fill_slot(half, TextSlot::Type, &card.type_line, EntryMode::Append)
            .await?;
        if let Some(rules) = card.rules_text() {
            self.fill_slot(half, TextSlot::Rules, &rules, EntryMode::Append)
                .await?;
        }
        if with_power_toughness {
            if let Some(pt) = &card.power_toughness {
                let pt = pt.to_string();
                self.fill_slot(half, TextSlot::PowerToughness, &pt, EntryMode::Append)
                    .await?;
            }
        }
        Ok(())
    }

    async fn set_art(&mut self, ctx: &mut UnitContext, art: &Path) -> ForgeResult<()> {
        self.open_tab(ctx, Tab::Art).await?;
        let limit = self.config.step_timeout;
        bounded(
            limit,
            || "art file reset".to_string(),
            self.surface.clear_file(Control::ArtUpload),
        )
        .await?;
        bounded(
            limit,
            || format!("art upload of {}", art.display()),
            self.surface.upload_file(Control::ArtUpload, art),
        )
        .await?;
        self.wait_visible(Control::ArtLoaded, self.config.asset_timeout)
            .await
    }

    async fn set_rarity(&mut self, ctx: &mut UnitContext, rarity: Rarity) -> ForgeResult<()> {
        self.open_tab(ctx, Tab::SetSymbol).await?;
        self.type_text(Input::SetSymbolUrl, rarity.symbol_url(), EntryMode::Replace)
            .await?;
        let limit = self.config.step_timeout;
        bounded(
            limit,
            || "set symbol submit".to_string(),
            self.surface.press_enter(Input::SetSymbolUrl),
        )
        .await?;
        self.wait_visible(Control::SetSymbolLoaded, self.config.asset_timeout)
            .await
    }

    async fn set_collector_info(
        &mut self,
        ctx: &mut UnitContext,
        card: &CardRecord,
        rarity: Rarity,
    ) -> ForgeResult<()> {
        self.open_tab(ctx, Tab::Collector).await?;
        let artist = self.config.artist.clone();
        let fields = [
            (CollectorField::Artist, artist),
            (CollectorField::Number, card.seq.to_string()),
            (CollectorField::Rarity, rarity.code().to_string()),
        ];
        for (field, value) in fields {
            self.type_text(Input::Collector(field), &value, EntryMode::Replace)
                .await?;
        }
        Ok(())
    }

    async fn open_tab(&mut self, ctx: &mut UnitContext, tab: Tab) -> ForgeResult<()> {
        if ctx.tab() == Some(tab) {
            return Ok(());
        }
        self.select(Control::Tab(tab)).await?;
        self.wait_visible(Control::Panel(tab), self.config.step_timeout)
            .await?;
        ctx.set_tab(tab);
        Ok(())
    }

    async fn fill_slot(
        &mut self,
        half: Half,
        slot: TextSlot,
        value: &str,
        mode: EntryMode,
    ) -> ForgeResult<()> {
        self.select(Control::TextSlot(half, slot)).await?;
        self.type_text(Input::TextEditor, value, mode).await
    }

    async fn select(&mut self, control: Control) -> ForgeResult<()> {
        let limit = self.config.step_timeout;
        bounded(limit, || control.to_string(), self.surface.select(control)).await
    }

    async fn wait_visible(&mut self, control: Control, limit: Duration) -> ForgeResult<()> {
        bounded(
            limit,
            || format!("{} to become visible", control),
            self.surface.wait_visible(control),
        )
        .await
    }

    async fn type_text(&mut self, input: Input, value: &str, mode: EntryMode) -> ForgeResult<()> {
        let limit = self.config.step_timeout;
        bounded(
            limit,
            || format!("typing into {:?}", input),
            self.surface.set_text(input, value, mode),
        )
        .await
    }

    async fn reset(&mut self) -> ForgeResult<()> {
        let limit = self.config.step_timeout;
        bounded(limit, || "surface reset".to_string(), self.surface.reset()).await
    }
}

/// Move a finished export to where the resume check looks for it.
async fn settle_artifact(produced: PathBuf, target: PathBuf) -> PathBuf {
    if produced == target {
        return produced;
    }
    match tokio::fs::rename(&produced, &target).await {
        Ok(()) => target,
        Err(err) => {
            warn!(
                from = %produced.display(),
                to = %target.display(),
                error = %err,
                "could not move export into the output directory"
            );
            produced
        }
    }
}

/// Warn about units that export to the same file. The resume check
/// matches by file name, so the later unit will look finished once the first is.
fn warn_on_name_collisions(units: &[RenderUnit]) -> usize {
    let mut first_seen: HashMap<String, u32> = HashMap::new();
    let mut collisions = 0;
    for unit in units {
        let seq = unit.seq();
        let stem = unit.file_stem();
        match first_seen.get(&stem) {
            Some(first) => {
                collisions += 1;
                warn!(name = unit.name(), file = %stem, first = *first, seq, "output name collision");
            }
            None => {
                first_seen.insert(stem, seq);
            }
        }
    }
    if collisions > 0 {
        debug!(collisions, "name collisions found");
    }
    collisions
}
