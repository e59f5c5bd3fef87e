//! Driving the remote card creator: one render unit at a time, every wait
//! bounded, finished exports skipped on re-runs.

mod art;
mod context;
mod orchestrator;
mod report;
mod surface;

#[cfg(test)]
pub(crate) mod fake;

pub use art::ArtLibrary;
pub use context::{UnitContext, UnitState};
pub use orchestrator::Orchestrator;
pub use report::{BatchReport, SkippedRecord, UnitOutcome, UnitReport};
pub use surface::{
    CollectorField, Control, DownloadEvent, EntryMode, Half, Input, RenderSurface, Tab, TextSlot,
    await_download, bounded,
};
