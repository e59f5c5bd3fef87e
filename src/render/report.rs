use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{RenderUnit, SkipReason};
use crate::render::context::UnitState;

/// What happened to one render unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Rendered { path: PathBuf },
    AlreadyRendered { path: PathBuf },
    /// The surface was driven but the unit did not complete.
    Failed { after: UnitState, error: String },
    /// Rejected before any surface interaction (mapping problems).
    Rejected { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitReport {
    pub seqs: Vec<u32>,
    pub name: String,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

impl UnitReport {
    pub fn new(unit: &RenderUnit, outcome: UnitOutcome) -> Self {
        Self {
            seqs: unit.seqs(),
            name: unit.name().to_string(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedRecord {
    pub seq: u32,
    pub reason: SkipReason,
}

/// Summary of a batch run, written next to the rendered cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub units: Vec<UnitReport>,
    /// Pairing problems found while grouping records.
    #[serde(default)]
    pub pairing_errors: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<SkippedRecord>,
    /// Set when the run stopped before reaching the last unit.
    #[serde(default)]
    pub interrupted: bool,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            units: Vec::new(),
            pairing_errors: Vec::new(),
            skipped: Vec::new(),
            interrupted: false,
        }
    }

    pub fn record(&mut self, unit: &RenderUnit, outcome: UnitOutcome) {
        self.units.push(UnitReport::new(unit, outcome));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn rendered(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Rendered { .. }))
    }

    pub fn already_rendered(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::AlreadyRendered { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed { .. } | UnitOutcome::Rejected { .. }))
    }

    fn count<F: Fn(&UnitOutcome) -> bool>(&self, pred: F) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }

    /// Images available for sheet packing, in unit order.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.units
            .iter()
            .filter_map(|u| match &u.outcome {
                UnitOutcome::Rendered { path } | UnitOutcome::AlreadyRendered { path } => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).context("failed to serialize report")?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse report {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_and_paths_follow_unit_order() {
        let a = RenderUnit::Single(CardRecord::new(1, "Shock", "Red", "Instant"));
        let b = RenderUnit::Single(CardRecord::new(2, "Opt", "Blue", "Instant"));
        let c = RenderUnit::Single(CardRecord::new(3, "Duress", "Black", "Sorcery"));

        let mut report = BatchReport::new();
        report.record(
            &a,
            UnitOutcome::AlreadyRendered {
                path: "cards/Shock.png".into(),
            },
        );
        report.record(
            &b,
            UnitOutcome::Failed {
                after: UnitState::Submitted,
                error: "canceled".into(),
            },
        );
        report.record(
            &c,
            UnitOutcome::Rendered {
                path: "cards/Duress.png".into(),
            },
        );

        assert_eq!(report.rendered(), 1);
        assert_eq!(report.already_rendered(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.image_paths(),
            vec![PathBuf::from("cards/Shock.png"), PathBuf::from("cards/Duress.png")]
        );
    }

    #[test]
    fn report_survives_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = BatchReport::new();
        report.record(
            &RenderUnit::Single(CardRecord::new(4, "Bear", "Green", "Creature")),
            UnitOutcome::Rejected {
                error: "unknown rarity '' on card #4".into(),
            },
        );
        report.skipped.push(SkippedRecord {
            seq: 9,
            reason: SkipReason::MissingField("Type".into()),
        });
        report.finish();
        report.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"status\": \"rejected\""));
        assert_eq!(BatchReport::load(&path).unwrap(), report);
    }
}
