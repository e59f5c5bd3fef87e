use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::record::{CardRecord, SkipReason};
use crate::error::ForgeError;

/// Which grouping column joined two records into one unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PairKind {
    Split,
    Fuse,
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairKind::Split => write!(f, "split"),
            PairKind::Fuse => write!(f, "fuse"),
        }
    }
}

/// One job submitted to the render surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "layout")]
pub enum RenderUnit {
    Single(CardRecord),
    Paired {
        kind: PairKind,
        top: CardRecord,
        bottom: CardRecord,
    },
}

impl RenderUnit {
    /// The record that owns the rarity symbol and collector info.
    pub fn top(&self) -> &CardRecord {
        match self {
            RenderUnit::Single(card) => card,
            RenderUnit::Paired { top, .. } => top,
        }
    }

    pub fn bottom(&self) -> Option<&CardRecord> {
        match self {
            RenderUnit::Single(_) => None,
            RenderUnit::Paired { bottom, .. } => Some(bottom),
        }
    }

    /// Sequence number used for the artwork lookup and collector number.
    pub fn seq(&self) -> u32 {
        self.top().seq
    }

    pub fn seqs(&self) -> Vec<u32> {
        match self {
            RenderUnit::Single(card) => vec![card.seq],
            RenderUnit::Paired { top, bottom, .. } => vec![top.seq, bottom.seq],
        }
    }

    /// Title the surface names the exported image after.
    pub fn name(&self) -> &str {
        &self.top().name
    }

    /// [`RenderUnit::name`] reduced to one file-name component. Exports and
    /// the resume check both use it, so they always agree on the path.
    pub fn file_stem(&self) -> String {
        file_stem(self.name())
    }
}

fn file_stem(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    // Also rules out "." and "..".
    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Outcome of grouping a record list into render units.
#[derive(Debug, Default)]
pub struct Resolution {
    pub units: Vec<RenderUnit>,
    pub errors: Vec<ForgeError>,
    pub skipped: Vec<(u32, SkipReason)>,
}

fn missing_field(card: &CardRecord) -> Option<&'static str> {
    if card.name.trim().is_empty() {
        Some("Name")
    } else if card.color.trim().is_empty() {
        Some("Color")
    } else if card.type_line.trim().is_empty() {
        Some("Type")
    } else {
        None
    }
}

fn group_of(card: &CardRecord) -> Result<Option<(PairKind, &str)>, ForgeError> {
    match (&card.split_group, &card.fuse_group) {
        (Some(split), Some(fuse)) => Err(ForgeError::ConflictingGroups {
            seq: card.seq,
            split: split.clone(),
            fuse: fuse.clone(),
        }),
        (Some(key), None) => Ok(Some((PairKind::Split, key))),
        (None, Some(key)) => Ok(Some((PairKind::Fuse, key))),
        (None, None) => Ok(None),
    }
}

/// Locate the unique partner of `records[idx]`, if the record is grouped.
///
/// The search covers the whole list, so the answer is the same from either half.
pub(crate) fn find_partner(
    records: &[CardRecord],
    idx: usize,
) -> Result<Option<(PairKind, usize)>, ForgeError> {
    let Some(card) = records.get(idx) else {
        return Ok(None);
    };
    let Some((kind, key)) = group_of(card)? else {
        return Ok(None);
    };
    let partners: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(other_idx, other)| {
            *other_idx != idx
                && missing_field(other).is_none()
                && matches!(group_of(other), Ok(Some((k, other_key))) if k == kind && other_key == key)
        })
        .map(|(other_idx, _)| other_idx)
        .collect();

    match partners.as_slice() {
        [partner] => Ok(Some((kind, *partner))),
        _ => Err(ForgeError::Pairing {
            kind,
            key: key.to_string(),
            seq: card.seq,
            matches: partners.len(),
        }),
    }
}

/// Group records into render units, preserving the order of top records.
///
/// Pairing problems are collected per unit and never stop the resolution.
pub fn resolve_units(records: &[CardRecord]) -> Resolution {
    let mut resolution = Resolution::default();
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut failed_groups: HashSet<(PairKind, String)> = HashSet::new();

    for (idx, card) in records.iter().enumerate() {
        if consumed.contains(&idx) {
            continue;
        }
        if let Some(field) = missing_field(card) {
            debug!(seq = card.seq, field, "skipping incomplete record");
            resolution
                .skipped
                .push((card.seq, SkipReason::MissingField(field.to_string())));
            continue;
        }

        if let Ok(Some((kind, key))) = group_of(card) {
            if failed_groups.contains(&(kind, key.to_string())) {
                continue;
            }
        }

        match find_partner(records, idx) {
            Ok(None) => resolution.units.push(RenderUnit::Single(card.clone())),
            Ok(Some((kind, partner))) => {
                consumed.insert(partner);
                let (top, bottom) = if partner < idx {
                    (&records[partner], card)
                } else {
                    (card, &records[partner])
                };
                resolution.units.push(RenderUnit::Paired {
                    kind,
                    top: top.clone(),
                    bottom: bottom.clone(),
                });
            }
            Err(err) => {
                warn!(seq = card.seq, name = %card.name, error = %err, "skipping unpairable card");
                if let ForgeError::Pairing { kind, key, .. } = &err {
                    failed_groups.insert((*kind, key.clone()));
                }
                resolution.errors.push(err);
            }
        }
    }
    resolution
}
