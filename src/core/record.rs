use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Literal two-character escape used by spreadsheet cells for line breaks.
pub const NEWLINE_ESCAPE: &str = "\\n";
/// Marker the card creator uses to start the flavor-text block.
pub const FLAVOR_MARKER: &str = "{flavor}";

/// Raw tabular row as exported from the card sheet.
///
/// Cells may arrive as numbers or strings depending on how the sheet was
/// typed; every cell is normalized to an optional trimmed string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRow {
    #[serde(rename = "#", default, deserialize_with = "cell")]
    pub seq: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "cell")]
    pub name: Option<String>,
    #[serde(rename = "Rarity", default, deserialize_with = "cell")]
    pub rarity: Option<String>,
    #[serde(rename = "Color", default, deserialize_with = "cell")]
    pub color: Option<String>,
    #[serde(rename = "Cost", default, deserialize_with = "cell")]
    pub cost: Option<String>,
    #[serde(rename = "Type", default, deserialize_with = "cell")]
    pub type_line: Option<String>,
    #[serde(rename = "Text", default, deserialize_with = "cell")]
    pub text: Option<String>,
    #[serde(rename = "Power", default, deserialize_with = "cell")]
    pub power: Option<String>,
    #[serde(rename = "Toughness", default, deserialize_with = "cell")]
    pub toughness: Option<String>,
    #[serde(rename = "Flavor", default, deserialize_with = "cell")]
    pub flavor: Option<String>,
    #[serde(rename = "Split", default, deserialize_with = "cell")]
    pub split: Option<String>,
    #[serde(rename = "Fuse", default, deserialize_with = "cell")]
    pub fuse: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Cell>::deserialize(deserializer)?;
    let text = match raw {
        None => return Ok(None),
        Some(Cell::Text(s)) => s,
        Some(Cell::Int(i)) => i.to_string(),
        Some(Cell::Float(f)) if f.fract() == 0.0 => format!("{}", f as i64),
        Some(Cell::Float(f)) => f.to_string(),
        Some(Cell::Bool(b)) => b.to_string(),
    };
    Ok(non_blank(text))
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

/// Why a row never became a [`CardRecord`]. These rows are template or
/// separator rows and are expected in real sheets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    MissingField(String),
    BadSequence(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing required field '{}'", field),
            SkipReason::BadSequence(raw) => write!(f, "sequence number '{}' is not a number", raw),
        }
    }
}

/// Power and toughness, present only when both cells are filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PowerToughness {
    pub power: String,
    pub toughness: String,
}

impl fmt::Display for PowerToughness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.power, self.toughness)
    }
}

/// One logical card to render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRecord {
    pub seq: u32,
    pub name: String,
    #[serde(default)]
    pub rarity: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    pub type_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_toughness: Option<PowerToughness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuse_group: Option<String>,
}

impl CardRecord {
    /// Normalize a raw row, or explain why it is not a card.
    pub fn from_row(row: CardRow) -> Result<Self, SkipReason> {
        let name = row.name.ok_or_else(|| SkipReason::MissingField("Name".into()))?;
        let color = row
            .color
            .ok_or_else(|| SkipReason::MissingField("Color".into()))?;
        let type_line = row
            .type_line
            .ok_or_else(|| SkipReason::MissingField("Type".into()))?;
        let raw_seq = row.seq.ok_or_else(|| SkipReason::MissingField("#".into()))?;
        let seq = raw_seq
            .parse::<u32>()
            .map_err(|_| SkipReason::BadSequence(raw_seq.clone()))?;

        let power_toughness = match (row.power, row.toughness) {
            (Some(power), Some(toughness)) => Some(PowerToughness { power, toughness }),
            _ => None,
        };

        Ok(Self {
            seq,
            name,
            rarity: row.rarity.unwrap_or_default(),
            color,
            cost: row.cost,
            type_line,
            text: row.text,
            flavor: row.flavor,
            power_toughness,
            split_group: row.split,
            fuse_group: row.fuse,
        })
    }

    /// Convenience constructor for the required fields.
    pub fn new<S: Into<String>>(seq: u32, name: S, color: S, type_line: S) -> Self {
        Self {
            seq,
            name: name.into(),
            rarity: String::new(),
            color: color.into(),
            cost: None,
            type_line: type_line.into(),
            text: None,
            flavor: None,
            power_toughness: None,
            split_group: None,
            fuse_group: None,
        }
    }

    pub fn is_dual_color(&self) -> bool {
        self.color.contains('/')
    }

    /// Rules text as it should be typed: escapes decoded, flavor appended after the marker.
    pub fn rules_text(&self) -> Option<String> {
        let rules = self.text.as_deref().map(decode_newlines);
        let flavor = self.flavor.as_deref().map(decode_newlines);
        match (rules, flavor) {
            (None, None) => None,
            (Some(rules), None) => Some(rules),
            (rules, Some(flavor)) => {
                let mut out = rules.unwrap_or_default();
                out.push_str(FLAVOR_MARKER);
                out.push_str(&flavor);
                Some(out)
            }
        }
    }
}

/// Replace the literal `\n` escape with real line breaks.
pub fn decode_newlines(text: &str) -> String {
    text.replace(NEWLINE_ESCAPE, "\n")
}

/// Normalize a batch of rows, keeping the skipped ones for reporting.
pub fn records_from_rows<I>(rows: I) -> (Vec<CardRecord>, Vec<(usize, SkipReason)>)
where
    I: IntoIterator<Item = CardRow>,
{
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        match CardRecord::from_row(row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::debug!(row = idx, %reason, "skipping row");
                skipped.push((idx, reason));
            }
        }
    }
    (records, skipped)
}
