//! Core domain primitives: card records, pairing into render units, and the
//! frame/rarity lookup tables.

pub mod frames;
pub mod pairing;
pub mod record;

pub use frames::{
    ColorSpec, FrameColor, FrameMask, FrameOption, FramePlacement, FramePlan, FrameTemplate,
    Rarity, plan_paired, plan_single,
};
pub use pairing::{PairKind, RenderUnit, Resolution, resolve_units};
pub use record::{
    CardRecord, CardRow, FLAVOR_MARKER, PowerToughness, SkipReason, decode_newlines,
    records_from_rows,
};
