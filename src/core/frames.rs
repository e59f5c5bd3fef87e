//! Static lookup tables between card attributes and the options the card
//! creator exposes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::record::CardRecord;
use crate::error::ForgeError;

/// Frame colors understood by the creator's frame picker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FrameColor {
    White,
    Blue,
    Black,
    Red,
    Green,
    Multi,
    Artifact,
    Land,
    Eldrazi,
    Vehicle,
    Colorless,
}

impl FrameColor {
    pub const ALL: [FrameColor; 11] = [
        FrameColor::White,
        FrameColor::Blue,
        FrameColor::Black,
        FrameColor::Red,
        FrameColor::Green,
        FrameColor::Multi,
        FrameColor::Artifact,
        FrameColor::Land,
        FrameColor::Eldrazi,
        FrameColor::Vehicle,
        FrameColor::Colorless,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameColor::White => "White",
            FrameColor::Blue => "Blue",
            FrameColor::Black => "Black",
            FrameColor::Red => "Red",
            FrameColor::Green => "Green",
            FrameColor::Multi => "Multi",
            FrameColor::Artifact => "Artifact",
            FrameColor::Land => "Land",
            FrameColor::Eldrazi => "Eldrazi",
            FrameColor::Vehicle => "Vehicle",
            FrameColor::Colorless => "Colorless",
        }
    }

    /// Position of the base frame in the picker (1-based, as the picker's children are).
    pub fn frame_option(&self) -> Option<FrameOption> {
        let idx = match self {
            FrameColor::White => 1,
            FrameColor::Blue => 2,
            FrameColor::Black => 3,
            FrameColor::Red => 4,
            FrameColor::Green => 5,
            FrameColor::Multi => 6,
            FrameColor::Artifact => 7,
            FrameColor::Land => 8,
            FrameColor::Eldrazi => 9,
            FrameColor::Vehicle => 10,
            FrameColor::Colorless => return None,
        };
        Some(FrameOption(idx))
    }

    /// Position of the matching power/toughness box in the picker.
    pub fn power_toughness_option(&self) -> Option<FrameOption> {
        let idx = match self {
            FrameColor::White => 11,
            FrameColor::Blue => 12,
            FrameColor::Black => 13,
            FrameColor::Red => 14,
            FrameColor::Green => 15,
            FrameColor::Multi => 16,
            FrameColor::Artifact => 17,
            FrameColor::Colorless => 18,
            FrameColor::Land | FrameColor::Eldrazi | FrameColor::Vehicle => return None,
        };
        Some(FrameOption(idx))
    }
}

impl fmt::Display for FrameColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        FrameColor::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// 1-based child index of an entry in the frame picker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FrameOption(pub u8);

/// Color specification of a record: a single frame or a left/right pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpec {
    Single(FrameColor),
    Dual(FrameColor, FrameColor),
}

impl ColorSpec {
    /// Parse the record's color cell, naming the record on failure.
    pub fn for_card(card: &CardRecord) -> Result<Self, ForgeError> {
        let unknown = |token: &str| ForgeError::UnknownColor {
            token: token.trim().to_string(),
            seq: card.seq,
        };
        let parse = |token: &str| token.parse::<FrameColor>().map_err(|_| unknown(token));
        match card.color.split_once('/') {
            Some((left, right)) => {
                if right.contains('/') {
                    return Err(unknown(&card.color));
                }
                Ok(ColorSpec::Dual(parse(left)?, parse(right)?))
            }
            None => Ok(ColorSpec::Single(parse(&card.color)?)),
        }
    }

    /// Power/toughness box for this color spec. Dual frames always use the
    /// colorless box.
    pub fn power_toughness_option(&self, card: &CardRecord) -> Result<FrameOption, ForgeError> {
        let color = match self {
            ColorSpec::Single(color) => *color,
            ColorSpec::Dual(..) => FrameColor::Colorless,
        };
        color
            .power_toughness_option()
            .ok_or_else(|| ForgeError::MissingPowerToughnessFrame {
                color: color.to_string(),
                seq: card.seq,
            })
    }

    /// Single frame color used where only one frame fits (split halves).
    pub fn collapsed(&self) -> FrameColor {
        match self {
            ColorSpec::Single(color) => *color,
            ColorSpec::Dual(..) => FrameColor::Multi,
        }
    }
}

fn base_option(color: FrameColor, card: &CardRecord) -> Result<FrameOption, ForgeError> {
    color.frame_option().ok_or_else(|| ForgeError::UnknownColor {
        token: color.to_string(),
        seq: card.seq,
    })
}

/// Rarity letters and the set-symbol image each one loads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    pub fn for_card(card: &CardRecord) -> Result<Self, ForgeError> {
        match card.rarity.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Rarity::Common),
            "U" => Ok(Rarity::Uncommon),
            "R" => Ok(Rarity::Rare),
            _ => Err(ForgeError::UnknownRarity {
                token: card.rarity.clone(),
                seq: card.seq,
            }),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rarity::Common => "C",
            Rarity::Uncommon => "U",
            Rarity::Rare => "R",
        }
    }

    pub fn symbol_url(&self) -> &'static str {
        match self {
            Rarity::Rare => "https://i.imgur.com/3dvWenR.png",
            Rarity::Uncommon => "https://i.imgur.com/FMyNUww.png",
            Rarity::Common => "https://i.imgur.com/CGciVRr.png",
        }
    }
}

/// Frame pack selected before any frame is placed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FrameTemplate {
    Standard,
    Split,
}

/// Region of the card a frame option is added to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FrameMask {
    Full,
    RightHalf,
    Top,
    Bottom,
}

/// A frame option and the mask it is added with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FramePlacement {
    pub option: FrameOption,
    pub mask: FrameMask,
}

/// Everything the frame step needs, resolved up front so mapping errors
/// surface before the surface is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub template: FrameTemplate,
    pub placements: Vec<FramePlacement>,
}

/// Frames for a standalone card.
pub fn plan_single(card: &CardRecord) -> Result<FramePlan, ForgeError> {
    let spec = ColorSpec::for_card(card)?;
    let mut placements = Vec::new();
    match spec {
        ColorSpec::Single(color) => {
            placements.push(FramePlacement {
                option: base_option(color, card)?,
                mask: FrameMask::Full,
            });
        }
        ColorSpec::Dual(left, right) => {
            placements.push(FramePlacement {
                option: base_option(left, card)?,
                mask: FrameMask::Full,
            });
            placements.push(FramePlacement {
                option: base_option(right, card)?,
                mask: FrameMask::RightHalf,
            });
        }
    }
    if card.power_toughness.is_some() {
        placements.push(FramePlacement {
            option: spec.power_toughness_option(card)?,
            mask: FrameMask::Full,
        });
    }
    Ok(FramePlan {
        template: FrameTemplate::Standard,
        placements,
    })
}

/// Frames for a split or fuse pair: each half gets one frame in its own mask.
pub fn plan_paired(top: &CardRecord, bottom: &CardRecord) -> Result<FramePlan, ForgeError> {
    let top_spec = ColorSpec::for_card(top)?;
    let bottom_spec = ColorSpec::for_card(bottom)?;
    let mut placements = vec![
        FramePlacement {
            option: base_option(top_spec.collapsed(), top)?,
            mask: FrameMask::Top,
        },
        FramePlacement {
            option: base_option(bottom_spec.collapsed(), bottom)?,
            mask: FrameMask::Bottom,
        },
    ];
    if top.power_toughness.is_some() {
        placements.push(FramePlacement {
            option: top_spec.power_toughness_option(top)?,
            mask: FrameMask::Top,
        });
    }
    Ok(FramePlan {
        template: FrameTemplate::Split,
        placements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::PowerToughness;
    use pretty_assertions::assert_eq;

    fn creature(color: &str) -> CardRecord {
        let mut card = CardRecord::new(5, "Beast", color, "Creature");
        card.power_toughness = Some(PowerToughness {
            power: "3".into(),
            toughness: "3".into(),
        });
        card
    }

    #[test]
    fn color_tokens_parse_case_insensitively() {
        assert_eq!("white".parse::<FrameColor>(), Ok(FrameColor::White));
        assert_eq!(" Multi ".parse::<FrameColor>(), Ok(FrameColor::Multi));
        assert!("Purple".parse::<FrameColor>().is_err());
    }

    #[test]
    fn single_color_creature_uses_color_specific_pt_box() {
        let plan = plan_single(&creature("Green")).unwrap();
        assert_eq!(plan.template, FrameTemplate::Standard);
        assert_eq!(
            plan.placements,
            vec![
                FramePlacement {
                    option: FrameOption(5),
                    mask: FrameMask::Full
                },
                FramePlacement {
                    option: FrameOption(15),
                    mask: FrameMask::Full
                },
            ]
        );
    }

    #[test]
    fn dual_color_creature_uses_colorless_pt_box() {
        let plan = plan_single(&creature("White/Blue")).unwrap();
        let options: Vec<(u8, FrameMask)> = plan
            .placements
            .iter()
            .map(|p| (p.option.0, p.mask))
            .collect();
        assert_eq!(
            options,
            vec![
                (1, FrameMask::Full),
                (2, FrameMask::RightHalf),
                (18, FrameMask::Full)
            ]
        );
    }

    #[test]
    fn unknown_tokens_name_the_record() {
        let err = plan_single(&CardRecord::new(9, "Odd", "Red/Purple", "Instant")).unwrap_err();
        assert_eq!(err.to_string(), "unknown color 'Purple' on card #9");

        let err = plan_single(&CardRecord::new(9, "Odd", "Red/Blue/Green", "Instant")).unwrap_err();
        assert!(matches!(err, ForgeError::UnknownColor { .. }));

        let mut card = CardRecord::new(4, "Rare?", "Red", "Instant");
        card.rarity = "M".into();
        assert!(matches!(
            Rarity::for_card(&card),
            Err(ForgeError::UnknownRarity { seq: 4, .. })
        ));
    }

    #[test]
    fn land_creature_has_no_pt_box() {
        let err = plan_single(&creature("Land")).unwrap_err();
        assert!(matches!(err, ForgeError::MissingPowerToughnessFrame { .. }));
    }

    #[test]
    fn paired_plan_places_halves_in_complementary_masks() {
        let top = creature("Red");
        let bottom = CardRecord::new(6, "Ice", "Blue/Black", "Instant");
        let plan = plan_paired(&top, &bottom).unwrap();
        assert_eq!(plan.template, FrameTemplate::Split);
        let options: Vec<(u8, FrameMask)> = plan
            .placements
            .iter()
            .map(|p| (p.option.0, p.mask))
            .collect();
        assert_eq!(
            options,
            vec![(4, FrameMask::Top), (6, FrameMask::Bottom), (14, FrameMask::Top)]
        );
    }

    #[test]
    fn rarity_codes_map_to_symbols() {
        let mut card = CardRecord::new(1, "Shock", "Red", "Instant");
        card.rarity = "u".into();
        let rarity = Rarity::for_card(&card).unwrap();
        assert_eq!(rarity, Rarity::Uncommon);
        assert_eq!(rarity.code(), "U");
        assert_eq!(rarity.symbol_url(), "https://i.imgur.com/FMyNUww.png");
    }
}
