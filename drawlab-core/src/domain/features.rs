//! Categorical features attached to a draw by the external enrichment step.
//!
//! The enrichment step (lunar phase, zodiac placements, numerology) runs
//! outside this crate. Here the features are plain tagged values: a draw
//! either has a field or it does not, and two draws match on a field only
//! when both sides carry the same value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of independent feature comparisons used for astro similarity.
pub const FEATURE_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label '{label}'")]
pub struct FeatureError {
    pub kind: &'static str,
    pub label: String,
}

/// Lowercase with spaces, underscores and hyphens removed, so "Waxing Gibbous",
/// "waxing_gibbous" and "WaxingGibbous" all compare equal.
fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_label<T: Copy>(
    kind: &'static str,
    label: &str,
    all: &[T],
    label_of: impl Fn(T) -> &'static str,
) -> Result<T, FeatureError> {
    let wanted = normalize_label(label);
    all.iter()
        .copied()
        .find(|&v| normalize_label(label_of(v)) == wanted)
        .ok_or_else(|| FeatureError {
            kind,
            label: label.to_string(),
        })
}

// ─── Lunar phase ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum LunarPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl LunarPhase {
    pub const ALL: [LunarPhase; 8] = [
        Self::NewMoon,
        Self::WaxingCrescent,
        Self::FirstQuarter,
        Self::WaxingGibbous,
        Self::FullMoon,
        Self::WaningGibbous,
        Self::LastQuarter,
        Self::WaningCrescent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::NewMoon => "New Moon",
            Self::WaxingCrescent => "Waxing Crescent",
            Self::FirstQuarter => "First Quarter",
            Self::WaxingGibbous => "Waxing Gibbous",
            Self::FullMoon => "Full Moon",
            Self::WaningGibbous => "Waning Gibbous",
            Self::LastQuarter => "Last Quarter",
            Self::WaningCrescent => "Waning Crescent",
        }
    }
}

impl FromStr for LunarPhase {
    type Err = FeatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("lunar phase", s, &Self::ALL, Self::label)
    }
}

// ─── Zodiac sign ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        Self::Aries,
        Self::Taurus,
        Self::Gemini,
        Self::Cancer,
        Self::Leo,
        Self::Virgo,
        Self::Libra,
        Self::Scorpio,
        Self::Sagittarius,
        Self::Capricorn,
        Self::Aquarius,
        Self::Pisces,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Aries => "Aries",
            Self::Taurus => "Taurus",
            Self::Gemini => "Gemini",
            Self::Cancer => "Cancer",
            Self::Leo => "Leo",
            Self::Virgo => "Virgo",
            Self::Libra => "Libra",
            Self::Scorpio => "Scorpio",
            Self::Sagittarius => "Sagittarius",
            Self::Capricorn => "Capricorn",
            Self::Aquarius => "Aquarius",
            Self::Pisces => "Pisces",
        }
    }
}

impl FromStr for ZodiacSign {
    type Err = FeatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("zodiac sign", s, &Self::ALL, Self::label)
    }
}

// ─── Element ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

impl Element {
    pub const ALL: [Element; 4] = [Self::Fire, Self::Earth, Self::Air, Self::Water];

    pub fn label(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Earth => "earth",
            Self::Air => "air",
            Self::Water => "water",
        }
    }
}

impl FromStr for Element {
    type Err = FeatureError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("element", s, &Self::ALL, Self::label)
    }
}

macro_rules! label_conversions {
    ($($ty:ty),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = FeatureError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for &'static str {
            fn from(value: $ty) -> Self {
                value.label()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    )*};
}

label_conversions!(LunarPhase, ZodiacSign, Element);

// ─── Feature bag ─────────────────────────────────────────────────────

/// Fixed-shape feature bag for a historical draw or a hypothetical target.
///
/// A forecast target has no draw id yet, so `id_digital_root` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawFeatures {
    pub lunar_phase: Option<LunarPhase>,
    pub moon_sign: Option<ZodiacSign>,
    pub sun_sign: Option<ZodiacSign>,
    pub dominant_element: Option<Element>,
    pub weekday_index: Option<u8>,
    pub date_digital_root: Option<u8>,
    pub id_digital_root: Option<u8>,
}

fn same<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

impl DrawFeatures {
    /// Per-feature match flags, in [`FeatureWeights`] order.
    pub fn matches(&self, other: &DrawFeatures) -> [bool; FEATURE_COUNT] {
        [
            same(self.lunar_phase, other.lunar_phase),
            same(self.moon_sign, other.moon_sign),
            same(self.sun_sign, other.sun_sign),
            same(self.dominant_element, other.dominant_element),
            same(self.weekday_index, other.weekday_index),
            same(self.date_digital_root, other.date_digital_root),
            same(self.id_digital_root, other.id_digital_root),
        ]
    }

    /// Weighted sum of the matching features.
    pub fn similarity(&self, other: &DrawFeatures, weights: &FeatureWeights) -> f64 {
        self.matches(other)
            .iter()
            .zip(weights.0)
            .filter_map(|(m, w)| m.then_some(w))
            .sum()
    }
}

/// Weight of each feature comparison in the astro similarity score.
///
/// Order: lunar phase, moon sign, sun sign, dominant element, weekday,
/// date digital root, id digital root. All ones gives the plain match count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureWeights(pub [f64; FEATURE_COUNT]);

impl Default for FeatureWeights {
    fn default() -> Self {
        Self([1.0; FEATURE_COUNT])
    }
}
