//! Draw loading.
//!
//! Input is the JSON array written by the enrichment step: one object per
//! draw with `concurso`, `data_sorteio`, `bola1`..`bola6` and an optional
//! `astro` blob. Only the seven features used for similarity are read from
//! `astro`; everything else in it is ignored.
//!
//! Loading fails fast: the first malformed record aborts with its id.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use drawlab_core::domain::{DatasetHash, Draw, DrawError, DrawFeatures, FeatureError};
use drawlab_core::fingerprint::dataset_hash;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record {index}: {field} is not a number: '{value}'")]
    InvalidNumber {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("draw {id}: invalid date '{value}'")]
    InvalidDate { id: u32, value: String },
    #[error("invalid draw: {0}")]
    Draw(#[from] DrawError),
    #[error("draw {id}: {source}")]
    Feature {
        id: u32,
        #[source]
        source: FeatureError,
    },
    #[error("draw ids must be strictly increasing: {previous} then {next}")]
    NotChronological { previous: u32, next: u32 },
}

/// A loaded draw sequence and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedDraws {
    pub draws: Vec<Draw>,
    pub dataset_hash: DatasetHash,
    pub source: PathBuf,
}

/// Integer fields arrive as numbers or numeric strings ("04").
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn parse(&self, index: usize, field: &'static str) -> Result<i64, LoadError> {
        let invalid = |value: String| LoadError::InvalidNumber {
            index,
            field,
            value,
        };
        match self {
            RawNumber::Int(n) => Ok(*n),
            RawNumber::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            RawNumber::Float(f) => Err(invalid(f.to_string())),
            RawNumber::Text(s) => s.trim().parse().map_err(|_| invalid(s.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDraw {
    concurso: RawNumber,
    data_sorteio: String,
    bola1: RawNumber,
    bola2: RawNumber,
    bola3: RawNumber,
    bola4: RawNumber,
    bola5: RawNumber,
    bola6: RawNumber,
    #[serde(default)]
    astro: Option<RawAstro>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAstro {
    lunar_phase: Option<RawPhase>,
    bodies: Option<RawBodies>,
    dominant: Option<RawDominant>,
    numerology: Option<RawNumerology>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBodies {
    moon: Option<RawBody>,
    sun: Option<RawBody>,
}

#[derive(Debug, Deserialize)]
struct RawBody {
    sign: Option<RawSign>,
}

#[derive(Debug, Deserialize)]
struct RawSign {
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDominant {
    element: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNumerology {
    weekday_index: Option<u8>,
    date_digital_root: Option<u8>,
    concurso_digital_root: Option<u8>,
}

impl RawAstro {
    fn sign_label(body: &Option<RawBody>) -> Option<&str> {
        body.as_ref()?.sign.as_ref()?.label.as_deref()
    }

    fn features(&self) -> Result<DrawFeatures, FeatureError> {
        let phase = self.lunar_phase.as_ref().and_then(|p| p.name.as_deref());
        let (moon, sun) = match &self.bodies {
            Some(b) => (Self::sign_label(&b.moon), Self::sign_label(&b.sun)),
            None => (None, None),
        };
        let element = self.dominant.as_ref().and_then(|d| d.element.as_deref());
        let numerology = self.numerology.as_ref();

        Ok(DrawFeatures {
            lunar_phase: phase.map(str::parse).transpose()?,
            moon_sign: moon.map(str::parse).transpose()?,
            sun_sign: sun.map(str::parse).transpose()?,
            dominant_element: element.map(str::parse).transpose()?,
            weekday_index: numerology.and_then(|n| n.weekday_index),
            date_digital_root: numerology.and_then(|n| n.date_digital_root),
            id_digital_root: numerology.and_then(|n| n.concurso_digital_root),
        })
    }
}

/// Target file for a forecast: either the flat feature bag or an object with
/// an enrichment-shaped `astro` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Enriched { astro: RawAstro },
    Flat(DrawFeatures),
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

fn parse_date(id: u32, value: &str) -> Result<NaiveDate, LoadError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| LoadError::InvalidDate {
            id,
            value: value.to_string(),
        })
}

fn convert(index: usize, raw: RawDraw) -> Result<Draw, LoadError> {
    let id = raw.concurso.parse(index, "concurso")?;
    let id = u32::try_from(id).map_err(|_| LoadError::InvalidNumber {
        index,
        field: "concurso",
        value: id.to_string(),
    })?;
    let date = parse_date(id, &raw.data_sorteio)?;

    let balls = [
        (&raw.bola1, "bola1"),
        (&raw.bola2, "bola2"),
        (&raw.bola3, "bola3"),
        (&raw.bola4, "bola4"),
        (&raw.bola5, "bola5"),
        (&raw.bola6, "bola6"),
    ];
    let numbers = balls
        .iter()
        .map(|&(n, field)| n.parse(index, field))
        .collect::<Result<Vec<_>, _>>()?;

    let features = raw
        .astro
        .as_ref()
        .map(RawAstro::features)
        .transpose()
        .map_err(|source| LoadError::Feature { id, source })?;

    Ok(Draw::new(id, date, &numbers, features)?)
}

/// Parse an enriched draw array. Ids must be strictly increasing.
pub fn parse_draws(content: &str) -> Result<Vec<Draw>, LoadError> {
    let raw: Vec<RawDraw> = serde_json::from_str(strip_bom(content))?;
    let draws = raw
        .into_iter()
        .enumerate()
        .map(|(index, r)| convert(index, r))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(w) = draws.windows(2).find(|w| w[1].id <= w[0].id) {
        return Err(LoadError::NotChronological {
            previous: w[0].id,
            next: w[1].id,
        });
    }
    Ok(draws)
}

/// Load and fingerprint a draw file.
pub fn load_draws(path: &Path) -> Result<LoadedDraws, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let draws = parse_draws(&content)?;
    let hash = dataset_hash(&draws);

    let enriched = draws.iter().filter(|d| d.features.is_some()).count();
    info!(
        path = %path.display(),
        draws = draws.len(),
        enriched,
        dataset = hash.short(),
        "draws loaded"
    );
    if let (Some(first), Some(last)) = (draws.first(), draws.last()) {
        debug!(first_id = first.id, first_date = %first.date, last_id = last.id, last_date = %last.date, "draw range");
    }

    Ok(LoadedDraws {
        draws,
        dataset_hash: hash,
        source: path.to_path_buf(),
    })
}

/// Parse forecast target features.
pub fn parse_target_features(content: &str) -> Result<DrawFeatures, LoadError> {
    let raw: RawTarget = serde_json::from_str(strip_bom(content))?;
    match raw {
        RawTarget::Enriched { astro } => {
            astro.features().map_err(|source| LoadError::Feature { id: 0, source })
        }
        RawTarget::Flat(features) => Ok(features),
    }
}

pub fn load_target_features(path: &Path) -> Result<DrawFeatures, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_target_features(&content)
}
