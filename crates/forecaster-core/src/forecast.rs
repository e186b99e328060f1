//! Growth forecast scoring
//!
//! Maps a workspace onto a 0-200 score:
//! - Section A: admissions, linear up to 60 points at 1000 admissions
//! - Section B: conversion rate, up to 60 points
//! - Section C: promotion rate, up to 50 points
//! - Section D: 10 points for rapidly increasing local growth, otherwise 5
//!
//! Contributions are summed in `f64` in section order and the total is
//! rounded half to even, so scores match the published calculator exactly,
//! including totals that land a hair off a .5 tie.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ValidationError};
use crate::models::{LocalGrowth, SectionId};
use crate::schema::fields;
use crate::session::Workspace;

/// Upper bound of the growth forecast score
pub const MAX_SCORE: u32 = 200;

/// Admissions at which the Section A contribution saturates
pub const ADMISSIONS_SATURATION: u32 = 1000;

const HISTORICAL_WEIGHT: u32 = 60;
const MARKET_WEIGHT: u32 = 60;
const CAPACITY_WEIGHT: u32 = 50;
const GROWTH_BONUS: u32 = 10;
const BASELINE_BONUS: u32 = 5;

/// Qualitative label derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Expansion,
    Stable,
    Saturation,
}

impl Classification {
    /// Bands: above 140 is expansion, above 80 is stable, the rest saturation
    pub fn from_score(score: u32) -> Self {
        if score > 140 {
            Self::Expansion
        } else if score > 80 {
            Self::Stable
        } else {
            Self::Saturation
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expansion => "expansion",
            Self::Stable => "stable",
            Self::Saturation => "saturation",
        }
    }

    /// One-line recommendation shown with the score
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Expansion => "Aggressive Expansion Suggested",
            Self::Stable => "Moderate/Stable Growth",
            Self::Saturation => "Market Saturation/Intervention Required",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-section contributions before rounding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub historical: f64,
    pub market: f64,
    pub capacity: f64,
    pub external: f64,
    pub raw_total: f64,
}

/// Outcome of one forecast computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    score: u32,
    classification: Classification,
    breakdown: ScoreBreakdown,
}

impl ForecastResult {
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }
}

/// Round a raw total to whole points, ties to even, capped at [`MAX_SCORE`]
fn round_score(raw_total: f64) -> u32 {
    // raw_total is finite and within 0..=180 for any accepted input
    raw_total.round_ties_even().clamp(0.0, f64::from(MAX_SCORE)) as u32
}

/// Deterministic mapping from a workspace to a [`ForecastResult`]
pub struct ForecastEngine;

impl ForecastEngine {
    /// Score the workspace
    ///
    /// Fails if any scored field (admissions, conversion rate, promotion rate,
    /// local growth) has not been submitted. Other fields are collected but do
    /// not influence the score.
    pub fn compute(workspace: &Workspace) -> Result<ForecastResult> {
        let admissions = workspace
            .historical_trends()
            .total_admissions
            .ok_or(ValidationError::MissingField {
                section: SectionId::A,
                field: fields::TOTAL_ADMISSIONS,
            })?;
        let conversion_rate =
            workspace
                .market_data()
                .conversion_rate
                .ok_or(ValidationError::MissingField {
                    section: SectionId::B,
                    field: fields::CONVERSION_RATE,
                })?;
        let promotion_rate =
            workspace
                .capacity()
                .promotion_rate
                .ok_or(ValidationError::MissingField {
                    section: SectionId::C,
                    field: fields::PROMOTION_RATE,
                })?;
        let local_growth =
            workspace
                .external_factors()
                .local_growth
                .ok_or(ValidationError::MissingField {
                    section: SectionId::D,
                    field: fields::LOCAL_GROWTH,
                })?;

        let historical = historical_points(admissions);
        let market = f64::from(conversion_rate) / 100.0 * f64::from(MARKET_WEIGHT);
        let capacity = f64::from(promotion_rate) / 100.0 * f64::from(CAPACITY_WEIGHT);
        let external = f64::from(match local_growth {
            LocalGrowth::RapidlyIncreasing => GROWTH_BONUS,
            _ => BASELINE_BONUS,
        });

        let raw_total = historical + market + capacity + external;
        let score = round_score(raw_total);
        let classification = Classification::from_score(score);

        info!(
            score,
            classification = %classification,
            raw_total,
            "Forecast computed"
        );

        Ok(ForecastResult {
            score,
            classification,
            breakdown: ScoreBreakdown {
                historical,
                market,
                capacity,
                external,
                raw_total,
            },
        })
    }
}

/// admissions / 1000 * 60 points, capped at 60
fn historical_points(admissions: u32) -> f64 {
    (f64::from(admissions) / f64::from(ADMISSIONS_SATURATION) * f64::from(HISTORICAL_WEIGHT))
        .min(f64::from(HISTORICAL_WEIGHT))
}
