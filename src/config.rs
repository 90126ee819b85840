use std::env;
use std::path::PathBuf;

use crate::parlay::DEFAULT_COPULA_POINTS;

pub const MIN_CONFIDENCE_FLOOR: f64 = 50.0;
pub const MIN_CONFIDENCE_CEIL: f64 = 85.0;
pub const MAX_PARLAY_LEGS: usize = 12;

/// Runtime settings, read from the environment (after `.env.local` / `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Fixed seed for reproducible sessions; random when unset.
    pub seed: Option<u64>,
    pub min_confidence: f64,
    pub parlay_legs: usize,
    pub stake: f64,
    pub copula_points: usize,
    /// Shade lines and targets down by default.
    pub conservative: bool,
    pub export_path: PathBuf,
    pub feed_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: None,
            min_confidence: 60.0,
            parlay_legs: 6,
            stake: 100.0,
            copula_points: DEFAULT_COPULA_POINTS,
            conservative: false,
            export_path: PathBuf::from("props_export.xlsx"),
            feed_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let seed = get("PROP_SEED").and_then(|v| v.trim().parse::<u64>().ok());
        let min_confidence = get("PROP_MIN_CONFIDENCE")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(d.min_confidence)
            .clamp(MIN_CONFIDENCE_FLOOR, MIN_CONFIDENCE_CEIL);
        let parlay_legs = get("PROP_PARLAY_LEGS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(d.parlay_legs)
            .clamp(2, MAX_PARLAY_LEGS);
        let stake = get("PROP_STAKE")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(d.stake)
            .clamp(10.0, 1000.0);
        let copula_points = get("PROP_COPULA_POINTS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(d.copula_points)
            .clamp(256, 65_536);
        let conservative = get("PROP_CONSERVATIVE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(d.conservative);
        let export_path = get("PROP_EXPORT_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(d.export_path);
        let feed_path = get("PROP_FEED_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            seed,
            min_confidence,
            parlay_legs,
            stake,
            copula_points,
            conservative,
            export_path,
            feed_path,
        }
    }
}

/// Loads `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
