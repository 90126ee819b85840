use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conditions::{GameConditions, InjuryStatus};
use crate::defense::{DefenseRanking, defense_factor};
use crate::error::PropResult;
use crate::stat_config::{Position, StatConfig, StatKind, StatTable};

const HOME_FACTOR: f64 = 1.07;
const LINE_SPREAD_PER_VARIANCE: f64 = 0.15;
const TARGET_MARGIN_MIN: f64 = 0.06;
const TARGET_MARGIN_MAX: f64 = 0.14;
const HISTORY_WINDOW: usize = 5;
const NEUTRAL_CONSISTENCY: f64 = 0.5;

const CONFIDENCE_START: f64 = 65.0;
const CONFIDENCE_JITTER: f64 = 3.0;
const BASIC_BOUNDS: (f64, f64) = (55.0, 85.0);
const FULL_BOUNDS: (f64, f64) = (52.0, 88.0);

// Applied one after another: 6%, then 7%, then 3.1%.
const CONSERVATIVE_REDUCTIONS: [f64; 3] = [0.06, 0.07, 0.031];

/// One prop to project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropRequest {
    pub player: String,
    pub position: Position,
    pub stat: StatKind,
    pub opponent: String,
    pub is_home: bool,
    #[serde(default)]
    pub game_id: Option<String>,
}

/// Situational inputs for a prop. Every field is optional and defaults to neutral.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropContext {
    #[serde(default)]
    pub defense: Option<DefenseRanking>,
    #[serde(default)]
    pub conditions: Option<GameConditions>,
    #[serde(default)]
    pub injury: Option<InjuryStatus>,
    /// Per-player baseline from a projections feed; replaces the static base.
    #[serde(default)]
    pub baseline: Option<f64>,
    /// Recent observations for this (player, stat), most recent first.
    #[serde(default)]
    pub history: Option<Vec<f64>>,
    /// Shade the drawn line and target down with `conservative`.
    #[serde(default)]
    pub conservative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub base: f64,
    pub defense: f64,
    pub home: f64,
    pub weather: f64,
    pub injury: f64,
    pub script: f64,
    pub consistency: Option<f64>,
}

impl FactorBreakdown {
    pub fn product(&self) -> f64 {
        self.base * self.defense * self.home * self.weather * self.injury * self.script
    }
}

/// Deterministic half of a projection: everything before any random draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanProjection {
    pub config: StatConfig,
    pub factors: FactorBreakdown,
    pub mean: f64,
    /// Confidence before jitter and clipping.
    pub raw_confidence: f64,
    pub bounds: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegProjection {
    pub player: String,
    pub position: Position,
    pub stat: StatKind,
    pub opponent: String,
    pub is_home: bool,
    #[serde(default)]
    pub game_id: Option<String>,
    pub mean: f64,
    pub line: f64,
    pub target: f64,
    pub margin: f64,
    pub confidence: f64,
    pub factors: FactorBreakdown,
}

impl LegProjection {
    pub fn stat_name(&self) -> &'static str {
        self.stat.display_name()
    }

    /// Confidence at display precision (0.1). Thresholds compare against this value.
    pub fn rounded_confidence(&self) -> f64 {
        (self.confidence * 10.0).round() / 10.0
    }
}

/// Three stacked reductions (6%, 7%, 3.1%), about 15.3% off overall.
pub fn conservative(value: f64) -> f64 {
    CONSERVATIVE_REDUCTIONS
        .iter()
        .fold(value, |v, r| v * (1.0 - r))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub mean: Option<f64>,
    pub consistency: f64,
}

/// Summarizes up to the five most recent observations. Non-positive values are dropped
/// before averaging.
pub fn summarize_history(history: &[f64]) -> HistorySummary {
    let values: Vec<f64> = history
        .iter()
        .take(HISTORY_WINDOW)
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if values.is_empty() {
        return HistorySummary {
            mean: None,
            consistency: NEUTRAL_CONSISTENCY,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let consistency = if mean > 0.0 {
        (1.0 - var.sqrt() / mean).clamp(0.0, 1.0)
    } else {
        NEUTRAL_CONSISTENCY
    };
    HistorySummary {
        mean: Some(mean),
        consistency,
    }
}

pub fn project_mean(
    req: &PropRequest,
    ctx: &PropContext,
    table: &StatTable,
) -> PropResult<MeanProjection> {
    let config = table.resolve(req.position, req.stat)?;

    let mut base = ctx.baseline.filter(|b| b.is_finite() && *b >= 0.0).unwrap_or(config.base);
    let mut consistency = None;
    if let Some(history) = ctx.history.as_deref() {
        let summary = summarize_history(history);
        if let Some(mean) = summary.mean {
            base = mean;
        }
        consistency = Some(summary.consistency);
    }

    let defense = defense_factor(ctx.defense.unwrap_or_default().rank_for(req.stat));
    let home = if req.is_home { HOME_FACTOR } else { 1.0 };
    let conditions = ctx.conditions.unwrap_or_default();
    let weather = conditions.weather_factor(req.stat);
    let injury = ctx.injury.unwrap_or_default().factor();
    let script = conditions.script_factor();

    let factors = FactorBreakdown {
        base,
        defense,
        home,
        weather,
        injury,
        script,
        consistency,
    };
    let mean = factors.product();

    let mut raw_confidence = CONFIDENCE_START;
    if defense > 1.15 {
        raw_confidence += 10.0;
    } else if defense < 0.85 {
        raw_confidence -= 10.0;
    }
    if req.is_home {
        raw_confidence += 3.0;
    }
    if weather < 0.90 {
        raw_confidence -= 8.0;
    } else if weather < 0.95 {
        raw_confidence -= 4.0;
    }
    if script > 1.08 {
        raw_confidence += 5.0;
    }
    if let Some(c) = consistency {
        if c > 0.8 {
            raw_confidence += 5.0;
        } else if c < 0.5 {
            raw_confidence -= 5.0;
        }
    }

    let full_signal = conditions.weather.is_some() || consistency.is_some();
    let bounds = if full_signal { FULL_BOUNDS } else { BASIC_BOUNDS };

    debug!(
        player = %req.player,
        stat = %req.stat,
        base,
        defense,
        home,
        weather,
        injury,
        script,
        mean,
        "projected mean"
    );

    Ok(MeanProjection {
        config,
        factors,
        mean,
        raw_confidence,
        bounds,
    })
}

/// Draws the line, target and final confidence around a deterministic mean.
pub fn sample_leg(req: &PropRequest, proj: &MeanProjection, rng: &mut impl Rng) -> LegProjection {
    // A zero mean (player ruled out) stays exactly zero instead of picking up noise.
    let line = if proj.mean <= 0.0 {
        0.0
    } else {
        let sd = proj.config.variance * LINE_SPREAD_PER_VARIANCE;
        let draw = match Normal::new(proj.mean, sd) {
            Ok(normal) => normal.sample(rng),
            Err(_) => proj.mean,
        };
        draw.max(0.0)
    };

    let u = rng.gen_range(TARGET_MARGIN_MIN..=TARGET_MARGIN_MAX);
    let target = line * (1.0 + u);

    let jitter = rng.gen_range(-CONFIDENCE_JITTER..=CONFIDENCE_JITTER);
    let (lo, hi) = proj.bounds;
    let confidence = (proj.raw_confidence + jitter).clamp(lo, hi);

    LegProjection {
        player: req.player.clone(),
        position: req.position,
        stat: req.stat,
        opponent: req.opponent.clone(),
        is_home: req.is_home,
        game_id: req.game_id.clone(),
        mean: proj.mean,
        line,
        target,
        margin: target - line,
        confidence,
        factors: proj.factors,
    }
}

pub fn project(
    req: &PropRequest,
    ctx: &PropContext,
    table: &StatTable,
    rng: &mut impl Rng,
) -> PropResult<LegProjection> {
    let proj = project_mean(req, ctx, table)?;
    let mut leg = sample_leg(req, &proj, rng);
    if ctx.conservative {
        leg.line = conservative(leg.line);
        leg.target = conservative(leg.target);
        leg.margin = leg.target - leg.line;
    }
    Ok(leg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Precipitation, Weather};
    use crate::error::PropError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn request(position: Position, stat: StatKind, is_home: bool) -> PropRequest {
        PropRequest {
            player: "Test Player".to_string(),
            position,
            stat,
            opponent: "Nowhere Nomads".to_string(),
            is_home,
            game_id: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn neutral_mean_is_base_times_default_pace() {
        let req = request(Position::QB, StatKind::PassingYards, false);
        let proj = project_mean(&req, &PropContext::default(), StatTable::builtin()).unwrap();
        // Rank 16 -> 0.95, default total 45 -> 1.04.
        assert!(approx(proj.mean, 250.0 * 0.95 * 1.04));
        assert_eq!(proj.factors.consistency, None);
        assert_eq!(proj.bounds, BASIC_BOUNDS);
        assert!(approx(proj.raw_confidence, 65.0));
    }

    #[test]
    fn stingy_defense_is_point_eight_for_both_categories() {
        let ctx = PropContext {
            defense: Some(DefenseRanking {
                pass_rank: 3,
                run_rank: 1,
            }),
            ..PropContext::default()
        };
        for (pos, stat) in [
            (Position::QB, StatKind::PassingYards),
            (Position::RB, StatKind::RushingYards),
            (Position::TE, StatKind::Receptions),
        ] {
            let proj = project_mean(&request(pos, stat, false), &ctx, StatTable::builtin()).unwrap();
            assert_eq!(proj.factors.defense, 0.80);
            assert!(approx(proj.raw_confidence, 55.0));
        }
    }

    #[test]
    fn full_chain_multiplies_every_factor() {
        let ctx = PropContext {
            defense: Some(DefenseRanking {
                pass_rank: 30,
                run_rank: 30,
            }),
            conditions: Some(GameConditions {
                total: 51.0,
                spread: 3.0,
                weather: Some(Weather {
                    temperature_f: 45.0,
                    wind_mph: 12.0,
                    precipitation: Precipitation::Light,
                }),
            }),
            injury: Some(InjuryStatus::Questionable),
            ..PropContext::default()
        };
        let req = request(Position::WR, StatKind::ReceivingYards, true);
        let proj = project_mean(&req, &ctx, StatTable::builtin()).unwrap();
        let weather = 0.95 * 0.95 * 0.97;
        let expected = 65.0 * 1.18 * 1.07 * weather * 0.85 * (1.12 * 1.03);
        assert!(approx(proj.mean, expected));
        // 65 + 10 (defense) + 3 (home) - 8 (weather < 0.90) + 5 (script)
        assert!(approx(proj.raw_confidence, 75.0));
        assert_eq!(proj.bounds, FULL_BOUNDS);
    }

    #[test]
    fn history_replaces_base_and_scores_consistency() {
        let ctx = PropContext {
            history: Some(vec![80.0, 80.0, 0.0, 80.0, 80.0, 300.0]),
            ..PropContext::default()
        };
        let req = request(Position::RB, StatKind::RushingYards, false);
        let proj = project_mean(&req, &ctx, StatTable::builtin()).unwrap();
        // Sixth value is outside the window and the zero is dropped.
        assert!(approx(proj.factors.base, 80.0));
        assert_eq!(proj.factors.consistency, Some(1.0));
        assert!(approx(proj.raw_confidence, 70.0));
    }

    #[test]
    fn empty_history_keeps_static_base_with_neutral_consistency() {
        let summary = summarize_history(&[0.0, -3.0]);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.consistency, 0.5);

        let ctx = PropContext {
            history: Some(vec![0.0]),
            ..PropContext::default()
        };
        let req = request(Position::WR, StatKind::Receptions, false);
        let proj = project_mean(&req, &ctx, StatTable::builtin()).unwrap();
        assert!(approx(proj.factors.base, 6.0));
        assert_eq!(proj.factors.consistency, Some(0.5));
    }

    #[test]
    fn erratic_history_costs_confidence() {
        let summary = summarize_history(&[2.0, 120.0, 5.0, 90.0]);
        assert!(summary.consistency < 0.5);
    }

    #[test]
    fn baseline_feed_is_overridden_by_history() {
        let req = request(Position::QB, StatKind::PassingYards, false);
        let with_baseline = PropContext {
            baseline: Some(280.0),
            ..PropContext::default()
        };
        let proj = project_mean(&req, &with_baseline, StatTable::builtin()).unwrap();
        assert!(approx(proj.factors.base, 280.0));

        let with_both = PropContext {
            history: Some(vec![300.0]),
            ..with_baseline
        };
        let proj = project_mean(&req, &with_both, StatTable::builtin()).unwrap();
        assert!(approx(proj.factors.base, 300.0));
    }

    #[test]
    fn ruled_out_player_projects_exact_zero() {
        let ctx = PropContext {
            injury: Some(InjuryStatus::Out),
            ..PropContext::default()
        };
        let req = request(Position::RB, StatKind::RushingYards, true);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let leg = project(&req, &ctx, StatTable::builtin(), &mut rng).unwrap();
            assert_eq!(leg.mean, 0.0);
            assert_eq!(leg.line, 0.0);
            assert_eq!(leg.target, 0.0);
            assert_eq!(leg.margin, 0.0);
        }
    }

    #[test]
    fn sampled_values_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let ctx = PropContext::default();
        for _ in 0..500 {
            let req = request(Position::TE, StatKind::ReceivingTds, rng.gen_range(0..2) == 0);
            let leg = project(&req, &ctx, StatTable::builtin(), &mut rng).unwrap();
            assert!(leg.line >= 0.0);
            assert!((55.0..=85.0).contains(&leg.confidence));
            if leg.line > 0.0 {
                let ratio = leg.target / leg.line;
                assert!((1.06 - 1e-9..=1.14 + 1e-9).contains(&ratio));
            }
        }
    }

    #[test]
    fn same_seed_same_projection() {
        let req = request(Position::WR, StatKind::ReceivingYards, true);
        let ctx = PropContext::default();
        let a = project(&req, &ctx, StatTable::builtin(), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = project(&req, &ctx, StatTable::builtin(), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn conservative_shades_line_and_target_only() {
        assert!(approx(conservative(100.0), 100.0 * 0.94 * 0.93 * 0.969));
        assert_eq!(conservative(0.0), 0.0);

        let req = request(Position::QB, StatKind::PassingYards, true);
        let plain = PropContext::default();
        let shaded = PropContext {
            conservative: true,
            ..PropContext::default()
        };
        let a = project(&req, &plain, StatTable::builtin(), &mut StdRng::seed_from_u64(8)).unwrap();
        let b = project(&req, &shaded, StatTable::builtin(), &mut StdRng::seed_from_u64(8)).unwrap();
        assert!(approx(b.line, conservative(a.line)));
        assert!(approx(b.target, conservative(a.target)));
        assert!(approx(b.margin, b.target - b.line));
        assert!(b.line < a.line);
        assert_eq!(b.mean, a.mean);
        assert_eq!(b.confidence, a.confidence);
    }

    #[test]
    fn rounded_confidence_uses_one_decimal() {
        let mut rng = StdRng::seed_from_u64(1);
        let req = request(Position::WR, StatKind::Receptions, false);
        let mut leg = project(&req, &PropContext::default(), StatTable::builtin(), &mut rng).unwrap();
        leg.confidence = 59.96;
        assert!(approx(leg.rounded_confidence(), 60.0));
        leg.confidence = 59.74;
        assert!(approx(leg.rounded_confidence(), 59.7));
    }

    #[test]
    fn invalid_stat_for_position_errors() {
        let req = request(Position::QB, StatKind::Receptions, false);
        let mut rng = StdRng::seed_from_u64(0);
        let err = project(&req, &PropContext::default(), StatTable::builtin(), &mut rng).unwrap_err();
        assert!(matches!(err, PropError::InvalidStatKind { .. }));
        assert!(err.is_configuration());
    }
}
