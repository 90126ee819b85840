use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::conditions::{GameConditions, InjuryStatus};
use crate::config::AppConfig;
use crate::defense::DefenseTable;
use crate::error::{PropError, PropResult};
use crate::feeds::StaticFeed;
use crate::parlay::{self, ParlayMode, ParlayQuote};
use crate::projection::{LegProjection, PropRequest};
use crate::session::{Game, PropOutcome, SessionContext};
use crate::stat_config::{Position, StatKind, StatTable};

/// A batch of games and props to project in one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slate {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub feed: StaticFeed,
    /// Replaces the built-in base and variance table.
    #[serde(default)]
    pub stats: Option<StatTable>,
    /// Replaces the built-in defense ranks; the feed still wins for teams it covers.
    #[serde(default)]
    pub defense: Option<DefenseTable>,
    /// Shade every line and target down.
    #[serde(default)]
    pub conservative: bool,
    #[serde(default)]
    pub games: Vec<SlateGame>,
    #[serde(default)]
    pub injuries: HashMap<String, InjuryStatus>,
    #[serde(default)]
    pub histories: Vec<SlateHistory>,
    /// Players expanded to every stat their position supports.
    #[serde(default)]
    pub players: Vec<SlatePlayer>,
    /// Individual props, projected after the expanded players.
    #[serde(default)]
    pub props: Vec<PropRequest>,
    #[serde(default)]
    pub parlay: Option<ParlayRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateGame {
    pub away: String,
    pub home: String,
    #[serde(default)]
    pub conditions: Option<GameConditions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateHistory {
    pub player: String,
    pub stat: StatKind,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlatePlayer {
    pub name: String,
    pub position: Position,
    pub team: String,
    /// `"Away @ Home"`.
    pub game: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParlayRequest {
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub legs: Option<usize>,
    #[serde(default)]
    pub stake: Option<f64>,
    /// Leg-by-leg correlation; independent legs when absent.
    #[serde(default)]
    pub correlation: Option<Vec<Vec<f64>>>,
}

pub struct SlateReport {
    pub seed: u64,
    pub outcomes: Vec<PropOutcome>,
    pub parlay: Option<PropResult<(Vec<LegProjection>, ParlayQuote)>>,
    pub stake: f64,
    pub session: SessionContext,
}

impl Slate {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse slate json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read slate file {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Expands players into per-stat requests, followed by the explicit props.
    pub fn requests(&self) -> PropResult<Vec<PropRequest>> {
        let mut out = Vec::new();
        for p in &self.players {
            let game = self
                .games
                .iter()
                .find(|g| Game::id_for(&g.away, &g.home) == p.game.trim())
                .ok_or_else(|| PropError::UnknownGame(p.game.clone()))?;
            let is_home = game.home.eq_ignore_ascii_case(p.team.trim());
            let opponent = if is_home {
                game.away.clone()
            } else if game.away.eq_ignore_ascii_case(p.team.trim()) {
                game.home.clone()
            } else {
                return Err(PropError::TeamNotInGame {
                    team: p.team.clone(),
                    game: p.game.clone(),
                });
            };
            for stat in p.position.stats() {
                out.push(PropRequest {
                    player: p.name.clone(),
                    position: p.position,
                    stat: *stat,
                    opponent: opponent.clone(),
                    is_home,
                    game_id: Some(p.game.trim().to_string()),
                });
            }
        }
        out.extend(self.props.iter().cloned());
        Ok(out)
    }

    pub fn run(&self, config: &AppConfig) -> PropResult<SlateReport> {
        let seed = self.seed.or(config.seed).unwrap_or_else(rand::random);
        let mut session =
            SessionContext::new(Some(seed)).with_feed(Arc::new(self.feed.clone()));
        let defense = self.defense.as_ref().filter(|d| !d.is_empty());
        if self.stats.is_some() || defense.is_some() {
            info!(
                custom_stats = self.stats.is_some(),
                defense_teams = defense.map(DefenseTable::len).unwrap_or(0),
                "slate overrides built-in tables"
            );
            session = session.with_tables(
                self.stats.clone().unwrap_or_else(|| StatTable::builtin().clone()),
                defense.cloned().unwrap_or_else(|| DefenseTable::builtin().clone()),
            );
        }
        session.conservative = self.conservative || config.conservative;

        for g in &self.games {
            let id = session.create_game(&g.away, &g.home)?;
            if let Some(cond) = g.conditions {
                session.set_conditions(&id, cond)?;
            }
        }
        for (player, status) in &self.injuries {
            session.set_injury(player, *status);
        }
        for h in &self.histories {
            session.record_history(&h.player, h.stat, h.values.clone());
        }

        let requests = self.requests()?;
        let outcomes = session.project_batch(&requests, seed);
        for outcome in &outcomes {
            session.record(outcome);
        }
        info!(
            seed,
            props = outcomes.len(),
            projected = session.results.len(),
            "slate projected"
        );

        let stake = self
            .parlay
            .as_ref()
            .and_then(|p| p.stake)
            .unwrap_or(config.stake);
        let parlay = self.parlay.as_ref().map(|req| {
            let min = req.min_confidence.unwrap_or(config.min_confidence);
            let legs = session.parlay_legs(min, req.legs.unwrap_or(config.parlay_legs));
            let mode = match &req.correlation {
                Some(matrix) => ParlayMode::Correlated(matrix.clone()),
                None => ParlayMode::Independent,
            };
            let confidences: Vec<f64> = legs.iter().map(|l| l.confidence).collect();
            parlay::aggregate_parlay_with_points(&confidences, &mode, config.copula_points)
                .map(|quote| (legs, quote))
        });

        Ok(SlateReport {
            seed,
            outcomes,
            parlay,
            stake,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players_expand_with_side_and_opponent() {
        let slate = Slate::from_json(
            r#"{
                "games": [{"away": "Dallas Cowboys", "home": "Arizona Cardinals"}],
                "players": [
                    {"name": "Kyler Murray", "position": "QB", "team": "Arizona Cardinals", "game": "Dallas Cowboys @ Arizona Cardinals"}
                ],
                "props": [
                    {"player": "Dak Prescott", "position": "QB", "stat": "passing_yards", "opponent": "Arizona Cardinals", "is_home": false}
                ]
            }"#,
        )
        .unwrap();
        let reqs = slate.requests().unwrap();
        assert_eq!(reqs.len(), 4);
        assert!(reqs[..3].iter().all(|r| r.is_home && r.opponent == "Dallas Cowboys"));
        assert_eq!(reqs[3].player, "Dak Prescott");
        assert_eq!(reqs[3].game_id, None);
    }

    #[test]
    fn player_on_wrong_team_is_rejected() {
        let slate = Slate::from_json(
            r#"{
                "games": [{"away": "Dallas Cowboys", "home": "Arizona Cardinals"}],
                "players": [{"name": "X", "position": "WR", "team": "Chicago Bears", "game": "Dallas Cowboys @ Arizona Cardinals"}]
            }"#,
        )
        .unwrap();
        assert!(matches!(slate.requests(), Err(PropError::TeamNotInGame { .. })));
    }

    #[test]
    fn slate_tables_and_conservative_flag_reach_the_session() {
        let slate = Slate::from_json(
            r#"{
                "seed": 4,
                "conservative": true,
                "stats": {"configs": {"receptions": {"base": 10.0, "variance": 0.0}}},
                "defense": {"nowhere nomads": {"pass": 30, "run": 30}},
                "props": [
                    {"player": "Z", "position": "WR", "stat": "receptions", "opponent": "Nowhere Nomads", "is_home": false}
                ]
            }"#,
        )
        .unwrap();
        let report = slate.run(&AppConfig::default()).unwrap();
        let leg = report.outcomes[0].projection().unwrap();
        // No position override for WR receptions in a custom table, so base 10.
        assert_eq!(leg.factors.base, 10.0);
        assert_eq!(leg.factors.defense, 1.18);
        // Zero variance: the line is the mean, shaded.
        let expected = crate::projection::conservative(leg.mean);
        assert!((leg.line - expected).abs() < 1e-9);
        assert!(report.session.conservative);
    }

    #[test]
    fn run_without_parlay_request_skips_quote() {
        let slate = Slate {
            seed: Some(5),
            props: vec![PropRequest {
                player: "Travis Kelce".to_string(),
                position: Position::TE,
                stat: StatKind::Receptions,
                opponent: "Baltimore Ravens".to_string(),
                is_home: true,
                game_id: None,
            }],
            ..Slate::default()
        };
        let report = slate.run(&AppConfig::default()).unwrap();
        assert_eq!(report.seed, 5);
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.parlay.is_none());
    }
}
