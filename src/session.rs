use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conditions::{GameConditions, InjuryStatus};
use crate::config::MAX_PARLAY_LEGS;
use crate::defense::DefenseTable;
use crate::error::{PropError, PropResult};
use crate::feeds::{DataFeed, NoFeed, absorb};
use crate::parlay::{self, ParlayMode, ParlayQuote};
use crate::projection::{self, LegProjection, PropContext, PropRequest};
use crate::stat_config::{Position, StatKind, StatTable};
use crate::teams::is_known_team;

const MAX_LOGS: usize = 200;
// Spreads per-prop seeds across the u64 space so neighbouring props do not share streams.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub away: String,
    pub home: String,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn id_for(away: &str, home: &str) -> String {
        format!("{} @ {}", away.trim(), home.trim())
    }

    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if self.home.eq_ignore_ascii_case(team.trim()) {
            Some(&self.away)
        } else if self.away.eq_ignore_ascii_case(team.trim()) {
            Some(&self.home)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub position: Position,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PropOutcome {
    Projected(LegProjection),
    Unavailable { request: PropRequest, reason: String },
}

impl PropOutcome {
    pub fn projection(&self) -> Option<&LegProjection> {
        match self {
            PropOutcome::Projected(leg) => Some(leg),
            PropOutcome::Unavailable { .. } => None,
        }
    }
}

/// Everything one user session owns. The engine functions it calls keep no state of their own.
pub struct SessionContext {
    pub games: Vec<Game>,
    pub active_game: Option<String>,
    pub conditions: HashMap<String, GameConditions>,
    pub injuries: HashMap<String, InjuryStatus>,
    pub histories: HashMap<(String, StatKind), Vec<f64>>,
    pub players: HashMap<String, Vec<PlayerEntry>>,
    pub results: Vec<LegProjection>,
    pub unavailable: Vec<PropOutcome>,
    pub logs: VecDeque<String>,
    /// Shade every new projection down (see `projection::conservative`).
    pub conservative: bool,
    stats: StatTable,
    defense: DefenseTable,
    feed: Arc<dyn DataFeed>,
    rng: StdRng,
}

impl SessionContext {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            games: Vec::new(),
            active_game: None,
            conditions: HashMap::new(),
            injuries: HashMap::new(),
            histories: HashMap::new(),
            players: HashMap::new(),
            results: Vec::new(),
            unavailable: Vec::new(),
            logs: VecDeque::new(),
            conservative: false,
            stats: StatTable::builtin().clone(),
            defense: DefenseTable::builtin().clone(),
            feed: Arc::new(NoFeed),
            rng,
        }
    }

    pub fn with_feed(mut self, feed: Arc<dyn DataFeed>) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_tables(mut self, stats: StatTable, defense: DefenseTable) -> Self {
        self.stats = stats;
        self.defense = defense;
        self
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn active(&self) -> Option<&Game> {
        self.active_game.as_deref().and_then(|id| self.game(id))
    }

    pub fn create_game(&mut self, away: &str, home: &str) -> PropResult<String> {
        let (away, home) = (away.trim(), home.trim());
        if away.is_empty() || home.is_empty() {
            return Err(PropError::InvalidGame("both teams are required".to_string()));
        }
        if away.eq_ignore_ascii_case(home) {
            return Err(PropError::InvalidGame(format!("{away} cannot play itself")));
        }
        for team in [away, home] {
            if !is_known_team(team) {
                warn!(team, "team is not in the NFL list; defense falls back to the feed or neutral");
            }
        }
        let id = Game::id_for(away, home);
        if self.game(&id).is_some() {
            return Err(PropError::GameExists(id));
        }
        self.games.push(Game {
            id: id.clone(),
            away: away.to_string(),
            home: home.to_string(),
            created_at: Utc::now(),
        });
        self.players.entry(id.clone()).or_default();
        self.push_log(format!("[INFO] Created {id}"));
        Ok(id)
    }

    pub fn set_conditions(&mut self, id: &str, conditions: GameConditions) -> PropResult<()> {
        if self.game(id).is_none() {
            return Err(PropError::UnknownGame(id.to_string()));
        }
        self.conditions.insert(id.to_string(), conditions);
        Ok(())
    }

    pub fn activate_game(&mut self, id: &str, conditions: GameConditions) -> PropResult<()> {
        self.set_conditions(id, conditions)?;
        self.active_game = Some(id.to_string());
        self.push_log(format!("[INFO] Activated {id} (O/U {:.1})", conditions.total));
        Ok(())
    }

    pub fn remove_game(&mut self, id: &str) -> PropResult<()> {
        let Some(idx) = self.games.iter().position(|g| g.id == id) else {
            return Err(PropError::UnknownGame(id.to_string()));
        };
        self.games.remove(idx);
        self.conditions.remove(id);
        self.players.remove(id);
        self.results.retain(|r| r.game_id.as_deref() != Some(id));
        self.unavailable.retain(|o| match o {
            PropOutcome::Unavailable { request, .. } => request.game_id.as_deref() != Some(id),
            PropOutcome::Projected(_) => true,
        });
        if self.active_game.as_deref() == Some(id) {
            self.active_game = None;
        }
        self.push_log(format!("[INFO] Removed {id}"));
        Ok(())
    }

    pub fn set_injury(&mut self, player: &str, status: InjuryStatus) {
        self.injuries.insert(player.trim().to_string(), status);
    }

    pub fn record_history(&mut self, player: &str, stat: StatKind, values: Vec<f64>) {
        self.histories.insert((player.trim().to_string(), stat), values);
    }

    /// Gathers the inputs for one prop: session data first, then the feed, then neutral defaults.
    pub fn resolve_context(&self, req: &PropRequest) -> PropContext {
        self.resolve_with_notes(req, &mut Vec::new())
    }

    /// Like `resolve_context`, collecting a line for every feed lookup that failed.
    fn resolve_with_notes(&self, req: &PropRequest, notes: &mut Vec<String>) -> PropContext {
        let feed = self.feed.as_ref();

        let defense = absorb(
            "defense",
            &req.opponent,
            feed.defense_ranking(&req.opponent),
            notes,
        )
        .or_else(|| self.defense.get(&req.opponent));

        let conditions = req.game_id.as_deref().map(|gid| {
            let mut cond = match self.conditions.get(gid) {
                Some(c) => *c,
                None => match absorb("betting line", gid, feed.betting_line(gid), notes) {
                    Some(line) => GameConditions {
                        total: line.total,
                        spread: line.spread,
                        weather: None,
                    },
                    None => GameConditions::default(),
                },
            };
            if cond.weather.is_none() {
                cond.weather = absorb("weather", gid, feed.weather(gid), notes);
            }
            // Stored spreads are the home side's line.
            if !req.is_home {
                cond.spread = -cond.spread;
            }
            cond
        });

        let injury = self
            .injuries
            .get(req.player.trim())
            .copied()
            .or_else(|| absorb("injury", &req.player, feed.injury_status(&req.player), notes));

        let baseline = absorb(
            "baseline",
            &req.player,
            feed.player_baseline(&req.player, req.stat),
            notes,
        );

        let history = self
            .histories
            .get(&(req.player.trim().to_string(), req.stat))
            .cloned()
            .or_else(|| {
                absorb(
                    "history",
                    &req.player,
                    feed.player_history(&req.player, req.stat),
                    notes,
                )
            });

        PropContext {
            defense,
            conditions,
            injury,
            baseline,
            history,
            conservative: self.conservative,
        }
    }

    /// Projects one prop with the session's generator. Failed feed lookups land in the log.
    pub fn project_prop(&mut self, req: &PropRequest) -> PropResult<LegProjection> {
        let mut notes = Vec::new();
        let ctx = self.resolve_with_notes(req, &mut notes);
        for note in notes {
            self.push_log(format!("[WARN] {note}"));
        }
        projection::project(req, &ctx, &self.stats, &mut self.rng)
    }

    /// Projects each request in order, keeping successes in `results`. A failed prop is
    /// recorded as unavailable and does not stop the rest.
    pub fn analyze(&mut self, requests: &[PropRequest]) -> Vec<PropOutcome> {
        let mut out = Vec::with_capacity(requests.len());
        for req in requests {
            let outcome = match self.project_prop(req) {
                Ok(leg) => PropOutcome::Projected(leg),
                Err(err) => PropOutcome::Unavailable {
                    request: req.clone(),
                    reason: err.to_string(),
                },
            };
            self.record(&outcome);
            out.push(outcome);
        }
        out
    }

    /// Projects a slate in parallel. Prop `i` draws from its own generator seeded by
    /// `(seed, i)`, so the output does not depend on scheduling. Nothing is stored.
    pub fn project_batch(&self, requests: &[PropRequest], seed: u64) -> Vec<PropOutcome> {
        requests
            .par_iter()
            .enumerate()
            .map(|(i, req)| {
                let mut rng = StdRng::seed_from_u64(seed ^ (i as u64 + 1).wrapping_mul(SEED_STRIDE));
                let ctx = self.resolve_context(req);
                match projection::project(req, &ctx, &self.stats, &mut rng) {
                    Ok(leg) => PropOutcome::Projected(leg),
                    Err(err) => PropOutcome::Unavailable {
                        request: req.clone(),
                        reason: err.to_string(),
                    },
                }
            })
            .collect()
    }

    pub fn record(&mut self, outcome: &PropOutcome) {
        match outcome {
            PropOutcome::Projected(leg) => self.results.push(leg.clone()),
            PropOutcome::Unavailable { request, reason } => {
                warn!(player = %request.player, stat = %request.stat, %reason, "prop unavailable");
                self.push_log(format!(
                    "[WARN] {} {} unavailable: {reason}",
                    request.player,
                    request.stat.display_name()
                ));
                self.unavailable.push(outcome.clone());
            }
        }
    }

    /// Registers a player on the active game and projects every stat their position supports.
    pub fn add_player(
        &mut self,
        name: &str,
        position: Position,
        team: &str,
    ) -> PropResult<Vec<PropOutcome>> {
        self.add_player_with_injury(name, position, team, None)
    }

    /// `add_player` that also records the player's injury status. Nothing is recorded when the
    /// player is rejected.
    pub fn add_player_with_injury(
        &mut self,
        name: &str,
        position: Position,
        team: &str,
        injury: Option<InjuryStatus>,
    ) -> PropResult<Vec<PropOutcome>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PropError::UnknownPlayer(String::new()));
        }
        let game = self.active().cloned().ok_or(PropError::NoActiveGame)?;
        let Some(opponent) = game.opponent_of(team).map(str::to_string) else {
            return Err(PropError::TeamNotInGame {
                team: team.to_string(),
                game: game.id.clone(),
            });
        };
        let roster = self.players.entry(game.id.clone()).or_default();
        if roster.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
            return Err(PropError::PlayerExists(name.to_string()));
        }
        let is_home = game.home.eq_ignore_ascii_case(team.trim());
        roster.push(PlayerEntry {
            name: name.to_string(),
            position,
            team: if is_home { game.home.clone() } else { game.away.clone() },
        });
        if let Some(status) = injury {
            self.set_injury(name, status);
        }

        let requests: Vec<PropRequest> = position
            .stats()
            .iter()
            .map(|stat| PropRequest {
                player: name.to_string(),
                position,
                stat: *stat,
                opponent: opponent.clone(),
                is_home,
                game_id: Some(game.id.clone()),
            })
            .collect();
        let outcomes = self.analyze(&requests);
        info!(player = name, %position, props = outcomes.len(), "player added");
        self.push_log(format!("[INFO] Added {name} ({position})"));
        Ok(outcomes)
    }

    pub fn remove_player(&mut self, name: &str) -> PropResult<()> {
        let game_id = self.active_game.clone().ok_or(PropError::NoActiveGame)?;
        let roster = self.players.entry(game_id.clone()).or_default();
        let Some(idx) = roster
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name.trim()))
        else {
            return Err(PropError::UnknownPlayer(name.to_string()));
        };
        let removed = roster.remove(idx);
        self.results.retain(|r| {
            !(r.player == removed.name && r.game_id.as_deref() == Some(game_id.as_str()))
        });
        self.push_log(format!("[INFO] Removed {}", removed.name));
        Ok(())
    }

    pub fn active_players(&self) -> &[PlayerEntry] {
        self.active_game
            .as_deref()
            .and_then(|id| self.players.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn filtered_results(&self, min_confidence: f64) -> Vec<&LegProjection> {
        self.results
            .iter()
            .filter(|r| r.rounded_confidence() >= min_confidence)
            .collect()
    }

    /// The first `legs` props at or above the threshold, capped at the payout table's 12.
    pub fn parlay_legs(&self, min_confidence: f64, legs: usize) -> Vec<LegProjection> {
        self.filtered_results(min_confidence)
            .into_iter()
            .take(legs.min(MAX_PARLAY_LEGS))
            .cloned()
            .collect()
    }

    pub fn build_parlay(
        &self,
        min_confidence: f64,
        legs: usize,
        mode: &ParlayMode,
    ) -> PropResult<(Vec<LegProjection>, ParlayQuote)> {
        let picked = self.parlay_legs(min_confidence, legs);
        let quote = parlay::aggregate_legs(&picked, mode)?;
        Ok((picked, quote))
    }
}
