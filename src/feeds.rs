use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::conditions::{BettingLine, InjuryStatus, Weather};
use crate::defense::DefenseRanking;
use crate::error::PropResult;
use crate::stat_config::StatKind;

/// Optional lookups the engine consults before falling back to neutral defaults.
///
/// `Ok(None)` means the source has nothing for the key; `Err(DataUnavailable)` means the lookup
/// itself failed. Callers treat both the same way: no data.
pub trait DataFeed: Send + Sync {
    fn defense_ranking(&self, _team: &str) -> PropResult<Option<DefenseRanking>> {
        Ok(None)
    }

    fn injury_status(&self, _player: &str) -> PropResult<Option<InjuryStatus>> {
        Ok(None)
    }

    fn weather(&self, _game_id: &str) -> PropResult<Option<Weather>> {
        Ok(None)
    }

    fn betting_line(&self, _game_id: &str) -> PropResult<Option<BettingLine>> {
        Ok(None)
    }

    fn player_baseline(&self, _player: &str, _stat: StatKind) -> PropResult<Option<f64>> {
        Ok(None)
    }

    fn player_history(&self, _player: &str, _stat: StatKind) -> PropResult<Option<Vec<f64>>> {
        Ok(None)
    }
}

/// Feed with no data at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeed;

impl DataFeed for NoFeed {}

/// In-memory feed, usually loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFeed {
    #[serde(default)]
    pub defense: HashMap<String, DefenseRanking>,
    #[serde(default)]
    pub injuries: HashMap<String, InjuryStatus>,
    #[serde(default)]
    pub weather: HashMap<String, Weather>,
    #[serde(default)]
    pub lines: HashMap<String, BettingLine>,
    #[serde(default)]
    pub baselines: HashMap<String, HashMap<StatKind, f64>>,
    #[serde(default)]
    pub histories: HashMap<String, HashMap<StatKind, Vec<f64>>>,
}

impl StaticFeed {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse feed json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read feed file {}", path.display()))?;
        Self::from_json(&raw)
    }
}

impl DataFeed for StaticFeed {
    fn defense_ranking(&self, team: &str) -> PropResult<Option<DefenseRanking>> {
        Ok(lookup(&self.defense, team).copied())
    }

    fn injury_status(&self, player: &str) -> PropResult<Option<InjuryStatus>> {
        Ok(lookup(&self.injuries, player).copied())
    }

    fn weather(&self, game_id: &str) -> PropResult<Option<Weather>> {
        Ok(lookup(&self.weather, game_id).copied())
    }

    fn betting_line(&self, game_id: &str) -> PropResult<Option<BettingLine>> {
        Ok(lookup(&self.lines, game_id).copied())
    }

    fn player_baseline(&self, player: &str, stat: StatKind) -> PropResult<Option<f64>> {
        Ok(lookup(&self.baselines, player).and_then(|m| m.get(&stat).copied()))
    }

    fn player_history(&self, player: &str, stat: StatKind) -> PropResult<Option<Vec<f64>>> {
        Ok(lookup(&self.histories, player).and_then(|m| m.get(&stat).cloned()))
    }
}

// Exact key first, then a case-insensitive scan; feed files are hand-edited.
fn lookup<'a, V>(map: &'a HashMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        let want = key.trim();
        map.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(want))
            .map(|(_, v)| v)
    })
}

/// Collapses a feed result to `Option`. A lookup that failed outright is logged and noted in
/// `notes` so the caller can surface it.
pub fn absorb<T>(
    what: &str,
    key: &str,
    res: PropResult<Option<T>>,
    notes: &mut Vec<String>,
) -> Option<T> {
    match res {
        Ok(v) => v,
        Err(err) => {
            warn!(lookup = what, key, error = %err, "feed lookup failed; using neutral default");
            notes.push(format!("{err}; using neutral {what}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropError;

    struct BrokenFeed;

    impl DataFeed for BrokenFeed {
        fn injury_status(&self, player: &str) -> PropResult<Option<InjuryStatus>> {
            Err(PropError::unavailable("injury", player))
        }
    }

    #[test]
    fn static_feed_parses_and_looks_up_case_insensitively() {
        let raw = r#"{
            "defense": {"Detroit Lions": {"pass": 20, "run": 3}},
            "injuries": {"CeeDee Lamb": "questionable"},
            "lines": {"Dallas Cowboys @ Detroit Lions": {"total": 51.5, "spread": 3.5}},
            "histories": {"CeeDee Lamb": {"receiving_yards": [88, 101, 67]}}
        }"#;
        let feed = StaticFeed::from_json(raw).unwrap();
        assert_eq!(
            feed.defense_ranking("detroit lions").unwrap(),
            Some(DefenseRanking {
                pass_rank: 20,
                run_rank: 3
            })
        );
        assert_eq!(
            feed.injury_status("CeeDee Lamb").unwrap(),
            Some(InjuryStatus::Questionable)
        );
        assert_eq!(
            feed.player_history("CeeDee Lamb", StatKind::ReceivingYards)
                .unwrap()
                .map(|h| h.len()),
            Some(3)
        );
        assert_eq!(feed.player_history("CeeDee Lamb", StatKind::Receptions).unwrap(), None);
        assert_eq!(feed.weather("anything").unwrap(), None);
    }

    #[test]
    fn failed_lookup_is_absorbed() {
        let feed = BrokenFeed;
        let mut notes = Vec::new();
        assert_eq!(absorb("injury", "X", feed.injury_status("X"), &mut notes), None);
        assert_eq!(notes, vec!["injury lookup unavailable for X; using neutral injury".to_string()]);
        assert_eq!(absorb("line", "g", NoFeed.betting_line("g"), &mut notes), None);
        assert_eq!(notes.len(), 1);
    }
}
