use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::stat_config::StatKind;

pub const NEUTRAL_RANK: u8 = 16;
const MIN_RANK: u8 = 1;
const MAX_RANK: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseRanking {
    #[serde(rename = "pass")]
    pub pass_rank: u8,
    #[serde(rename = "run")]
    pub run_rank: u8,
}

impl DefenseRanking {
    pub fn neutral() -> Self {
        Self {
            pass_rank: NEUTRAL_RANK,
            run_rank: NEUTRAL_RANK,
        }
    }

    /// Rank that applies to `stat`: pass defense for pass-type stats, run defense otherwise.
    pub fn rank_for(&self, stat: StatKind) -> u8 {
        let rank = if stat.is_pass_type() {
            self.pass_rank
        } else {
            self.run_rank
        };
        rank.clamp(MIN_RANK, MAX_RANK)
    }
}

impl Default for DefenseRanking {
    fn default() -> Self {
        Self::neutral()
    }
}

static BUILTIN: Lazy<DefenseTable> = Lazy::new(|| {
    let mut table = DefenseTable::default();
    table.insert("Arizona Cardinals", 28, 22);
    table.insert("Dallas Cowboys", 11, 16);
    table.insert("Baltimore Ravens", 8, 5);
    table.insert("Kansas City Chiefs", 13, 12);
    table
});

/// Opponent defense ranks keyed by team name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefenseTable {
    teams: HashMap<String, DefenseRanking>,
}

impl DefenseTable {
    pub fn builtin() -> &'static DefenseTable {
        &BUILTIN
    }

    pub fn insert(&mut self, team: &str, pass_rank: u8, run_rank: u8) {
        self.teams.insert(
            team_key(team),
            DefenseRanking {
                pass_rank,
                run_rank,
            },
        );
    }

    pub fn get(&self, team: &str) -> Option<DefenseRanking> {
        self.teams.get(&team_key(team)).copied()
    }

    /// Unlisted teams are treated as league average.
    pub fn ranking_or_neutral(&self, team: &str) -> DefenseRanking {
        self.get(team).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

fn team_key(team: &str) -> String {
    team.trim().to_lowercase()
}

/// Maps a defense rank to a stat multiplier. Bands are inclusive on the upper rank.
pub fn defense_factor(rank: u8) -> f64 {
    match rank {
        0..=5 => 0.80,
        6..=10 => 0.88,
        11..=16 => 0.95,
        17..=24 => 1.00,
        25..=28 => 1.12,
        _ => 1.18,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_inclusive() {
        assert_eq!(defense_factor(1), 0.80);
        assert_eq!(defense_factor(5), 0.80);
        assert_eq!(defense_factor(6), 0.88);
        assert_eq!(defense_factor(10), 0.88);
        assert_eq!(defense_factor(16), 0.95);
        assert_eq!(defense_factor(17), 1.00);
        assert_eq!(defense_factor(24), 1.00);
        assert_eq!(defense_factor(25), 1.12);
        assert_eq!(defense_factor(28), 1.12);
        assert_eq!(defense_factor(29), 1.18);
        assert_eq!(defense_factor(32), 1.18);
    }

    #[test]
    fn factor_never_decreases_with_rank() {
        let mut prev = 0.0;
        for rank in 1..=32 {
            let f = defense_factor(rank);
            assert!(f >= prev, "rank {rank} dropped to {f}");
            prev = f;
        }
    }

    #[test]
    fn unlisted_team_is_neutral() {
        let ranking = DefenseTable::builtin().ranking_or_neutral("Nowhere Nomads");
        assert_eq!(ranking, DefenseRanking::neutral());
        assert_eq!(defense_factor(ranking.rank_for(StatKind::PassingYards)), 0.95);
    }

    #[test]
    fn picks_pass_or_run_rank_by_stat() {
        let ravens = DefenseTable::builtin().ranking_or_neutral("baltimore ravens");
        assert_eq!(ravens.rank_for(StatKind::Receptions), 8);
        assert_eq!(ravens.rank_for(StatKind::RushingTds), 5);
    }

    #[test]
    fn out_of_range_ranks_are_clamped() {
        let odd = DefenseRanking {
            pass_rank: 0,
            run_rank: 40,
        };
        assert_eq!(odd.rank_for(StatKind::PassingYards), 1);
        assert_eq!(odd.rank_for(StatKind::RushingYards), 32);
    }
}
