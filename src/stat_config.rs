use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{PropError, PropResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

pub const POSITIONS: [Position; 4] = [Position::QB, Position::RB, Position::WR, Position::TE];

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }

    /// Stats a player at this position can be projected for.
    pub fn stats(self) -> &'static [StatKind] {
        match self {
            Position::QB => &[
                StatKind::PassingYards,
                StatKind::PassingTds,
                StatKind::RushingYards,
            ],
            Position::RB => &[
                StatKind::RushingYards,
                StatKind::RushingTds,
                StatKind::ReceivingYards,
            ],
            Position::WR | Position::TE => &[
                StatKind::ReceivingYards,
                StatKind::ReceivingTds,
                StatKind::Receptions,
            ],
        }
    }

    pub fn supports(self, stat: StatKind) -> bool {
        self.stats().contains(&stat)
    }

    pub fn next(self) -> Self {
        match self {
            Position::QB => Position::RB,
            Position::RB => Position::WR,
            Position::WR => Position::TE,
            Position::TE => Position::QB,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Position {
    type Err = PropError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            _ => Err(PropError::UnknownPosition(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    PassingYards,
    PassingTds,
    RushingYards,
    RushingTds,
    ReceivingYards,
    ReceivingTds,
    Receptions,
}

pub const STAT_KINDS: [StatKind; 7] = [
    StatKind::PassingYards,
    StatKind::PassingTds,
    StatKind::RushingYards,
    StatKind::RushingTds,
    StatKind::ReceivingYards,
    StatKind::ReceivingTds,
    StatKind::Receptions,
];

impl StatKind {
    pub fn key(self) -> &'static str {
        match self {
            StatKind::PassingYards => "passing_yards",
            StatKind::PassingTds => "passing_tds",
            StatKind::RushingYards => "rushing_yards",
            StatKind::RushingTds => "rushing_tds",
            StatKind::ReceivingYards => "receiving_yards",
            StatKind::ReceivingTds => "receiving_tds",
            StatKind::Receptions => "receptions",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StatKind::PassingYards => "Passing Yards",
            StatKind::PassingTds => "Passing TDs",
            StatKind::RushingYards => "Rushing Yards",
            StatKind::RushingTds => "Rushing TDs",
            StatKind::ReceivingYards => "Receiving Yards",
            StatKind::ReceivingTds => "Receiving TDs",
            StatKind::Receptions => "Receptions",
        }
    }

    /// Pass-type stats are judged against pass defense and are hit by wind.
    pub fn is_pass_type(self) -> bool {
        let key = self.key();
        ["passing", "receiving", "receptions"]
            .iter()
            .any(|needle| key.contains(needle))
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

impl FromStr for StatKind {
    type Err = PropError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let want = raw.trim().to_lowercase().replace(' ', "_");
        STAT_KINDS
            .iter()
            .copied()
            .find(|s| s.key() == want || s.display_name().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| PropError::UnknownStat(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatConfig {
    pub base: f64,
    pub variance: f64,
}

pub const DEFAULT_STAT_CONFIG: StatConfig = StatConfig {
    base: 1.0,
    variance: 1.0,
};

// Position-specific bases where the generic table misleads (a QB is not a 65-yard rusher).
const POSITION_BASES: &[(Position, StatKind, f64)] = &[
    (Position::QB, StatKind::RushingYards, 25.0),
    (Position::RB, StatKind::RushingYards, 75.0),
    (Position::RB, StatKind::ReceivingYards, 30.0),
    (Position::WR, StatKind::ReceivingYards, 65.0),
    (Position::WR, StatKind::Receptions, 6.0),
    (Position::TE, StatKind::ReceivingYards, 45.0),
    (Position::TE, StatKind::Receptions, 5.0),
];

static BUILTIN: Lazy<StatTable> = Lazy::new(|| {
    let mut configs = HashMap::new();
    for (stat, base, variance) in [
        (StatKind::PassingYards, 250.0, 45.0),
        (StatKind::PassingTds, 1.5, 1.0),
        (StatKind::RushingYards, 65.0, 25.0),
        (StatKind::RushingTds, 0.5, 0.6),
        (StatKind::ReceivingYards, 55.0, 22.0),
        (StatKind::ReceivingTds, 0.4, 0.5),
        (StatKind::Receptions, 5.5, 2.5),
    ] {
        configs.insert(stat, StatConfig { base, variance });
    }
    StatTable {
        configs,
        overrides: POSITION_BASES
            .iter()
            .map(|(position, stat, base)| BaseOverride {
                position: *position,
                stat: *stat,
                base: *base,
            })
            .collect(),
    }
});

/// Base rates and variances per stat, plus per-position base overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatTable {
    pub configs: HashMap<StatKind, StatConfig>,
    #[serde(default)]
    pub overrides: Vec<BaseOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseOverride {
    pub position: Position,
    pub stat: StatKind,
    pub base: f64,
}

impl StatTable {
    pub fn builtin() -> &'static StatTable {
        &BUILTIN
    }

    /// Resolves the config for a valid (position, stat) pair. Missing entries fall back to
    /// `DEFAULT_STAT_CONFIG`; a pair the position never produces is an error.
    pub fn resolve(&self, position: Position, stat: StatKind) -> PropResult<StatConfig> {
        if !position.supports(stat) {
            return Err(PropError::InvalidStatKind { position, stat });
        }
        let mut cfg = self
            .configs
            .get(&stat)
            .copied()
            .unwrap_or(DEFAULT_STAT_CONFIG);
        if let Some(o) = self
            .overrides
            .iter()
            .find(|o| o.position == position && o.stat == stat)
        {
            cfg.base = o.base;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_overrides_replace_generic_base() {
        let table = StatTable::builtin();
        let qb = table.resolve(Position::QB, StatKind::RushingYards).unwrap();
        assert_eq!(qb.base, 25.0);
        assert_eq!(qb.variance, 25.0);
        let rb = table.resolve(Position::RB, StatKind::RushingYards).unwrap();
        assert_eq!(rb.base, 75.0);
        let wr = table.resolve(Position::WR, StatKind::Receptions).unwrap();
        assert_eq!(wr.base, 6.0);
        let te = table.resolve(Position::TE, StatKind::Receptions).unwrap();
        assert_eq!(te.base, 5.0);
        let qb_pass = table.resolve(Position::QB, StatKind::PassingYards).unwrap();
        assert_eq!(qb_pass.base, 250.0);
    }

    #[test]
    fn mismatched_stat_is_rejected() {
        let err = StatTable::builtin()
            .resolve(Position::WR, StatKind::RushingYards)
            .unwrap_err();
        assert_eq!(
            err,
            PropError::InvalidStatKind {
                position: Position::WR,
                stat: StatKind::RushingYards
            }
        );
    }

    #[test]
    fn missing_entry_falls_back_to_default() {
        let table = StatTable::default();
        let cfg = table.resolve(Position::RB, StatKind::RushingTds).unwrap();
        assert_eq!(cfg, DEFAULT_STAT_CONFIG);
    }

    #[test]
    fn parses_names_and_classifies_pass_type() {
        assert_eq!("wr".parse::<Position>().unwrap(), Position::WR);
        assert!("K".parse::<Position>().is_err());
        assert_eq!(
            "Receiving Yards".parse::<StatKind>().unwrap(),
            StatKind::ReceivingYards
        );
        assert_eq!("receptions".parse::<StatKind>().unwrap(), StatKind::Receptions);
        assert!("sacks".parse::<StatKind>().is_err());
        assert!(StatKind::Receptions.is_pass_type());
        assert!(StatKind::PassingTds.is_pass_type());
        assert!(!StatKind::RushingYards.is_pass_type());
        assert!(!StatKind::RushingTds.is_pass_type());
    }

    #[test]
    fn every_position_stat_resolves() {
        for pos in POSITIONS {
            for stat in pos.stats() {
                assert!(StatTable::builtin().resolve(pos, *stat).is_ok());
            }
        }
    }
}
