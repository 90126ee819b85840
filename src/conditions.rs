use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stat_config::StatKind;

pub const DEFAULT_TOTAL: f64 = 45.0;
pub const DEFAULT_TEMPERATURE_F: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precipitation {
    #[default]
    None,
    Light,
    Moderate,
    Heavy,
}

impl Precipitation {
    pub fn factor(self) -> f64 {
        match self {
            Precipitation::Heavy => 0.80,
            Precipitation::Moderate => 0.90,
            Precipitation::Light => 0.95,
            Precipitation::None => 1.00,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Precipitation::None => Precipitation::Light,
            Precipitation::Light => Precipitation::Moderate,
            Precipitation::Moderate => Precipitation::Heavy,
            Precipitation::Heavy => Precipitation::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Precipitation::None => "none",
            Precipitation::Light => "light",
            Precipitation::Moderate => "moderate",
            Precipitation::Heavy => "heavy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    #[serde(default = "default_temperature")]
    pub temperature_f: f64,
    #[serde(default)]
    pub wind_mph: f64,
    #[serde(default)]
    pub precipitation: Precipitation,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE_F
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temperature_f: DEFAULT_TEMPERATURE_F,
            wind_mph: 0.0,
            precipitation: Precipitation::None,
        }
    }
}

impl Weather {
    /// Wind only hurts the passing game; rain and cold hurt everything. The three stack.
    pub fn factor(&self, stat: StatKind) -> f64 {
        let wind = if stat.is_pass_type() {
            if self.wind_mph >= 20.0 {
                0.70
            } else if self.wind_mph >= 15.0 {
                0.85
            } else if self.wind_mph >= 10.0 {
                0.95
            } else {
                1.00
            }
        } else {
            1.00
        };

        let temp = if self.temperature_f < 30.0 {
            0.88
        } else if self.temperature_f < 40.0 {
            0.93
        } else if self.temperature_f < 50.0 {
            0.97
        } else {
            1.00
        };

        wind * self.precipitation.factor() * temp
    }
}

/// Over/under and spread for one game, plus optional weather.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConditions {
    #[serde(default = "default_total")]
    pub total: f64,
    #[serde(default)]
    pub spread: f64,
    #[serde(default)]
    pub weather: Option<Weather>,
}

fn default_total() -> f64 {
    DEFAULT_TOTAL
}

impl Default for GameConditions {
    fn default() -> Self {
        Self {
            total: DEFAULT_TOTAL,
            spread: 0.0,
            weather: None,
        }
    }
}

impl GameConditions {
    pub fn with_total(total: f64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Expected pace from the total.
    pub fn pace_factor(&self) -> f64 {
        let t = self.total;
        if t >= 50.0 {
            1.12
        } else if t >= 47.0 {
            1.08
        } else if t >= 44.0 {
            1.04
        } else if t <= 38.0 {
            0.92
        } else if t <= 41.0 {
            0.96
        } else {
            1.00
        }
    }

    /// Positive spread means the team is the underdog and expected to throw to catch up.
    pub fn spread_factor(&self) -> f64 {
        if self.spread > 0.0 {
            1.03
        } else if self.spread < -7.0 {
            1.05
        } else {
            1.00
        }
    }

    pub fn script_factor(&self) -> f64 {
        self.pace_factor() * self.spread_factor()
    }

    pub fn weather_factor(&self, stat: StatKind) -> f64 {
        self.weather.map(|w| w.factor(stat)).unwrap_or(1.0)
    }
}

/// Sportsbook total and spread as reported by a betting-line feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BettingLine {
    pub total: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
    #[default]
    Healthy,
    Questionable,
    Doubtful,
    Out,
}

impl InjuryStatus {
    pub fn factor(self) -> f64 {
        match self {
            InjuryStatus::Out => 0.0,
            InjuryStatus::Doubtful => 0.50,
            InjuryStatus::Questionable => 0.85,
            InjuryStatus::Healthy => 1.00,
        }
    }

    pub fn next(self) -> Self {
        match self {
            InjuryStatus::Healthy => InjuryStatus::Questionable,
            InjuryStatus::Questionable => InjuryStatus::Doubtful,
            InjuryStatus::Doubtful => InjuryStatus::Out,
            InjuryStatus::Out => InjuryStatus::Healthy,
        }
    }
}

impl fmt::Display for InjuryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InjuryStatus::Healthy => "healthy",
            InjuryStatus::Questionable => "questionable",
            InjuryStatus::Doubtful => "doubtful",
            InjuryStatus::Out => "out",
        };
        f.pad(label)
    }
}
