use anyhow::Result;

use crate::conditions::{GameConditions, InjuryStatus, Precipitation, Weather};
use crate::config::{AppConfig, MAX_PARLAY_LEGS, MIN_CONFIDENCE_CEIL, MIN_CONFIDENCE_FLOOR};
use crate::error::PropResult;
use crate::export::{self, ExportReport, ParlayExport};
use crate::parlay::{MIN_LEGS, ParlayMode, ParlayQuote};
use crate::projection::LegProjection;
use crate::session::SessionContext;
use crate::stat_config::Position;
use crate::teams::{NFL_TEAMS, quick_picks};

pub const HIGH_CONFIDENCE: f64 = 70.0;

const TOTAL_RANGE: (f64, f64) = (30.0, 70.0);
const SPREAD_RANGE: (f64, f64) = (-20.0, 20.0);
const WIND_RANGE: (f64, f64) = (0.0, 40.0);
const TEMP_RANGE: (f64, f64) = (-10.0, 110.0);
const STAKE_RANGE: (f64, f64) = (10.0, 1000.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Setup,
    Players,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Away,
    Home,
    Total,
    Spread,
    Wind,
    Temperature,
    Precipitation,
}

const SETUP_FIELDS: [SetupField; 7] = [
    SetupField::Away,
    SetupField::Home,
    SetupField::Total,
    SetupField::Spread,
    SetupField::Wind,
    SetupField::Temperature,
    SetupField::Precipitation,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerField {
    Side,
    Position,
    Pick,
    Injury,
}

const PLAYER_FIELDS: [PlayerField; 4] = [
    PlayerField::Side,
    PlayerField::Position,
    PlayerField::Pick,
    PlayerField::Injury,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsField {
    Threshold,
    Legs,
    Stake,
}

const RESULTS_FIELDS: [ResultsField; 3] = [
    ResultsField::Threshold,
    ResultsField::Legs,
    ResultsField::Stake,
];

pub struct DashboardState {
    pub session: SessionContext,
    pub config: AppConfig,
    pub screen: Screen,
    pub help_overlay: bool,

    pub setup_field: SetupField,
    pub away_idx: usize,
    pub home_idx: usize,
    pub total: f64,
    pub spread: f64,
    pub weather_enabled: bool,
    pub wind_mph: f64,
    pub temperature_f: f64,
    pub precipitation: Precipitation,
    pub selected_game: usize,

    pub player_field: PlayerField,
    pub home_side: bool,
    pub position: Position,
    pub pick_idx: usize,
    /// Typed name; overrides the quick pick when non-empty.
    pub manual_name: String,
    pub typing: bool,
    pub injury: InjuryStatus,
    pub selected_player: usize,

    pub results_field: ResultsField,
    pub min_confidence: f64,
    pub parlay_legs: usize,
    pub stake: f64,
    pub selected_result: usize,
}

impl DashboardState {
    pub fn new(session: SessionContext, config: AppConfig) -> Self {
        Self {
            session,
            screen: Screen::Setup,
            help_overlay: false,
            setup_field: SetupField::Away,
            away_idx: 8,
            home_idx: 0,
            total: 45.0,
            spread: 0.0,
            weather_enabled: false,
            wind_mph: 0.0,
            temperature_f: 70.0,
            precipitation: Precipitation::None,
            selected_game: 0,
            player_field: PlayerField::Side,
            home_side: true,
            position: Position::QB,
            pick_idx: 0,
            manual_name: String::new(),
            typing: false,
            injury: InjuryStatus::Healthy,
            selected_player: 0,
            results_field: ResultsField::Threshold,
            min_confidence: config.min_confidence,
            parlay_legs: config.parlay_legs,
            stake: config.stake,
            selected_result: 0,
            config,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.session.push_log(msg);
    }

    pub fn next_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Setup => Screen::Players,
            Screen::Players => Screen::Results,
            Screen::Results => Screen::Setup,
        };
    }

    pub fn field_next(&mut self) {
        match self.screen {
            Screen::Setup => self.setup_field = cycle(&SETUP_FIELDS, self.setup_field, 1),
            Screen::Players => self.player_field = cycle(&PLAYER_FIELDS, self.player_field, 1),
            Screen::Results => self.results_field = cycle(&RESULTS_FIELDS, self.results_field, 1),
        }
    }

    pub fn field_prev(&mut self) {
        match self.screen {
            Screen::Setup => self.setup_field = cycle(&SETUP_FIELDS, self.setup_field, -1),
            Screen::Players => self.player_field = cycle(&PLAYER_FIELDS, self.player_field, -1),
            Screen::Results => self.results_field = cycle(&RESULTS_FIELDS, self.results_field, -1),
        }
    }

    /// Steps the focused field up (`dir > 0`) or down.
    pub fn adjust(&mut self, dir: i32) {
        let d = dir.signum() as f64;
        match self.screen {
            Screen::Setup => match self.setup_field {
                SetupField::Away => self.away_idx = wrap(self.away_idx, dir, NFL_TEAMS.len()),
                SetupField::Home => self.home_idx = wrap(self.home_idx, dir, NFL_TEAMS.len()),
                SetupField::Total => self.total = step(self.total, 0.5 * d, TOTAL_RANGE),
                SetupField::Spread => self.spread = step(self.spread, 0.5 * d, SPREAD_RANGE),
                SetupField::Wind => {
                    self.weather_enabled = true;
                    self.wind_mph = step(self.wind_mph, d, WIND_RANGE);
                }
                SetupField::Temperature => {
                    self.weather_enabled = true;
                    self.temperature_f = step(self.temperature_f, 5.0 * d, TEMP_RANGE);
                }
                SetupField::Precipitation => {
                    self.weather_enabled = true;
                    self.precipitation = self.precipitation.next();
                }
            },
            Screen::Players => match self.player_field {
                PlayerField::Side => self.home_side = !self.home_side,
                PlayerField::Position => {
                    self.position = self.position.next();
                    self.pick_idx = 0;
                }
                PlayerField::Pick => {
                    self.pick_idx = wrap(self.pick_idx, dir, quick_picks(self.position).len())
                }
                PlayerField::Injury => self.injury = self.injury.next(),
            },
            Screen::Results => match self.results_field {
                ResultsField::Threshold => {
                    self.min_confidence = step(
                        self.min_confidence,
                        5.0 * d,
                        (MIN_CONFIDENCE_FLOOR, MIN_CONFIDENCE_CEIL),
                    )
                }
                ResultsField::Legs => {
                    let next = self.parlay_legs as i64 + dir.signum() as i64;
                    self.parlay_legs = next.clamp(MIN_LEGS as i64, MAX_PARLAY_LEGS as i64) as usize;
                }
                ResultsField::Stake => self.stake = step(self.stake, 10.0 * d, STAKE_RANGE),
            },
        }
    }

    pub fn toggle_weather(&mut self) {
        self.weather_enabled = !self.weather_enabled;
    }

    pub fn conditions(&self) -> GameConditions {
        GameConditions {
            total: self.total,
            spread: self.spread,
            weather: self.weather_enabled.then_some(Weather {
                temperature_f: self.temperature_f,
                wind_mph: self.wind_mph,
                precipitation: self.precipitation,
            }),
        }
    }

    pub fn away_team(&self) -> &'static str {
        NFL_TEAMS[self.away_idx % NFL_TEAMS.len()]
    }

    pub fn home_team(&self) -> &'static str {
        NFL_TEAMS[self.home_idx % NFL_TEAMS.len()]
    }

    /// Creates the away @ home game from the pickers and makes it active.
    pub fn create_and_activate(&mut self) {
        let (away, home) = (self.away_team(), self.home_team());
        let conditions = self.conditions();
        let result = self
            .session
            .create_game(away, home)
            .and_then(|id| self.session.activate_game(&id, conditions));
        match result {
            Ok(_) => {
                self.selected_game = self.session.games.len().saturating_sub(1);
                self.screen = Screen::Players;
            }
            Err(err) => self.push_log(format!("[WARN] {err}")),
        }
    }

    pub fn select_game(&mut self, dir: i32) {
        self.selected_game = wrap(self.selected_game, dir, self.session.games.len());
    }

    /// Activates the highlighted game with the current pickers' conditions.
    pub fn activate_selected(&mut self) {
        let Some(id) = self.session.games.get(self.selected_game).map(|g| g.id.clone()) else {
            self.push_log("[INFO] No game to activate");
            return;
        };
        let conditions = self.conditions();
        if let Err(err) = self.session.activate_game(&id, conditions) {
            self.push_log(format!("[WARN] {err}"));
        }
    }

    pub fn delete_selected_game(&mut self) {
        let Some(id) = self.session.games.get(self.selected_game).map(|g| g.id.clone()) else {
            return;
        };
        if let Err(err) = self.session.remove_game(&id) {
            self.push_log(format!("[WARN] {err}"));
        }
        self.selected_game = self
            .selected_game
            .min(self.session.games.len().saturating_sub(1));
    }

    pub fn current_team(&self) -> Option<String> {
        self.session
            .active()
            .map(|g| if self.home_side { g.home.clone() } else { g.away.clone() })
    }

    pub fn current_player_name(&self) -> String {
        let typed = self.manual_name.trim();
        if !typed.is_empty() {
            return typed.to_string();
        }
        let picks = quick_picks(self.position);
        picks
            .get(self.pick_idx % picks.len().max(1))
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    pub fn start_typing(&mut self) {
        self.typing = true;
        self.manual_name.clear();
    }

    pub fn type_char(&mut self, c: char) {
        if self.typing && self.manual_name.chars().count() < 40 {
            self.manual_name.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.typing {
            self.manual_name.pop();
        }
    }

    pub fn finish_typing(&mut self, keep: bool) {
        self.typing = false;
        if !keep {
            self.manual_name.clear();
        }
    }

    pub fn add_current_player(&mut self) {
        let Some(team) = self.current_team() else {
            self.push_log("[WARN] Activate a game first");
            return;
        };
        let name = self.current_player_name();
        match self
            .session
            .add_player_with_injury(&name, self.position, &team, Some(self.injury))
        {
            Ok(_) => {
                self.manual_name.clear();
                self.selected_player = self.session.active_players().len().saturating_sub(1);
            }
            Err(err) => self.push_log(format!("[WARN] {err}")),
        }
    }

    /// Flips conservative shading for props projected from now on.
    pub fn toggle_conservative(&mut self) {
        self.session.conservative = !self.session.conservative;
        let state = if self.session.conservative { "on" } else { "off" };
        self.push_log(format!("[INFO] Conservative lines {state}"));
    }

    pub fn select_player(&mut self, dir: i32) {
        self.selected_player = wrap(self.selected_player, dir, self.session.active_players().len());
    }

    pub fn delete_selected_player(&mut self) {
        let Some(name) = self
            .session
            .active_players()
            .get(self.selected_player)
            .map(|p| p.name.clone())
        else {
            return;
        };
        if let Err(err) = self.session.remove_player(&name) {
            self.push_log(format!("[WARN] {err}"));
        }
        self.selected_player = self
            .selected_player
            .min(self.session.active_players().len().saturating_sub(1));
    }

    pub fn visible_results(&self) -> Vec<&LegProjection> {
        self.session.filtered_results(self.min_confidence)
    }

    pub fn select_result(&mut self, dir: i32) {
        self.selected_result = wrap(self.selected_result, dir, self.visible_results().len());
    }

    pub fn parlay(&self) -> PropResult<(Vec<LegProjection>, ParlayQuote)> {
        self.session
            .build_parlay(self.min_confidence, self.parlay_legs, &ParlayMode::Independent)
    }

    pub fn export(&mut self) -> Result<ExportReport> {
        let path = self.config.export_path.clone();
        let parlay = self.parlay().ok();
        let parlay_export = parlay.as_ref().map(|(legs, quote)| ParlayExport {
            legs,
            quote,
            stake: self.stake,
        });
        let report =
            export::export_results_xlsx(&path, &self.session.results, parlay_export.as_ref())?;
        self.push_log(format!(
            "[INFO] Exported {} props to {}",
            report.props,
            path.display()
        ));
        Ok(report)
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, dir: i32) -> T {
    let idx = all.iter().position(|f| *f == current).unwrap_or(0);
    all[wrap(idx, dir, all.len())]
}

fn wrap(idx: usize, dir: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as i64;
    (idx as i64 + dir.signum() as i64).rem_euclid(len) as usize
}

fn step(value: f64, delta: f64, (lo, hi): (f64, f64)) -> f64 {
    (value + delta).clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard() -> DashboardState {
        DashboardState::new(SessionContext::new(Some(3)), AppConfig::default())
    }

    #[test]
    fn fields_wrap_both_ways() {
        let mut d = dashboard();
        d.field_prev();
        assert_eq!(d.setup_field, SetupField::Precipitation);
        d.field_next();
        assert_eq!(d.setup_field, SetupField::Away);
    }

    #[test]
    fn threshold_steps_by_five_within_bounds() {
        let mut d = dashboard();
        d.screen = Screen::Results;
        for _ in 0..10 {
            d.adjust(1);
        }
        assert_eq!(d.min_confidence, 85.0);
        for _ in 0..10 {
            d.adjust(-1);
        }
        assert_eq!(d.min_confidence, 50.0);
    }

    #[test]
    fn weather_only_sent_once_touched() {
        let mut d = dashboard();
        assert!(d.conditions().weather.is_none());
        d.setup_field = SetupField::Wind;
        d.adjust(1);
        assert_eq!(d.conditions().weather.map(|w| w.wind_mph), Some(1.0));
    }

    #[test]
    fn create_then_add_quick_pick() {
        let mut d = dashboard();
        d.create_and_activate();
        assert_eq!(d.screen, Screen::Players);
        assert_eq!(
            d.session.active_game.as_deref(),
            Some("Dallas Cowboys @ Arizona Cardinals")
        );
        d.home_side = false;
        d.add_current_player();
        assert_eq!(d.session.active_players()[0].name, "Dak Prescott");
        assert_eq!(d.session.results.len(), 3);

        d.delete_selected_player();
        assert!(d.session.results.is_empty());
    }

    #[test]
    fn rejected_add_leaves_injuries_alone() {
        let mut d = dashboard();
        d.create_and_activate();
        d.home_side = false;
        d.add_current_player();
        assert_eq!(d.session.injuries.get("Dak Prescott"), Some(&InjuryStatus::Healthy));

        d.injury = InjuryStatus::Out;
        d.add_current_player();
        assert!(d.session.logs.back().is_some_and(|l| l.contains("already added")));
        assert_eq!(d.session.injuries.get("Dak Prescott"), Some(&InjuryStatus::Healthy));
    }

    #[test]
    fn toggling_conservative_reaches_the_session() {
        let mut d = dashboard();
        assert!(!d.session.conservative);
        d.toggle_conservative();
        assert!(d.session.conservative);
        assert!(d.session.logs.back().is_some_and(|l| l.ends_with("on")));
    }

    #[test]
    fn duplicate_game_is_logged_not_fatal() {
        let mut d = dashboard();
        d.create_and_activate();
        d.create_and_activate();
        assert_eq!(d.session.games.len(), 1);
        assert!(d.session.logs.back().is_some_and(|l| l.contains("already exists")));
    }

    #[test]
    fn typed_name_overrides_pick() {
        let mut d = dashboard();
        d.start_typing();
        for c in "Brock Purdy".chars() {
            d.type_char(c);
        }
        d.finish_typing(true);
        assert_eq!(d.current_player_name(), "Brock Purdy");
        d.start_typing();
        d.finish_typing(false);
        assert_eq!(d.current_player_name(), "Dak Prescott");
    }
}
