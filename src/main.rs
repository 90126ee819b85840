use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use prop_terminal::config::{self, AppConfig};
use prop_terminal::dashboard::{
    DashboardState, HIGH_CONFIDENCE, PlayerField, ResultsField, Screen, SetupField,
};
use prop_terminal::export::parlay_slip;
use prop_terminal::feeds::StaticFeed;
use prop_terminal::session::SessionContext;
use prop_terminal::teams::quick_picks;

struct App {
    state: DashboardState,
    should_quit: bool,
}

impl App {
    fn new(state: DashboardState) -> Self {
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let s = &mut self.state;
        if s.typing {
            match key.code {
                KeyCode::Enter => s.finish_typing(true),
                KeyCode::Esc => s.finish_typing(false),
                KeyCode::Backspace => s.backspace(),
                KeyCode::Char(c) => s.type_char(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => s.screen = Screen::Setup,
            KeyCode::Char('2') => s.screen = Screen::Players,
            KeyCode::Char('3') => s.screen = Screen::Results,
            KeyCode::Tab => s.next_screen(),
            KeyCode::Char('j') | KeyCode::Down => s.field_next(),
            KeyCode::Char('k') | KeyCode::Up => s.field_prev(),
            KeyCode::Char('l') | KeyCode::Right => s.adjust(1),
            KeyCode::Char('h') | KeyCode::Left => s.adjust(-1),
            KeyCode::Char('?') => s.help_overlay = !s.help_overlay,
            KeyCode::Esc => s.help_overlay = false,
            _ => match s.screen {
                Screen::Setup => match key.code {
                    KeyCode::Enter | KeyCode::Char('n') => s.create_and_activate(),
                    KeyCode::Char('a') => s.activate_selected(),
                    KeyCode::Char('g') => s.select_game(1),
                    KeyCode::Char('G') => s.select_game(-1),
                    KeyCode::Char('w') => s.toggle_weather(),
                    KeyCode::Char('x') | KeyCode::Delete => s.delete_selected_game(),
                    _ => {}
                },
                Screen::Players => match key.code {
                    KeyCode::Enter | KeyCode::Char('a') => s.add_current_player(),
                    KeyCode::Char('i') => s.start_typing(),
                    KeyCode::Char('c') => s.toggle_conservative(),
                    KeyCode::Char('n') => s.select_player(1),
                    KeyCode::Char('p') => s.select_player(-1),
                    KeyCode::Char('x') | KeyCode::Delete => s.delete_selected_player(),
                    _ => {}
                },
                Screen::Results => match key.code {
                    KeyCode::Char('n') => s.select_result(1),
                    KeyCode::Char('p') => s.select_result(-1),
                    KeyCode::Char('e') => {
                        if let Err(err) = s.export() {
                            s.push_log(format!("[WARN] Export failed: {err:#}"));
                        }
                    }
                    _ => {}
                },
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let cfg = AppConfig::from_env();

    let mut session = SessionContext::new(cfg.seed);
    session.conservative = cfg.conservative;
    let mut feed_note = None;
    if let Some(path) = cfg.feed_path.as_deref() {
        match StaticFeed::load(path) {
            Ok(feed) => session = session.with_feed(Arc::new(feed)),
            Err(err) => feed_note = Some(format!("[WARN] Feed not loaded: {err:#}")),
        }
    }
    let mut app = App::new(DashboardState::new(session, cfg));
    if let Some(note) = feed_note {
        app.state.push_log(note);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Setup => render_setup(frame, chunks[1], &app.state),
        Screen::Players => render_players(frame, chunks[1], &app.state),
        Screen::Results => render_results(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::TOP))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &DashboardState) -> String {
    let screen = match state.screen {
        Screen::Setup => "SETUP",
        Screen::Players => "PLAYERS",
        Screen::Results => "RESULTS",
    };
    let game = state
        .session
        .active()
        .map(|g| g.id.clone())
        .unwrap_or_else(|| "no active game".to_string());
    let line1 = format!(" NFL PROPS | {screen} | {game}");
    let line2 = format!(
        " {} games | {} props | min {:.0}%",
        state.session.games.len(),
        state.session.results.len(),
        state.min_confidence
    );
    format!("{line1}\n{line2}")
}

fn footer_text(state: &DashboardState) -> String {
    if state.typing {
        return "Type name | Enter Keep | Esc Cancel".to_string();
    }
    match state.screen {
        Screen::Setup => {
            "1/2/3 Screen | j/k Field | h/l Adjust | Enter Create | g Game | a Activate | w Weather | x Delete | ? Help | q Quit".to_string()
        }
        Screen::Players => {
            "1/2/3 Screen | j/k Field | h/l Adjust | i Type name | Enter Add | n/p Select | x Delete | ? Help | q Quit".to_string()
        }
        Screen::Results => {
            "1/2/3 Screen | j/k Field | h/l Adjust | n/p Select | e Export | ? Help | q Quit".to_string()
        }
    }
}

fn field_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    Line::from(vec![
        Span::styled(format!("{marker}{label:<14}"), field_style(focused)),
        Span::raw(value),
    ])
}

fn render_setup(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let f = state.setup_field;
    let weather_value = |v: String| {
        if state.weather_enabled {
            v
        } else {
            format!("{v} (off)")
        }
    };
    let lines = vec![
        field_line("Away", state.away_team().to_string(), f == SetupField::Away),
        field_line("Home", state.home_team().to_string(), f == SetupField::Home),
        field_line("O/U", format!("{:.1}", state.total), f == SetupField::Total),
        field_line(
            "Home spread",
            format!("{:+.1}", state.spread),
            f == SetupField::Spread,
        ),
        field_line(
            "Wind",
            weather_value(format!("{:.0} mph", state.wind_mph)),
            f == SetupField::Wind,
        ),
        field_line(
            "Temperature",
            weather_value(format!("{:.0}°F", state.temperature_f)),
            f == SetupField::Temperature,
        ),
        field_line(
            "Precip",
            weather_value(state.precipitation.label().to_string()),
            f == SetupField::Precipitation,
        ),
    ];
    let form = Paragraph::new(lines).block(Block::default().title("New game").borders(Borders::ALL));
    frame.render_widget(form, cols[0]);

    let games = &state.session.games;
    if games.is_empty() {
        let empty = Paragraph::new("No games yet. Pick teams and press Enter.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Games").borders(Borders::ALL));
        frame.render_widget(empty, cols[1]);
        return;
    }
    let active = state.session.active_game.as_deref();
    let lines: Vec<Line> = games
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let cond = state.session.conditions.get(&g.id);
            let detail = cond
                .map(|c| format!("O/U {:.1} | {:+.1}", c.total, c.spread))
                .unwrap_or_default();
            let mark = if Some(g.id.as_str()) == active { "*" } else { " " };
            let style = if i == state.selected_game {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::styled(format!("{mark} {:<40} {detail}", g.id), style)
        })
        .collect();
    let list =
        Paragraph::new(lines).block(Block::default().title("Games").borders(Borders::ALL));
    frame.render_widget(list, cols[1]);
}

fn render_players(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let f = state.player_field;
    let side = match state.current_team() {
        Some(team) => format!("{} ({team})", if state.home_side { "Home" } else { "Away" }),
        None => "activate a game first".to_string(),
    };
    let picks = quick_picks(state.position).join(" / ");
    let name = if state.typing {
        format!("{}_", state.manual_name)
    } else {
        state.current_player_name()
    };
    let lines = vec![
        field_line("Team", side, f == PlayerField::Side),
        field_line("Position", state.position.to_string(), f == PlayerField::Position),
        field_line("Player", name, f == PlayerField::Pick),
        field_line("Injury", state.injury.to_string(), f == PlayerField::Injury),
        Line::raw(""),
        Line::styled(format!("  Quick picks: {picks}"), Style::default().fg(Color::DarkGray)),
    ];
    let form =
        Paragraph::new(lines).block(Block::default().title("Add player").borders(Borders::ALL));
    frame.render_widget(form, cols[0]);

    let players = state.session.active_players();
    if players.is_empty() {
        let empty = Paragraph::new("No players on this game")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Roster").borders(Borders::ALL));
        frame.render_widget(empty, cols[1]);
        return;
    }
    let lines: Vec<Line> = players
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let props = state
                .session
                .results
                .iter()
                .filter(|r| r.player == p.name)
                .count();
            let style = if i == state.selected_player {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::styled(
                format!("{:<24} {:<3} {:<24} {props} props", p.name, p.position, p.team),
                style,
            )
        })
        .collect();
    let list = Paragraph::new(lines).block(Block::default().title("Roster").borders(Borders::ALL));
    frame.render_widget(list, cols[1]);
}

fn render_results(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let f = state.results_field;
    let controls = vec![
        field_line(
            "Min conf",
            format!("{:.0}%", state.min_confidence),
            f == ResultsField::Threshold,
        ),
        field_line("Legs", state.parlay_legs.to_string(), f == ResultsField::Legs),
        field_line("Stake", format!("${:.0}", state.stake), f == ResultsField::Stake),
    ];
    let controls =
        Paragraph::new(controls).block(Block::default().title("Parlay").borders(Borders::ALL));
    frame.render_widget(controls, rows[0]);

    let results = state.visible_results();
    if results.is_empty() {
        let empty = Paragraph::new("No props at this confidence")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Props").borders(Borders::ALL));
        frame.render_widget(empty, cols[0]);
    } else {
        let visible = cols[0].height.saturating_sub(2) as usize;
        let (start, end) = visible_range(state.selected_result, results.len(), visible);
        let lines: Vec<Line> = results[start..end]
            .iter()
            .enumerate()
            .map(|(offset, r)| {
                let dot = if r.rounded_confidence() >= HIGH_CONFIDENCE {
                    "🟢"
                } else {
                    "🟡"
                };
                let style = if start + offset == state.selected_result {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Line::styled(
                    format!(
                        "{dot} {:<20} {:<16} O {:>6.1}  tgt {:>6.1}  {:>5.1}%",
                        r.player,
                        r.stat_name(),
                        r.line,
                        r.target,
                        r.confidence
                    ),
                    style,
                )
            })
            .collect();
        let list = Paragraph::new(lines).block(Block::default().title("Props").borders(Borders::ALL));
        frame.render_widget(list, cols[0]);
    }

    let text = match state.parlay() {
        Ok((legs, quote)) => {
            let mut out = vec![
                format!("Legs        {}", quote.legs),
                format!("Probability {:.2}%", quote.probability * 100.0),
                format!("Odds        {}", quote.american_odds),
                format!("EV          {:+.1}%", quote.expected_value),
                format!("Payout      ${:.0}", quote.payout(state.stake)),
                String::new(),
            ];
            out.extend(parlay_slip(&legs));
            out.join("\n")
        }
        Err(err) => format!("No parlay: {err}"),
    };
    let slip = Paragraph::new(text).block(Block::default().title("Slip").borders(Borders::ALL));
    frame.render_widget(slip, cols[1]);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &DashboardState) -> String {
    if state.session.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .session
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "NFL Props - Help",
        "",
        "Global:",
        "  1 / 2 / 3    Setup / Players / Results",
        "  Tab          Next screen",
        "  j/k or ↑/↓   Move between fields",
        "  h/l or ←/→   Change focused value",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Setup:",
        "  Enter / n    Create and activate game",
        "  g / G        Select game",
        "  a            Activate selected game",
        "  w            Weather on/off",
        "  x            Delete selected game",
        "",
        "Players:",
        "  i            Type a player name",
        "  Enter / a    Add player",
        "  c            Conservative lines on/off",
        "  x            Delete selected player",
        "",
        "Results:",
        "  e            Export to xlsx",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
