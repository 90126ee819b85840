use crate::stat_config::Position;

pub const NFL_TEAMS: [&str; 32] = [
    "Arizona Cardinals",
    "Atlanta Falcons",
    "Baltimore Ravens",
    "Buffalo Bills",
    "Carolina Panthers",
    "Chicago Bears",
    "Cincinnati Bengals",
    "Cleveland Browns",
    "Dallas Cowboys",
    "Denver Broncos",
    "Detroit Lions",
    "Green Bay Packers",
    "Houston Texans",
    "Indianapolis Colts",
    "Jacksonville Jaguars",
    "Kansas City Chiefs",
    "Las Vegas Raiders",
    "Los Angeles Chargers",
    "Los Angeles Rams",
    "Miami Dolphins",
    "Minnesota Vikings",
    "New England Patriots",
    "New Orleans Saints",
    "New York Giants",
    "New York Jets",
    "Philadelphia Eagles",
    "Pittsburgh Steelers",
    "San Francisco 49ers",
    "Seattle Seahawks",
    "Tampa Bay Buccaneers",
    "Tennessee Titans",
    "Washington Commanders",
];

/// Names offered by the dashboard's quick-add list.
pub fn quick_picks(position: Position) -> &'static [&'static str] {
    match position {
        Position::QB => &["Dak Prescott", "Kyler Murray", "Patrick Mahomes"],
        Position::RB => &["Javonte Williams", "Bam Knight", "Saquon Barkley"],
        Position::WR => &["CeeDee Lamb", "Marvin Harrison Jr.", "George Pickens"],
        Position::TE => &["Jake Ferguson", "Trey McBride", "Travis Kelce"],
    }
}

pub fn is_known_team(name: &str) -> bool {
    let want = name.trim();
    NFL_TEAMS.iter().any(|t| t.eq_ignore_ascii_case(want))
}
