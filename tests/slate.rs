use std::path::PathBuf;

use prop_terminal::config::AppConfig;
use prop_terminal::session::PropOutcome;
use prop_terminal::slate::Slate;
use prop_terminal::stat_config::StatKind;

fn load_slate() -> Slate {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("slate.json");
    Slate::load(&path).expect("slate fixture")
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn slate_projects_every_prop_and_flags_bad_ones() {
    let report = load_slate().run(&AppConfig::default()).unwrap();
    assert_eq!(report.seed, 42);
    assert_eq!(report.outcomes.len(), 13);

    let unavailable: Vec<&PropOutcome> = report
        .outcomes
        .iter()
        .filter(|o| o.projection().is_none())
        .collect();
    assert_eq!(unavailable.len(), 1);
    match unavailable[0] {
        PropOutcome::Unavailable { request, reason } => {
            assert_eq!(request.player, "Isiah Pacheco");
            assert!(reason.contains("invalid stat"));
        }
        PropOutcome::Projected(_) => unreachable!(),
    }
    assert_eq!(report.session.results.len(), 12);
}

#[test]
fn ruled_out_player_projects_to_zero() {
    let report = load_slate().run(&AppConfig::default()).unwrap();
    let kelce: Vec<_> = report
        .session
        .results
        .iter()
        .filter(|r| r.player == "Travis Kelce")
        .collect();
    assert_eq!(kelce.len(), 3);
    for leg in kelce {
        assert_eq!(leg.mean, 0.0);
        assert_eq!(leg.line, 0.0);
        assert_eq!(leg.target, 0.0);
        assert_eq!(leg.margin, 0.0);
    }
}

#[test]
fn history_replaces_base_and_sets_consistency() {
    let report = load_slate().run(&AppConfig::default()).unwrap();
    let lamb = report
        .session
        .results
        .iter()
        .find(|r| r.player == "CeeDee Lamb" && r.stat == StatKind::ReceivingYards)
        .expect("lamb receiving yards");
    // Only the five most recent games count.
    assert!(approx(lamb.factors.base, 93.6));
    assert!(lamb.factors.consistency.is_some());
    assert!(!lamb.is_home);
    assert_eq!(lamb.opponent, "Detroit Lions");
}

#[test]
fn feed_line_and_baseline_fill_the_second_game() {
    let report = load_slate().run(&AppConfig::default()).unwrap();
    let allen = report
        .session
        .results
        .iter()
        .find(|r| r.player == "Josh Allen" && r.stat == StatKind::PassingYards)
        .expect("allen passing yards");
    assert!(approx(allen.factors.base, 265.0));
    // O/U 52.5 pace, and Buffalo is the away side of a -2.5 home line.
    assert!(approx(allen.factors.script, 1.12 * 1.03));

    let goff = report
        .session
        .results
        .iter()
        .find(|r| r.player == "Jared Goff" && r.stat == StatKind::PassingYards)
        .expect("goff passing yards");
    assert!(approx(goff.factors.script, 1.12));
    // 12 mph wind and 34°F.
    assert!(approx(goff.factors.weather, 0.95 * 0.93));
    assert!((52.0..=88.0).contains(&goff.confidence));
}

#[test]
fn correlated_parlay_is_quoted() {
    let report = load_slate().run(&AppConfig::default()).unwrap();
    let (legs, quote) = report
        .parlay
        .expect("parlay requested")
        .expect("parlay quoted");
    assert_eq!(legs.len(), 3);
    assert_eq!(quote.legs, 3);
    assert_eq!(quote.american_odds, "+596");
    assert!(quote.composite_z.is_some());
    let independent: f64 = legs.iter().map(|l| l.confidence / 100.0).product();
    // Positive correlation between overs raises the joint probability.
    assert!(quote.probability > independent);
    let weakest = legs
        .iter()
        .map(|l| l.confidence / 100.0)
        .fold(f64::INFINITY, f64::min);
    assert!(quote.probability <= weakest + 1e-3);
    assert_eq!(report.stake, 50.0);
}

#[test]
fn same_seed_same_slate() {
    let slate = load_slate();
    let a = slate.run(&AppConfig::default()).unwrap();
    let b = slate.run(&AppConfig::default()).unwrap();
    assert_eq!(a.outcomes, b.outcomes);

    let mut other = slate.clone();
    other.seed = Some(43);
    let c = other.run(&AppConfig::default()).unwrap();
    assert_ne!(a.outcomes, c.outcomes);
}
