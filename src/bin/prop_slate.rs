use std::path::PathBuf;

use prop_terminal::config::{self, AppConfig};
use prop_terminal::export::{self, ParlayExport, parlay_slip};
use prop_terminal::session::PropOutcome;
use prop_terminal::slate::Slate;

fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prop_terminal=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/slate.json"));
    let export_path = args.next().map(PathBuf::from);

    let cfg = AppConfig::from_env();
    let slate = Slate::load(&path)?;
    let report = slate.run(&cfg)?;

    println!("Seed: {}", report.seed);
    for outcome in &report.outcomes {
        match outcome {
            PropOutcome::Projected(leg) => println!(
                "{:<22} {:<16} vs {:<22} line {:>6.1}  target {:>6.1}  conf {:>5.1}%",
                leg.player,
                leg.stat_name(),
                leg.opponent,
                leg.line,
                leg.target,
                leg.confidence
            ),
            PropOutcome::Unavailable { request, reason } => println!(
                "{:<22} {:<16} unavailable ({reason})",
                request.player,
                request.stat.display_name()
            ),
        }
    }

    let mut built = None;
    match &report.parlay {
        Some(Ok((legs, quote))) => {
            println!();
            println!("Parlay: {} legs", quote.legs);
            println!("Probability: {:.2}%", quote.probability * 100.0);
            println!("Odds: {}", quote.american_odds);
            println!("EV: {:+.1}%", quote.expected_value);
            println!("Payout on ${:.0}: ${:.0}", report.stake, quote.payout(report.stake));
            if let Some(z) = quote.composite_z {
                println!("Composite z: {z:.3}");
            }
            for line in parlay_slip(legs) {
                println!("  {line}");
            }
            built = Some(ParlayExport {
                legs,
                quote,
                stake: report.stake,
            });
        }
        Some(Err(err)) => println!("\nParlay unavailable: {err}"),
        None => {}
    }

    if let Some(out) = export_path {
        let written = export::export_results_xlsx(&out, &report.session.results, built.as_ref())?;
        println!("\nWrote {} props to {}", written.props, out.display());
    }

    Ok(())
}
