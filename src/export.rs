use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::parlay::ParlayQuote;
use crate::projection::LegProjection;

pub struct ExportReport {
    pub props: usize,
    pub parlay_legs: usize,
}

/// A built parlay plus the stake it should be priced at.
pub struct ParlayExport<'a> {
    pub legs: &'a [LegProjection],
    pub quote: &'a ParlayQuote,
    pub stake: f64,
}

/// One numbered line per leg, e.g. `1. Josh Allen OVER 267.5 Passing Yards`.
pub fn parlay_slip(legs: &[LegProjection]) -> Vec<String> {
    legs.iter()
        .enumerate()
        .map(|(i, leg)| {
            format!(
                "{}. {} OVER {:.1} {}",
                i + 1,
                leg.player,
                leg.line,
                leg.stat_name()
            )
        })
        .collect()
}

pub fn props_rows(results: &[LegProjection]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player".to_string(),
        "Pos".to_string(),
        "Stat".to_string(),
        "Opponent".to_string(),
        "Home".to_string(),
        "Line".to_string(),
        "Target".to_string(),
        "Margin".to_string(),
        "Confidence".to_string(),
        "Mean".to_string(),
        "Base".to_string(),
        "Defense".to_string(),
        "Home Adj".to_string(),
        "Weather".to_string(),
        "Injury".to_string(),
        "Script".to_string(),
        "Consistency".to_string(),
        "Game".to_string(),
    ]];
    for r in results {
        let f = &r.factors;
        rows.push(vec![
            r.player.clone(),
            r.position.to_string(),
            r.stat_name().to_string(),
            r.opponent.clone(),
            if r.is_home { "Y" } else { "N" }.to_string(),
            format!("{:.1}", r.line),
            format!("{:.1}", r.target),
            format!("{:.1}", r.margin),
            format!("{:.1}", r.confidence),
            format!("{:.2}", r.mean),
            format!("{:.2}", f.base),
            format!("{:.2}", f.defense),
            format!("{:.2}", f.home),
            format!("{:.2}", f.weather),
            format!("{:.2}", f.injury),
            format!("{:.2}", f.script),
            f.consistency.map(|c| format!("{c:.2}")).unwrap_or_default(),
            r.game_id.clone().unwrap_or_default(),
        ]);
    }
    rows
}

pub fn parlay_rows(parlay: &ParlayExport<'_>) -> Vec<Vec<String>> {
    let q = parlay.quote;
    let mut rows = vec![
        vec!["Generated".to_string(), Utc::now().to_rfc3339()],
        vec!["Legs".to_string(), q.legs.to_string()],
        vec![
            "Probability".to_string(),
            format!("{:.2}%", q.probability * 100.0),
        ],
        vec!["Odds".to_string(), q.american_odds.clone()],
        vec!["EV".to_string(), format!("{:+.1}%", q.expected_value)],
        vec!["Stake".to_string(), format!("${:.0}", parlay.stake)],
        vec![
            "Payout".to_string(),
            format!("${:.0}", q.payout(parlay.stake)),
        ],
    ];
    if let Some(z) = q.composite_z {
        rows.push(vec!["Composite Z".to_string(), format!("{z:.3}")]);
    }
    rows.push(Vec::new());
    rows.extend(parlay_slip(parlay.legs).into_iter().map(|line| vec![line]));
    rows
}

pub fn export_results_xlsx(
    path: &Path,
    results: &[LegProjection],
    parlay: Option<&ParlayExport<'_>>,
) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Props")?;
        write_rows(sheet, &props_rows(results))?;
    }
    if let Some(parlay) = parlay {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Parlay")?;
        write_rows(sheet, &parlay_rows(parlay))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        props: results.len(),
        parlay_legs: parlay.map(|p| p.legs.len()).unwrap_or(0),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
