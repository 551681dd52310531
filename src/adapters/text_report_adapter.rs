//! Plain-text report adapter implementing ReportPort.
//!
//! Produces the human-readable daily screening report and the
//! single-symbol analysis printout used by `zonescan analyze`.

use crate::domain::error::ScreenerError;
use crate::domain::opportunity::TradingOpportunity;
use crate::domain::pipeline::SymbolScreening;
use crate::domain::structure::StructureAnalysis;
use crate::domain::summary::{ScreeningReport, ScreeningSummary};
use crate::ports::report_port::ReportPort;

const RULE: &str = "========================================================================\n";

pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for TextReportAdapter {
    fn render(&self, report: &ScreeningReport) -> Result<String, ScreenerError> {
        let mut out = String::new();
        out.push_str(RULE);
        out.push_str(&format!(
            "ZONESCAN DAILY REPORT  {}\n",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        out.push_str(RULE);
        out.push_str(&format!(
            "Symbols: {} requested, {} screened, {} skipped\n",
            report.symbols_requested,
            report.symbols_screened,
            report.skipped.len()
        ));
        out.push_str(&format!("Liquidity zones found: {}\n\n", report.zones_found));

        out.push_str(&format_summary(&report.summary));

        if report.opportunities.is_empty() {
            out.push_str("\nNo opportunities passed validation.\n");
        } else {
            out.push_str("\nOPPORTUNITIES\n");
            for (i, opp) in report.opportunities.iter().enumerate() {
                out.push_str(&format_opportunity(i + 1, opp));
            }
        }

        if !report.rejected.is_empty() {
            out.push_str(&format!("\nREJECTED ({})\n", report.rejected.len()));
            for r in &report.rejected {
                out.push_str(&format!(
                    "  {:<12} {:<24} {}\n",
                    r.opportunity.symbol,
                    r.opportunity.model.to_string(),
                    r.reason
                ));
            }
        }

        if !report.skipped.is_empty() {
            out.push_str(&format!("\nSKIPPED ({})\n", report.skipped.len()));
            for s in &report.skipped {
                out.push_str(&format!("  {:<12} {:?}: {}\n", s.symbol, s.stage, s.reason));
            }
        }
        Ok(out)
    }
}

pub fn format_summary(summary: &ScreeningSummary) -> String {
    let mut out = String::from("SUMMARY\n");
    out.push_str(&format!(
        "  Opportunities: {} ({} direct, {} confirmation; {} long, {} short)\n",
        summary.total, summary.direct, summary.confirmation, summary.long, summary.short
    ));
    if summary.total > 0 {
        out.push_str(&format!(
            "  Avg R:R {:.2}  Avg confluence {:.2}  Avg risk {:.2}%  Avg reward {:.2}%\n",
            summary.avg_risk_reward,
            summary.avg_confluence,
            summary.avg_risk_pct * 100.0,
            summary.avg_reward_pct * 100.0
        ));
    }
    if let Some(best) = &summary.best {
        out.push_str(&format!(
            "  Best: {} {} {} (confluence {:.2}, R:R {:.2})\n",
            best.symbol, best.direction, best.model, best.confluence_score, best.risk_reward
        ));
    }
    out
}

pub fn format_opportunity(rank: usize, opp: &TradingOpportunity) -> String {
    let mut out = format!(
        "\n{}. {} {} via {}\n",
        rank, opp.symbol, opp.direction, opp.model
    );
    out.push_str(&format!(
        "   Entry {:.2}  Stop {:.2}  Target {:.2}\n",
        opp.entry, opp.stop, opp.target
    ));
    out.push_str(&format!(
        "   R:R {:.2}  Risk {:.2}%  Reward {:.2}%  Confluence {:.2}\n",
        opp.risk_reward,
        opp.risk_pct() * 100.0,
        opp.reward_pct() * 100.0,
        opp.confluence_score
    ));
    if !opp.confirmations.is_empty() {
        out.push_str(&format!("   Confirmations: {}\n", opp.confirmations.join(", ")));
    }
    for note in &opp.notes {
        out.push_str(&format!("   Note: {}\n", note));
    }
    for tf in &opp.timeframes {
        out.push_str(&format!(
            "   [{}] trend {} quality {} close {:.2} volume {}\n",
            tf.timeframe,
            tf.trend.map_or("n/a".to_string(), |t| t.to_string()),
            tf.quality.map_or("n/a".to_string(), |q| q.to_string()),
            tf.last_close,
            tf.volume_trend
                .map_or("n/a".to_string(), |v| format!("{:?}", v).to_lowercase())
        ));
    }
    out
}

fn format_analysis(analysis: &StructureAnalysis) -> String {
    let mut out = format!("\n[{}]\n", analysis.timeframe);
    match &analysis.structure {
        Ok(s) => out.push_str(&format!(
            "  Structure: {} trend, {} quality, volatility {:.4}, {} swings, {} pullbacks\n",
            s.trend,
            s.quality,
            s.volatility,
            s.swings.len(),
            s.pullbacks.len()
        )),
        Err(e) => out.push_str(&format!("  Structure: {}\n", e)),
    }
    match &analysis.trendlines {
        Ok(lines) if lines.is_empty() => out.push_str("  Trendlines: none\n"),
        Ok(lines) => {
            out.push_str("  Trendlines:\n");
            for line in lines.iter().take(5) {
                out.push_str(&format!(
                    "    {:<10} {:?} touches {} strength {:.2} now {:.2}\n",
                    line.role.as_str(),
                    line.direction,
                    line.touches,
                    line.strength,
                    line.current_level
                ));
            }
        }
        Err(e) => out.push_str(&format!("  Trendlines: {}\n", e)),
    }
    match &analysis.levels {
        Ok(levels) if levels.is_empty() => out.push_str("  Levels: none\n"),
        Ok(levels) => {
            out.push_str("  Levels:\n");
            for level in levels.iter().take(8) {
                let sources: Vec<String> = level
                    .sources
                    .iter()
                    .map(|s| format!("{:?}", s).to_lowercase())
                    .collect();
                out.push_str(&format!(
                    "    {:>10.2} strength {:.1} touches {} ({})\n",
                    level.price,
                    level.strength,
                    level.touches,
                    sources.join(", ")
                ));
            }
        }
        Err(e) => out.push_str(&format!("  Levels: {}\n", e)),
    }
    match &analysis.fibonacci {
        Ok(fib) => {
            let levels: Vec<String> = fib
                .levels
                .iter()
                .map(|l| format!("{}={:.2}", l.ratio, l.price))
                .collect();
            out.push_str(&format!(
                "  Fibonacci {:.2}..{:.2}: {}\n",
                fib.swing_low,
                fib.swing_high,
                levels.join(" ")
            ));
        }
        Err(e) => out.push_str(&format!("  Fibonacci: {}\n", e)),
    }
    out
}

/// Full single-symbol printout: structure per timeframe, zones, then
/// accepted and rejected opportunities.
pub fn format_screening(screening: &SymbolScreening) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str(&format!(
        "{}  current price {:.2}\n",
        screening.symbol, screening.current_price
    ));
    out.push_str(RULE);

    for analysis in &screening.analyses {
        out.push_str(&format_analysis(analysis));
    }

    if screening.zones.is_empty() {
        out.push_str("\nZones: none\n");
    } else {
        out.push_str("\nZONES\n");
        for zone in &screening.zones {
            out.push_str(&format!(
                "  {:>10.2} {:?} [{:.2} .. {:.2}] score {:.2} distance {:.2}% : {}\n",
                zone.price,
                zone.kind,
                zone.lower_edge(),
                zone.upper_edge(),
                zone.score,
                zone.distance * 100.0,
                zone.tags().join(", ")
            ));
        }
    }

    if screening.accepted.is_empty() {
        out.push_str("\nNo opportunities passed validation.\n");
    } else {
        out.push_str("\nOPPORTUNITIES\n");
        for (i, opp) in screening.accepted.iter().enumerate() {
            out.push_str(&format_opportunity(i + 1, opp));
        }
    }
    for r in &screening.rejected {
        out.push_str(&format!(
            "\nRejected {} {} at {:.2}: {}\n",
            r.opportunity.direction, r.opportunity.model, r.opportunity.entry, r.reason
        ));
    }
    out
}
