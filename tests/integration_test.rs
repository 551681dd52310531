//! End-to-end tests of the screening pipeline.
//!
//! Tests cover:
//! - Uptrend analysis (structure, zones, no break/retest candidates)
//! - Break, retest and rejection on the confirmation timeframe
//! - Risk validation at the boundaries
//! - Batch screening with MockDataPort (partial failures, ordering)
//! - Report rendering of a batch run

mod common;

use approx::assert_relative_eq;
use common::*;
use std::collections::HashSet;
use zonescan::domain::config::{AnalysisConfig, ScreenerConfig, TradingConfig};
use zonescan::domain::confluence::{LiquidityZone, ZoneKind};
use zonescan::domain::entry::{
    ConfirmationView, EntryContext, RetestState, evaluate_entries, evaluate_retest,
};
use zonescan::domain::error::ScreenerError;
use zonescan::domain::opportunity::{EntryModel, TradeDirection, TradingOpportunity};
use zonescan::domain::pipeline::screen_symbol;
use zonescan::domain::structure::{
    LineDirection, StructureQuality, Trend, TrendlineRole, detect_trendlines,
};
use zonescan::domain::timeseries::{MarketData, Timeframe};
use zonescan::domain::universe::{SkipStage, UniverseError, screen_universe};
use zonescan::domain::validator::{RejectionReason, validate};

mod uptrend_scenario {
    use super::*;

    fn market() -> MarketData {
        MarketData::new("ALPHA")
            .with_series(series(
                Timeframe::Daily,
                rising_with_wicks(Timeframe::Daily, 60, 100_000),
            ))
            .with_series(series(
                Timeframe::Hourly,
                rising_with_wicks(Timeframe::Hourly, 60, 100_000),
            ))
    }

    #[test]
    fn daily_structure_is_bullish_with_ascending_support() {
        let screening = screen_symbol(&market(), &ScreenerConfig::default(), now()).unwrap();
        let daily = screening.analysis(Timeframe::Daily).unwrap();

        assert_eq!(daily.trend(), Some(Trend::Bullish));
        assert!(daily.trendline_slice().iter().any(|l| {
            l.role == TrendlineRole::Support
                && l.direction == LineDirection::Ascending
                && l.touches >= 2
        }));
    }

    #[test]
    fn produces_no_break_and_retest_candidates() {
        let screening = screen_symbol(&market(), &ScreenerConfig::default(), now()).unwrap();
        let model2 = screening
            .accepted
            .iter()
            .chain(screening.rejected.iter().map(|r| &r.opportunity))
            .filter(|o| o.model == EntryModel::Confirmation)
            .count();
        assert_eq!(model2, 0);
    }

    #[test]
    fn zones_satisfy_confirmation_minimum_with_distinct_categories() {
        let config = ScreenerConfig::default();
        let screening = screen_symbol(&market(), &config, now()).unwrap();

        assert!(screening.zones.len() <= config.analysis.max_zones);
        for zone in &screening.zones {
            assert!(zone.confirmation_count() >= config.analysis.min_confirmations);
            assert!(zone.score >= config.analysis.min_confluence_score - 1e-9);
            let categories: HashSet<_> = zone.confirmations.iter().map(|c| c.category).collect();
            assert_eq!(categories.len(), zone.confirmations.len());
            match zone.kind {
                ZoneKind::Support => assert!(zone.price <= screening.current_price),
                ZoneKind::Resistance => assert!(zone.price > screening.current_price),
            }
        }
    }

    #[test]
    fn every_accepted_opportunity_passes_risk_limits() {
        let config = ScreenerConfig::default();
        let screening = screen_symbol(&market(), &config, now()).unwrap();
        for opp in &screening.accepted {
            assert!(opp.sides_valid());
            assert!(opp.risk_reward + 1e-9 >= config.trading.min_risk_reward);
            assert!(opp.risk_pct() <= config.trading.max_risk_pct + 1e-9);
            assert_eq!(opp.created_at, now());
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let config = ScreenerConfig::default();
        let a = screen_symbol(&market(), &config, now()).unwrap();
        let b = screen_symbol(&market(), &config, now()).unwrap();
        assert_eq!(a.zones, b.zones);
        assert_eq!(a.accepted, b.accepted);
    }
}

mod break_and_retest_scenario {
    use super::*;

    fn support_zone() -> LiquidityZone {
        LiquidityZone {
            price: 104.5,
            kind: ZoneKind::Support,
            width: 0.02,
            confirmations: vec![],
            score: 8.0,
            distance: 0.5 / 105.0,
            anchors: vec![],
        }
    }

    fn view() -> ConfirmationView {
        let hourly = series(Timeframe::Hourly, break_and_retest_hourly());
        let lines = detect_trendlines(&hourly, &AnalysisConfig::default()).unwrap();
        ConfirmationView {
            series: hourly,
            lines,
        }
    }

    fn confirmation_candidates(
        view: &ConfirmationView,
        zone: LiquidityZone,
        trend: Option<Trend>,
    ) -> Vec<TradingOpportunity> {
        let ctx = EntryContext {
            symbol: "BETA",
            current_price: 105.0,
            trend,
            daily: &view.series,
            confirmation: Some(view),
            target_levels: &[],
            timeframes: &[],
            created_at: now(),
        };
        evaluate_entries(&ctx, &[zone], &TradingConfig::default())
            .into_iter()
            .filter(|o| o.model == EntryModel::Confirmation)
            .collect()
    }

    #[test]
    fn descending_resistance_is_detected() {
        let view = view();
        assert!(view.lines.iter().any(|l| {
            l.role == TrendlineRole::Resistance
                && l.direction == LineDirection::Descending
                && l.start.index == 5
                && l.end.index == 45
        }));
    }

    #[test]
    fn state_machine_confirms_on_rejection_bar() {
        let view = view();
        let confirmed: Vec<RetestState> = view
            .lines
            .iter()
            .map(|line| {
                evaluate_retest(
                    line,
                    view.series.bars(),
                    &support_zone(),
                    TradeDirection::Long,
                    &TradingConfig::default(),
                )
            })
            .filter(|s| matches!(s, RetestState::Confirmed { .. }))
            .collect();

        assert!(!confirmed.is_empty());
        for state in confirmed {
            assert_eq!(
                state,
                RetestState::Confirmed {
                    break_index: 50,
                    confirm_index: 53,
                    entry: 105.0
                }
            );
        }
    }

    #[test]
    fn exactly_one_confirmation_candidate() {
        let view = view();
        let candidates = confirmation_candidates(&view, support_zone(), Some(Trend::Bullish));
        assert_eq!(candidates.len(), 1);

        let opp = &candidates[0];
        assert_eq!(opp.direction, TradeDirection::Long);
        assert_relative_eq!(opp.entry, 105.0);
        assert_relative_eq!(opp.stop, 104.5 * 0.98 * 0.995, epsilon = 1e-9);
        assert_relative_eq!(opp.risk_reward, 2.0, epsilon = 1e-9);
        assert_relative_eq!(opp.confluence_score, 9.0);
        assert!(
            opp.confirmations
                .contains(&"trendline_break:resistance".to_string())
        );
    }

    #[test]
    fn confirmation_candidate_passes_validation() {
        let view = view();
        let opp = &confirmation_candidates(&view, support_zone(), Some(Trend::Bullish))[0];
        assert_eq!(
            validate(opp, Some(StructureQuality::High), &TradingConfig::default(), 5.0),
            Ok(())
        );
    }

    #[test]
    fn bearish_trend_blocks_long_retest() {
        let view = view();
        for trend in [Some(Trend::Bearish), Some(Trend::Sideways), None] {
            assert!(confirmation_candidates(&view, support_zone(), trend).is_empty());
        }
    }

    #[test]
    fn distant_zone_is_not_evaluated() {
        let view = view();
        let mut zone = support_zone();
        zone.price = 95.0;
        assert!(confirmation_candidates(&view, zone, Some(Trend::Bullish)).is_empty());
    }

    /// Daily structure supplies the zone, hourly bars supply the break and
    /// the rejection; nothing is built by hand.
    fn market() -> MarketData {
        MarketData::new("BETA")
            .with_series(series(Timeframe::Daily, climbing_daily_with_volume_spike()))
            .with_series(series(Timeframe::Hourly, break_and_retest_hourly()))
    }

    #[test]
    fn daily_structure_yields_one_support_zone_below_the_retest() {
        let screening = screen_symbol(&market(), &ScreenerConfig::default(), now()).unwrap();

        assert_relative_eq!(screening.current_price, 105.0);
        assert_eq!(
            screening.analysis(Timeframe::Daily).unwrap().trend(),
            Some(Trend::Bullish)
        );
        assert_eq!(screening.zones.len(), 1);
        let zone = &screening.zones[0];
        assert_eq!(zone.kind, ZoneKind::Support);
        assert_relative_eq!(zone.price, 104.3 - 6.8 * 0.236, epsilon = 1e-9);
        assert_eq!(zone.confirmation_count(), 3);
    }

    #[test]
    fn screening_produces_one_accepted_retest_entry() {
        let screening = screen_symbol(&market(), &ScreenerConfig::default(), now()).unwrap();
        let zone_price = 104.3 - 6.8 * 0.236;

        let model2: Vec<&TradingOpportunity> = screening
            .accepted
            .iter()
            .chain(screening.rejected.iter().map(|r| &r.opportunity))
            .filter(|o| o.model == EntryModel::Confirmation)
            .collect();
        assert_eq!(model2.len(), 1);
        assert!(screening.rejected.is_empty());
        assert_eq!(screening.accepted.len(), 1);

        let opp = &screening.accepted[0];
        assert_eq!(opp.model, EntryModel::Confirmation);
        assert_eq!(opp.direction, TradeDirection::Long);
        assert_relative_eq!(opp.entry, 105.0);
        assert_relative_eq!(opp.zone_price, zone_price, epsilon = 1e-9);
        assert_relative_eq!(opp.stop, zone_price * 0.98 * 0.995, epsilon = 1e-9);
        assert_relative_eq!(opp.risk_reward, 2.0, epsilon = 1e-9);
        assert_relative_eq!(opp.confluence_score, 11.0, epsilon = 1e-9);
        assert!(
            opp.confirmations
                .contains(&"trendline_break:resistance".to_string())
        );
        assert_eq!(opp.created_at, now());
    }
}

mod risk_validation_scenario {
    use super::*;

    fn long(stop: f64) -> TradingOpportunity {
        TradingOpportunity {
            symbol: "GAMMA".into(),
            model: EntryModel::Direct,
            direction: TradeDirection::Long,
            entry: 100.0,
            stop,
            target: 110.0,
            risk_reward: 10.0 / (100.0 - stop),
            confluence_score: 6.0,
            zone_price: 100.0,
            confirmations: vec![],
            notes: vec![],
            timeframes: vec![],
            created_at: now(),
        }
    }

    #[test]
    fn boundary_trade_is_accepted() {
        let opp = long(95.0);
        assert_relative_eq!(opp.risk_reward, 2.0);
        assert_relative_eq!(opp.risk_pct(), 0.05);
        assert_eq!(validate(&opp, None, &TradingConfig::default(), 5.0), Ok(()));
    }

    #[test]
    fn doubled_risk_is_rejected() {
        let opp = long(90.0);
        assert!(matches!(
            validate(&opp, None, &TradingConfig::default(), 5.0),
            Err(RejectionReason::RiskTooHigh { .. })
        ));
    }
}

mod batch_screening {
    use super::*;

    fn port() -> MockDataPort {
        MockDataPort::new()
            .with_bars(
                "ALPHA",
                Timeframe::Daily,
                rising_with_wicks(Timeframe::Daily, 60, 100_000),
            )
            .with_bars(
                "THIN",
                Timeframe::Daily,
                rising_with_wicks(Timeframe::Daily, 60, 1_000),
            )
            .with_error("BROKEN", "connection reset")
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn failures_are_isolated_per_symbol() {
        let report = screen_universe(
            &port(),
            &symbols(&["ALPHA", "THIN", "BROKEN", "MISSING"]),
            &ScreenerConfig::default(),
            now(),
        )
        .unwrap();

        assert_eq!(report.symbols_requested, 4);
        assert_eq!(report.symbols_screened, 1);
        let skipped: Vec<(&str, SkipStage)> = report
            .skipped
            .iter()
            .map(|s| (s.symbol.as_str(), s.stage))
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("BROKEN", SkipStage::Load),
                ("MISSING", SkipStage::Load),
                ("THIN", SkipStage::Prescreen),
            ]
        );
        assert_eq!(report.skipped[1].reason, "daily data unavailable for MISSING");
    }

    #[test]
    fn prescreen_can_be_disabled() {
        let mut config = ScreenerConfig::default();
        config.prescreen.enabled = false;
        let report =
            screen_universe(&port(), &symbols(&["ALPHA", "THIN"]), &config, now()).unwrap();
        assert_eq!(report.symbols_screened, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn opportunities_are_ordered_by_confluence() {
        let mut config = ScreenerConfig::default();
        config.prescreen.enabled = false;
        let report =
            screen_universe(&port(), &symbols(&["ALPHA", "THIN"]), &config, now()).unwrap();
        for pair in report.opportunities.windows(2) {
            assert!(pair[0].confluence_score >= pair[1].confluence_score);
        }
        assert_eq!(report.summary.total, report.opportunities.len());
    }

    #[test]
    fn batch_output_is_deterministic() {
        let mut config = ScreenerConfig::default();
        config.prescreen.enabled = false;
        let list = symbols(&["THIN", "ALPHA"]);
        let a = screen_universe(&port(), &list, &config, now()).unwrap();
        let b = screen_universe(&port(), &list, &config, now()).unwrap();
        assert_eq!(a.opportunities, b.opportunities);
        assert_eq!(a.zones_found, b.zones_found);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn all_symbols_failing_is_an_error() {
        let result = screen_universe(
            &port(),
            &symbols(&["BROKEN", "MISSING"]),
            &ScreenerConfig::default(),
            now(),
        );
        assert!(matches!(
            result,
            Err(ScreenerError::Universe(UniverseError::AllSymbolsFailed))
        ));
    }

    #[test]
    fn empty_universe_is_an_error() {
        let result = screen_universe(&port(), &[], &ScreenerConfig::default(), now());
        assert!(matches!(
            result,
            Err(ScreenerError::Universe(UniverseError::Empty))
        ));
    }
}

mod report_generation {
    use super::*;
    use zonescan::adapters::json_report_adapter::JsonReportAdapter;
    use zonescan::adapters::text_report_adapter::TextReportAdapter;
    use zonescan::ports::report_port::ReportPort;

    #[test]
    fn batch_report_renders_in_both_formats() {
        let port = MockDataPort::new()
            .with_bars(
                "ALPHA",
                Timeframe::Daily,
                rising_with_wicks(Timeframe::Daily, 60, 100_000),
            )
            .with_error("BROKEN", "timeout");
        let report = screen_universe(
            &port,
            &["ALPHA".to_string(), "BROKEN".to_string()],
            &ScreenerConfig::default(),
            now(),
        )
        .unwrap();

        let text = TextReportAdapter::new().render(&report).unwrap();
        assert!(text.contains("Symbols: 2 requested, 1 screened, 1 skipped"));
        assert!(text.contains("BROKEN"));

        let json = JsonReportAdapter::new().render(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["symbols_requested"], 2);
        assert_eq!(value["skipped"][0]["symbol"], "BROKEN");
        assert_eq!(value["skipped"][0]["stage"], "load");
    }
}
