//! Liquidity zones: price areas where independent structure confirms.
//!
//! Each candidate price is checked by a set of independent predicates, one
//! per [`ConfirmationCategory`]. Their results are folded into a
//! [`ConfluenceTally`] that holds at most one confirmation per category, so
//! a zone's confirmation count is always the number of distinct categories
//! that agree on it.

use crate::domain::config::AnalysisConfig;
use crate::domain::stats::near;
use crate::domain::structure::{
    FibLevel, Level, StructureAnalysis, Trendline, high_volume_bars, round_number_step,
};
use crate::domain::timeseries::{MarketData, Timeframe};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationCategory {
    Trendline,
    Level,
    Fibonacci,
    Volume,
    RoundNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirmation {
    pub category: ConfirmationCategory,
    pub tag: String,
    pub weight: f64,
}

/// At most one confirmation per category. Re-adding a category keeps the
/// heavier of the two.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfluenceTally {
    entries: BTreeMap<ConfirmationCategory, Confirmation>,
}

impl ConfluenceTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, confirmation: Confirmation) {
        match self.entries.get(&confirmation.category) {
            Some(existing) if existing.weight >= confirmation.weight => {}
            _ => {
                self.entries.insert(confirmation.category, confirmation);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn score(&self) -> f64 {
        self.entries.values().map(|c| c.weight).sum()
    }

    pub fn contains(&self, category: ConfirmationCategory) -> bool {
        self.entries.contains_key(&category)
    }

    pub fn into_confirmations(self) -> Vec<Confirmation> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<Confirmation> for ConfluenceTally {
    fn from_iter<I: IntoIterator<Item = Confirmation>>(iter: I) -> Self {
        let mut tally = ConfluenceTally::new();
        for c in iter {
            tally.add(c);
        }
        tally
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityZone {
    pub price: f64,
    pub kind: ZoneKind,
    /// Half-width of the zone as a fraction of its price.
    pub width: f64,
    pub confirmations: Vec<Confirmation>,
    pub score: f64,
    /// `|price - current| / current` at build time.
    pub distance: f64,
    /// Projected trendline levels that confirm the zone.
    pub anchors: Vec<f64>,
}

impl LiquidityZone {
    pub fn lower_edge(&self) -> f64 {
        self.price * (1.0 - self.width)
    }

    pub fn upper_edge(&self) -> f64 {
        self.price * (1.0 + self.width)
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    pub fn tags(&self) -> Vec<String> {
        self.confirmations.iter().map(|c| c.tag.clone()).collect()
    }
}

/// Structure gathered from the zone timeframes, borrowed from the analyses.
#[derive(Debug, Clone, Default)]
pub struct ZoneEvidence<'a> {
    pub trendlines: Vec<(Timeframe, &'a Trendline)>,
    pub levels: Vec<(Timeframe, &'a Level)>,
    pub fibs: Vec<(Timeframe, FibLevel)>,
    /// Highs and lows of high-volume daily bars.
    pub volume_prices: Vec<f64>,
    pub round_step: f64,
}

impl<'a> ZoneEvidence<'a> {
    pub fn collect(
        market: &MarketData,
        analyses: &'a [StructureAnalysis],
        current: f64,
        cfg: &AnalysisConfig,
    ) -> Self {
        let mut evidence = ZoneEvidence {
            round_step: round_number_step(current),
            ..ZoneEvidence::default()
        };

        for analysis in analyses
            .iter()
            .filter(|a| cfg.zone_timeframes.contains(&a.timeframe))
        {
            let tf = analysis.timeframe;
            evidence.trendlines.extend(
                analysis
                    .trendline_slice()
                    .iter()
                    .take(cfg.zone_trendline_count)
                    .map(|l| (tf, l)),
            );
            evidence.levels.extend(
                analysis
                    .level_slice()
                    .iter()
                    .take(cfg.zone_level_count)
                    .map(|l| (tf, l)),
            );
            evidence
                .fibs
                .extend(analysis.fib_slice().iter().map(|f| (tf, *f)));
        }

        if let Some(daily) = market.daily() {
            let bars = daily.bars();
            for i in high_volume_bars(daily, cfg) {
                evidence.volume_prices.push(bars[i].high);
                evidence.volume_prices.push(bars[i].low);
            }
        }
        evidence
    }

    /// Structural prices worth testing as zone centres.
    fn structural_prices(&self) -> Vec<f64> {
        self.levels
            .iter()
            .map(|(_, l)| l.price)
            .chain(self.trendlines.iter().map(|(_, t)| t.current_level))
            .chain(self.fibs.iter().map(|(_, f)| f.price))
            .collect()
    }
}

pub fn trendline_confirmation(
    price: f64,
    evidence: &ZoneEvidence<'_>,
    cfg: &AnalysisConfig,
) -> Option<Confirmation> {
    evidence
        .trendlines
        .iter()
        .filter(|(_, line)| near(price, line.current_level, cfg.zone_trendline_tolerance))
        .max_by(|a, b| a.1.strength.total_cmp(&b.1.strength))
        .map(|(tf, line)| Confirmation {
            category: ConfirmationCategory::Trendline,
            tag: format!("trendline:{}:{}", tf, line.role.as_str()),
            weight: 2.0 * line.strength,
        })
}

pub fn level_confirmation(
    price: f64,
    evidence: &ZoneEvidence<'_>,
    cfg: &AnalysisConfig,
) -> Option<Confirmation> {
    evidence
        .levels
        .iter()
        .filter(|(_, level)| near(price, level.price, cfg.zone_level_tolerance))
        .max_by(|a, b| a.1.strength.total_cmp(&b.1.strength))
        .map(|(tf, level)| Confirmation {
            category: ConfirmationCategory::Level,
            tag: format!("level:{}:{:.2}", tf, level.price),
            weight: level.strength,
        })
}

pub fn fibonacci_confirmation(
    price: f64,
    evidence: &ZoneEvidence<'_>,
    cfg: &AnalysisConfig,
) -> Option<Confirmation> {
    evidence
        .fibs
        .iter()
        .find(|(_, fib)| near(price, fib.price, cfg.zone_fib_tolerance))
        .map(|(tf, fib)| Confirmation {
            category: ConfirmationCategory::Fibonacci,
            tag: format!("fib_{}:{}", fib.ratio, tf),
            weight: 2.0,
        })
}

pub fn volume_confirmation(
    price: f64,
    evidence: &ZoneEvidence<'_>,
    cfg: &AnalysisConfig,
) -> Option<Confirmation> {
    evidence
        .volume_prices
        .iter()
        .any(|&p| near(price, p, cfg.zone_volume_tolerance))
        .then(|| Confirmation {
            category: ConfirmationCategory::Volume,
            tag: "volume".to_string(),
            weight: 1.0,
        })
}

pub fn round_number_confirmation(
    price: f64,
    evidence: &ZoneEvidence<'_>,
    cfg: &AnalysisConfig,
) -> Option<Confirmation> {
    let step = evidence.round_step;
    if step <= 0.0 {
        return None;
    }
    let round = (price / step).round() * step;
    (round > 0.0 && near(price, round, cfg.zone_round_tolerance)).then(|| Confirmation {
        category: ConfirmationCategory::RoundNumber,
        tag: format!("round_number:{}", round),
        weight: 1.0,
    })
}

/// Runs every predicate on one candidate and builds the zone if it clears
/// both thresholds.
pub fn evaluate_candidate(
    price: f64,
    current: f64,
    evidence: &ZoneEvidence<'_>,
    cfg: &AnalysisConfig,
) -> Option<LiquidityZone> {
    let predicates: [fn(f64, &ZoneEvidence<'_>, &AnalysisConfig) -> Option<Confirmation>; 5] = [
        trendline_confirmation,
        level_confirmation,
        fibonacci_confirmation,
        volume_confirmation,
        round_number_confirmation,
    ];
    let tally: ConfluenceTally = predicates
        .iter()
        .filter_map(|p| p(price, evidence, cfg))
        .collect();

    if tally.count() < cfg.min_confirmations || tally.score() < cfg.min_confluence_score {
        debug!(
            price,
            confirmations = tally.count(),
            score = tally.score(),
            "zone candidate below threshold"
        );
        return None;
    }

    let anchors = evidence
        .trendlines
        .iter()
        .map(|(_, line)| line.current_level)
        .filter(|&level| near(price, level, cfg.zone_trendline_tolerance))
        .collect();

    Some(LiquidityZone {
        price,
        kind: if price <= current {
            ZoneKind::Support
        } else {
            ZoneKind::Resistance
        },
        width: cfg.zone_width,
        score: tally.score(),
        confirmations: tally.into_confirmations(),
        distance: (price - current).abs() / current,
        anchors,
    })
}

/// Candidate centres: deduplicated structural prices plus the percentage
/// grid around the current price, all within `zone_range`.
pub fn candidate_prices(current: f64, evidence: &ZoneEvidence<'_>, cfg: &AnalysisConfig) -> Vec<f64> {
    let in_range = |p: f64| {
        p.is_finite() && p > 0.0 && (p - current).abs() / current <= cfg.zone_range + 1e-12
    };

    let mut structural: Vec<f64> = evidence
        .structural_prices()
        .into_iter()
        .filter(|&p| in_range(p))
        .collect();
    structural.sort_by(f64::total_cmp);

    let mut candidates: Vec<f64> = Vec::with_capacity(structural.len());
    for p in structural {
        if !candidates
            .last()
            .is_some_and(|&kept| near(kept, p, cfg.level_merge_tolerance))
        {
            candidates.push(p);
        }
    }

    let grid: Vec<f64> = cfg
        .zone_offsets
        .iter()
        .filter(|&&pct| pct > 0.0 && pct <= cfg.zone_range)
        .flat_map(|&pct| [current * (1.0 - pct), current * (1.0 + pct)])
        .filter(|&p| {
            in_range(p)
                && !candidates
                    .iter()
                    .any(|&s| near(s, p, cfg.level_merge_tolerance))
        })
        .collect();

    candidates.extend(grid);
    candidates
}

/// Ranked zones for one symbol.
///
/// Only analyses whose timeframe is listed in `zone_timeframes` contribute.
/// Ordering is score, then confirmation count (both desc), then distance
/// and price (asc).
pub fn build_zones(
    market: &MarketData,
    analyses: &[StructureAnalysis],
    cfg: &AnalysisConfig,
) -> Vec<LiquidityZone> {
    let Some(current) = market.current_price() else {
        return Vec::new();
    };
    let evidence = ZoneEvidence::collect(market, analyses, current, cfg);

    let mut zones: Vec<LiquidityZone> = candidate_prices(current, &evidence, cfg)
        .into_iter()
        .filter_map(|price| evaluate_candidate(price, current, &evidence, cfg))
        .collect();

    zones.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.confirmation_count().cmp(&a.confirmation_count()))
            .then(a.distance.total_cmp(&b.distance))
            .then(a.price.total_cmp(&b.price))
    });
    zones.truncate(cfg.max_zones);
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::structure::{LevelSource, LineDirection, Pivot, PivotKind, TrendlineRole};
    use approx::assert_relative_eq;

    fn line(level: f64, strength: f64) -> Trendline {
        let pivot = Pivot {
            index: 0,
            price: level,
            kind: PivotKind::Low,
        };
        Trendline {
            role: TrendlineRole::Support,
            start: pivot,
            end: Pivot { index: 10, ..pivot },
            slope: 0.0,
            intercept: level,
            touches: 3,
            span: 10,
            strength,
            direction: LineDirection::Horizontal,
            current_level: level,
        }
    }

    fn conf(category: ConfirmationCategory, weight: f64) -> Confirmation {
        Confirmation {
            category,
            tag: format!("{:?}", category),
            weight,
        }
    }

    #[test]
    fn tally_counts_categories_once() {
        let mut tally = ConfluenceTally::new();
        tally.add(conf(ConfirmationCategory::Level, 1.0));
        tally.add(conf(ConfirmationCategory::Level, 3.0));
        tally.add(conf(ConfirmationCategory::Level, 2.0));
        tally.add(conf(ConfirmationCategory::Volume, 1.0));
        assert_eq!(tally.count(), 2);
        assert_relative_eq!(tally.score(), 4.0);
        assert!(tally.contains(ConfirmationCategory::Level));
        assert!(!tally.contains(ConfirmationCategory::Fibonacci));
    }

    #[test]
    fn zone_built_when_thresholds_met() {
        let support = line(95.0, 0.8);
        let level = Level::new(95.5, 3.0, LevelSource::Pivot);
        let evidence = ZoneEvidence {
            trendlines: vec![(Timeframe::Daily, &support)],
            levels: vec![(Timeframe::Weekly, &level)],
            fibs: vec![(
                Timeframe::Daily,
                FibLevel {
                    ratio: 0.618,
                    price: 95.2,
                },
            )],
            volume_prices: vec![140.0],
            round_step: 10.0,
        };
        let cfg = AnalysisConfig::default();
        let zone = evaluate_candidate(95.0, 100.0, &evidence, &cfg).unwrap();

        assert_eq!(zone.kind, ZoneKind::Support);
        assert_eq!(zone.confirmation_count(), 3);
        // trendline 1.6 + level 3 + fib 2
        assert_relative_eq!(zone.score, 6.6, epsilon = 1e-9);
        assert_relative_eq!(zone.distance, 0.05, epsilon = 1e-12);
        assert_eq!(zone.anchors, vec![95.0]);
        assert!(zone.tags().contains(&"trendline:daily:support".to_string()));
        assert!(zone.lower_edge() < 95.0 && zone.upper_edge() > 95.0);
    }

    #[test]
    fn zone_rejected_below_min_confirmations() {
        let level = Level::new(105.0, 9.0, LevelSource::HistoricalExtreme);
        let evidence = ZoneEvidence {
            levels: vec![(Timeframe::Daily, &level)],
            volume_prices: vec![105.0],
            round_step: 10.0,
            ..ZoneEvidence::default()
        };
        assert!(evaluate_candidate(105.0, 100.0, &evidence, &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn zone_above_price_is_resistance() {
        let level = Level::new(110.0, 2.0, LevelSource::Pivot);
        let evidence = ZoneEvidence {
            levels: vec![(Timeframe::Daily, &level)],
            fibs: vec![(
                Timeframe::Daily,
                FibLevel {
                    ratio: 0.5,
                    price: 110.5,
                },
            )],
            volume_prices: vec![109.0],
            round_step: 10.0,
            ..ZoneEvidence::default()
        };
        let zone = evaluate_candidate(110.0, 100.0, &evidence, &AnalysisConfig::default()).unwrap();
        assert_eq!(zone.kind, ZoneKind::Resistance);
        // level, fib, volume, round number
        assert_eq!(zone.confirmation_count(), 4);
        assert_relative_eq!(zone.score, 6.0);
    }

    #[test]
    fn grid_candidates_skip_structural_neighbours() {
        let level = Level::new(98.5, 1.0, LevelSource::Pivot);
        let evidence = ZoneEvidence {
            levels: vec![(Timeframe::Daily, &level)],
            round_step: 10.0,
            ..ZoneEvidence::default()
        };
        let candidates = candidate_prices(100.0, &evidence, &AnalysisConfig::default());
        assert_relative_eq!(candidates[0], 98.5);
        // 99 and 98 are within 2% of 98.5, 101 is not
        assert!(!candidates.iter().any(|&p| (p - 99.0).abs() < 1e-9));
        assert!(!candidates.iter().any(|&p| (p - 98.0).abs() < 1e-9));
        assert!(candidates.iter().any(|&p| (p - 101.0).abs() < 1e-9));
        assert!(candidates.iter().all(|&p| (p - 100.0).abs() / 100.0 <= 0.15 + 1e-12));
    }

    #[test]
    fn out_of_range_structure_is_ignored() {
        let far = Level::new(150.0, 5.0, LevelSource::Pivot);
        let evidence = ZoneEvidence {
            levels: vec![(Timeframe::Daily, &far)],
            round_step: 10.0,
            ..ZoneEvidence::default()
        };
        let candidates = candidate_prices(100.0, &evidence, &AnalysisConfig::default());
        assert!(!candidates.iter().any(|&p| (p - 150.0).abs() < 1e-9));
        assert_eq!(candidates.len(), 14);
    }
}
