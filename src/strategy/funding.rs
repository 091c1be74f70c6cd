//! Supplemental to the distilled feature list (SPEC_FULL.md §4.7.1): a
//! read-only funding-rate opportunity scanner used by operator tooling to
//! shortlist candidate symbols before calling into the Orchestrator.

use super::constants::APR_MULTIPLIER;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FundingOpportunity {
    pub symbol: String,
    pub mean_funding_rate: Decimal,
    pub apr_pct: Decimal,
    pub coefficient_of_variation: Option<Decimal>,
}

/// For each `(symbol, recent funding rate samples)` pair, computes the mean
/// rate's annualized APR and the coefficient of variation across the
/// samples (`stddev / |mean|`; `None`/treated as infinite when the mean is
/// zero). Keeps symbols clearing `min_apr_pct` with volatility at or below
/// `max_volatility_pct`, sorted by descending APR.
pub fn analyze_funding_opportunities(
    samples: &[(String, Vec<Decimal>)],
    min_apr_pct: Decimal,
    max_volatility_pct: Decimal,
) -> Vec<FundingOpportunity> {
    let mut opportunities: Vec<FundingOpportunity> = samples
        .iter()
        .filter_map(|(symbol, rates)| {
            if rates.is_empty() {
                return None;
            }
            let count = Decimal::from(rates.len() as i64);
            let mean = rates.iter().copied().sum::<Decimal>() / count;
            let apr_pct = mean * APR_MULTIPLIER;

            let cv = if mean.is_zero() {
                None
            } else {
                let variance = rates
                    .iter()
                    .map(|r| {
                        let diff = *r - mean;
                        diff * diff
                    })
                    .sum::<Decimal>()
                    / count;
                let stddev = sqrt_decimal(variance);
                Some((stddev / mean.abs()) * Decimal::ONE_HUNDRED)
            };

            Some(FundingOpportunity {
                symbol: symbol.clone(),
                mean_funding_rate: mean,
                apr_pct,
                coefficient_of_variation: cv,
            })
        })
        .filter(|opportunity| {
            let volatility_ok = match opportunity.coefficient_of_variation {
                Some(cv) => cv <= max_volatility_pct,
                None => false,
            };
            opportunity.apr_pct >= min_apr_pct && volatility_ok
        })
        .collect();

    opportunities.sort_by(|a, b| b.apr_pct.cmp(&a.apr_pct));
    opportunities
}

/// `Decimal` has no native sqrt; Newton's method converges in a handful of
/// iterations for the magnitudes funding-rate variance ever takes.
fn sqrt_decimal(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = value;
    for _ in 0..50 {
        let next = (guess + value / guess) / Decimal::TWO;
        if (next - guess).abs() < Decimal::new(1, 12) {
            return next;
        }
        guess = next;
    }
    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stable_positive_funding_rate_clears_threshold() {
        let samples = vec![("BTCUSDT".to_string(), vec![dec!(0.0001), dec!(0.0001), dec!(0.0001)])];
        let opportunities = analyze_funding_opportunities(&samples, dec!(1), dec!(50));
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].coefficient_of_variation, Some(dec!(0)));
    }

    #[test]
    fn volatile_funding_rate_is_excluded() {
        let samples = vec![("ETHUSDT".to_string(), vec![dec!(0.001), dec!(-0.001), dec!(0.002)])];
        let opportunities = analyze_funding_opportunities(&samples, dec!(-1000), dec!(10));
        assert!(opportunities.is_empty());
    }

    #[test]
    fn results_sorted_descending_by_apr() {
        let samples = vec![
            ("ETHUSDT".to_string(), vec![dec!(-0.0002), dec!(-0.0002)]),
            ("BTCUSDT".to_string(), vec![dec!(0.0001), dec!(0.0001)]),
        ];
        let opportunities = analyze_funding_opportunities(&samples, dec!(-10000), dec!(1000));
        assert_eq!(opportunities[0].symbol, "BTCUSDT");
        assert_eq!(opportunities[1].symbol, "ETHUSDT");
    }
}
