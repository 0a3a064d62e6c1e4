use super::types::{Recommendation, TechnicalLabel};
use serde::{Deserialize, Serialize};

/// Thresholds turning predictions and indicators into a verdict.
///
/// Defaults are the compatibility values and must not drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub overbought_above: f64,
    pub oversold_below: f64,
    pub variation_threshold_pct: f64,
    pub variation_weight: i32,
    pub oversold_weight: i32,
    pub valuation_ceiling: f64,
    pub valuation_penalty: i32,
    pub buy_at_or_above: i32,
    pub sell_at_or_below: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            overbought_above: 70.0,
            oversold_below: 35.0,
            variation_threshold_pct: 1.5,
            variation_weight: 2,
            oversold_weight: 2,
            valuation_ceiling: 100.0,
            valuation_penalty: 2,
            buy_at_or_above: 2,
            sell_at_or_below: -2,
        }
    }
}

impl ScoringPolicy {
    pub fn technical_label(&self, oscillator: f64) -> TechnicalLabel {
        if oscillator > self.overbought_above {
            TechnicalLabel::Overbought
        } else if oscillator < self.oversold_below {
            TechnicalLabel::Oversold
        } else {
            TechnicalLabel::Neutral
        }
    }

    /// Integer score from predicted variation, oscillator and valuation.
    pub fn composite_score(&self, variation_pct: f64, oscillator: f64, valuation: f64) -> i32 {
        let mut score = 0;
        if variation_pct > self.variation_threshold_pct {
            score += self.variation_weight;
        }
        if variation_pct < -self.variation_threshold_pct {
            score -= self.variation_weight;
        }
        if oscillator < self.oversold_below {
            score += self.oversold_weight;
        }
        if valuation > self.valuation_ceiling {
            score -= self.valuation_penalty;
        }
        score
    }

    pub fn recommendation(&self, score: i32) -> Recommendation {
        if score >= self.buy_at_or_above {
            Recommendation::Buy
        } else if score <= self.sell_at_or_below {
            Recommendation::Sell
        } else {
            Recommendation::Neutral
        }
    }
}
