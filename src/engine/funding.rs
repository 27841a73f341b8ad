//! Funding-rate risk assessment.

use super::levels::RiskLevel;
use crate::domain::OrderSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Outcome of a funding-risk check for a proposed position.
#[derive(Debug, Clone)]
pub struct FundingAssessment {
    pub level: RiskLevel,
    pub message: String,
}

/// Assesses funding cost risk for a position side.
///
/// A position pays funding when it is long with a positive rate or short
/// with a negative rate. Paying positions classify Critical above the
/// threshold, High above half of it, Low otherwise. Missing data is Low;
/// the check never blocks on it.
pub fn assess(rate: Option<Decimal>, side: OrderSide, threshold: Decimal) -> FundingAssessment {
    let Some(rate) = rate else {
        return FundingAssessment {
            level: RiskLevel::Low,
            message: "No funding data".to_string(),
        };
    };

    let pays_funding = (side.is_long() && rate > Decimal::ZERO)
        || (!side.is_long() && rate < Decimal::ZERO);

    if pays_funding {
        if rate.abs() > threshold {
            return FundingAssessment {
                level: RiskLevel::Critical,
                message: format!("High funding cost: {:.3}%", rate * dec!(100)),
            };
        }
        if rate.abs() > threshold * dec!(0.5) {
            return FundingAssessment {
                level: RiskLevel::High,
                message: format!("Moderate funding cost: {:.3}%", rate * dec!(100)),
            };
        }
    }

    FundingAssessment {
        level: RiskLevel::Low,
        message: "Low funding risk".to_string(),
    }
}
