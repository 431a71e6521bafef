//! Price normalization.
//!
//! Every venue quotes in its own convention. This module reduces each of them
//! to a share price `p` in (0, 1) plus the per-share profit on a win and on a
//! loss for a long position paying 1 when the outcome occurs:
//! `win = 1 - p`, `lose = -p`. Venue fee models adjust those two numbers and
//! leave `p` untouched.
//!
//! # Examples
//!
//! ```
//! use linesman::domain::price::{normalize, PriceFormat};
//! use rust_decimal_macros::dec;
//!
//! let price = normalize(dec!(55), PriceFormat::Cents).unwrap();
//! assert_eq!(price.share_price, dec!(0.55));
//! assert_eq!(price.win_pnl, dec!(0.45));
//! assert_eq!(price.lose_pnl, dec!(-0.55));
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Price representation, kept as `Decimal` end to end.
pub type Price = Decimal;

/// How a venue expresses a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormat {
    /// Share price in (0, 1).
    #[serde(alias = "share_0_1")]
    Probability,
    /// Share price in cents, (0, 100).
    Cents,
    /// Decimal (European) odds, > 1.
    Decimal,
    /// American moneyline odds, |x| >= 100.
    American,
}

impl PriceFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Probability => "probability",
            Self::Cents => "cents",
            Self::Decimal => "decimal",
            Self::American => "american",
        }
    }
}

impl fmt::Display for PriceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "probability" | "share_0_1" => Ok(Self::Probability),
            "cents" => Ok(Self::Cents),
            "decimal" => Ok(Self::Decimal),
            "american" => Ok(Self::American),
            other => Err(DomainError::InvalidValue {
                field: "price_format",
                value: other.to_string(),
            }),
        }
    }
}

/// A venue price reduced to share-price form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPrice {
    pub share_price: Price,
    /// Profit per share if the outcome occurs.
    pub win_pnl: Price,
    /// Profit per share if it does not (negative).
    pub lose_pnl: Price,
}

impl NormalizedPrice {
    /// Cash paid per share, including fees charged up front.
    #[must_use]
    pub fn effective_cost(&self) -> Price {
        -self.lose_pnl
    }

    /// Cash returned per share on a win: `win - lose`.
    #[must_use]
    pub fn gross_return(&self) -> Price {
        self.win_pnl - self.lose_pnl
    }

    /// Recover the share price implied by the PnL pair. Equals `share_price`
    /// when no fees were applied.
    #[must_use]
    pub fn implied_share_price(&self) -> Price {
        self.effective_cost() / self.gross_return()
    }
}

/// Per-venue trading fee model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeModel {
    #[default]
    None,
    /// Commission charged on net winnings.
    ProfitCommission { commission_rate: Decimal },
    /// Fee proportional to notional, charged at purchase.
    TurnoverFee { turnover_rate: Decimal },
    /// Flat per-contract fees at purchase and at settlement.
    PerContract {
        trading_fee: Decimal,
        #[serde(default)]
        settlement_fee: Decimal,
    },
}

impl FeeModel {
    /// Check the fee parameters leave a positive gross return.
    ///
    /// # Errors
    /// Returns a description of the offending parameter.
    pub fn validate(&self) -> Result<(), String> {
        let in_unit = |v: Decimal| v >= Decimal::ZERO && v < Decimal::ONE;
        match *self {
            Self::None => Ok(()),
            Self::ProfitCommission { commission_rate } if !in_unit(commission_rate) => {
                Err(format!("commission_rate {commission_rate} must be in [0, 1)"))
            }
            Self::TurnoverFee { turnover_rate } if !in_unit(turnover_rate) => {
                Err(format!("turnover_rate {turnover_rate} must be in [0, 1)"))
            }
            Self::PerContract {
                trading_fee,
                settlement_fee,
            } if !in_unit(trading_fee) || !in_unit(settlement_fee) => Err(format!(
                "per-contract fees ({trading_fee}, {settlement_fee}) must be in [0, 1)"
            )),
            _ => Ok(()),
        }
    }

    fn apply(&self, p: Price) -> (Price, Price) {
        match *self {
            Self::None => (Decimal::ONE - p, -p),
            Self::ProfitCommission { commission_rate } => {
                ((Decimal::ONE - p) * (Decimal::ONE - commission_rate), -p)
            }
            Self::TurnoverFee { turnover_rate } => {
                let cost = p * (Decimal::ONE + turnover_rate);
                (Decimal::ONE - cost, -cost)
            }
            Self::PerContract {
                trading_fee,
                settlement_fee,
            } => {
                let cost = p + trading_fee;
                (Decimal::ONE - cost - settlement_fee, -cost)
            }
        }
    }
}

/// Reduce a venue price to share-price form.
///
/// # Errors
/// `InvalidPriceFormat` when the value is outside its format's range,
/// `DegeneratePrice` when it reduces to a share price of exactly 0 or 1.
pub fn normalize(raw_price: Decimal, format: PriceFormat) -> Result<NormalizedPrice, DomainError> {
    normalize_with_fees(raw_price, format, &FeeModel::None)
}

/// Like [`normalize`], then apply a venue fee model to the PnL pair.
///
/// # Errors
/// Same as [`normalize`].
pub fn normalize_with_fees(
    raw_price: Decimal,
    format: PriceFormat,
    fees: &FeeModel,
) -> Result<NormalizedPrice, DomainError> {
    let share_price = share_price(raw_price, format)?;
    if share_price <= Decimal::ZERO || share_price >= Decimal::ONE {
        return Err(DomainError::DegeneratePrice { share_price });
    }
    let (win_pnl, lose_pnl) = fees.apply(share_price);
    Ok(NormalizedPrice {
        share_price,
        win_pnl,
        lose_pnl,
    })
}

/// Convert a float from a venue payload, rejecting NaN and infinities.
///
/// # Errors
/// `InvalidPriceFormat` for non-finite input.
pub fn decimal_from_f64(value: f64, format: PriceFormat) -> Result<Decimal, DomainError> {
    Decimal::from_f64(value).ok_or_else(|| invalid(format, value, "not a finite number"))
}

fn share_price(raw: Decimal, format: PriceFormat) -> Result<Price, DomainError> {
    match format {
        PriceFormat::Probability => {
            if raw < Decimal::ZERO || raw > Decimal::ONE {
                return Err(invalid(format, raw, "must be within [0, 1]"));
            }
            Ok(raw)
        }
        PriceFormat::Cents => {
            if raw < Decimal::ZERO || raw > dec!(100) {
                return Err(invalid(format, raw, "must be within [0, 100]"));
            }
            Ok(raw / dec!(100))
        }
        PriceFormat::Decimal => {
            if raw < Decimal::ONE {
                return Err(invalid(format, raw, "decimal odds must be at least 1"));
            }
            Ok(Decimal::ONE / raw)
        }
        PriceFormat::American => {
            if raw.abs() < dec!(100) {
                return Err(invalid(format, raw, "magnitude must be at least 100"));
            }
            let decimal_odds = if raw.is_sign_positive() {
                Decimal::ONE + raw / dec!(100)
            } else {
                Decimal::ONE + dec!(100) / raw.abs()
            };
            Ok(Decimal::ONE / decimal_odds)
        }
    }
}

fn invalid(format: PriceFormat, value: impl fmt::Display, reason: &'static str) -> DomainError {
    DomainError::InvalidPriceFormat {
        format: format.as_str(),
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_is_identity() {
        let n = normalize(dec!(0.4), PriceFormat::Probability).unwrap();
        assert_eq!(n.share_price, dec!(0.4));
        assert_eq!(n.win_pnl, dec!(0.6));
        assert_eq!(n.lose_pnl, dec!(-0.4));
    }

    #[test]
    fn decimal_and_american_odds() {
        let d = normalize(dec!(2.5), PriceFormat::Decimal).unwrap();
        assert_eq!(d.share_price, dec!(0.4));

        let plus = normalize(dec!(150), PriceFormat::American).unwrap();
        assert_eq!(plus.share_price, dec!(0.4));

        let minus = normalize(dec!(-300), PriceFormat::American).unwrap();
        assert_eq!(minus.share_price, dec!(0.75));
    }

    #[test]
    fn round_trip_recovers_share_price_for_every_format() {
        let cases = [
            (dec!(0.37), PriceFormat::Probability),
            (dec!(62), PriceFormat::Cents),
            (dec!(1.8), PriceFormat::Decimal),
            (dec!(-200), PriceFormat::American),
            (dec!(135), PriceFormat::American),
        ];
        for (raw, format) in cases {
            let n = normalize(raw, format).unwrap();
            assert_eq!(n.implied_share_price(), n.share_price, "{format} {raw}");
        }
    }

    #[test]
    fn out_of_range_is_invalid() {
        for (raw, format) in [
            (dec!(1.2), PriceFormat::Probability),
            (dec!(-0.1), PriceFormat::Probability),
            (dec!(101), PriceFormat::Cents),
            (dec!(0.9), PriceFormat::Decimal),
            (dec!(99), PriceFormat::American),
            (dec!(-50), PriceFormat::American),
        ] {
            let err = normalize(raw, format).unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidPriceFormat { .. }),
                "{format} {raw}: {err}"
            );
        }
    }

    #[test]
    fn certain_outcomes_are_degenerate() {
        for (raw, format) in [
            (dec!(0), PriceFormat::Probability),
            (dec!(1), PriceFormat::Probability),
            (dec!(0), PriceFormat::Cents),
            (dec!(100), PriceFormat::Cents),
            (dec!(1), PriceFormat::Decimal),
        ] {
            assert!(matches!(
                normalize(raw, format),
                Err(DomainError::DegeneratePrice { .. })
            ));
        }
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(decimal_from_f64(f64::NAN, PriceFormat::Probability).is_err());
        assert!(decimal_from_f64(f64::INFINITY, PriceFormat::Cents).is_err());
        assert_eq!(
            decimal_from_f64(0.5, PriceFormat::Probability).unwrap(),
            dec!(0.5)
        );
    }

    #[test]
    fn profit_commission_reduces_win_only() {
        let fees = FeeModel::ProfitCommission {
            commission_rate: dec!(0.1),
        };
        let n = normalize_with_fees(dec!(0.5), PriceFormat::Probability, &fees).unwrap();
        assert_eq!(n.share_price, dec!(0.5));
        assert_eq!(n.win_pnl, dec!(0.45));
        assert_eq!(n.lose_pnl, dec!(-0.5));
    }

    #[test]
    fn turnover_and_per_contract_fees_raise_cost() {
        let turnover = FeeModel::TurnoverFee {
            turnover_rate: dec!(0.02),
        };
        let n = normalize_with_fees(dec!(0.5), PriceFormat::Probability, &turnover).unwrap();
        assert_eq!(n.lose_pnl, dec!(-0.51));
        assert_eq!(n.win_pnl, dec!(0.49));

        let contract = FeeModel::PerContract {
            trading_fee: dec!(0.01),
            settlement_fee: dec!(0.02),
        };
        let n = normalize_with_fees(dec!(40), PriceFormat::Cents, &contract).unwrap();
        assert_eq!(n.lose_pnl, dec!(-0.41));
        assert_eq!(n.win_pnl, dec!(0.57));
    }

    #[test]
    fn fee_model_parses_from_tagged_toml() {
        let fees: FeeModel = toml::from_str("type = \"turnover_fee\"\nturnover_rate = \"0.01\"").unwrap();
        assert_eq!(
            fees,
            FeeModel::TurnoverFee {
                turnover_rate: dec!(0.01)
            }
        );
        assert!(FeeModel::ProfitCommission {
            commission_rate: dec!(1.5)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn price_format_accepts_legacy_alias() {
        assert_eq!(
            "share_0_1".parse::<PriceFormat>().unwrap(),
            PriceFormat::Probability
        );
        assert!("fractional".parse::<PriceFormat>().is_err());
    }
}
