use crate::domain::money::{CURRENCY_SCALE, Income, Tax};
use crate::error::{Result, TaxError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The outcome of a single tax computation.
///
/// Immutable once built: the calculator identifier is never blank because
/// history records are keyed on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    tax: Tax,
    calculator: String,
}

impl CalculationResult {
    pub fn new(tax: Tax, calculator: impl Into<String>) -> Result<Self> {
        let calculator = calculator.into();
        if calculator.trim().is_empty() {
            return Err(TaxError::InternalError(
                "calculation result has no calculator identifier".into(),
            ));
        }
        Ok(Self { tax, calculator })
    }

    pub fn tax(&self) -> Tax {
        self.tax
    }

    pub fn calculator(&self) -> &str {
        &self.calculator
    }
}

/// A tax strategy for one jurisdiction.
///
/// Implementations are stateless and shared by every request, so
/// concurrent calls never interfere with each other.
#[async_trait]
pub trait Calculator: Send + Sync {
    /// Identifier reported in results and history, e.g. `"FlatRate"`.
    fn id(&self) -> &str;

    async fn calculate(&self, income: Income) -> Result<CalculationResult>;
}

/// One band of a progressive schedule. `from` is inclusive, `to` exclusive;
/// `to: None` marks the open-ended top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub from: Decimal,
    pub to: Option<Decimal>,
    pub rate: Decimal,
}

impl Bracket {
    pub fn new(from: Decimal, to: Option<Decimal>, rate: Decimal) -> Self {
        Self { from, to, rate }
    }

    /// The portion of `income` that falls inside this band.
    fn taxable(&self, income: Decimal) -> Decimal {
        let upper = match self.to {
            Some(to) => income.min(to),
            None => income,
        };
        (upper - self.from).max(Decimal::ZERO)
    }
}

/// A side-effect-free Income -> Tax rule. Rates are fractions (0.175 = 17.5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRule {
    /// `income * rate`.
    FlatRate { rate: Decimal },
    /// `income * rate_below` under `threshold`, a fixed `amount` at or above it.
    FlatValue {
        threshold: Decimal,
        amount: Decimal,
        rate_below: Decimal,
    },
    /// Marginal `rate` applied to the slice of income inside each bracket.
    Progressive { brackets: Vec<Bracket> },
}

impl TaxRule {
    /// Checks that the rule is monotonic in income and never taxes more than
    /// the income itself.
    pub fn validate(&self) -> Result<()> {
        match self {
            TaxRule::FlatRate { rate } => check_rate(*rate),
            TaxRule::FlatValue {
                threshold,
                amount,
                rate_below,
            } => {
                check_rate(*rate_below)?;
                if *threshold <= Decimal::ZERO {
                    return Err(TaxError::ConfigError(format!(
                        "flat value threshold must be positive, got {}",
                        threshold
                    )));
                }
                if *amount > *threshold || *amount < *threshold * *rate_below {
                    return Err(TaxError::ConfigError(format!(
                        "flat value amount {} must lie between {} and {}",
                        amount,
                        *threshold * *rate_below,
                        threshold
                    )));
                }
                Ok(())
            }
            TaxRule::Progressive { brackets } => check_brackets(brackets),
        }
    }

    /// Unrounded tax for `income`.
    pub fn raw_tax(&self, income: Decimal) -> Decimal {
        match self {
            TaxRule::FlatRate { rate } => income * *rate,
            TaxRule::FlatValue {
                threshold,
                amount,
                rate_below,
            } => {
                if income < *threshold {
                    income * *rate_below
                } else {
                    *amount
                }
            }
            TaxRule::Progressive { brackets } => brackets
                .iter()
                .map(|b| b.taxable(income) * b.rate)
                .sum(),
        }
    }
}

fn check_rate(rate: Decimal) -> Result<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        Err(TaxError::ConfigError(format!(
            "rate must be between 0 and 1, got {}",
            rate
        )))
    } else {
        Ok(())
    }
}

fn check_brackets(brackets: &[Bracket]) -> Result<()> {
    let Some(first) = brackets.first() else {
        return Err(TaxError::ConfigError(
            "progressive schedule has no brackets".to_string(),
        ));
    };
    if !first.from.is_zero() {
        return Err(TaxError::ConfigError(format!(
            "first bracket must start at 0, got {}",
            first.from
        )));
    }

    let mut expected_from = Decimal::ZERO;
    for (i, bracket) in brackets.iter().enumerate() {
        check_rate(bracket.rate)?;
        if bracket.from != expected_from {
            return Err(TaxError::ConfigError(format!(
                "bracket {} starts at {} but the previous one ends at {}",
                i, bracket.from, expected_from
            )));
        }
        match bracket.to {
            Some(to) if to <= bracket.from => {
                return Err(TaxError::ConfigError(format!(
                    "bracket {} is empty ({} to {})",
                    i, bracket.from, to
                )));
            }
            Some(to) => expected_from = to,
            None if i + 1 != brackets.len() => {
                return Err(TaxError::ConfigError(format!(
                    "bracket {} is open-ended but is not the last one",
                    i
                )));
            }
            None => {}
        }
    }

    if brackets.last().is_some_and(|b| b.to.is_some()) {
        return Err(TaxError::ConfigError(
            "last bracket must be open-ended".to_string(),
        ));
    }
    Ok(())
}

/// A [`Calculator`] backed by a validated [`TaxRule`].
#[derive(Debug, Clone)]
pub struct RuleCalculator {
    id: String,
    rule: TaxRule,
}

impl RuleCalculator {
    pub fn new(id: impl Into<String>, rule: TaxRule) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TaxError::ConfigError(
                "calculator identifier must not be blank".to_string(),
            ));
        }
        rule.validate().map_err(|e| match e {
            TaxError::ConfigError(msg) => {
                TaxError::ConfigError(format!("calculator '{}': {}", id, msg))
            }
            other => other,
        })?;
        Ok(Self { id, rule })
    }

    pub fn rule(&self) -> &TaxRule {
        &self.rule
    }
}

#[async_trait]
impl Calculator for RuleCalculator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn calculate(&self, income: Income) -> Result<CalculationResult> {
        // Rounded once, on the total.
        let tax = Tax::new(self.rule.raw_tax(income.value()))?;
        debug_assert!(
            tax.value() <= income.value() + Decimal::new(1, CURRENCY_SCALE),
            "tax {} exceeds income {} for {}",
            tax,
            income,
            self.id
        );
        CalculationResult::new(tax, self.id.as_str())
    }
}
