//! Calculator and postal code configuration.
//!
//! A [`TaxConfig`] describes every calculator by identifier and rule, the
//! postal code table, and the default/fallback policy. It is loaded once at
//! process start, either from a JSON file or from [`TaxConfig::builtin`].

use crate::application::registry::CalculatorRegistry;
use crate::application::resolver::{PostalCodeResolver, ResolutionPolicy};
use crate::domain::calculator::{Bracket, TaxRule};
use crate::domain::postal_code::PostalCode;
use crate::error::{Result, TaxError};
use crate::infrastructure::in_memory::InMemoryPostalCodeDirectory;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalculatorSettings {
    pub id: String,
    pub rule: TaxRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostalCodeEntry {
    pub postal_code: String,
    pub calculator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxConfig {
    pub calculators: Vec<CalculatorSettings>,
    pub postal_codes: Vec<PostalCodeEntry>,
    /// Calculator for requests without a postal code.
    #[serde(default)]
    pub default_calculator: Option<String>,
    /// Calculator for postal codes missing from the table.
    #[serde(default)]
    pub fallback_calculator: Option<String>,
}

impl TaxConfig {
    /// The rule set shipped with the binary.
    pub fn builtin() -> Self {
        let calculators = vec![
            CalculatorSettings {
                id: "Progressive".to_string(),
                rule: TaxRule::Progressive {
                    brackets: vec![
                        Bracket::new(dec!(0), Some(dec!(8350)), dec!(0.10)),
                        Bracket::new(dec!(8350), Some(dec!(33950)), dec!(0.15)),
                        Bracket::new(dec!(33950), Some(dec!(82250)), dec!(0.25)),
                        Bracket::new(dec!(82250), Some(dec!(171550)), dec!(0.28)),
                        Bracket::new(dec!(171550), Some(dec!(372950)), dec!(0.33)),
                        Bracket::new(dec!(372950), None, dec!(0.35)),
                    ],
                },
            },
            CalculatorSettings {
                id: "FlatValue".to_string(),
                rule: TaxRule::FlatValue {
                    threshold: dec!(200000),
                    amount: dec!(10000),
                    rate_below: dec!(0.05),
                },
            },
            CalculatorSettings {
                id: "FlatRate".to_string(),
                rule: TaxRule::FlatRate { rate: dec!(0.175) },
            },
            CalculatorSettings {
                id: "Flat-10%".to_string(),
                rule: TaxRule::FlatRate { rate: dec!(0.10) },
            },
        ];

        let postal_codes = [
            ("7441", "Progressive"),
            ("A100", "FlatValue"),
            ("7000", "FlatRate"),
            ("1000", "Progressive"),
            ("0000", "Flat-10%"),
        ]
        .into_iter()
        .map(|(postal_code, calculator)| PostalCodeEntry {
            postal_code: postal_code.to_string(),
            calculator: calculator.to_string(),
        })
        .collect();

        Self {
            calculators,
            postal_codes,
            default_calculator: Some("FlatRate".to_string()),
            fallback_calculator: None,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| TaxError::ConfigError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            TaxError::ConfigError(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Cross-checks postal codes, default and fallback against the calculators.
    /// Rules themselves are validated when the registry is built.
    pub fn validate(&self) -> Result<()> {
        let ids: HashSet<&str> = self.calculators.iter().map(|c| c.id.as_str()).collect();

        let mut seen = HashSet::new();
        for entry in &self.postal_codes {
            let code = PostalCode::normalize(&entry.postal_code);
            if code.is_empty() {
                return Err(TaxError::ConfigError(
                    "postal code table contains a blank postal code".to_string(),
                ));
            }
            if !ids.contains(entry.calculator.as_str()) {
                return Err(TaxError::ConfigError(format!(
                    "postal code '{}' names unknown calculator '{}'",
                    entry.postal_code, entry.calculator
                )));
            }
            if !seen.insert(code) {
                return Err(TaxError::ConfigError(format!(
                    "postal code '{}' is listed more than once",
                    entry.postal_code
                )));
            }
        }

        for id in [&self.default_calculator, &self.fallback_calculator]
            .into_iter()
            .flatten()
        {
            if !ids.contains(id.as_str()) {
                return Err(TaxError::ConfigError(format!(
                    "unknown calculator '{}' in resolution policy",
                    id
                )));
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> Result<CalculatorRegistry> {
        let mut registry = CalculatorRegistry::new();
        for settings in &self.calculators {
            registry.register_rule(&settings.id, settings.rule.clone())?;
        }
        Ok(registry)
    }

    pub fn directory(&self) -> InMemoryPostalCodeDirectory {
        let directory = InMemoryPostalCodeDirectory::new();
        for entry in &self.postal_codes {
            directory.insert(&entry.postal_code, &entry.calculator);
        }
        directory
    }

    pub fn policy(&self) -> ResolutionPolicy {
        ResolutionPolicy {
            default_calculator: self.default_calculator.clone(),
            fallback_calculator: self.fallback_calculator.clone(),
        }
    }

    /// Builds a resolver over an in-memory copy of the postal code table.
    pub fn resolver(&self) -> Result<PostalCodeResolver> {
        self.validate()?;
        PostalCodeResolver::new(Box::new(self.directory()), self.registry()?, self.policy())
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self::builtin()
    }
}
