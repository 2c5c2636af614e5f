use crate::domain::calculator::{Calculator, RuleCalculator, TaxRule};
use crate::error::{Result, TaxError};
use std::collections::HashMap;
use std::sync::Arc;

/// Calculators keyed by identifier, populated once at process start.
#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    calculators: HashMap<String, Arc<dyn Calculator>>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a calculator under its own identifier. Identifiers must be unique.
    pub fn register(&mut self, calculator: Arc<dyn Calculator>) -> Result<()> {
        let id = calculator.id().to_string();
        if self.calculators.contains_key(&id) {
            return Err(TaxError::ConfigError(format!(
                "calculator '{}' is registered twice",
                id
            )));
        }
        self.calculators.insert(id, calculator);
        Ok(())
    }

    pub fn register_rule(&mut self, id: &str, rule: TaxRule) -> Result<()> {
        self.register(Arc::new(RuleCalculator::new(id, rule)?))
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Calculator>> {
        self.calculators.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.calculators.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.calculators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
