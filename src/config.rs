use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::PenaltyConfig;
use crate::types::LoanTerms;

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub penalty: PenaltyConfig,
    #[serde(default = "default_products")]
    pub products: Vec<LoanProduct>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            penalty: PenaltyConfig::default(),
            products: default_products(),
        }
    }
}

impl EngineConfig {
    /// parse and validate a json configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| LoanError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.penalty.daily_rate.is_negative() {
            return Err(LoanError::InvalidConfiguration {
                message: format!("negative penalty rate {}", self.penalty.daily_rate),
            });
        }
        for product in &self.products {
            product.validate()?;
        }
        Ok(())
    }

    /// look up a product by name
    pub fn product(&self, name: &str) -> Option<&LoanProduct> {
        self.products.iter().find(|p| p.name == name)
    }
}

fn default_products() -> Vec<LoanProduct> {
    vec![LoanProduct::basic()]
}

/// a loan product from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub name: String,
    pub annual_rate: Rate,
    pub min_amount: Money,
    pub max_amount: Money,
    pub min_term_months: u32,
    pub max_term_months: u32,
    #[serde(default)]
    pub description: String,
}

impl LoanProduct {
    /// standard consumer loan
    pub fn basic() -> Self {
        Self {
            name: "basic".to_string(),
            annual_rate: Rate::from_percent(dec!(15.5)),
            min_amount: Money::from_major(10_000),
            max_amount: Money::from_major(500_000),
            min_term_months: 6,
            max_term_months: 24,
            description: "Standard consumer loan".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.annual_rate.is_negative() {
            return Err(LoanError::InvalidConfiguration {
                message: format!("product {}: negative rate {}", self.name, self.annual_rate),
            });
        }
        if !self.min_amount.is_positive() || self.min_amount > self.max_amount {
            return Err(LoanError::InvalidConfiguration {
                message: format!(
                    "product {}: bad amount range {}..={}",
                    self.name, self.min_amount, self.max_amount
                ),
            });
        }
        if self.min_term_months == 0 || self.min_term_months > self.max_term_months {
            return Err(LoanError::InvalidConfiguration {
                message: format!(
                    "product {}: bad term range {}..={}",
                    self.name, self.min_term_months, self.max_term_months
                ),
            });
        }
        Ok(())
    }

    /// build loan terms for this product, checking its limits
    pub fn terms(
        &self,
        amount: Money,
        term_months: u32,
        origination_date: NaiveDate,
    ) -> Result<LoanTerms> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(LoanError::AmountOutOfRange {
                amount,
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        if term_months < self.min_term_months || term_months > self.max_term_months {
            return Err(LoanError::TermOutOfRange {
                term_months,
                min: self.min_term_months,
                max: self.max_term_months,
            });
        }
        LoanTerms::new(amount, self.annual_rate, term_months, origination_date)
    }
}
