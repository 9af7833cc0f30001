//! Request and response bodies for the HTTP API.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::advisor::{AdvisoryOutcome, InvestmentInput};

const MAX_COMPANY_NAME_CHARS: usize = 100;
const MAX_INDUSTRY_CHARS: usize = 50;
const MAX_DETAILS_CHARS: usize = 1000;
const MAX_BUDGET: i64 = 1_000_000_000;

/// Body of `POST /api/analysis`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub budget: i64,
    #[serde(default)]
    pub details: Option<String>,
}

impl AdvisoryRequest {
    /// Check field bounds, collecting every violation keyed by field name.
    pub fn validate(self) -> Result<InvestmentInput, BTreeMap<&'static str, String>> {
        let mut errors = BTreeMap::new();

        let company_name = self.company_name.trim();
        if company_name.is_empty() {
            errors.insert("companyName", "Company name is required".to_string());
        } else if company_name.chars().count() > MAX_COMPANY_NAME_CHARS {
            errors.insert(
                "companyName",
                format!("Company name must be at most {} characters", MAX_COMPANY_NAME_CHARS),
            );
        }

        let industry = self.industry.trim();
        if industry.is_empty() {
            errors.insert("industry", "Investment category is required".to_string());
        } else if industry.chars().count() > MAX_INDUSTRY_CHARS {
            errors.insert(
                "industry",
                format!("Investment category must be at most {} characters", MAX_INDUSTRY_CHARS),
            );
        }

        if self.budget <= 0 {
            errors.insert("budget", "Budget must be at least 1".to_string());
        } else if self.budget > MAX_BUDGET {
            errors.insert("budget", format!("Budget must be at most {}", MAX_BUDGET));
        }

        let details = self
            .details
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if details.is_some_and(|d| d.chars().count() > MAX_DETAILS_CHARS) {
            errors.insert(
                "details",
                format!("Details must be at most {} characters", MAX_DETAILS_CHARS),
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(InvestmentInput {
            company_name: company_name.to_string(),
            industry: industry.to_string(),
            budget: self.budget as u64,
            details: details.map(str::to_string),
        })
    }
}

/// Body returned by `POST /api/analysis`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryResponse {
    /// False when neither pattern could be produced.
    pub analysis_available: bool,
    pub analysis: AdvisoryOutcome,
    pub simple_allocation: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub message: String,
    pub removed: usize,
}
