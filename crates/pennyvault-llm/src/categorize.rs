//! Expense categorization
//!
//! Sends spending records to an LLM with an expense-analysis prompt and
//! parses the structured answer. When no LLM is reachable, keyword rules
//! produce the same result shape.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pennyvault_types::TransactionRecord;
use serde::{Deserialize, Serialize};

use crate::router::LLMRouter;
use crate::types::*;

/// Spending categories, in display order
pub const CATEGORIES: [&str; 5] = ["Food", "Travel", "Bills", "Shopping", "Misc"];

/// One categorized record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizedTransaction {
    pub desc: String,
    pub amount: serde_json::Value,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Set when the bill looks unusual
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpendingInsights {
    pub total_spent: f64,
    pub category_breakdown: BTreeMap<String, f64>,
    pub bill_anomalies: Vec<String>,
    pub spending_trends: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PotentialSavings {
    pub monthly: f64,
    pub description: String,
}

/// Full analysis of a batch of records. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategorizationResult {
    pub categorized: Vec<CategorizedTransaction>,
    pub alerts: Vec<String>,
    pub insights: SpendingInsights,
    pub tips: Vec<String>,
    pub potential_savings: PotentialSavings,
}

/// Anything that can categorize spending records
#[async_trait]
pub trait CategorizationService: Send + Sync {
    async fn categorize(&self, records: &[TransactionRecord]) -> Result<CategorizationResult>;
}

// ============================================================================
// LLM-backed client
// ============================================================================

const SYSTEM_PROMPT: &str =
    "You are an AI expense manager and financial advisor. Analyze the following transactions and provide comprehensive insights.";

const INSTRUCTIONS: &str = r#"Requirements:
1. Categorize transactions into: Food, Travel, Bills, Shopping, Misc.
2. Detect bill anomalies:
   - Compare bill amounts with typical ranges
   - Flag bills that are 20%+ higher than expected
   - Identify unusual spending patterns
3. Provide smart alerts:
   - Bill due date reminders (if dates provided)
   - Spending trend warnings
   - Budget optimization suggestions
4. Suggest 2-3 actionable savings tips based on spending patterns
5. Calculate potential monthly savings if recommendations are followed

Return ONLY this JSON structure (no markdown, no code blocks):
{
  "categorized": [
    {
      "desc": "string",
      "amount": number,
      "category": "string",
      "date": "string (if provided)",
      "anomaly": "string (if bill is unusual)"
    }
  ],
  "alerts": ["string (bill warnings, due dates, anomalies)"],
  "insights": {
    "totalSpent": number,
    "categoryBreakdown": {"Food": number, "Travel": number, "Bills": number, "Shopping": number, "Misc": number},
    "billAnomalies": ["string"],
    "spendingTrends": ["string"]
  },
  "tips": ["string (actionable savings advice)"],
  "potentialSavings": {
    "monthly": number,
    "description": "string"
  }
}"#;

/// Build the user prompt for a batch of records
pub fn build_prompt(records: &[TransactionRecord]) -> String {
    let transactions = serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string());
    format!("{INSTRUCTIONS}\n\nTransactions: {transactions}")
}

/// Remove markdown code fences models wrap JSON in despite instructions
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse a model answer into a result
pub fn parse_response(text: &str) -> Result<CategorizationResult> {
    serde_json::from_str(&strip_code_fences(text)).map_err(|e| LLMError::InvalidResponse {
        message: format!("categorization is not valid JSON: {e}"),
    })
}

/// Categorizes through the configured LLM, with keyword rules as fallback
pub struct CategorizationClient {
    router: LLMRouter,
    fallback: KeywordCategorizer,
}

impl CategorizationClient {
    pub fn new(router: LLMRouter) -> Self {
        Self {
            router,
            fallback: KeywordCategorizer,
        }
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.router.kind()
    }
}

#[async_trait]
impl CategorizationService for CategorizationClient {
    async fn categorize(&self, records: &[TransactionRecord]) -> Result<CategorizationResult> {
        let request = PromptRequest::new(SYSTEM_PROMPT, build_prompt(records));

        let Some(response) = self.router.complete_with_fallback(request).await else {
            return self.fallback.categorize(records).await;
        };

        tracing::debug!(
            provider = %self.router.kind(),
            model = %response.model,
            tokens = response.total_tokens,
            records = records.len(),
            "Categorization completed"
        );
        parse_response(&response.content)
    }
}

// ============================================================================
// Keyword rules
// ============================================================================

const KEYWORDS: [(&str, &[&str]); 4] = [
    (
        "Food",
        &[
            "grocery", "restaurant", "coffee", "cafe", "food", "dinner", "lunch", "breakfast",
            "pizza", "bakery", "swiggy", "zomato",
        ],
    ),
    (
        "Travel",
        &[
            "uber", "ola", "lyft", "taxi", "cab", "flight", "airline", "train", "bus", "metro",
            "gas station", "fuel", "petrol", "parking",
        ],
    ),
    (
        "Bills",
        &[
            "bill", "electricity", "water", "internet", "broadband", "phone", "mobile", "rent",
            "insurance", "subscription", "netflix", "spotify",
        ],
    ),
    (
        "Shopping",
        &["shopping", "amazon", "flipkart", "store", "mall", "clothes", "shoes", "electronics"],
    ),
];

/// Rule-based categorization used when no LLM is available
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordCategorizer;

impl KeywordCategorizer {
    /// Category for a description
    pub fn category_of(description: &str) -> &'static str {
        let description = description.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| description.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or("Misc")
    }

    fn analyze(records: &[TransactionRecord]) -> CategorizationResult {
        let mut breakdown: BTreeMap<String, f64> =
            CATEGORIES.iter().map(|c| (c.to_string(), 0.0)).collect();
        let mut categorized = Vec::with_capacity(records.len());
        let mut alerts = Vec::new();

        for record in records {
            let category = Self::category_of(&record.description);
            let amount = record.amount.as_f64().unwrap_or(0.0);
            *breakdown.entry(category.to_string()).or_default() += amount;

            if category == "Bills" {
                if let Some(date) = &record.date {
                    alerts.push(format!(
                        "{} was paid on {}; plan for the next cycle",
                        record.description, date
                    ));
                }
            }

            categorized.push(CategorizedTransaction {
                desc: record.description.clone(),
                amount: record.amount.clone(),
                category: category.to_string(),
                date: record.date.clone(),
                anomaly: None,
            });
        }

        let total_spent: f64 = breakdown.values().sum();
        let (top_category, top_amount) = breakdown
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(c, a)| (c.clone(), *a))
            .unwrap_or_else(|| ("Misc".to_string(), 0.0));

        let mut trends = Vec::new();
        let mut tips = vec![
            "Round up every purchase and sweep the spare change into your vault".to_string(),
        ];
        if total_spent > 0.0 {
            let share = top_amount / total_spent * 100.0;
            trends.push(format!("{top_category} is {share:.0}% of your spending"));
            tips.push(format!(
                "Set a weekly cap on {top_category} spending and review it every Sunday"
            ));
        }
        if breakdown.get("Bills").copied().unwrap_or(0.0) > 0.0 {
            tips.push("Audit recurring subscriptions and cancel the ones you rarely use".to_string());
        }

        // One tenth of the largest category is a realistic monthly cut
        let monthly = (top_amount * 0.1).round();

        CategorizationResult {
            categorized,
            alerts,
            insights: SpendingInsights {
                total_spent,
                category_breakdown: breakdown,
                bill_anomalies: Vec::new(),
                spending_trends: trends,
            },
            tips,
            potential_savings: PotentialSavings {
                monthly,
                description: format!("Trimming {top_category} spending by 10%"),
            },
        }
    }
}

#[async_trait]
impl CategorizationService for KeywordCategorizer {
    async fn categorize(&self, records: &[TransactionRecord]) -> Result<CategorizationResult> {
        Ok(Self::analyze(records))
    }
}
