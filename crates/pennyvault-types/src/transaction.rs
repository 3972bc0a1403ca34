//! Spending records and their round-up projection

use serde::{Deserialize, Serialize};

/// A single spending record as entered by the user.
///
/// Records are immutable once received. `amount` is kept as raw JSON so that
/// malformed input survives parsing and can still be rendered; only
/// non-negative integers (minor currency units) take part in round-up math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Free-form description ("Uber Ride")
    #[serde(rename = "desc", alias = "description", default)]
    pub description: String,
    /// Amount in minor currency units
    #[serde(default)]
    pub amount: serde_json::Value,
    /// Optional date string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Optional category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TransactionRecord {
    /// Create a record with an integer amount
    pub fn new(description: impl Into<String>, amount: i64) -> Self {
        Self {
            description: description.into(),
            amount: serde_json::Value::from(amount),
            date: None,
            category: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The amount in minor units, if it is a non-negative integer
    pub fn minor_units(&self) -> Option<u64> {
        self.amount.as_u64()
    }

    /// Parse a JSON array of records.
    ///
    /// Malformed input yields an empty list rather than an error.
    pub fn parse_list(json: &str) -> Vec<Self> {
        serde_json::from_str(json).unwrap_or_default()
    }
}

/// One record together with its computed round-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundupItem {
    pub record: TransactionRecord,
    /// Minor units needed to reach the next whole boundary
    pub roundup: u64,
}

/// Round-ups for an ordered list of records. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundupResult {
    /// Per-record round-ups in input order
    pub per_item: Vec<RoundupItem>,
    /// Sum of all per-record round-ups
    pub total: u64,
}

impl RoundupResult {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Sample data matching the dashboard's "Load Sample Data" button
pub fn sample_transactions() -> Vec<TransactionRecord> {
    [
        ("Uber Ride", 290, "2024-01-15"),
        ("Electricity Bill", 1485, "2024-01-20"),
        ("Grocery Shopping", 880, "2024-01-18"),
        ("Netflix Subscription", 485, "2024-01-01"),
        ("Restaurant Dinner", 1190, "2024-01-16"),
        ("Gas Station", 1590, "2024-01-17"),
        ("Coffee Shop", 195, "2024-01-19"),
        ("Movie Tickets", 495, "2024-01-21"),
    ]
    .into_iter()
    .map(|(desc, amount, date)| TransactionRecord::new(desc, amount).with_date(date))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dashboard_format() {
        let records = TransactionRecord::parse_list(
            r#"[{"desc": "Uber Ride", "amount": 300, "date": "2024-01-15"},
                {"description": "Coffee", "amount": 195}]"#,
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "Uber Ride");
        assert_eq!(records[0].minor_units(), Some(300));
        assert_eq!(records[0].date.as_deref(), Some("2024-01-15"));
        assert_eq!(records[1].description, "Coffee");
    }

    #[test]
    fn test_malformed_json_is_empty() {
        assert!(TransactionRecord::parse_list("not json").is_empty());
        assert!(TransactionRecord::parse_list(r#"{"desc": "x"}"#).is_empty());
    }

    #[test]
    fn test_non_integer_amounts_have_no_minor_units() {
        let records = TransactionRecord::parse_list(
            r#"[{"desc": "a", "amount": "12"}, {"desc": "b"}, {"desc": "c", "amount": -5},
                {"desc": "d", "amount": 2.5}]"#,
        );
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.minor_units().is_none()));
    }

    #[test]
    fn test_serializes_with_desc_key() {
        let json = serde_json::to_value(TransactionRecord::new("Taxi", 250)).unwrap();
        assert_eq!(json["desc"], "Taxi");
        assert_eq!(json["amount"], 250);
        assert!(json.get("date").is_none());
    }

    #[test]
    fn test_sample_transactions() {
        let samples = sample_transactions();
        assert_eq!(samples.len(), 8);
        assert!(samples.iter().all(|r| r.minor_units().is_some()));
    }
}
