use crate::model::Month;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The running balance of a category at the end of a month, after that month's distribution and
/// transaction effects have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryBalance {
    pub(crate) category_name: String,
    pub(crate) month: Month,
    pub(crate) balance: Decimal,
}

impl CategoryBalance {
    pub fn new(category_name: impl Into<String>, month: Month, balance: Decimal) -> Self {
        Self {
            category_name: category_name.into(),
            month,
            balance,
        }
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }
}

/// The amount of income (e.g. salary) allocated to a category for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryDistribution {
    pub(crate) category_name: String,
    pub(crate) month: Month,
    pub(crate) allocation: Decimal,
}

impl CategoryDistribution {
    pub fn new(category_name: impl Into<String>, month: Month, allocation: Decimal) -> Self {
        Self {
            category_name: category_name.into(),
            month,
            allocation,
        }
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn allocation(&self) -> Decimal {
        self.allocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_balance_wire_shape() {
        let record = CategoryBalance::new(
            "Groceries",
            Month::from_str("2024-01").unwrap(),
            Decimal::from(170),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["category_name"], "Groceries");
        assert_eq!(value["month"], "2024-01");
        assert_eq!(value["balance"], "170");
    }

    #[test]
    fn test_distribution_accepts_json_numbers() {
        let json = r#"{"category_name":"Rent","month":"2024-02","allocation":1200.5}"#;
        let record: CategoryDistribution = serde_json::from_str(json).unwrap();
        assert_eq!(record.allocation(), Decimal::from_str("1200.5").unwrap());
        assert_eq!(record.month().to_string(), "2024-02");
    }
}
