//! The fixed category taxonomy shared by the rule engine and the embedding classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Transaction categories. Closed set: adding a label means updating the rule
/// table and the exemplar phrases together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "Groceries")]
    Groceries,
    #[serde(rename = "Food & Dining")]
    FoodDining,
    #[serde(rename = "Transport")]
    Transport,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Subscriptions")]
    Subscriptions,
    #[serde(rename = "Utilities")]
    Utilities,
    #[serde(rename = "Healthcare")]
    Healthcare,
    #[serde(rename = "Entertainment")]
    Entertainment,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Insurance")]
    Insurance,
    #[serde(rename = "Housing")]
    Housing,
    #[serde(rename = "Investments")]
    Investments,
    #[serde(rename = "Transfers")]
    Transfers,
    #[serde(rename = "Income")]
    Income,
    #[serde(rename = "Fees & Charges")]
    FeesCharges,
    #[serde(rename = "Personal Care")]
    PersonalCare,
    #[serde(rename = "Gifts & Donations")]
    GiftsDonations,
    #[serde(rename = "Other")]
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl Category {
    pub const ALL: [Category; 19] = [
        Category::Groceries,
        Category::FoodDining,
        Category::Transport,
        Category::Shopping,
        Category::Subscriptions,
        Category::Utilities,
        Category::Healthcare,
        Category::Entertainment,
        Category::Travel,
        Category::Education,
        Category::Insurance,
        Category::Housing,
        Category::Investments,
        Category::Transfers,
        Category::Income,
        Category::FeesCharges,
        Category::PersonalCare,
        Category::GiftsDonations,
        Category::Other,
    ];

    /// Display label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::FoodDining => "Food & Dining",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Subscriptions => "Subscriptions",
            Category::Utilities => "Utilities",
            Category::Healthcare => "Healthcare",
            Category::Entertainment => "Entertainment",
            Category::Travel => "Travel",
            Category::Education => "Education",
            Category::Insurance => "Insurance",
            Category::Housing => "Housing",
            Category::Investments => "Investments",
            Category::Transfers => "Transfers",
            Category::Income => "Income",
            Category::FeesCharges => "Fees & Charges",
            Category::PersonalCare => "Personal Care",
            Category::GiftsDonations => "Gifts & Donations",
            Category::Other => "Other",
        }
    }

    /// Parse a label case-insensitively. Unknown labels are rejected.
    pub fn from_label(label: &str) -> Result<Self, UnknownCategory> {
        let wanted = label.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);
