use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{InvalidEnumValue, ReleaseStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    Kilogram,
    Gram,
    Milligram,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Kilogram => "kilogram",
            UnitOfMeasure::Gram => "gram",
            UnitOfMeasure::Milligram => "milligram",
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for UnitOfMeasure {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "kilogram" => Ok(UnitOfMeasure::Kilogram),
            "gram" => Ok(UnitOfMeasure::Gram),
            "milligram" => Ok(UnitOfMeasure::Milligram),
            _ => Err(InvalidEnumValue { field: "unit_of_measure", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Addition,
    Removal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Addition => "addition",
            TransactionType::Removal => "removal",
        }
    }

    /// Sign the quantity contributes to the material balance.
    pub fn signed(&self, quantity: f64) -> f64 {
        match self {
            TransactionType::Addition => quantity,
            TransactionType::Removal => -quantity,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TransactionType {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "addition" => Ok(TransactionType::Addition),
            "removal" => Ok(TransactionType::Removal),
            _ => Err(InvalidEnumValue { field: "transaction_type", value }),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct Material {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub unit_of_measure: UnitOfMeasure,
    pub current_quantity: f64,
    pub minimum_quantity: f64,
    pub maximum_quantity: f64,
    pub plant_area_location: Option<String>,
    pub barcode_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ReleaseStatus,
    pub supplier: Option<String>,
    pub supplier_contact_info: Option<String>,
    pub notes: Option<String>,
    pub margin: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Append-only ledger row; never mutated after insert.
#[derive(Debug, FromRow)]
pub struct MaterialTransaction {
    pub id: i64,
    pub material_id: i64,
    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub transaction_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_signs_quantity() {
        assert_eq!(TransactionType::Addition.signed(5.0), 5.0);
        assert_eq!(TransactionType::Removal.signed(5.0), -5.0);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let err = UnitOfMeasure::try_from("pound".to_string()).unwrap_err();
        assert_eq!(err.field, "unit_of_measure");
    }
}
