use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{InvalidEnumValue, ReleaseStatus};

/// Lifecycle of a dosing record. `pending` and `in progress` are the only
/// stages a weight capture may advance; the rest are terminal for dosing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeMaterialStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "created")]
    Created,
    Released,
    Unreleased,
}

impl RecipeMaterialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeMaterialStatus::Pending => "pending",
            RecipeMaterialStatus::InProgress => "in progress",
            RecipeMaterialStatus::Created => "created",
            RecipeMaterialStatus::Released => "Released",
            RecipeMaterialStatus::Unreleased => "Unreleased",
        }
    }
}

impl fmt::Display for RecipeMaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RecipeMaterialStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(RecipeMaterialStatus::Pending),
            "in progress" => Ok(RecipeMaterialStatus::InProgress),
            "created" => Ok(RecipeMaterialStatus::Created),
            "Released" => Ok(RecipeMaterialStatus::Released),
            "Unreleased" => Ok(RecipeMaterialStatus::Unreleased),
            _ => Err(InvalidEnumValue { field: "recipe material status", value }),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub version: String,
    #[sqlx(try_from = "String")]
    pub status: ReleaseStatus,
    pub created_by: i64,
    pub barcode_id: Option<String>,
    pub no_of_materials: Option<i32>,
    pub sequence: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One dosing line of a recipe: dose `material_id` to `set_point`.
#[derive(Debug, FromRow)]
pub struct RecipeMaterial {
    pub id: i64,
    pub recipe_id: i64,
    pub material_id: i64,
    pub bucket_id: Option<i64>,
    pub set_point: Option<f64>,
    pub actual: Option<f64>,
    pub margin: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: RecipeMaterialStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_keep_legacy_spellings() {
        assert_eq!(RecipeMaterialStatus::InProgress.as_str(), "in progress");
        assert_eq!(
            RecipeMaterialStatus::try_from("in progress".to_string()).unwrap(),
            RecipeMaterialStatus::InProgress
        );
        // Release states are capitalized, dosing states are not.
        assert_eq!(RecipeMaterialStatus::Released.as_str(), "Released");
        assert!(RecipeMaterialStatus::try_from("In Progress".to_string()).is_err());
    }

    #[test]
    fn serde_wire_format_matches_storage_format() {
        let s: RecipeMaterialStatus = serde_json::from_str("\"in progress\"").unwrap();
        assert_eq!(s, RecipeMaterialStatus::InProgress);
        assert_eq!(
            serde_json::to_string(&RecipeMaterialStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
