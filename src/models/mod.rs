pub mod material;
pub mod production;
pub mod recipe;
pub mod storage;
pub mod user;

use std::fmt;

/// Raised when a stored status/unit string does not match any enum value.
#[derive(Debug)]
pub struct InvalidEnumValue {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for InvalidEnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {}", self.field, self.value)
    }
}

impl std::error::Error for InvalidEnumValue {}

/// Release state shared by materials and recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReleaseStatus {
    Released,
    Unreleased,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Released => "Released",
            ReleaseStatus::Unreleased => "Unreleased",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ReleaseStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Released" => Ok(ReleaseStatus::Released),
            "Unreleased" => Ok(ReleaseStatus::Unreleased),
            _ => Err(InvalidEnumValue { field: "status", value }),
        }
    }
}
