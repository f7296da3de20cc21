use sqlx::FromRow;

/// Physical bucket a dosed material is discharged into.
#[derive(Debug, FromRow)]
pub struct StorageBucket {
    pub id: i64,
    pub bucket_code: String,
    pub description: Option<String>,
    pub capacity: Option<f64>,
}
