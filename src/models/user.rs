use sqlx::FromRow;

/// Minimal referential target for created_by / operator_id / dispensed_by.
/// Authentication lives outside this service.
#[derive(Debug, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
}
