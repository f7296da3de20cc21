// src/dtos/storage.rs
use serde::{Deserialize, Serialize};

use crate::models::storage::StorageBucket;

#[derive(Debug, Deserialize)]
pub struct CreateBucketRequest {
    pub bucket_code: String,
    pub description: Option<String>,
    pub capacity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct BucketResponse {
    pub id: i64,
    pub bucket_code: String,
    pub description: Option<String>,
    pub capacity: Option<f64>,
}

impl From<StorageBucket> for BucketResponse {
    fn from(b: StorageBucket) -> Self {
        Self {
            id: b.id,
            bucket_code: b.bucket_code,
            description: b.description,
            capacity: b.capacity,
        }
    }
}
