pub mod material;
pub mod production;
pub mod recipe;
pub mod scale;
pub mod storage;
pub mod user;
