pub mod exercise;
pub mod stress;
