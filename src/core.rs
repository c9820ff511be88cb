pub mod align;
pub mod allocation;
pub mod consumer;
pub mod error;
pub mod series;
pub mod spot;
pub mod valuation;
