pub mod aggregation;
pub mod assignment;
pub mod performance;
pub mod transition;
