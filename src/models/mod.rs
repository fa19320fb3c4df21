pub mod assignment;
pub mod metrics;
pub mod order;
pub mod partner;
