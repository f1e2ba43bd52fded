pub mod audit;
pub mod metrics;
pub mod notify;
pub mod rules;
pub mod users;
