pub mod dashboard;
pub mod db;
pub mod metrics;
pub mod rate_limit;
pub mod reconcile;
