pub mod alignment;
pub mod config;
pub mod domain;
pub mod reconcile;
pub mod schedule;
pub mod source;
pub mod telemetry;
pub mod view;
