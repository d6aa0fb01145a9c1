// Library exports for the outlook-asana crate
// Both binaries (migration and analytics) are built on these modules

pub mod analytics;
pub mod asana_client;
pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod graph_client;
pub mod migration;
pub mod task;
