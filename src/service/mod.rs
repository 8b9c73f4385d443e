pub mod analytics;
pub mod classifier;
pub mod export;
pub mod map;
pub mod planner;
pub mod provisioning;
pub mod recommendations;
pub mod webhook;
