pub mod auth;
pub mod dashboard;
pub mod environmental;
pub mod export;
pub mod health;
pub mod map;
pub mod notifications;
pub mod planner;
pub mod process_upload;
pub mod projects;
pub mod recommendations;
pub mod uploads;
pub mod webhooks;
