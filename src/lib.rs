pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use backend::{HostedBackend, SupabaseBackend};
pub use error::LandwatchError;
