pub mod auth;
pub mod json;
pub mod recommendation_request;
pub mod session;
