//! HTTP handlers, one module per resource.

pub mod health;
pub mod listings;
pub mod orders;
pub mod users;
