//! In-memory stores.

pub mod session;
pub mod user;

pub use session::InMemorySessionStore;
pub use user::InMemoryUserRepository;
