pub mod billing;
pub mod chat;
pub mod config;
pub mod cookie;
pub mod error;
pub mod export;
pub mod feedback;
pub mod guard;
pub mod session;
pub mod upgrade;

pub use error::{CoreError, Result, SessionError};
