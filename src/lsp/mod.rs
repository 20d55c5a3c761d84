//! LSP Protocol Implementation
//!
//! Framing, message model and the synchronous dispatcher.

pub mod handlers;
pub mod message;
pub mod server;
pub mod transport;

pub use message::{Message, Notification, Request, Response};
pub use server::{Server, ServerError, ServerState};
