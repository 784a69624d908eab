//! # Document Handlers
//!
//! The dispatcher that turns inbound documents into domain entities and
//! events, and the inbox transports feed it through.

pub mod dispatch;
pub mod inbox;

pub use dispatch::{
    DispatchError, DocumentDispatcher, IdentityInterceptor, Interceptor, TransactionInterceptor,
};
pub use inbox::{DocumentInbox, InboxReceiver};
