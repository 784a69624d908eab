//! # Shared Types Crate
//!
//! This crate contains the network documents, their structural
//! classification, and the domain entities exchanged between subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Classify Once**: A raw JSON document is classified exactly once, when it
//!   is parsed into a [`Document`]; downstream code matches on the variant.
//! - **Legacy Precedence**: Classification follows the fixed order
//!   Membership → Block → PeerAnnouncement so that ambiguous documents from
//!   older producers are routed the same way everywhere.

pub mod digest;
pub mod document;
pub mod endpoint;
pub mod entities;
pub mod errors;
pub mod merkle;

pub use document::{is_truthy, Document, DocumentKind};
pub use endpoint::{Endpoint, BASIC_MERKLED_API};
pub use entities::*;
pub use errors::*;
pub use merkle::MerkleSummary;

/// Document format version written into locally produced documents.
pub const DOCUMENT_VERSION: u32 = 1;
