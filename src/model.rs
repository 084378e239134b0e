//! Core data model for Tattle.
//!
//! These types describe one outgoing report: its content items,
//! the identity used for consent tracking, and the server addresses.

mod content;
mod identity;
mod url;

pub use content::{Attachment, Body, ContentItem, ContentKind, Field, Truncation};
pub use identity::Identity;
pub use url::{ParsedUrl, UrlError};
