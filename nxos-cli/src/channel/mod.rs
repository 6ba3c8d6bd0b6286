//! Channel layer: sessions, action maps and the dispatch engine.
//!
//! This module handles the interactive side of a device session:
//! prompt detection on ANSI-stripped output and automatic answers to
//! questions the device asks along the way.

mod action;
mod buffer;
pub mod dispatch;
mod session;

pub use action::{Action, ActionMap, InlineSecret, SecretRef, Trigger};
pub use buffer::PatternBuffer;
pub use session::{Credentials, Session};
