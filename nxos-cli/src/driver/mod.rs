//! CLI service layer.
//!
//! [`CliHandler`] opens sessions and runs the session start sequence;
//! [`CliService`] sends commands in a given command mode, navigating the
//! [`ModeGraph`] as needed.

mod builder;
mod handler;
mod mode_graph;
pub(crate) mod response;
mod service;
mod settings;

pub use builder::CliHandlerBuilder;
pub use handler::CliHandler;
pub use mode_graph::{ModeGraph, Transition};
pub use response::Response;
pub use service::CliService;
pub use settings::CliSettings;
