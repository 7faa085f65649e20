//! Progress reporting for the CLI
//!
//! The core reports through a [`ProgressProvider`](cashier_core::ProgressProvider);
//! a channel carries the updates to a renderer task that prints them.

pub mod provider;
pub mod renderer;

pub use provider::{ChannelProvider, create_progress_infrastructure};
pub use renderer::{ProgressRenderer, join_renderer, render_progress};
