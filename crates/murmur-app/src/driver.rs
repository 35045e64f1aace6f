//! Driver trait for abstracting UI I/O.
//!
//! The [`Driver`] trait decouples the application runtime from specific UI
//! implementations. Each frontend implements the trait to provide input
//! events and rendering, while the generic [`crate::Runtime`] handles all
//! orchestration. Backend calls and time are not the driver's concern; they
//! come from the [`murmur_core::Backend`] and [`murmur_core::Environment`]
//! handed to the runtime.

use std::future::Future;

use crate::{App, AppEvent};

/// Abstracts UI I/O for the application runtime.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, ratatui for rendering
/// - **Simulation**: scripted events, rendering counted but not drawn
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next input event.
    ///
    /// Returns `None` if no event is ready. Implementations may wait a short
    /// while for input, which paces the runtime loop.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Release UI resources.
    fn stop(&mut self);
}
