//! Error type shared by every fallible operation in the crate.

use std::io;

use thiserror::Error;

use crate::geometry::WindowHandle;

/// Result alias used throughout [`hudlayer`](crate).
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by overlay construction, rendering and settings I/O.
///
/// Construction failures ([`Error::InvalidParentWindow`],
/// [`Error::WindowCreation`], [`Error::DeviceCreation`]) are fatal: the
/// overlay is unusable and the host is expected to abort whatever it was
/// setting up.
#[derive(Debug, Error)]
pub enum Error {
    /// The parent window handle passed to an attached overlay is null or does
    /// not identify a live window.
    #[error("the handle of the parent window isn't valid: {0:?}")]
    InvalidParentWindow(WindowHandle),

    /// The native overlay window could not be created.
    #[error("could not create overlay window: {0}")]
    WindowCreation(String),

    /// The drawing device bound to the overlay window could not be created.
    #[error("could not create drawing device: {0}")]
    DeviceCreation(String),

    /// A native Windows API call failed.
    #[cfg(windows)]
    #[error(transparent)]
    Native(#[from] windows::core::Error),

    /// A non-native backend reported a failure.
    #[error("backend failure: {0}")]
    Backend(String),

    /// A lifecycle operation was invoked in a state that does not allow it.
    #[error("cannot {operation} while the overlay is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The lifecycle state at the time of the call.
        state: &'static str,
    },

    /// Settings could not be read or written.
    #[error("settings i/o: {0}")]
    Settings(#[from] io::Error),

    /// Settings could not be encoded or decoded.
    #[error("settings format: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}
