//! Error types for the browser crate.

use std::io;

use thiserror::Error;

/// Failure to fetch a document or subresource.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The URL scheme or form is not one this loader serves.
    #[error("unsupported URL '{0}'")]
    UnsupportedUrl(String),
    /// Nothing exists at the URL.
    #[error("no document at '{0}'")]
    NotFound(String),
    /// Reading a local file failed.
    #[error("failed to read '{path}'")]
    Io {
        /// The file that could not be read.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Failure reported by a script host.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script raised an error while running.
    #[error("script '{name}' failed: {message}")]
    Runtime {
        /// Script URL or handler name.
        name: String,
        /// Host-supplied description.
        message: String,
    },
}

/// Failure while rasterizing or drawing a frame.
#[derive(Debug, Error)]
pub enum RasterError {
    /// A surface of the requested size could not be allocated.
    #[error("cannot allocate a {width}x{height} surface")]
    Surface {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The presenter rejected the frame.
    #[error(transparent)]
    Present(#[from] PresentError),
}

/// Failure to hand a finished frame to the display.
#[derive(Debug, Error)]
pub enum PresentError {
    /// The display went away.
    #[error("presenter is closed")]
    Closed,
    /// The frame could not be written out.
    #[error("failed to write frame: {0}")]
    Write(String),
}

/// Top-level browser failures.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// A worker or timer thread could not be started.
    #[error("failed to spawn thread '{name}'")]
    Spawn {
        /// Thread name.
        name: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Rasterization failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}
