//! Crate-wide error and result types.

/// Errors returned by the simulated LED strip and its viewer.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum Error {
    /// A pixel index was outside `0..len`.
    #[display("pixel index {index} out of range for a strip of {len} pixels")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// Number of pixels in the strip.
        len: usize,
    },

    /// `begin` was called on a strip that already has a viewer.
    #[display("the viewer for this strip was already started")]
    AlreadyStarted,

    /// The viewer thread could not be spawned.
    #[display("failed to spawn viewer thread: {_0}")]
    ViewerSpawn(#[error(source)] std::io::Error),

    /// The viewer thread panicked before it could report a result.
    #[display("viewer thread panicked")]
    ViewerPanicked,

    /// A renderer failed to write its output.
    #[from]
    #[display("renderer I/O error: {_0}")]
    Io(#[error(source)] std::io::Error),

    /// PNG encoding failed.
    #[cfg(feature = "png")]
    #[from]
    #[display("PNG encoding error: {_0}")]
    Png(#[error(source)] png::EncodingError),

    /// The on-screen window could not be created or drawn.
    #[cfg(feature = "window")]
    #[display("window error: {_0}")]
    Window(#[error(not(source))] String),
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
