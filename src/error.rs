/// Errors that stop a frame from being rendered.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A per-frame buffer could not be allocated. No frame can proceed without it.
    #[error("failed to allocate {what} ({cells} cells)")]
    Allocation { what: &'static str, cells: usize },

    /// The renderer configuration is unusable (e.g. zero worker threads).
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),

    /// The surface does not match the depth buffer the renderer was created with.
    #[error("surface is {surface_width}x{surface_height} but the depth buffer is {width}x{height}")]
    SurfaceMismatch {
        surface_width: usize,
        surface_height: usize,
        width: usize,
        height: usize,
    },

    /// A worker thread panicked while rasterizing.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    /// Writing a framebuffer image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
