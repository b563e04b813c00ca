//! Multi-threaded software triangle rasterizer.
//!
//! Meshes are transformed to screen space, then scan converted with incremental barycentric
//! weights into a shared atomic depth buffer and a [`Surface`]. How triangles are spread over
//! threads is chosen per frame through [`RenderConfig`].

pub mod config;
pub mod depthbuffer;
pub mod error;
pub mod math;
pub mod rasterizer;
pub mod rendercamera;
pub mod renderer;
pub mod scene;
pub mod sentinelqueue;
pub mod strategy;
pub mod surface;
pub mod transform;
pub mod util;

pub use config::{QueueKind, RenderConfig, Strategy};
pub use depthbuffer::DepthBuffer;
pub use error::RenderError;
pub use rasterizer::{RasterMode, RenderTarget, Triangle, TriangleData};
pub use rendercamera::RenderCamera;
pub use renderer::Renderer;
pub use scene::{Light, Mesh, Scene, Vertex};
pub use surface::{Framebuffer, Surface};
