pub mod preview;
pub mod sdl2;

pub use preview::{PreviewError, PreviewMode, PreviewSurface};
pub use sdl2::Sdl2Preview;
