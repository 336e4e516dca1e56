pub mod compositor;
pub mod font;

pub use compositor::Compositor;
