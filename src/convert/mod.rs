pub mod blend;
pub mod color;
pub mod diagnostics;
pub mod geometry;
pub mod mask;
pub mod opacity;
pub mod options;
pub mod path;
pub mod session;
