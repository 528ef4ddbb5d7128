pub mod fit;
pub mod font;
pub mod style;
pub mod variables;
