pub mod descriptor;
pub mod model;
pub mod text;
