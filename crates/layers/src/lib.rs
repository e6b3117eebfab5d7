pub mod markers;
pub mod route;
pub mod tiles;

pub use markers::*;
pub use route::*;
pub use tiles::*;
