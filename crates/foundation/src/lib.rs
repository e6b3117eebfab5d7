pub mod geo;
pub mod handles;
pub mod ids;

// Foundation crate: small, well-tested primitives only.
pub use geo::*;
pub use handles::*;
pub use ids::*;
