//! Type definitions

pub mod diagnostic;
pub mod geometry;
pub mod stop;
pub mod tables;

pub use diagnostic::*;
pub use geometry::*;
pub use stop::*;
pub use tables::*;
