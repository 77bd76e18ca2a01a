pub mod endpoints;

pub use endpoints::*;
