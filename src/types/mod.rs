//! Provider-agnostic request and response shapes.

pub mod request;
pub mod response;
pub mod streaming;

// Re-export commonly used types
pub use request::*;
pub use response::*;
pub use streaming::*;
