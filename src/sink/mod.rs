pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use error::SinkError;
pub use http::HttpSink;
pub use traits::EventSink;
