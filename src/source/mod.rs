pub mod enumerator;
pub mod error;
pub mod kinesis;
pub mod traits;

// Re-export commonly used types
pub use enumerator::enumerate_shards;
pub use error::SourceError;
pub use kinesis::KinesisSource;
pub use traits::StreamSource;
