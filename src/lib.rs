//! Shard stream to CloudEvents ingester
//!
//! Reads every shard of a Kinesis stream from its trim horizon, drops records
//! whose result field is empty, and POSTs the rest as structured CloudEvents
//! to an HTTP sink.

pub mod app;
pub mod domain;
pub mod prelude;
pub mod sink;
pub mod source;
pub mod streaming;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
