use thiserror::Error;

/// Errors raised while delivering an event to the sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Sink responded with status {status}: {body}")]
    Status { status: u16, body: String },
}
