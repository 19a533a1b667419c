use tracing::{error, info};

use super::error::SourceError;
use super::traits::StreamSource;
use crate::domain::Shard;

/// List the complete shard set of `stream_name`
///
/// There is no retry and no partial result: one failure fails the whole
/// enumeration.
pub async fn enumerate_shards<S>(source: &S, stream_name: &str) -> Result<Vec<Shard>, SourceError>
where
    S: StreamSource + ?Sized,
{
    if stream_name.trim().is_empty() {
        return Err(SourceError::InvalidStreamName(stream_name.to_string()));
    }

    match source.list_shards(stream_name).await {
        Ok(shards) => {
            info!(stream = stream_name, shard_count = shards.len(), "Enumerated shards");
            Ok(shards)
        }
        Err(e) => {
            error!(stream = stream_name, error = %e, "Shard enumeration failed");
            Err(e)
        }
    }
}
