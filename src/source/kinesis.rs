use async_trait::async_trait;
use aws_sdk_kinesis::Client;
use aws_sdk_kinesis::config::Region;
use aws_sdk_kinesis::error::DisplayErrorContext;
use aws_sdk_kinesis::types::{self as kinesis, ShardIteratorType};
use tracing::debug;

use super::error::SourceError;
use super::traits::StreamSource;
use crate::domain::{Record, RecordBatch, Shard, ShardCursor};

/// Amazon Kinesis Data Streams adapter
///
/// Credentials come from the default AWS provider chain.
#[derive(Clone, Debug)]
pub struct KinesisSource {
    client: Client,
}

impl KinesisSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client for `region` from the ambient AWS configuration
    pub async fn from_region(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&config))
    }
}

impl From<&kinesis::Record> for Record {
    fn from(record: &kinesis::Record) -> Self {
        Self {
            sequence_number: record.sequence_number().to_string(),
            partition_key: record.partition_key().map(str::to_string),
            data: record.data().as_ref().to_vec(),
        }
    }
}

#[async_trait]
impl StreamSource for KinesisSource {
    async fn list_shards(&self, stream_name: &str) -> Result<Vec<Shard>, SourceError> {
        let mut shards = Vec::new();
        let mut next_token: Option<String> = None;

        // ListShards rejects StreamName together with NextToken
        loop {
            let request = match &next_token {
                Some(token) => self.client.list_shards().next_token(token),
                None => self.client.list_shards().stream_name(stream_name),
            };

            let output = request
                .send()
                .await
                .map_err(|e| SourceError::ListShards {
                    stream: stream_name.to_string(),
                    message: DisplayErrorContext(&e).to_string(),
                })?;

            shards.extend(
                output
                    .shards()
                    .iter()
                    .map(|shard| Shard::new(stream_name, shard.shard_id())),
            );

            match output.next_token() {
                Some(token) => {
                    debug!(stream = stream_name, listed = shards.len(), "Following ListShards page");
                    next_token = Some(token.to_string());
                }
                None => break,
            }
        }

        Ok(shards)
    }

    async fn shard_cursor(&self, shard: &Shard) -> Result<ShardCursor, SourceError> {
        let output = self
            .client
            .get_shard_iterator()
            .stream_name(&shard.stream_name)
            .shard_id(&shard.shard_id)
            .shard_iterator_type(ShardIteratorType::TrimHorizon)
            .send()
            .await
            .map_err(|e| SourceError::ShardCursor {
                shard_id: shard.shard_id.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .shard_iterator()
            .map(ShardCursor::new)
            .ok_or_else(|| SourceError::ShardCursor {
                shard_id: shard.shard_id.clone(),
                message: "response carried no shard iterator".to_string(),
            })
    }

    async fn fetch(&self, shard: &Shard, cursor: &ShardCursor) -> Result<RecordBatch, SourceError> {
        let output = self
            .client
            .get_records()
            .shard_iterator(cursor.as_str())
            .send()
            .await
            .map_err(|e| SourceError::Fetch {
                shard_id: shard.shard_id.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let records = output.records().iter().map(Record::from).collect();

        Ok(RecordBatch {
            records,
            next_cursor: output.next_shard_iterator().map(ShardCursor::new),
            millis_behind_latest: output.millis_behind_latest(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_kinesis::primitives::Blob;

    #[test]
    fn converts_sdk_record() {
        let sdk_record = kinesis::Record::builder()
            .sequence_number("49590338271490256608559692538361571095921575989136588898")
            .partition_key("camera-7")
            .data(Blob::new(br#"{"FaceSearchResponse":[]}"#.to_vec()))
            .build()
            .unwrap();

        let record = Record::from(&sdk_record);

        assert_eq!(
            record.sequence_number,
            "49590338271490256608559692538361571095921575989136588898"
        );
        assert_eq!(record.partition_key.as_deref(), Some("camera-7"));
        assert_eq!(record.data, br#"{"FaceSearchResponse":[]}"#.to_vec());
    }

    #[test]
    fn missing_partition_key_is_kept_as_none() {
        let sdk_record = kinesis::Record::builder()
            .sequence_number("1")
            .data(Blob::new(b"{}".to_vec()))
            .build()
            .unwrap();

        assert_eq!(Record::from(&sdk_record).partition_key, None);
    }
}
