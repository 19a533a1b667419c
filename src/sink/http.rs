use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::error::SinkError;
use super::traits::EventSink;
use crate::domain::StructuredEvent;

const MAX_ERROR_BODY: usize = 512;

/// POSTs structured events to a fixed URL
#[derive(Clone, Debug)]
pub struct HttpSink {
    client: Client,
    url: Url,
}

impl HttpSink {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError> {
        let mut request = self.client.post(self.url.clone());
        for (name, value) in &event.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(event.body.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }

        Err(SinkError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one request, answer with `status_line`, return the raw request
    async fn one_shot_server(status_line: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!("{status_line}\r\ncontent-length: 4\r\nconnection: close\r\n\r\nnope");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8(request).unwrap()
        });

        (url, handle)
    }

    fn event() -> StructuredEvent {
        StructuredEvent {
            headers: vec![(
                "content-type".to_string(),
                "application/cloudevents+json; charset=utf-8".to_string(),
            )],
            body: br#"{"specversion":"1.0"}"#.to_vec(),
        }
    }

    #[tokio::test]
    async fn posts_body_with_envelope_headers() {
        let (url, server) = one_shot_server("HTTP/1.1 202 Accepted").await;
        let sink = HttpSink::new(url, Duration::from_secs(5)).unwrap();

        sink.deliver(&event()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST / HTTP/1.1"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: application/cloudevents+json; charset=utf-8")
        );
        assert!(request.ends_with(r#"{"specversion":"1.0"}"#));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, server) = one_shot_server("HTTP/1.1 503 Service Unavailable").await;
        let sink = HttpSink::new(url, Duration::from_secs(5)).unwrap();

        let result = sink.deliver(&event()).await;
        server.await.unwrap();

        match result {
            Err(SinkError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "nope");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_sink_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let sink = HttpSink::new(url, Duration::from_secs(5)).unwrap();
        let result = sink.deliver(&event()).await;

        assert!(matches!(result, Err(SinkError::Transport(_))));
    }
}
