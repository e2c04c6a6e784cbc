//! # dj-notify
//!
//! `Notifier` implementations: a log sink for development and an HTTP webhook
//! that hands messages to whatever mail relay sits behind it.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use dj_core::traits::Notifier;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

/// Writes every notification to the log instead of delivering it.
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(from = %self.from, to = recipient, subject, body, "notification");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// POSTs each notification as JSON. Any non-2xx answer is an error.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    from: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, from: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building webhook client")?;
        Ok(Self {
            client,
            url: url.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = WebhookMessage {
            from: &self.from,
            to: recipient,
            subject,
            body,
        };
        self.client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .with_context(|| format!("posting to {}", self.url))?
            .error_for_status()
            .context("webhook rejected notification")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one request, answers with `status_line`, returns the raw request.
    async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/notify", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.ends_with(b"}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let response = format!("{status_line}\r\ncontent-length: 0\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (url, handle)
    }

    #[tokio::test]
    async fn webhook_posts_json_message() {
        let (url, server) = one_shot_server("HTTP/1.1 204 No Content").await;
        let notifier = WebhookNotifier::new(url, "noreply@journalsapp.com").unwrap();

        notifier
            .notify("jane@example.org", "Daily Journal Reminder", "Hi there")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /notify"));
        let json = &request[request.find('{').unwrap()..];
        let payload: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(payload["to"], "jane@example.org");
        assert_eq!(payload["from"], "noreply@journalsapp.com");
        assert_eq!(payload["subject"], "Daily Journal Reminder");
    }

    #[tokio::test]
    async fn webhook_error_status_is_an_error() {
        let (url, _server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let notifier = WebhookNotifier::new(url, "noreply@journalsapp.com").unwrap();
        assert!(notifier.notify("jane@example.org", "s", "b").await.is_err());
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier::new("noreply@journalsapp.com")
            .notify("jane@example.org", "s", "b")
            .await
            .is_ok());
    }
}
