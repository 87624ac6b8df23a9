//! HTTP client for the message broker's management API.
//!
//! Covers the three operations the system needs: queue depth inspection
//! (with lazy declaration when the queue does not exist yet), publishing a
//! job id, and the worker-side single-message pop.

use serde::Deserialize;

use shapecloud_core::fleet::QueueDepth;

/// Errors from the broker management API layer.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The broker returned a non-2xx status code.
    #[error("Broker API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Queue info subset returned by `GET /api/queues/{vhost}/{name}`.
#[derive(Debug, Deserialize)]
struct QueueInfo {
    #[serde(default)]
    messages_ready: u64,
}

/// Response of the publish endpoint.
#[derive(Debug, Deserialize)]
struct PublishResponse {
    routed: bool,
}

/// One message returned by the basic-get endpoint.
#[derive(Debug, Deserialize)]
struct GetMessage {
    payload: String,
}

/// HTTP client for one broker management endpoint.
pub struct BrokerClient {
    client: reqwest::Client,
    management_url: String,
    vhost: String,
    username: String,
    password: String,
}

impl BrokerClient {
    /// Create a client for a management endpoint, e.g.
    /// `http://broker:15672`.
    pub fn new(
        management_url: String,
        vhost: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            management_url,
            vhost,
            username,
            password,
        }
    }

    /// Build a client from `BROKER_*` environment variables with local
    /// development defaults.
    pub fn from_env() -> Self {
        let management_url = std::env::var("BROKER_MANAGEMENT_URL")
            .unwrap_or_else(|_| "http://localhost:15672".into());
        let vhost = std::env::var("BROKER_VHOST").unwrap_or_else(|_| "/".into());
        let username = std::env::var("BROKER_USERNAME").unwrap_or_else(|_| "guest".into());
        let password = std::env::var("BROKER_PASSWORD").unwrap_or_else(|_| "guest".into());
        Self::new(management_url, vhost, username, password)
    }

    /// Number of ready (unconsumed) messages in `queue`.
    ///
    /// A queue that does not exist yet is declared (non-durable, matching
    /// the worker queue's declaration) and `Unknown` is returned; callers
    /// must not treat `Unknown` as empty.
    pub async fn queue_depth(&self, queue: &str) -> Result<QueueDepth, BrokerError> {
        let response = self
            .request(reqwest::Method::GET, &self.queue_url(queue))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.declare_queue(queue).await?;
            return Ok(QueueDepth::Unknown);
        }

        let info: QueueInfo = Self::parse_response(response).await?;
        Ok(QueueDepth::Ready(info.messages_ready))
    }

    /// Declare `queue` (idempotent on the broker side).
    pub async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let response = self
            .request(reqwest::Method::PUT, &self.queue_url(queue))
            .json(&serde_json::json!({ "durable": false, "auto_delete": false }))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Publish one message to `queue` via the default exchange.
    pub async fn publish(&self, queue: &str, payload: &str) -> Result<(), BrokerError> {
        let url = format!(
            "{}/api/exchanges/{}/amq.default/publish",
            self.management_url,
            self.encoded_vhost(),
        );
        let body = serde_json::json!({
            "properties": {},
            "routing_key": queue,
            "payload": payload,
            "payload_encoding": "string",
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await?;
        let publish: PublishResponse = Self::parse_response(response).await?;

        if !publish.routed {
            // No queue bound to the routing key yet: declare it and retry
            // once so the first trigger after provisioning is not lost.
            self.declare_queue(queue).await?;
            let response = self
                .request(reqwest::Method::POST, &url)
                .json(&body)
                .send()
                .await?;
            let retry: PublishResponse = Self::parse_response(response).await?;
            if !retry.routed {
                tracing::warn!(queue, "Published message was not routed to any queue");
            }
        }
        Ok(())
    }

    /// Pop one message from `queue`, acknowledging it. `None` when the
    /// queue is empty or absent.
    pub async fn pop(&self, queue: &str) -> Result<Option<String>, BrokerError> {
        let url = format!("{}/get", self.queue_url(queue));
        let body = serde_json::json!({
            "count": 1,
            "ackmode": "ack_requeue_false",
            "encoding": "auto",
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let messages: Vec<GetMessage> = Self::parse_response(response).await?;
        Ok(messages.into_iter().next().map(|m| m.payload))
    }

    // ---- private helpers ----

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn queue_url(&self, queue: &str) -> String {
        format!(
            "{}/api/queues/{}/{}",
            self.management_url,
            self.encoded_vhost(),
            queue,
        )
    }

    /// The default vhost `/` must be percent-encoded in management URLs.
    fn encoded_vhost(&self) -> String {
        if self.vhost == "/" {
            "%2f".to_string()
        } else {
            self.vhost.clone()
        }
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`BrokerError::Api`] with the status and
    /// body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BrokerError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BrokerError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), BrokerError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
