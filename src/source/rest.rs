//! REST client for a Firebase-style realtime database.
//!
//! - `GET {base}/{collection}.json` returns the whole collection (pull).
//! - The same URL with `Accept: text/event-stream` streams changes (push).
//! - `PATCH {base}/{collection}/{id}.json` marks an order ready.

use crate::model::{OrderId, Snapshot};
use crate::source::stream::{SnapshotFolder, SseParser, StreamEvent};
use crate::source::{OrderActions, SnapshotFeed, SnapshotSource, Subscription, TransportError};
use async_trait::async_trait;
use reqwest::{header, Client, Response, Url};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Capacity of the channel between the stream reader and the board.
const FEED_BUFFER: usize = 16;

#[derive(Clone)]
pub struct RestSource {
    client: Client,
    base_url: Url,
    collection: String,
    auth: Option<String>,
    /// Applied to fetches and actions; streams stay open indefinitely.
    timeout: Duration,
}

impl RestSource {
    /// Creates a source for `collection` under `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Database root, e.g. `https://my-db.firebaseio.com`
    /// * `collection` - Collection path, e.g. `orders`
    /// * `timeout` - Per-request timeout for fetches and actions
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to create HTTP client: {e}")))?;
        let base_url: String = base_url.into();
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| TransportError::Request(format!("Invalid database URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Request(
                "Database URL must be an http(s) root".to_string(),
            ));
        }
        let collection: String = collection.into();

        Ok(Self {
            client,
            base_url,
            collection: collection.trim_matches('/').to_string(),
            auth: None,
            timeout,
        })
    }

    /// Appends `auth=<token>` to every request.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(token.into());
        self
    }

    pub fn collection_url(&self) -> Url {
        self.url(None)
    }

    pub fn order_url(&self, id: &OrderId) -> Url {
        self.url(Some(id.as_str()))
    }

    /// `{base}/{collection}[/{key}].json`, every segment percent-encoded.
    fn url(&self, key: Option<&str>) -> Url {
        let mut segments: Vec<&str> = self
            .collection
            .split('/')
            .filter(|segment| !segment.is_empty())
            .chain(key)
            .collect();
        let last = format!("{}.json", segments.pop().unwrap_or_default());

        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push(&last);
        }
        if let Some(token) = &self.auth {
            url.query_pairs_mut().append_pair("auth", token);
        }
        url
    }

    async fn check(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Reads the event stream until it ends, forwarding a snapshot after every change.
    async fn pump(
        mut response: Response,
        sender: mpsc::Sender<Result<Snapshot, TransportError>>,
    ) {
        let mut parser = SseParser::new();
        let mut folder = SnapshotFolder::new();

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    info!("Order stream ended");
                    let _ = sender.send(Err(TransportError::Closed)).await;
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Order stream failed");
                    let _ = sender.send(Err(e.into())).await;
                    return;
                }
            };

            for message in parser.feed(&chunk) {
                let outcome = StreamEvent::from_message(&message)
                    .and_then(|event| match event {
                        Some(event) => folder.apply(event),
                        None => Ok(false),
                    });
                let item = match outcome {
                    Ok(false) => continue,
                    Ok(true) => Ok(folder.snapshot().clone()),
                    Err(e) => Err(e),
                };
                let fatal = matches!(
                    item,
                    Err(TransportError::Cancelled(_)) | Err(TransportError::AuthRevoked)
                );
                if sender.send(item).await.is_err() {
                    debug!("Subscriber gone, stopping stream reader");
                    return;
                }
                if fatal {
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for RestSource {
    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn fetch_snapshot(&self) -> Result<Snapshot, TransportError> {
        debug!("Fetching collection");
        let response = self
            .client
            .get(self.collection_url())
            .timeout(self.timeout)
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        let snapshot = Snapshot::from_json(&body)?;
        debug!(orders = snapshot.len(), "Fetched collection");
        Ok(snapshot)
    }
}

#[async_trait]
impl SnapshotFeed for RestSource {
    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn subscribe(&self) -> Result<Subscription, TransportError> {
        let response = self
            .client
            .get(self.collection_url())
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check(response).await?;
        info!("Subscribed to order stream");

        let (sender, receiver) = mpsc::channel(FEED_BUFFER);
        let reader = tokio::spawn(Self::pump(response, sender));
        Ok(Subscription::new(receiver, reader))
    }
}

#[async_trait]
impl OrderActions for RestSource {
    #[instrument(skip(self))]
    async fn mark_ready(&self, id: &OrderId) -> Result<(), TransportError> {
        let response = self
            .client
            .patch(self.order_url(id))
            .timeout(self.timeout)
            .json(&json!({ "status": "completed" }))
            .send()
            .await?;
        Self::check(response).await?;
        info!(order_id = %id, "Marked ready");
        Ok(())
    }
}
