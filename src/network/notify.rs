// src/network/notify.rs
//! Work notifications
//!
//! Every new work package is POSTed to the configured endpoints, either as
//! the `[sealHash, seedHash, target, number]` string array or as the full
//! header object. Delivery is fire-and-forget: requests run on a small
//! runtime owned by the notifier and failures are only logged.

use crate::miner::remote::WorkPackage;
use crate::types::Header;
use crate::utils::error::FrkhashError;
use futures::future::join_all;
use log::{trace, warn};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use url::Url;

/// Timeout of a single notification request
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(1);

/// Posts new work to remote listeners
pub struct Notifier {
    urls: Vec<Url>,
    full: bool,
    client: Client,
    runtime: Option<Runtime>,
}

impl Notifier {
    /// Creates a notifier
    ///
    /// # Arguments
    /// * `urls` - Endpoints to notify
    /// * `full` - Send the complete header instead of the work array
    pub fn new(urls: Vec<Url>, full: bool) -> Result<Self, FrkhashError> {
        let client = Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("frkhash-notify")
            .enable_all()
            .build()?;
        Ok(Notifier {
            urls,
            full,
            client,
            runtime: Some(runtime),
        })
    }

    /// Endpoints this notifier posts to
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    /// Queues notifications for a new work package and returns immediately
    pub fn notify(&self, work: &WorkPackage, header: &Header) {
        if self.urls.is_empty() {
            return;
        }
        let body = if self.full {
            serde_json::to_vec(header)
        } else {
            serde_json::to_vec(&work.to_strings())
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode work notification: {}", e);
                return;
            }
        };

        let requests: Vec<_> = self
            .urls
            .iter()
            .map(|url| {
                let request = self
                    .client
                    .post(url.clone())
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
                let url = url.clone();
                async move { (url, request.send().await) }
            })
            .collect();

        let Some(runtime) = &self.runtime else {
            return;
        };
        runtime.spawn(async move {
            for (url, outcome) in join_all(requests).await {
                match outcome {
                    Ok(resp) => trace!("Notified remote miner {} ({})", url, resp.status()),
                    Err(e) => warn!("Failed to notify remote miner {}: {}", url, e),
                }
            }
        });
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // pending posts are abandoned; this also works from async contexts
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
