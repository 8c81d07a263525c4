use crate::clients::web_services_call::{CallType, WebServicesCall};
use crate::error::AcisError;
use crate::result::Query;
use futures_util::future::try_join_all;
use log::info;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const DEFAULT_IN_FLIGHT_LIMIT: usize = 64;

/// A batch of calls executed concurrently.
///
/// Obtained from [`crate::Acis::queue`]. Payloads come back in submission
/// order, each paired with its request parameters so it can be normalized
/// with [`crate::StnMetaResult`] or [`crate::DataResult`].
#[derive(Debug, Clone)]
pub struct RequestQueue {
    client: reqwest::Client,
    server: String,
    requests: Vec<(CallType, Value)>,
    limit: usize,
}

impl RequestQueue {
    pub(crate) fn new(client: reqwest::Client, server: &str) -> Self {
        Self {
            client,
            server: server.to_string(),
            requests: Vec::new(),
            limit: DEFAULT_IN_FLIGHT_LIMIT,
        }
    }

    /// Caps the number of calls in flight at once (at least one).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn add(&mut self, call_type: CallType, params: Value) -> &mut Self {
        self.requests.push((call_type, params));
        self
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Runs every queued call and returns the payloads in submission order.
    ///
    /// # Errors
    ///
    /// The first failing call fails the whole batch; see
    /// [`WebServicesCall::execute`].
    pub async fn execute(self) -> Result<Vec<Query>, AcisError> {
        info!(
            "Executing {} queued calls, at most {} in flight",
            self.requests.len(),
            self.limit
        );
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let calls = self.requests.into_iter().map(|(call_type, params)| {
            let call = WebServicesCall::with_client(self.client.clone(), &self.server, call_type);
            let semaphore = Arc::clone(&semaphore);
            async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = semaphore.acquire().await.ok();
                let result = call.execute(&params).await?;
                Ok::<_, AcisError>(Query::new(params, result))
            }
        });
        try_join_all(calls).await
    }
}
