//! The HTTP transport: one POST of `params=<json>` to an ACIS call endpoint.

use crate::error::AcisError;
use log::{info, warn};
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

pub const DEFAULT_SERVER: &str = "https://data.rcc-acis.org";

/// The ACIS Web Services call types this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    StnMeta,
    StnData,
    MultiStnData,
}

impl CallType {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            CallType::StnMeta => "StnMeta",
            CallType::StnData => "StnData",
            CallType::MultiStnData => "MultiStnData",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A single call endpoint, e.g. `https://data.rcc-acis.org/StnData`.
#[derive(Debug, Clone)]
pub struct WebServicesCall {
    client: reqwest::Client,
    call_type: CallType,
    url: String,
}

/// Extracts the message of an HTTP 400 reply. The server answers in plain
/// text, or in HTML with the message in a `<p>` element.
fn server_message(body: &str) -> String {
    let body = body.trim();
    body.split_once("<p>")
        .and_then(|(_, rest)| rest.split_once("</p>"))
        .map_or(body, |(message, _)| message.trim())
        .to_string()
}

fn status_error(url: &str, e: reqwest::Error) -> AcisError {
    warn!("HTTP error for {}: {:?}", url, e);
    if let Some(status) = e.status() {
        AcisError::HttpStatus {
            url: url.to_string(),
            status,
            source: e,
        }
    } else {
        AcisError::NetworkRequest(url.to_string(), e)
    }
}

impl WebServicesCall {
    pub fn new(call_type: CallType) -> Self {
        Self::with_client(reqwest::Client::new(), DEFAULT_SERVER, call_type)
    }

    pub fn with_client(client: reqwest::Client, server: &str, call_type: CallType) -> Self {
        Self {
            client,
            call_type,
            url: format!("{}/{}", server.trim_end_matches('/'), call_type.path_segment()),
        }
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts `params` and decodes the JSON reply.
    ///
    /// # Errors
    ///
    /// * [`AcisError::Request`] if the server rejects the parameters (HTTP 400).
    /// * [`AcisError::HttpStatus`] for any other error status.
    /// * [`AcisError::NetworkRequest`] if the request cannot be sent or read.
    /// * [`AcisError::JsonParse`] if the reply is not valid JSON.
    pub async fn execute(&self, params: &Value) -> Result<Value, AcisError> {
        info!("Calling {} with {}", self.url, params);
        let response = self
            .client
            .post(&self.url)
            .form(&[("params", params.to_string())])
            .send()
            .await
            .map_err(|e| AcisError::NetworkRequest(self.url.clone(), e))?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response
                .text()
                .await
                .map_err(|e| AcisError::NetworkRequest(self.url.clone(), e))?;
            let message = server_message(&body);
            warn!("{} rejected the request: {}", self.url, message);
            return Err(AcisError::Request(message));
        }
        let response = response
            .error_for_status()
            .map_err(|e| status_error(&self.url, e))?;
        let body = response
            .text()
            .await
            .map_err(|e| AcisError::NetworkRequest(self.url.clone(), e))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Posts `params` with the blocking client and returns the open reply
    /// for reading as a stream.
    ///
    /// This blocks the calling thread; do not call it from inside an async
    /// runtime.
    pub fn open_stream(&self, params: &Value) -> Result<reqwest::blocking::Response, AcisError> {
        info!("Opening stream from {} with {}", self.url, params);
        let response = reqwest::blocking::Client::new()
            .post(&self.url)
            .form(&[("params", params.to_string())])
            .send()
            .map_err(|e| AcisError::NetworkRequest(self.url.clone(), e))?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response
                .text()
                .map_err(|e| AcisError::NetworkRequest(self.url.clone(), e))?;
            let message = server_message(&body);
            warn!("{} rejected the request: {}", self.url, message);
            return Err(AcisError::Request(message));
        }
        response
            .error_for_status()
            .map_err(|e| status_error(&self.url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url() {
        let call = WebServicesCall::new(CallType::StnData);
        assert_eq!(call.url(), "https://data.rcc-acis.org/StnData");

        let call = WebServicesCall::with_client(reqwest::Client::new(), "http://localhost:8080/", CallType::MultiStnData);
        assert_eq!(call.url(), "http://localhost:8080/MultiStnData");
        assert_eq!(call.call_type().to_string(), "MultiStnData");
    }

    #[test]
    fn test_server_message() {
        assert_eq!(server_message("Need sId\n"), "Need sId");
        assert_eq!(
            server_message("<html><body><h1>400</h1><p> Unknown element: maxq </p></body></html>"),
            "Unknown element: maxq"
        );
        assert_eq!(server_message("<p>unterminated"), "<p>unterminated");
    }

    #[tokio::test]
    #[ignore = "requires the live ACIS server"]
    async fn test_call() -> Result<(), AcisError> {
        let call = WebServicesCall::new(CallType::StnData);
        let params = json!({"sid": "okc", "date": "2012-01-01", "elems": "maxt", "meta": "uid"});
        let result = call.execute(&params).await?;
        assert!(result["meta"]["uid"].is_u64());
        assert_eq!(result["data"][0][0], "2012-01-01");
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires the live ACIS server"]
    async fn test_bad_request() {
        let call = WebServicesCall::new(CallType::StnData);
        let err = call.execute(&json!({})).await.unwrap_err();
        assert!(matches!(err, AcisError::Request(_)));
    }
}
