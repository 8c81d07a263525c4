use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcisError {
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("invalid date '{0}': expected YYYY[-MM[-DD]]")]
    InvalidDate(String),

    #[error("uid is a required meta element")]
    MissingUid,

    /// The server parsed the request but the result object reports an error.
    #[error("{0}")]
    Result(String),

    /// The server rejected the request (HTTP 400 or a CSV error marker).
    #[error("{0}")]
    Request(String),

    #[error("invalid request parameters: {0}")]
    Parameter(String),

    #[error("invalid element specification: {0}")]
    InvalidElement(String),

    #[error("groupby results are not supported: dates cannot be reconstructed for grouped data")]
    UnsupportedGroupby,

    #[error("malformed result: {0}")]
    MalformedResult(String),

    #[error("malformed CSV line {line}: expected {expected} fields, found {found}")]
    MalformedLine {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("invalid SID: {0}")]
    InvalidSid(String),

    #[error("unknown SID type: {0}")]
    UnknownSidType(String),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("server did not return a valid JSON object")]
    JsonParse(#[from] serde_json::Error),

    #[error("failed to read CSV stream")]
    Csv(#[from] csv::Error),
}
