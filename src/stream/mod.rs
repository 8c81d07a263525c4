//! Streaming CSV replies and the requests that produce them.

pub mod csv_stream;
pub mod request;
