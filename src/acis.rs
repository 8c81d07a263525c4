//! The main entry point: an ACIS Web Services client that issues calls and
//! returns normalized results and record streams.

use crate::clients::request_queue::RequestQueue;
use crate::clients::web_services_call::{CallType, WebServicesCall, DEFAULT_SERVER};
use crate::error::AcisError;
use crate::result::data_result::DataResult;
use crate::result::meta_result::StnMetaResult;
use crate::result::Query;
use crate::stream::csv_stream::CsvStream;
use crate::stream::request::StreamRequest;
use crate::types::interval::Interval;
use bon::bon;
use log::info;
use serde_json::{Map, Value};

/// The client for ACIS Web Services.
///
/// JSON calls are asynchronous and return fully normalized results. CSV
/// calls are opened with a blocking connection and read incrementally
/// through a [`CsvStream`].
///
/// # Examples
///
/// ```no_run
/// # use acis::{Acis, AcisError};
/// # use serde_json::json;
/// # #[tokio::main]
/// # async fn main() -> Result<(), AcisError> {
/// let client = Acis::new();
/// let result = client
///     .multi_stn_data(json!({
///         "sids": "okc,tul",
///         "sdate": "2011-12-31",
///         "edate": "2012-01-01",
///         "elems": "maxt,mint",
///         "meta": "uid,name",
///     }))
///     .await?;
/// for record in &result {
///     println!("{} {} {}", record.uid(), record["date"], record["maxt"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Acis {
    client: reqwest::Client,
    server: String,
}

impl Default for Acis {
    fn default() -> Self {
        Self::new()
    }
}

#[bon]
impl Acis {
    /// Creates a client for the public server at `https://data.rcc-acis.org`.
    pub fn new() -> Self {
        Self::with_server(DEFAULT_SERVER)
    }

    /// Creates a client for another server, e.g. a mirror or a test double.
    pub fn with_server(server: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            server: server.trim_end_matches('/').to_string(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// The endpoint for one call type, sharing this client's connection pool.
    pub fn call(&self, call_type: CallType) -> WebServicesCall {
        WebServicesCall::with_client(self.client.clone(), &self.server, call_type)
    }

    /// An empty batch of calls to run concurrently.
    pub fn queue(&self) -> RequestQueue {
        RequestQueue::new(self.client.clone(), &self.server)
    }

    /// Issues a call and pairs the raw reply with its parameters.
    pub async fn query(&self, call_type: CallType, params: Value) -> Result<Query, AcisError> {
        let result = self.call(call_type).execute(&params).await?;
        Ok(Query::new(params, result))
    }

    /// Issues a `StnMeta` call and keys the site metadata by UID.
    ///
    /// `uid` is always added to the requested `meta` fields when a `meta`
    /// list is given, since results are keyed by it.
    pub async fn stn_meta(&self, params: Value) -> Result<StnMetaResult, AcisError> {
        let query = self.query(CallType::StnMeta, with_uid(params)).await?;
        StnMetaResult::new(&query)
    }

    /// Issues a `StnData` call and normalizes the reply.
    pub async fn stn_data(&self, params: Value) -> Result<DataResult, AcisError> {
        let query = self.query(CallType::StnData, with_uid(params)).await?;
        DataResult::stn_data(&query)
    }

    /// Issues a `MultiStnData` call and normalizes the reply.
    pub async fn multi_stn_data(&self, params: Value) -> Result<DataResult, AcisError> {
        let query = self.query(CallType::MultiStnData, with_uid(params)).await?;
        DataResult::multi_stn_data(&query)
    }

    /// Opens a single-site CSV stream.
    ///
    /// # Arguments
    ///
    /// * `sid` - **Required.** The site identifier (start argument).
    /// * `.sdate(&str)` - **Required.** A date, or `"por"` for the period of record.
    /// * `.edate(&str)` - Optional end date; without it `sdate` is a single date.
    /// * `.elems(..)` - **Required.** Elements as a comma string or a JSON list.
    /// * `.interval(Interval)` - Optional; defaults to [`Interval::Daily`].
    ///
    /// # Errors
    ///
    /// Fails on invalid parameters, on transport errors, and with
    /// [`AcisError::Request`] when the server replies with an error line.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use acis::{Acis, AcisError};
    /// let client = Acis::new();
    /// let stream = client
    ///     .stn_data_stream("okc")
    ///     .sdate("2011-12-31")
    ///     .edate("2012-01-31")
    ///     .elems("maxt,mint")
    ///     .call()?;
    /// for record in stream {
    ///     let record = record?;
    ///     println!("{} {}", record["date"], record["maxt"]);
    /// }
    /// # Ok::<(), AcisError>(())
    /// ```
    #[builder]
    pub fn stn_data_stream(
        &self,
        #[builder(start_fn)] sid: &str,
        sdate: &str,
        edate: Option<&str>,
        #[builder(into)] elems: Value,
        interval: Option<Interval>,
    ) -> Result<CsvStream<reqwest::blocking::Response>, AcisError> {
        let request = StreamRequest::stn_data(sid, sdate, edate, &elems, &interval.unwrap_or_default())?;
        self.open_stream(CallType::StnData, request)
    }

    /// Opens a multi-site CSV stream for a single date.
    ///
    /// # Arguments
    ///
    /// * `date` - **Required.** The date (start argument); the period of
    ///   record is not accepted.
    /// * At least one location option: `.sids`, `.county`, `.state`,
    ///   `.climdiv`, `.cwa`, `.basin` or `.bbox`.
    /// * `.elems(..)` - **Required.** Elements as a comma string or a JSON list.
    /// * `.interval(Interval)` - Optional; defaults to [`Interval::Daily`].
    ///
    /// Site metadata (name, state, elevation, coordinates) is collected into
    /// [`CsvStream::meta`] as lines are read.
    #[builder]
    #[allow(clippy::too_many_arguments)]
    pub fn multi_stn_data_stream(
        &self,
        #[builder(start_fn)] date: &str,
        sids: Option<&str>,
        county: Option<&str>,
        state: Option<&str>,
        climdiv: Option<&str>,
        cwa: Option<&str>,
        basin: Option<&str>,
        bbox: Option<&str>,
        #[builder(into)] elems: Value,
        interval: Option<Interval>,
    ) -> Result<CsvStream<reqwest::blocking::Response>, AcisError> {
        let location: Map<String, Value> = [
            ("sids", sids),
            ("county", county),
            ("state", state),
            ("climdiv", climdiv),
            ("cwa", cwa),
            ("basin", basin),
            ("bbox", bbox),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::from(v))))
        .collect();
        let request =
            StreamRequest::multi_stn_data(date, location, &elems, &interval.unwrap_or_default())?;
        self.open_stream(CallType::MultiStnData, request)
    }

    fn open_stream(
        &self,
        call_type: CallType,
        request: StreamRequest,
    ) -> Result<CsvStream<reqwest::blocking::Response>, AcisError> {
        let response = self.call(call_type).open_stream(&request.params)?;
        info!("Streaming {} records for {:?}", call_type, request.layout);
        CsvStream::open(response, request.layout, request.elems)
    }
}

/// Adds `uid` to an explicit `meta` field list.
fn with_uid(mut params: Value) -> Value {
    if let Some(meta) = params.get_mut("meta") {
        match meta {
            Value::String(fields) if !fields.split(',').any(|f| f.trim() == "uid") => {
                *meta = Value::from(format!("uid,{}", fields));
            }
            Value::Array(fields) if !fields.iter().any(|f| f == "uid") => {
                fields.insert(0, Value::from("uid"));
            }
            _ => {}
        }
    }
    params
}
