//! A client for ACIS Web Services climate data.
//!
//! Replies are normalized into site-keyed results ([`StnMetaResult`],
//! [`DataResult`]) or read incrementally from CSV output ([`CsvStream`]).
//! Both yield uniform [`Record`]s: `uid`, `date`, then one value per
//! requested element, labelled by its alias.

mod acis;
mod clients;
mod error;
mod result;
mod stream;
mod types;
mod utils;

pub use acis::Acis;
pub use error::AcisError;

pub use clients::request_queue::{RequestQueue, DEFAULT_IN_FLIGHT_LIMIT};
pub use clients::web_services_call::{CallType, WebServicesCall, DEFAULT_SERVER};

pub use result::data_result::DataResult;
pub use result::meta_result::StnMetaResult;
pub use result::Query;

pub use stream::csv_stream::{CsvStream, StreamLayout, StreamState};
pub use stream::request::{date_params, StreamRequest, LOCATION_OPTIONS};

pub use types::date_label::{date_object, date_string, date_trunc, DateLabel};
pub use types::date_range::{date_range, DateRange};
pub use types::element::{annotate, element_aliases, parse_elements, Element, ElementIdent, ElementSpec};
pub use types::interval::{Interval, Precision};
pub use types::record::{Meta, Record, Row};

pub use utils::{parse_sid, sids_table};
