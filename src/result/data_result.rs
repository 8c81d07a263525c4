//! Contains [`DataResult`], the normalized form of `StnData` and `MultiStnData`
//! replies.

use crate::error::AcisError;
use crate::result::{check_error, split_uid, Query};
use crate::types::date_range::date_range;
use crate::types::date_label::DateLabel;
use crate::types::element::{aliases_of, parse_elements, Element};
use crate::types::interval::Interval;
use crate::types::record::{record_fields, Meta, Record, Row};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where record dates come from.
#[derive(Debug, Clone, PartialEq)]
enum SiteDates {
    /// Single-site replies echo the date at the head of every row.
    Echoed(BTreeMap<u64, Vec<String>>),
    /// Multi-site rows carry no date; every site shares the range rebuilt
    /// from the request parameters.
    Shared(Vec<String>),
}

/// A normalized data reply, keyed by site UID.
///
/// Holds the site metadata, the data rows (one value per requested element,
/// in request order) and the optional summary row of every site, plus the
/// element aliases used to label record fields.
///
/// Iterating yields one [`Record`] per data row: sites in ascending UID
/// order, rows in reply order. Iteration does not modify the result and can
/// be repeated.
///
/// # Examples
///
/// ```
/// use acis::{DataResult, Query};
/// use serde_json::json;
///
/// let query = Query::new(
///     json!({"sids": "okc", "sdate": "2011-12-31", "edate": "2012-01-01", "elems": "maxt,mint"}),
///     json!({"data": [
///         {"meta": {"uid": 17, "name": "OKC"}, "data": [["50", "28"], ["48", "25"]]},
///     ]}),
/// );
/// let result = DataResult::multi_stn_data(&query)?;
/// assert_eq!(result.len(), 2);
///
/// let first = result.iter().next().unwrap();
/// assert_eq!(first.date(), Some("2011-12-31"));
/// assert_eq!(first["maxt"], "50");
/// # Ok::<(), acis::AcisError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataResult {
    meta: BTreeMap<u64, Meta>,
    data: BTreeMap<u64, Vec<Row>>,
    smry: BTreeMap<u64, Row>,
    elems: Vec<String>,
    fields: Arc<[String]>,
    interval: Interval,
    dates: SiteDates,
}

/// Element aliases and effective interval of a request.
struct RequestContext {
    elems: Vec<String>,
    interval: Interval,
}

impl RequestContext {
    fn new(params: &Value) -> Result<Self, AcisError> {
        let elements = parse_elements(params.get("elems").unwrap_or(&Value::Null))?;
        if elements.iter().any(Element::is_grouped) {
            return Err(AcisError::UnsupportedGroupby);
        }
        // All elements of a call share one interval; the first one decides.
        let interval = match elements.first() {
            Some(element) => element.interval()?.unwrap_or_default(),
            None => Interval::default(),
        };
        Ok(Self {
            elems: aliases_of(&elements),
            interval,
        })
    }
}

impl DataResult {
    /// Normalizes a single-site (`StnData`) reply:
    /// `{"meta": {...}, "data": [[date, v1, ...], ...], "smry": [...]}`.
    ///
    /// The echoed date is split off each row and used as the record date.
    /// `data` and `smry` may each be absent.
    ///
    /// # Errors
    ///
    /// * [`AcisError::Result`] if the reply reports an error.
    /// * [`AcisError::MissingUid`] if the metadata has no `uid`.
    /// * [`AcisError::UnsupportedGroupby`] for grouped element requests.
    /// * [`AcisError::InvalidDate`] if a row carries a malformed date.
    /// * [`AcisError::MalformedResult`] if a row does not hold a date plus one
    ///   value per element.
    pub fn stn_data(query: &Query) -> Result<Self, AcisError> {
        check_error(&query.result)?;
        let context = RequestContext::new(&query.params)?;
        let meta = query.result.get("meta").ok_or(AcisError::MissingUid)?;
        let (uid, meta) = split_uid(meta)?;

        let width = context.elems.len() + 1;
        let mut dates = Vec::new();
        let mut rows = Vec::new();
        for row in rows_of(query.result.get("data"), uid)? {
            let items = row_items(row, width, uid)?;
            let date = items[0].as_str().ok_or_else(|| {
                AcisError::MalformedResult(format!(
                    "site {} row must start with a date, got {}",
                    uid, items[0]
                ))
            })?;
            dates.push(DateLabel::parse(date)?.to_string());
            rows.push(items[1..].to_vec());
        }

        let mut smry = BTreeMap::new();
        if let Some(row) = smry_of(query.result.get("smry"), uid)? {
            smry.insert(uid, row);
        }

        Ok(Self {
            meta: BTreeMap::from([(uid, meta)]),
            data: BTreeMap::from([(uid, rows)]),
            smry,
            fields: record_fields(&context.elems),
            elems: context.elems,
            interval: context.interval,
            dates: SiteDates::Echoed(BTreeMap::from([(uid, dates)])),
        })
    }

    /// Normalizes a multi-site (`MultiStnData`) reply:
    /// `{"data": [{"meta": {...}, "data": [[v1, ...], ...], "smry": [...]}, ...]}`.
    ///
    /// Record dates are rebuilt from the request's `sdate`/`edate` (or `date`)
    /// and the interval of the first element. For a single-date request each
    /// site's data is one flat row and is wrapped as a one-row sequence.
    /// Sites without a summary are left out of [`DataResult::smry`].
    ///
    /// # Errors
    ///
    /// As for [`DataResult::stn_data`], plus [`AcisError::Parameter`] when the
    /// request dates cannot be turned into a range (missing, or period of
    /// record) and [`AcisError::MalformedResult`] when a site has a different
    /// number of rows than the range has dates.
    pub fn multi_stn_data(query: &Query) -> Result<Self, AcisError> {
        check_error(&query.result)?;
        let context = RequestContext::new(&query.params)?;
        let sites = match query.result.get("data") {
            Some(Value::Array(sites)) => sites,
            _ => {
                return Err(AcisError::MalformedResult(
                    "multi-site result must contain a 'data' list".into(),
                ))
            }
        };
        // Every site must carry a uid before any rows are looked at.
        let site_metas = sites
            .iter()
            .map(|site| split_uid(site.get("meta").ok_or(AcisError::MissingUid)?))
            .collect::<Result<Vec<_>, _>>()?;
        let single_date = query.params.get("date").is_some();
        let dates = shared_dates(&query.params, &context.interval)?;

        let mut meta = BTreeMap::new();
        let mut data = BTreeMap::new();
        let mut smry = BTreeMap::new();
        for (site, (uid, site_meta)) in sites.iter().zip(site_metas) {
            let raw_rows = match site.get("data") {
                Some(Value::Array(flat)) if single_date => vec![Value::Array(flat.clone())],
                other => rows_of(other, uid)?.to_vec(),
            };
            let rows = raw_rows
                .iter()
                .map(|row| row_items(row, context.elems.len(), uid).map(<[Value]>::to_vec))
                .collect::<Result<Vec<_>, _>>()?;
            if !rows.is_empty() && rows.len() != dates.len() {
                return Err(AcisError::MalformedResult(format!(
                    "site {} has {} rows but the requested range has {} dates",
                    uid,
                    rows.len(),
                    dates.len()
                )));
            }
            if let Some(row) = smry_of(site.get("smry"), uid)? {
                smry.insert(uid, row);
            }
            meta.insert(uid, site_meta);
            data.insert(uid, rows);
        }

        Ok(Self {
            meta,
            data,
            smry,
            fields: record_fields(&context.elems),
            elems: context.elems,
            interval: context.interval,
            dates: SiteDates::Shared(dates),
        })
    }

    pub fn meta(&self) -> &BTreeMap<u64, Meta> {
        &self.meta
    }

    pub fn data(&self) -> &BTreeMap<u64, Vec<Row>> {
        &self.data
    }

    pub fn smry(&self) -> &BTreeMap<u64, Row> {
        &self.smry
    }

    /// Element aliases, in request order.
    pub fn elems(&self) -> &[String] {
        &self.elems
    }

    /// Record field names: `uid`, `date`, then the element aliases.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Total number of data rows over all sites.
    pub fn len(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dates_for(&self, uid: u64) -> &[String] {
        match &self.dates {
            SiteDates::Echoed(dates) => dates.get(&uid).map(Vec::as_slice).unwrap_or(&[]),
            SiteDates::Shared(dates) => dates,
        }
    }

    /// Iterates over the uniform records of every site.
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.data.iter().flat_map(move |(&uid, rows)| {
            // Each site walks the date sequence from its start.
            rows.iter()
                .zip(self.dates_for(uid))
                .map(move |(row, date)| {
                    let mut values = Vec::with_capacity(self.fields.len());
                    values.push(Value::from(uid));
                    values.push(Value::from(date.as_str()));
                    values.extend(row.iter().cloned());
                    Record::new(self.fields.clone(), values)
                })
        })
    }
}

impl<'a> IntoIterator for &'a DataResult {
    type Item = Record;
    type IntoIter = Box<dyn Iterator<Item = Record> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn rows_of(data: Option<&Value>, uid: u64) -> Result<&[Value], AcisError> {
    match data {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(rows)) => Ok(rows),
        Some(other) => Err(AcisError::MalformedResult(format!(
            "site {} data must be a list, got {}",
            uid, other
        ))),
    }
}

fn row_items(row: &Value, width: usize, uid: u64) -> Result<&[Value], AcisError> {
    match row {
        Value::Array(items) if items.len() == width => Ok(items),
        other => Err(AcisError::MalformedResult(format!(
            "site {} row must be a list of {} values, got {}",
            uid, width, other
        ))),
    }
}

fn smry_of(smry: Option<&Value>, uid: u64) -> Result<Option<Row>, AcisError> {
    match smry {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(other) => Err(AcisError::MalformedResult(format!(
            "site {} smry must be a list, got {}",
            uid, other
        ))),
    }
}

fn date_param<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, AcisError> {
    match params.get(key) {
        None => Ok(None),
        Some(Value::String(date)) if date.eq_ignore_ascii_case("por") => Err(AcisError::Parameter(
            "period-of-record dates cannot be rebuilt for a multi-site result".into(),
        )),
        Some(Value::String(date)) => Ok(Some(date)),
        Some(other) => Err(AcisError::Parameter(format!("{} must be a date string, got {}", key, other))),
    }
}

fn shared_dates(params: &Value, interval: &Interval) -> Result<Vec<String>, AcisError> {
    let range = match (
        date_param(params, "date")?,
        date_param(params, "sdate")?,
        date_param(params, "edate")?,
    ) {
        (Some(date), _, _) => date_range(date, None, interval)?,
        (None, Some(sdate), Some(edate)) => date_range(sdate, Some(edate), interval)?,
        _ => return Err(AcisError::Parameter("invalid date range specification".into())),
    };
    Ok(range.map(|label| label.to_string()).collect())
}
