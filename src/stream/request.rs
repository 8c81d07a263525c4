//! Request parameters for CSV stream calls.

use crate::error::AcisError;
use crate::stream::csv_stream::StreamLayout;
use crate::types::date_label::{date_object, date_string};
use crate::types::element::{aliases_of, parse_elements};
use crate::types::interval::Interval;
use serde_json::{Map, Value};

/// Location options accepted by multi-site calls.
pub const LOCATION_OPTIONS: [&str; 7] = ["sids", "county", "state", "climdiv", "cwa", "basin", "bbox"];

fn is_por(date: &str) -> bool {
    date.eq_ignore_ascii_case("por")
}

fn checked_date(date: &str) -> Result<String, AcisError> {
    if is_por(date) {
        Ok("por".to_string())
    } else {
        Ok(date_string(date_object(date)?))
    }
}

/// Builds the date parameters of a request.
///
/// A single date becomes `{"date": d}`, except a lone `"por"` (period of
/// record) which becomes `{"sdate": "por", "edate": "por"}`. A range becomes
/// `{"sdate": s, "edate": e}`. Every date other than `por` is validated and
/// written as `YYYY-MM-DD`.
///
/// ```
/// use acis::date_params;
/// use serde_json::json;
///
/// assert_eq!(serde_json::Value::Object(date_params("20111231", None)?), json!({"date": "2011-12-31"}));
/// assert_eq!(
///     serde_json::Value::Object(date_params("2011-12", Some("por"))?),
///     json!({"sdate": "2011-12-01", "edate": "por"})
/// );
/// # Ok::<(), acis::AcisError>(())
/// ```
pub fn date_params(sdate: &str, edate: Option<&str>) -> Result<Map<String, Value>, AcisError> {
    let mut params = Map::new();
    match edate {
        None if is_por(sdate) => {
            params.insert("sdate".into(), Value::from("por"));
            params.insert("edate".into(), Value::from("por"));
        }
        None => {
            params.insert("date".into(), Value::from(checked_date(sdate)?));
        }
        Some(edate) => {
            params.insert("sdate".into(), Value::from(checked_date(sdate)?));
            params.insert("edate".into(), Value::from(checked_date(edate)?));
        }
    }
    Ok(params)
}

/// Everything needed to issue a CSV call and normalize its reply.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub params: Value,
    pub layout: StreamLayout,
    pub elems: Vec<String>,
}

/// Element params with the stream interval set on each, plus their aliases.
fn stream_elems(elems: &Value, interval: &Interval) -> Result<(Value, Vec<String>), AcisError> {
    let mut elements = parse_elements(elems)?;
    if elements.is_empty() {
        return Err(AcisError::Parameter("at least one element is required".into()));
    }
    if elements.iter().any(|e| e.is_grouped()) {
        return Err(AcisError::UnsupportedGroupby);
    }
    for element in &mut elements {
        element.set_option("interval", interval.to_value());
    }
    let params = elements.iter().map(|e| e.to_param()).collect();
    Ok((Value::Array(params), aliases_of(&elements)))
}

impl StreamRequest {
    /// A single-site (`StnData`) CSV request for `sid`.
    pub fn stn_data(
        sid: &str,
        sdate: &str,
        edate: Option<&str>,
        elems: &Value,
        interval: &Interval,
    ) -> Result<Self, AcisError> {
        let sid = sid.trim();
        if sid.is_empty() {
            return Err(AcisError::Parameter("a site identifier is required".into()));
        }
        let (elem_params, aliases) = stream_elems(elems, interval)?;
        let mut params = Map::new();
        params.insert("sid".into(), Value::from(sid));
        params.extend(date_params(sdate, edate)?);
        params.insert("elems".into(), elem_params);
        params.insert("output".into(), Value::from("csv"));
        Ok(Self {
            params: Value::Object(params),
            layout: StreamLayout::SingleSite {
                sid: sid.to_string(),
            },
            elems: aliases,
        })
    }

    /// A multi-site (`MultiStnData`) CSV request for one date.
    ///
    /// `location` must hold at least one of [`LOCATION_OPTIONS`]; other keys
    /// are rejected.
    pub fn multi_stn_data(
        date: &str,
        location: Map<String, Value>,
        elems: &Value,
        interval: &Interval,
    ) -> Result<Self, AcisError> {
        if is_por(date) {
            return Err(AcisError::Parameter(
                "multi-site streams need a single date, not the period of record".into(),
            ));
        }
        if let Some(key) = location.keys().find(|k| !LOCATION_OPTIONS.contains(&k.as_str())) {
            return Err(AcisError::Parameter(format!("unknown location option '{}'", key)));
        }
        if location.is_empty() {
            return Err(AcisError::Parameter(format!(
                "a location is required: one of {}",
                LOCATION_OPTIONS.join(", ")
            )));
        }
        let date = checked_date(date)?;
        let (elem_params, aliases) = stream_elems(elems, interval)?;
        let mut params = location;
        params.insert("date".into(), Value::from(date.as_str()));
        params.insert("elems".into(), elem_params);
        params.insert("output".into(), Value::from("csv"));
        Ok(Self {
            params: Value::Object(params),
            layout: StreamLayout::MultiSite { date },
            elems: aliases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_params() {
        assert_eq!(Value::Object(date_params("2011-12-31", None).unwrap()), json!({"date": "2011-12-31"}));
        assert_eq!(
            Value::Object(date_params("POR", None).unwrap()),
            json!({"sdate": "por", "edate": "por"})
        );
        assert_eq!(
            Value::Object(date_params("2011", Some("20120115")).unwrap()),
            json!({"sdate": "2011-01-01", "edate": "2012-01-15"})
        );
        assert!(matches!(
            date_params("11-12-31", None),
            Err(AcisError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_stn_data_stream_params() {
        let request = StreamRequest::stn_data(
            "okc",
            "2011-12-31",
            Some("2012-01-01"),
            &json!("maxt,mint,maxt"),
            &Interval::Daily,
        )
        .unwrap();
        assert_eq!(
            request.params,
            json!({
                "sid": "okc",
                "sdate": "2011-12-31",
                "edate": "2012-01-01",
                "elems": [
                    {"name": "maxt", "interval": "dly"},
                    {"name": "mint", "interval": "dly"},
                    {"name": "maxt", "interval": "dly"},
                ],
                "output": "csv",
            })
        );
        assert_eq!(request.elems, ["maxt_0", "mint", "maxt_1"]);
        assert_eq!(request.layout, StreamLayout::SingleSite { sid: "okc".into() });
    }

    #[test]
    fn test_multi_stn_data_stream_params() {
        let mut location = Map::new();
        location.insert("state".into(), json!("OK"));
        let request = StreamRequest::multi_stn_data(
            "20111231",
            location,
            &json!([{"name": "pcpn", "alias": "precip"}, 4]),
            &Interval::Daily,
        )
        .unwrap();
        assert_eq!(request.params["date"], "2011-12-31");
        assert_eq!(request.params["state"], "OK");
        assert_eq!(request.params["elems"][1], json!({"vX": 4, "interval": "dly"}));
        assert_eq!(request.elems, ["precip", "vx4"]);
        assert_eq!(
            request.layout,
            StreamLayout::MultiSite {
                date: "2011-12-31".into()
            }
        );
    }

    #[test]
    fn test_multi_stn_data_requires_location_and_date() {
        let elems = json!("maxt");
        assert!(matches!(
            StreamRequest::multi_stn_data("2011-12-31", Map::new(), &elems, &Interval::Daily),
            Err(AcisError::Parameter(_))
        ));

        let mut location = Map::new();
        location.insert("sids".into(), json!("okc"));
        assert!(matches!(
            StreamRequest::multi_stn_data("por", location.clone(), &elems, &Interval::Daily),
            Err(AcisError::Parameter(_))
        ));

        location.insert("radius".into(), json!(5));
        assert!(matches!(
            StreamRequest::multi_stn_data("2011-12-31", location, &elems, &Interval::Daily),
            Err(AcisError::Parameter(_))
        ));
    }

    #[test]
    fn test_stream_requires_elements() {
        assert!(matches!(
            StreamRequest::stn_data("okc", "por", None, &Value::Null, &Interval::Daily),
            Err(AcisError::Parameter(_))
        ));
    }
}
