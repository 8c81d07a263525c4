use crate::error::AcisError;
use crate::types::record::{record_fields, Meta, Record};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// Leading per-site fields of a multi-site line: sid, name, state, lon, lat, elev.
const SITE_FIELDS: usize = 6;

/// The line layout of a CSV reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLayout {
    /// `StnData` output: a site name header line, then `date,v1,v2,...` lines.
    SingleSite { sid: String },
    /// `MultiStnData` output for one date: `sid,name,state,lon,lat,elev,v1,v2,...`.
    MultiSite { date: String },
}

impl StreamLayout {
    /// Fewest fields a data line must carry.
    fn width(&self, elems: usize) -> usize {
        match self {
            StreamLayout::SingleSite { .. } => 1 + elems,
            StreamLayout::MultiSite { .. } => SITE_FIELDS + elems,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Header,
    Streaming,
    Done,
    Error,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamState::Connecting => "connecting",
            StreamState::Header => "header",
            StreamState::Streaming => "streaming",
            StreamState::Done => "done",
            StreamState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Incremental normalizer for a CSV reply.
///
/// Yields the same uniform records as [`crate::DataResult`] (`uid`, `date`,
/// then one value per element alias) one line at a time. For single-site
/// streams the `uid` field holds the requested site identifier; for
/// multi-site streams it holds the identifier leading each line.
///
/// Site metadata is collected as lines are read, so [`CsvStream::meta`] is
/// complete only once the stream is exhausted.
///
/// The stream is single pass. The source is dropped as soon as the stream
/// ends or fails, and with the stream itself if iteration is abandoned.
pub struct CsvStream<R: Read> {
    reader: Option<csv::Reader<R>>,
    layout: StreamLayout,
    elems: Vec<String>,
    fields: Arc<[String]>,
    meta: BTreeMap<String, Meta>,
    pending: Option<StringRecord>,
    state: StreamState,
    /// Source line number of the last record read.
    last_line: u64,
}

impl<R: Read> CsvStream<R> {
    /// Reads the first line of `source` and prepares the stream.
    ///
    /// For single-site layouts the first line is the site name and becomes
    /// the `name` attribute of that site's metadata.
    ///
    /// # Errors
    ///
    /// * [`AcisError::Request`] if the first line is a server error marker
    ///   (`error: <message>`); no record is ever produced.
    /// * [`AcisError::Csv`] if the first line cannot be read.
    pub fn open(source: R, layout: StreamLayout, elems: Vec<String>) -> Result<Self, AcisError> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source);
        let mut stream = Self {
            reader: Some(reader),
            fields: record_fields(&elems),
            layout,
            elems,
            meta: BTreeMap::new(),
            pending: None,
            state: StreamState::Connecting,
            last_line: 0,
        };

        let first = match stream.read_line() {
            Ok(Some(first)) => first,
            Ok(None) => {
                stream.release(StreamState::Done);
                return Ok(stream);
            }
            Err(e) => {
                stream.release(StreamState::Error);
                return Err(e);
            }
        };
        let line = join_fields(&first);
        if line.starts_with("error") {
            stream.release(StreamState::Error);
            let message = line.split_once(':').map_or(line.as_str(), |(_, m)| m).trim();
            return Err(AcisError::Request(message.to_string()));
        }

        stream.state = StreamState::Header;
        match &stream.layout {
            StreamLayout::SingleSite { sid } => {
                let mut meta = Meta::new();
                meta.insert("name".into(), Value::from(line.trim()));
                stream.meta.insert(sid.clone(), meta);
            }
            // No header line; the first line is already data.
            StreamLayout::MultiSite { .. } => stream.pending = Some(first),
        }
        stream.state = StreamState::Streaming;
        Ok(stream)
    }

    /// Site metadata keyed by site identifier, as read so far.
    pub fn meta(&self) -> &BTreeMap<String, Meta> {
        &self.meta
    }

    pub fn elems(&self) -> &[String] {
        &self.elems
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn layout(&self) -> &StreamLayout {
        &self.layout
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True once the stream has ended or failed. An exhausted stream yields
    /// nothing more and is never reopened.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, StreamState::Done | StreamState::Error)
    }

    fn read_line(&mut self) -> Result<Option<StringRecord>, AcisError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut line = StringRecord::new();
        if !reader.read_record(&mut line)? {
            return Ok(None);
        }
        // The reader skips empty lines; a gap in line numbers means one was
        // skipped, and a blank line ends the data.
        let number = line.position().map_or(self.last_line + 1, |p| p.line());
        let skipped_blank = number > self.last_line + 1;
        self.last_line = number;
        if skipped_blank && self.state == StreamState::Streaming {
            debug!("Blank line before CSV line {}, ending stream", number);
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn release(&mut self, state: StreamState) {
        if self.reader.take().is_some() {
            debug!("Releasing CSV stream in state {}", state);
        }
        self.state = state;
    }

    fn to_record(&mut self, line: &StringRecord) -> Record {
        let mut values = Vec::with_capacity(self.fields.len());
        match &self.layout {
            StreamLayout::SingleSite { sid } => {
                values.push(Value::from(sid.as_str()));
                values.extend(line.iter().map(Value::from));
            }
            StreamLayout::MultiSite { date } => {
                let sid = line.get(0).unwrap_or_default().to_string();
                values.push(Value::from(sid.as_str()));
                values.push(Value::from(date.as_str()));
                values.extend(line.iter().skip(SITE_FIELDS).map(Value::from));
                let site_meta = site_meta(line);
                self.meta.insert(sid, site_meta);
            }
        }
        Record::new(self.fields.clone(), values)
    }
}

impl<R: Read> Iterator for CsvStream<R> {
    type Item = Result<Record, AcisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }
        let line = match self.pending.take().map(Ok).or_else(|| self.read_line().transpose()) {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                self.release(StreamState::Error);
                return Some(Err(e));
            }
            None => {
                self.release(StreamState::Done);
                return None;
            }
        };

        let expected = self.layout.width(self.elems.len());
        if line.len() < expected {
            // A short line is a trailing blank.
            self.release(StreamState::Done);
            return None;
        }
        if line.len() > expected {
            let number = line.position().map_or(0, |p| p.line());
            warn!(
                "CSV line {} has {} fields, expected {}",
                number,
                line.len(),
                expected
            );
            self.release(StreamState::Error);
            return Some(Err(AcisError::MalformedLine {
                line: number,
                expected,
                found: line.len(),
            }));
        }
        Some(Ok(self.to_record(&line)))
    }
}

impl<R: Read> fmt::Debug for CsvStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvStream")
            .field("layout", &self.layout)
            .field("elems", &self.elems)
            .field("state", &self.state)
            .field("sites", &self.meta.len())
            .finish()
    }
}

fn join_fields(line: &StringRecord) -> String {
    line.iter().collect::<Vec<_>>().join(",")
}

fn parse_float(field: &str, value: &str) -> Option<Number> {
    let parsed = value.trim().parse::<f64>().ok().and_then(Number::from_f64);
    if parsed.is_none() {
        debug!("Skipping unparsable {} value '{}'", field, value);
    }
    parsed
}

/// Metadata carried by the leading fields of a multi-site line. Blank or
/// unparsable coordinates and elevation are left out.
fn site_meta(line: &StringRecord) -> Meta {
    let field = |i: usize| line.get(i).unwrap_or_default();
    let mut meta = Meta::new();
    meta.insert("name".into(), Value::from(field(1)));
    meta.insert("state".into(), Value::from(field(2)));
    if let Some(elev) = parse_float("elev", field(5)) {
        meta.insert("elev".into(), Value::Number(elev));
    }
    if let (Some(lon), Some(lat)) = (parse_float("lon", field(3)), parse_float("lat", field(4))) {
        meta.insert("ll".into(), Value::Array(vec![Value::Number(lon), Value::Number(lat)]));
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn elems(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn single(body: &str) -> Result<CsvStream<Cursor<String>>, AcisError> {
        CsvStream::open(
            Cursor::new(body.to_string()),
            StreamLayout::SingleSite { sid: "okc".into() },
            elems(&["maxt", "mint"]),
        )
    }

    fn multi(body: &str) -> Result<CsvStream<Cursor<String>>, AcisError> {
        CsvStream::open(
            Cursor::new(body.to_string()),
            StreamLayout::MultiSite {
                date: "2011-12-31".into(),
            },
            elems(&["maxt", "mint"]),
        )
    }

    #[test]
    fn test_single_site_stream() {
        let mut stream = single("OKLAHOMA CITY WILL ROGERS AP\n2011-12-31,59,26\n2012-01-01,70,33\n").unwrap();
        assert_eq!(stream.state(), StreamState::Streaming);
        assert_eq!(
            Value::Object(stream.meta()["okc"].clone()),
            json!({"name": "OKLAHOMA CITY WILL ROGERS AP"})
        );

        let records: Vec<Record> = stream.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields(), ["uid", "date", "maxt", "mint"]);
        assert_eq!(records[0].values(), [json!("okc"), json!("2011-12-31"), json!("59"), json!("26")]);
        assert_eq!(records[1]["mint"], "33");
        assert!(stream.is_exhausted());
        assert_eq!(stream.state(), StreamState::Done);
    }

    #[test]
    fn test_multi_site_stream_collects_meta() {
        let body = "\
13967,OKLAHOMA CITY WILL ROGERS AP,OK,-97.60,35.39,1285,59,26
13968,TULSA,OK,,,,61,30
";
        let mut stream = multi(body).unwrap();
        assert!(stream.meta().is_empty());

        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.values(), [json!("13967"), json!("2011-12-31"), json!("59"), json!("26")]);
        assert_eq!(
            Value::Object(stream.meta()["13967"].clone()),
            json!({"name": "OKLAHOMA CITY WILL ROGERS AP", "state": "OK", "elev": 1285.0, "ll": [-97.6, 35.39]})
        );

        let second = stream.next().unwrap().unwrap();
        assert_eq!(second.uid(), "13968");
        assert_eq!(second.date(), Some("2011-12-31"));
        assert_eq!(
            Value::Object(stream.meta()["13968"].clone()),
            json!({"name": "TULSA", "state": "OK"})
        );
        assert!(stream.next().is_none());
        assert_eq!(stream.meta().len(), 2);
    }

    #[test]
    fn test_error_marker() {
        let err = single("error: bad params\n").unwrap_err();
        assert!(matches!(err, AcisError::Request(ref m) if m == "bad params"));

        let err = multi("error: unknown element, maxq\n").unwrap_err();
        assert!(matches!(err, AcisError::Request(ref m) if m == "unknown element, maxq"));
    }

    #[test]
    fn test_exhausted_stream_yields_nothing() {
        let mut stream = single("OKC\n2011-12-31,59,26\n").unwrap();
        assert_eq!(stream.by_ref().count(), 1);
        assert!(stream.is_exhausted());
        assert_eq!(stream.by_ref().count(), 0);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_short_line_ends_stream() {
        let mut stream = single("OKC\n2011-12-31,59,26\n2012-01-01\n2012-01-02,70,33\n").unwrap();
        assert_eq!(stream.by_ref().count(), 1);
        assert_eq!(stream.state(), StreamState::Done);
    }

    #[test]
    fn test_blank_line_ends_stream() {
        let mut stream = single("OKC\n2011-12-31,59,26\n\n2012-01-02,70,33\n").unwrap();
        assert_eq!(stream.by_ref().count(), 1);
        assert_eq!(stream.state(), StreamState::Done);

        let mut stream = multi("13967,OKC,OK,-97.6,35.39,1285,59,26\n\n13968,TULSA,OK,,,,61,30\n").unwrap();
        assert_eq!(stream.by_ref().count(), 1);
        assert!(!stream.meta().contains_key("13968"));
    }

    #[test]
    fn test_leading_blank_lines_before_header() {
        let mut stream = single("\n\nOKC\n2011-12-31,59,26\n2012-01-01,70,33\n").unwrap();
        assert_eq!(stream.meta()["okc"]["name"], "OKC");
        assert_eq!(stream.by_ref().count(), 2);
    }

    /// A source that records when it is dropped.
    struct TrackedSource {
        inner: Cursor<String>,
        dropped: Rc<Cell<bool>>,
    }

    impl Read for TrackedSource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for TrackedSource {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    fn tracked(
        body: &str,
        layout: StreamLayout,
    ) -> (Result<CsvStream<TrackedSource>, AcisError>, Rc<Cell<bool>>) {
        let dropped = Rc::new(Cell::new(false));
        let source = TrackedSource {
            inner: Cursor::new(body.to_string()),
            dropped: Rc::clone(&dropped),
        };
        (CsvStream::open(source, layout, elems(&["maxt", "mint"])), dropped)
    }

    fn okc() -> StreamLayout {
        StreamLayout::SingleSite { sid: "okc".into() }
    }

    #[test]
    fn test_source_released_when_done() {
        let (stream, dropped) = tracked("OKC\n2011-12-31,59,26\n2012-01-01,70,33\n", okc());
        let mut stream = stream.unwrap();
        assert!(stream.next().is_some());
        assert!(!dropped.get());
        assert_eq!(stream.by_ref().count(), 1);
        assert!(dropped.get());
        assert_eq!(stream.state(), StreamState::Done);
    }

    #[test]
    fn test_source_released_on_blank_line() {
        let (stream, dropped) = tracked("OKC\n2011-12-31,59,26\n\n2012-01-02,70,33\n", okc());
        let mut stream = stream.unwrap();
        assert_eq!(stream.by_ref().count(), 1);
        assert!(dropped.get());
    }

    #[test]
    fn test_source_released_on_malformed_line() {
        let (stream, dropped) = tracked("OKC\n2011-12-31,59,26,extra\n", okc());
        let mut stream = stream.unwrap();
        assert!(matches!(stream.next(), Some(Err(AcisError::MalformedLine { .. }))));
        assert!(dropped.get());
        assert_eq!(stream.state(), StreamState::Error);
    }

    #[test]
    fn test_source_released_on_error_marker() {
        let (stream, dropped) = tracked("error: bad params\n", okc());
        assert!(matches!(stream, Err(AcisError::Request(ref m)) if m == "bad params"));
        assert!(dropped.get());
    }

    #[test]
    fn test_source_released_when_abandoned() {
        let (stream, dropped) = tracked("OKC\n2011-12-31,59,26\n2012-01-01,70,33\n", okc());
        let mut stream = stream.unwrap();
        assert!(stream.next().is_some());
        assert!(!dropped.get());
        drop(stream);
        assert!(dropped.get());
    }

    #[test]
    fn test_long_line_is_malformed() {
        let mut stream = multi("13967,OKC,OK,-97.6,35.39,1285,59,26,extra\n").unwrap();
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            AcisError::MalformedLine {
                expected: 8,
                found: 9,
                ..
            }
        ));
        assert_eq!(stream.state(), StreamState::Error);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_reply() {
        let mut stream = single("").unwrap();
        assert!(stream.is_exhausted());
        assert!(stream.meta().is_empty());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_header_only_reply() {
        let mut stream = single("OKC\n").unwrap();
        assert_eq!(stream.meta().len(), 1);
        assert!(stream.next().is_none());
        assert!(stream.is_exhausted());
    }
}
