use crate::error::AcisError;
use crate::result::{check_error, split_uid, Query};
use crate::types::record::Meta;
use serde_json::Value;
use std::collections::BTreeMap;

/// The normalized reply of a metadata-only (`StnMeta`) call: site metadata
/// keyed by UID.
#[derive(Debug, Clone, PartialEq)]
pub struct StnMetaResult {
    meta: BTreeMap<u64, Meta>,
}

impl StnMetaResult {
    /// Normalizes a `{"meta": [...]}` reply.
    ///
    /// # Errors
    ///
    /// * [`AcisError::Result`] if the reply reports an error.
    /// * [`AcisError::MissingUid`] if any site lacks a `uid`; nothing is kept.
    /// * [`AcisError::MalformedResult`] if `meta` is missing or not a list.
    pub fn new(query: &Query) -> Result<Self, AcisError> {
        check_error(&query.result)?;
        let sites = match query.result.get("meta") {
            Some(Value::Array(sites)) => sites,
            _ => {
                return Err(AcisError::MalformedResult(
                    "metadata result must contain a 'meta' list".into(),
                ))
            }
        };
        let meta = sites
            .iter()
            .map(split_uid)
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { meta })
    }

    pub fn meta(&self) -> &BTreeMap<u64, Meta> {
        &self.meta
    }

    pub fn into_meta(self) -> BTreeMap<u64, Meta> {
        self.meta
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }
}

impl TryFrom<Query> for StnMetaResult {
    type Error = AcisError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        StnMetaResult::new(&query)
    }
}
