use crate::error::AcisError;
use std::collections::HashMap;

fn sid_type(code: u32) -> Option<&'static str> {
    Some(match code {
        1 => "WBAN",
        2 => "COOP",
        3 => "FAA",
        4 => "WMO",
        5 => "ICAO",
        6 => "GHCN",
        7 => "NWSLI",
        8 => "RCC",
        9 => "ThreadEx",
        10 => "CoCoRaHS",
        _ => return None,
    })
}

/// Splits a server SID entry of the form `"<id> <type code>"`.
pub fn parse_sid(sid: &str) -> Result<(&str, &'static str), AcisError> {
    let (id, code) = sid
        .rsplit_once(' ')
        .filter(|(id, code)| {
            !id.contains(' ') && !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
        })
        .ok_or_else(|| AcisError::InvalidSid(sid.to_string()))?;
    code.parse()
        .ok()
        .and_then(sid_type)
        .map(|name| (id, name))
        .ok_or_else(|| AcisError::UnknownSidType(code.to_string()))
}

/// Maps identifier type names to identifiers for a site's `sids` metadata.
///
/// ```
/// use acis::sids_table;
///
/// let table = sids_table(&["13967 1", "346661 2"]).unwrap();
/// assert_eq!(table["WBAN"], "13967");
/// assert_eq!(table["COOP"], "346661");
/// ```
pub fn sids_table<S: AsRef<str>>(sids: &[S]) -> Result<HashMap<String, String>, AcisError> {
    sids.iter()
        .map(|sid| {
            parse_sid(sid.as_ref()).map(|(id, name)| (name.to_string(), id.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sids_table() {
        let table = sids_table(&["13967 1", "346661 2", "KOKC 5"]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table["WBAN"], "13967");
        assert_eq!(table["COOP"], "346661");
        assert_eq!(table["ICAO"], "KOKC");
    }

    #[test]
    fn test_missing_type_code() {
        let err = sids_table(&["13967"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid SID: 13967");
    }

    #[test]
    fn test_unknown_type_code() {
        let err = sids_table(&["13967 9999"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown SID type: 9999");
    }
}
