//! Requested data elements and the aliases used to label them in output.

use crate::error::AcisError;
use crate::types::interval::Interval;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// One requested element, in any of the shapes a caller or an echoed request
/// may use.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementSpec {
    /// An element name such as `"maxt"`. A name made of digits only is taken
    /// as a var-major code.
    ByName(String),
    /// A var-major code (`vX`).
    ByCode(u32),
    /// A full element object; must carry `name` or `vX`.
    Explicit(Map<String, Value>),
}

impl From<&str> for ElementSpec {
    fn from(name: &str) -> Self {
        ElementSpec::ByName(name.to_string())
    }
}

impl From<String> for ElementSpec {
    fn from(name: String) -> Self {
        ElementSpec::ByName(name)
    }
}

impl From<u32> for ElementSpec {
    fn from(code: u32) -> Self {
        ElementSpec::ByCode(code)
    }
}

impl From<Map<String, Value>> for ElementSpec {
    fn from(object: Map<String, Value>) -> Self {
        ElementSpec::Explicit(object)
    }
}

impl TryFrom<&Value> for ElementSpec {
    type Error = AcisError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(ElementSpec::ByName(name.clone())),
            Value::Number(n) => n
                .as_u64()
                .and_then(|code| u32::try_from(code).ok())
                .map(ElementSpec::ByCode)
                .ok_or_else(|| AcisError::InvalidElement(value.to_string())),
            Value::Object(object) => Ok(ElementSpec::Explicit(object.clone())),
            other => Err(AcisError::InvalidElement(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementIdent {
    Name(String),
    VarMajor(u32),
}

/// An element resolved to its canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    ident: ElementIdent,
    alias: String,
    options: Map<String, Value>,
}

impl Element {
    pub fn resolve(spec: ElementSpec) -> Result<Self, AcisError> {
        let (ident, mut options) = match spec {
            ElementSpec::ByName(name) => (ident_from_name(&name)?, Map::new()),
            ElementSpec::ByCode(code) => (ElementIdent::VarMajor(code), Map::new()),
            ElementSpec::Explicit(mut object) => {
                if object.contains_key("name") && object.contains_key("vX") {
                    return Err(AcisError::InvalidElement(format!(
                        "element object has both 'name' and 'vX': {}",
                        Value::Object(object)
                    )));
                }
                let ident = match (object.remove("name"), object.remove("vX")) {
                    (Some(Value::String(name)), _) => ElementIdent::Name(name.to_lowercase()),
                    (None, Some(code)) => ElementIdent::VarMajor(var_major(&code)?),
                    (name, code) => {
                        return Err(AcisError::InvalidElement(format!(
                            "element object needs a string 'name' or a 'vX' code (name: {:?}, vX: {:?})",
                            name, code
                        )))
                    }
                };
                (ident, object)
            }
        };
        let alias = match options.remove("alias") {
            Some(Value::String(alias)) => alias,
            _ => match &ident {
                ElementIdent::Name(name) => name.clone(),
                ElementIdent::VarMajor(code) => format!("vx{}", code),
            },
        };
        Ok(Self {
            ident,
            alias,
            options,
        })
    }

    pub fn ident(&self) -> &ElementIdent {
        &self.ident
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn set_option(&mut self, key: &str, value: Value) {
        self.options.insert(key.to_string(), value);
    }

    /// The explicit `interval` option, if one was given.
    pub fn interval(&self) -> Result<Option<Interval>, AcisError> {
        self.options
            .get("interval")
            .map(Interval::from_value)
            .transpose()
    }

    pub fn is_grouped(&self) -> bool {
        self.options.contains_key("groupby")
    }

    /// The element object sent in request parameters. The alias is a client
    /// side label and is not sent.
    pub fn to_param(&self) -> Value {
        let mut object = Map::new();
        match &self.ident {
            ElementIdent::Name(name) => object.insert("name".into(), Value::from(name.as_str())),
            ElementIdent::VarMajor(code) => object.insert("vX".into(), Value::from(*code)),
        };
        object.extend(self.options.clone());
        Value::Object(object)
    }
}

fn ident_from_name(name: &str) -> Result<ElementIdent, AcisError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AcisError::InvalidElement("empty element name".into()));
    }
    Ok(match name.parse::<u32>() {
        Ok(code) => ElementIdent::VarMajor(code),
        Err(_) => ElementIdent::Name(name.to_lowercase()),
    })
}

fn var_major(value: &Value) -> Result<u32, AcisError> {
    let code = match value {
        Value::Number(n) => n.as_u64().and_then(|c| u32::try_from(c).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    code.ok_or_else(|| AcisError::InvalidElement(format!("invalid vX code {}", value)))
}

/// Resolves the `elems` request parameter: a comma-delimited string, or an
/// array of names, codes and element objects. A missing parameter yields no
/// elements.
pub fn parse_elements(elems: &Value) -> Result<Vec<Element>, AcisError> {
    let specs: Vec<ElementSpec> = match elems {
        Value::Null => Vec::new(),
        Value::String(list) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ElementSpec::from)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(ElementSpec::try_from)
            .collect::<Result<_, _>>()?,
        other => return Err(AcisError::InvalidElement(other.to_string())),
    };
    specs.into_iter().map(Element::resolve).collect()
}

/// Makes duplicate names unique by suffixing each occurrence of a repeated
/// name with its 0-based index in order of appearance. Names that occur once
/// are left alone. A suffix that would collide with another name in the list
/// is skipped, so `["maxt_0", "maxt", "maxt"]` becomes
/// `["maxt_0", "maxt_1", "maxt_2"]`.
///
/// ```
/// use acis::annotate;
///
/// assert_eq!(annotate(&["maxt", "vx2", "maxt"]), ["maxt_0", "vx2", "maxt_1"]);
/// assert_eq!(annotate(&["maxt", "mint"]), ["maxt", "mint"]);
/// ```
pub fn annotate<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *totals.entry(name.as_ref()).or_default() += 1;
    }
    let mut taken: HashSet<String> = totals
        .iter()
        .filter(|&(_, &count)| count == 1)
        .map(|(name, _)| name.to_string())
        .collect();
    let mut next: HashMap<&str, usize> = HashMap::new();
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            if totals[name] == 1 {
                return name.to_string();
            }
            let index = next.entry(name).or_default();
            loop {
                let alias = format!("{}_{}", name, index);
                *index += 1;
                if taken.insert(alias.clone()) {
                    return alias;
                }
            }
        })
        .collect()
}

/// The ordered, unique aliases for an `elems` request parameter.
pub fn element_aliases(elems: &Value) -> Result<Vec<String>, AcisError> {
    let elements = parse_elements(elems)?;
    Ok(aliases_of(&elements))
}

pub(crate) fn aliases_of(elements: &[Element]) -> Vec<String> {
    let names: Vec<&str> = elements.iter().map(Element::alias).collect();
    annotate(&names)
}
