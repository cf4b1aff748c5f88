use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter predicate. Applicability depends on the committed kind of the
/// filtered field; an operator applied to the wrong kind yields an empty
/// result and an `incorrect operator` notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    NotEquals,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    NotBetween,
    InList,
    NotInList,
    RegExp,
    NotRegExp,
    InCidr,
    NotInCidr,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "Equals",
            Operator::NotEquals => "NotEquals",
            Operator::Greater => "Greater",
            Operator::Less => "Less",
            Operator::GreaterOrEqual => "GreaterOrEqual",
            Operator::LessOrEqual => "LessOrEqual",
            Operator::Between => "Between",
            Operator::NotBetween => "NotBetween",
            Operator::InList => "InList",
            Operator::NotInList => "NotInList",
            Operator::RegExp => "RegExp",
            Operator::NotRegExp => "NotRegExp",
            Operator::InCidr => "InCidr",
            Operator::NotInCidr => "NotInCidr",
            Operator::Contains => "Contains",
            Operator::NotContains => "NotContains",
            Operator::StartsWith => "StartsWith",
            Operator::NotStartsWith => "NotStartsWith",
            Operator::EndsWith => "EndsWith",
            Operator::NotEndsWith => "NotEndsWith",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The comparison argument of a filter. List variants serve the membership
/// predicates; two-element lists serve the range predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Texts(Vec<String>),
    Numbers(Vec<f64>),
    Instants(Vec<DateTime<Utc>>),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Number(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::Texts(v)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        FilterValue::Texts(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<f64>> for FilterValue {
    fn from(v: Vec<f64>) -> Self {
        FilterValue::Numbers(v)
    }
}

impl From<[f64; 2]> for FilterValue {
    fn from(v: [f64; 2]) -> Self {
        FilterValue::Numbers(v.to_vec())
    }
}

impl From<Vec<DateTime<Utc>>> for FilterValue {
    fn from(v: Vec<DateTime<Utc>>) -> Self {
        FilterValue::Instants(v)
    }
}

impl From<[DateTime<Utc>; 2]> for FilterValue {
    fn from(v: [DateTime<Utc>; 2]) -> Self {
        FilterValue::Instants(v.to_vec())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    /// When false, text comparisons lowercase both sides.
    pub case_sensitive: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            case_sensitive: true,
        }
    }
}

/// Inclusive numeric range; reversed bounds are swapped silently. None when
/// the argument is not a two-element list.
pub(crate) fn number_bounds(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() != 2 {
        return None;
    }
    let (lo, hi) = (values[0], values[1]);
    if lo > hi {
        Some((hi, lo))
    } else {
        Some((lo, hi))
    }
}

/// Inclusive instant range with the same swap rule.
pub(crate) fn instant_bounds(values: &[DateTime<Utc>]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if values.len() != 2 {
        return None;
    }
    let (lo, hi) = (values[0], values[1]);
    if lo > hi {
        Some((hi, lo))
    } else {
        Some((lo, hi))
    }
}

/// A parsed CIDR block. Matching is by prefix comparison; an address of the
/// other family never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    pub fn parse(text: &str) -> Option<Self> {
        let (addr, prefix) = text.split_once('/')?;
        let network: IpAddr = addr.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return None;
        }
        Some(Cidr { network, prefix })
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                if self.prefix == 0 {
                    return true;
                }
                (u32::from(net) ^ u32::from(ip)) >> (32 - self.prefix) == 0
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                if self.prefix == 0 {
                    return true;
                }
                (u128::from(net) ^ u128::from(ip)) >> (128 - self.prefix) == 0
            }
            _ => false,
        }
    }

    /// Whether a textual value is an IP literal inside this block. Values
    /// that do not parse as an address never match.
    pub fn contains_text(&self, value: &str) -> bool {
        value.parse::<IpAddr>().map_or(false, |ip| self.contains(ip))
    }
}
