//! Filter criteria -> upstream GraphQL vocabulary.
//!
//! The shape table below is the only place storefront shape names are mapped to the
//! inventory service's constants. Unmapped names are upper-cased and sent as-is.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::criteria::{FilterCriteria, Origin, Range};
use crate::normalization::grade::upper_grades;

/// Upper bound sent when only a carat minimum is given.
pub const CARAT_CEILING: f64 = 1_000.0;
/// Upper bound sent when only a price minimum is given.
pub const PRICE_CEILING: f64 = 100_000_000.0;

pub const AUTHENTICATE_QUERY: &str = r#"query Authenticate($username: String!, $password: String!) {
  authenticate {
    username_and_password(username: $username, password: $password) {
      token
    }
  }
}"#;

pub const SEARCH_QUERY: &str = r#"query DiamondSearch(
  $token: String!
  $query: DiamondQuery
  $offset: Int
  $limit: Int
  $order: DiamondOrder
) {
  as(token: $token) {
    diamonds_by_query(query: $query, offset: $offset, limit: $limit, order: $order) {
      total_count
      items {
        id
        price
        discount
        diamond {
          id
          image
          video
          certificate {
            lab
            shape
            certNumber
            carats
            color
            clarity
            cut
          }
        }
      }
    }
  }
}"#;

const SHAPE_TABLE: &[(&str, &str)] = &[
    ("round", "ROUND"),
    ("oval", "OVAL"),
    ("princess", "PRINCESS"),
    ("cushion", "CUSHION"),
    ("cushion-modified", "CUSHION_MODIFIED"),
    ("cushion-brilliant", "CUSHION_BRILLIANT"),
    ("emerald", "EMERALD"),
    ("square-emerald", "SQUARE_EMERALD"),
    ("asscher", "ASSCHER"),
    ("radiant", "RADIANT"),
    ("square-radiant", "SQUARE_RADIANT"),
    ("pear", "PEAR"),
    ("marquise", "MARQUISE"),
    ("heart", "HEART"),
    ("trillion", "TRILLIANT"),
    ("triangle", "TRIANGULAR"),
    ("baguette", "BAGUETTE"),
    ("old-european", "OLD_EUROPEAN"),
    ("old-miner", "OLD_MINER"),
    ("rose", "ROSE"),
];

/// Result of looking a storefront shape up in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMapping {
    Known(&'static str),
    /// Not in the table; the upper-cased input is sent instead.
    Fallback(String),
}

impl ShapeMapping {
    pub fn as_str(&self) -> &str {
        match self {
            ShapeMapping::Known(s) => s,
            ShapeMapping::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ShapeMapping::Fallback(_))
    }
}

pub fn upstream_shape(shape: &str) -> ShapeMapping {
    let key = shape.trim().to_ascii_lowercase();
    SHAPE_TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, constant)| ShapeMapping::Known(*constant))
        .unwrap_or_else(|| ShapeMapping::Fallback(shape.trim().to_ascii_uppercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeInput {
    pub from: f64,
    pub to: f64,
}

impl RangeInput {
    /// `None` when both bounds are absent; otherwise the missing side is opened up.
    fn from_range(range: Range, ceiling: f64) -> Option<Self> {
        if range.is_unbounded() {
            return None;
        }
        Some(Self {
            from: range.min.unwrap_or(0.0),
            to: range.max.unwrap_or(ceiling),
        })
    }
}

/// Origin constraint. `Natural` excludes lab-grown stones and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiamondType {
    Natural,
    LabGrown,
}

impl DiamondType {
    fn from_origin(origin: Origin) -> Option<Self> {
        match origin {
            Origin::Natural => Some(DiamondType::Natural),
            Origin::LabGrown => Some(DiamondType::LabGrown),
            Origin::Both => None,
        }
    }
}

/// The `DiamondQuery` input object. Absent filters are omitted, never sent empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiamondQuery {
    pub shapes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<RangeInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarity: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dollar_value: Option<RangeInput>,
    #[serde(rename = "diamondType", skip_serializing_if = "Option::is_none")]
    pub diamond_type: Option<DiamondType>,
    pub has_image: bool,
    pub returns: bool,
}

/// Fixed ascending-price order so offsets stay stable between pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiamondOrder {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub direction: &'static str,
}

pub const PRICE_ASCENDING: DiamondOrder = DiamondOrder {
    kind: "price",
    direction: "ASC",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchVariables<'a> {
    pub token: &'a str,
    pub query: DiamondQuery,
    pub offset: u32,
    pub limit: u32,
    pub order: DiamondOrder,
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    let upper = upper_grades(values);
    if upper.is_empty() {
        None
    } else {
        Some(upper)
    }
}

pub fn translate(criteria: &FilterCriteria) -> DiamondQuery {
    let shape = upstream_shape(criteria.shape());
    if shape.is_fallback() {
        debug!(
            shape = %criteria.shape(),
            sent = %shape.as_str(),
            "nivoda: shape not in table; sending upper-cased name"
        );
    }
    DiamondQuery {
        shapes: shape.as_str().to_string(),
        sizes: RangeInput::from_range(criteria.carat(), CARAT_CEILING).map(|r| vec![r]),
        color: non_empty(criteria.colors()),
        clarity: non_empty(criteria.clarities()),
        cut: non_empty(criteria.cuts()),
        dollar_value: RangeInput::from_range(criteria.price(), PRICE_CEILING),
        diamond_type: DiamondType::from_origin(criteria.origin()),
        has_image: true,
        returns: true,
    }
}

pub fn search_variables<'a>(criteria: &FilterCriteria, token: &'a str) -> SearchVariables<'a> {
    SearchVariables {
        token,
        query: translate(criteria),
        offset: criteria.offset(),
        limit: criteria.limit(),
        order: PRICE_ASCENDING,
    }
}

/// Full POST body for the search call.
pub fn search_body(criteria: &FilterCriteria, token: &str) -> Value {
    json!({
        "query": SEARCH_QUERY,
        "variables": search_variables(criteria, token),
    })
}

/// Full POST body for the authenticate call.
pub fn authenticate_body(username: &str, password: &str) -> Value {
    json!({
        "query": AUTHENTICATE_QUERY,
        "variables": { "username": username, "password": password },
    })
}
