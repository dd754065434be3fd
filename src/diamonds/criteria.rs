//! Validated search filters.
//!
//! Callers build a [`FilterCriteria`] through [`FilterCriteriaBuilder`] or from a
//! loosely-typed [`FilterRequest`]; either path rejects missing shapes and inverted
//! ranges before anything reaches the query translator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DiamondError;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Mined vs. laboratory-grown stones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Natural,
    LabGrown,
    #[default]
    Both,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Natural => "natural",
            Origin::LabGrown => "lab-grown",
            Origin::Both => "both",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = DiamondError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "natural" => Ok(Origin::Natural),
            "lab-grown" | "labgrown" | "lab" => Ok(Origin::LabGrown),
            "both" | "" => Ok(Origin::Both),
            other => Err(DiamondError::invalid(
                "origin",
                format!("expected natural, lab-grown or both, got `{other}`"),
            )),
        }
    }
}

/// Inclusive numeric bounds; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    fn validate(&self, field: &'static str) -> Result<(), DiamondError> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() || bound < 0.0 {
                return Err(DiamondError::invalid(
                    field,
                    format!("bounds must be finite and non-negative, got {bound}"),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(DiamondError::invalid(
                    field,
                    format!("min {min} is greater than max {max}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Per-search filters. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    shape: String,
    carat: Range,
    colors: Vec<String>,
    clarities: Vec<String>,
    cuts: Vec<String>,
    price: Range,
    origin: Origin,
    pagination: Pagination,
}

impl FilterCriteria {
    pub fn builder() -> FilterCriteriaBuilder {
        FilterCriteriaBuilder::default()
    }

    /// Lower-case, hyphenated shape name as supplied by the storefront.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn carat(&self) -> Range {
        self.carat
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn clarities(&self) -> &[String] {
        &self.clarities
    }

    pub fn cuts(&self) -> &[String] {
        &self.cuts
    }

    pub fn price(&self) -> Range {
        self.price
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn limit(&self) -> u32 {
        self.pagination.limit
    }

    pub fn offset(&self) -> u32 {
        self.pagination.offset
    }

    /// Same filters, different page.
    pub fn with_offset(&self, offset: u32) -> Self {
        let mut next = self.clone();
        next.pagination.offset = offset;
        next
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterCriteriaBuilder {
    shape: Option<String>,
    carat: Range,
    colors: Vec<String>,
    clarities: Vec<String>,
    cuts: Vec<String>,
    price: Range,
    origin: Origin,
    limit: Option<u32>,
    offset: u32,
}

impl FilterCriteriaBuilder {
    pub fn shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn carat(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.carat = Range::new(min, max);
        self
    }

    pub fn price(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price = Range::new(min, max);
        self
    }

    pub fn colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn clarities<I, S>(mut self, clarities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clarities = clarities.into_iter().map(Into::into).collect();
        self
    }

    pub fn cuts<I, S>(mut self, cuts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cuts = cuts.into_iter().map(Into::into).collect();
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn build(self) -> Result<FilterCriteria, DiamondError> {
        let shape = self
            .shape
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DiamondError::invalid("shape", "a diamond shape is required"))?;
        self.carat.validate("carat")?;
        self.price.validate("price")?;

        let limit = match self.limit {
            Some(0) => {
                return Err(DiamondError::invalid("limit", "must be at least 1"));
            }
            Some(n) => n.min(MAX_PAGE_LIMIT),
            None => DEFAULT_PAGE_LIMIT,
        };

        Ok(FilterCriteria {
            shape,
            carat: self.carat,
            colors: clean_list(self.colors),
            clarities: clean_list(self.clarities),
            cuts: clean_list(self.cuts),
            price: self.price,
            origin: self.origin,
            pagination: Pagination {
                limit,
                offset: self.offset,
            },
        })
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let trimmed = v.trim();
        if trimmed.is_empty() || out.iter().any(|seen| seen.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// Wire-level search request as product pages send it. Every field is optional
/// here; [`TryFrom`] enforces what [`FilterCriteria`] requires.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub shape: Option<String>,
    pub carat_min: Option<f64>,
    pub carat_max: Option<f64>,
    pub colors: Vec<String>,
    pub clarities: Vec<String>,
    pub cuts: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub origin: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TryFrom<FilterRequest> for FilterCriteria {
    type Error = DiamondError;

    fn try_from(req: FilterRequest) -> Result<Self, Self::Error> {
        let origin = match req.origin.as_deref() {
            Some(raw) => raw.parse::<Origin>()?,
            None => Origin::Both,
        };
        let mut builder = FilterCriteria::builder()
            .carat(req.carat_min, req.carat_max)
            .price(req.price_min, req.price_max)
            .colors(req.colors)
            .clarities(req.clarities)
            .cuts(req.cuts)
            .origin(origin)
            .offset(req.offset.unwrap_or(0));
        if let Some(shape) = req.shape {
            builder = builder.shape(shape);
        }
        if let Some(limit) = req.limit {
            builder = builder.limit(limit);
        }
        builder.build()
    }
}
