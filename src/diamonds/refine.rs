//! In-memory refinement of already-fetched diamonds.
//!
//! Product pages fetch a batch (sometimes with only the shape sent upstream) and
//! narrow it locally. Everything here is synchronous except [`DiamondBatch::load_more`].

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::NivodaClient;
use super::criteria::{FilterCriteria, Range};
use super::error::DiamondError;
use super::model::{DiamondRecord, SearchResult};
use crate::normalization::grade::{cut_matches, grade_matches};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineCriteria {
    pub carat: Range,
    pub colors: Vec<String>,
    pub clarities: Vec<String>,
    pub cuts: Vec<String>,
    pub price: Range,
}

impl RefineCriteria {
    /// Re-apply the filters of an upstream search locally.
    pub fn from_filter(criteria: &FilterCriteria) -> Self {
        Self {
            carat: criteria.carat(),
            colors: criteria.colors().to_vec(),
            clarities: criteria.clarities().to_vec(),
            cuts: criteria.cuts().to_vec(),
            price: criteria.price(),
        }
    }

    pub fn matches(&self, record: &DiamondRecord) -> bool {
        in_range(self.carat, record.carats())
            && in_range(self.price, record.price)
            && in_set(&self.colors, record.color(), grade_matches)
            && in_set(&self.clarities, record.clarity(), grade_matches)
            && in_set(&self.cuts, record.cut(), cut_matches)
    }
}

/// A bounded range excludes records that lack the value.
fn in_range(range: Range, value: Option<f64>) -> bool {
    if range.is_unbounded() {
        return true;
    }
    value.is_some_and(|v| range.contains(v))
}

/// An empty selection is no constraint.
fn in_set(selected: &[String], value: Option<&str>, eq: fn(&str, &str) -> bool) -> bool {
    if selected.is_empty() {
        return true;
    }
    value.is_some_and(|v| selected.iter().any(|s| eq(v, s)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Price,
    Carat,
}

impl FromStr for SortKey {
    type Err = DiamondError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(SortKey::Price),
            "carat" | "carats" => Ok(SortKey::Carat),
            other => Err(DiamondError::invalid(
                "sort",
                format!("expected price or carat, got `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    fn key_of(&self, record: &DiamondRecord) -> Option<f64> {
        match self.key {
            SortKey::Price => record.price,
            SortKey::Carat => record.carats(),
        }
    }

    /// Records missing the sort key go last in either direction.
    fn compare(&self, a: &DiamondRecord, b: &DiamondRecord) -> Ordering {
        match (self.key_of(a), self.key_of(b)) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match self.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Filter then stable-sort into a new list; the input is untouched.
pub fn refine(
    items: &[DiamondRecord],
    criteria: &RefineCriteria,
    order: SortOrder,
) -> Vec<DiamondRecord> {
    let mut out: Vec<DiamondRecord> = items
        .iter()
        .filter(|d| criteria.matches(d))
        .cloned()
        .collect();
    out.sort_by(|a, b| order.compare(a, b));
    out
}

/// Records accumulated across "load more" pages for one set of filters.
#[derive(Debug, Clone)]
pub struct DiamondBatch {
    criteria: FilterCriteria,
    records: Vec<DiamondRecord>,
    next_offset: u32,
    has_more: bool,
    total_count: u64,
}

impl DiamondBatch {
    pub fn from_result(criteria: FilterCriteria, result: SearchResult) -> Self {
        let mut batch = Self {
            criteria,
            records: Vec::new(),
            next_offset: 0,
            has_more: false,
            total_count: 0,
        };
        batch.append(result);
        batch
    }

    /// Fetch the first page.
    pub async fn fetch(
        client: &NivodaClient,
        criteria: FilterCriteria,
    ) -> Result<Self, DiamondError> {
        let result = client.search(&criteria).await?;
        Ok(Self::from_result(criteria, result))
    }

    /// Add a page. Offsets advance by what the upstream returned, not by what survived
    /// the image filter, so the next request lines up with upstream pagination.
    pub fn append(&mut self, result: SearchResult) {
        let page_end = result.offset.saturating_add(result.page_size as u32);
        self.next_offset = self.next_offset.max(page_end);
        self.has_more = result.has_more;
        self.total_count = result.total_count;

        let mut seen: HashSet<String> = self.records.iter().map(|d| d.id.clone()).collect();
        for record in result.items {
            if seen.insert(record.id.clone()) {
                self.records.push(record);
            }
        }
    }

    /// Criteria for the next page, or `None` once the upstream is exhausted.
    pub fn next_criteria(&self) -> Option<FilterCriteria> {
        self.has_more
            .then(|| self.criteria.with_offset(self.next_offset))
    }

    /// Fetch and append the next page. Returns how many records were added.
    pub async fn load_more(&mut self, client: &NivodaClient) -> Result<usize, DiamondError> {
        let Some(next) = self.next_criteria() else {
            return Ok(0);
        };
        let before = self.records.len();
        let result = client.search(&next).await?;
        self.append(result);
        let added = self.records.len() - before;
        debug!(added, next_offset = self.next_offset, "diamond batch extended");
        Ok(added)
    }

    pub fn view(&self, criteria: &RefineCriteria, order: SortOrder) -> Vec<DiamondRecord> {
        refine(&self.records, criteria, order)
    }

    pub fn records(&self) -> &[DiamondRecord] {
        &self.records
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }
}
