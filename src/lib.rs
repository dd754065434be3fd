pub mod api;
pub mod diamonds;
pub mod tracing;

pub mod normalization {
    pub mod grade;
}

pub mod util {
    pub mod env;
}

pub use diamonds::{
    DiamondBatch, DiamondError, DiamondRecord, FilterCriteria, FilterRequest, NivodaClient,
    NivodaConfig, Origin, RefineCriteria, SearchResult, SortOrder,
};
