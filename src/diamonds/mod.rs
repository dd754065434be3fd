//! Nivoda diamond search: authentication, query translation, transport and
//! client-side refinement.

pub mod client;
pub mod config;
pub mod criteria;
pub mod error;
pub mod model;
pub mod query;
pub mod refine;
pub mod token;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{NivodaAuthenticator, NivodaClient};
pub use config::{Credentials, ExecutionContext, NivodaConfig, ResponsePolicy};
pub use criteria::{FilterCriteria, FilterCriteriaBuilder, FilterRequest, Origin, Range};
pub use error::DiamondError;
pub use model::{Certificate, DiamondDetail, DiamondRecord, SearchResult};
pub use refine::{refine, DiamondBatch, RefineCriteria, SortDirection, SortKey, SortOrder};
pub use token::{Authenticator, Clock, SystemClock, TokenCache};
pub use transport::{GraphqlTransport, HttpReply, ReqwestTransport, TransportError};
