//! Search engine transport.
//!
//! [`SearchTransport`] is the raw request/response seam. Two implementations:
//!
//! - [`HttpTransport`]: Manticore's HTTP JSON API over `reqwest`
//! - [`MemoryTransport`]: in-process engine with a request log, for tests and dry runs
//!
//! Request and response bodies live in [`wire`].

pub mod http;
pub mod memory;
pub mod traits;
pub mod wire;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, TransportCall, TransportOp};
pub use traits::{ErrorKind, MigrationStep, SearchError, SearchTransport};
pub use wire::{
    BulkOperation, BulkResponse, DeleteDocumentRequest, FulltextFilter, InsertDocumentRequest,
    MatchOperator, RawHit, SearchRequest, SearchResponse, SqlResponse, SqlResultSet,
    WriteResponse,
};
