pub mod client;
pub mod entity;
pub mod http;
pub mod query;
pub mod value;

pub use client::{Client, Transport};
pub use entity::{Entity, Key, PartitionId, PathElement};
pub use http::HttpTransport;
pub use query::{MoreResults, Query, RunQueryRequest, RunQueryResponse};
pub use value::Value;
