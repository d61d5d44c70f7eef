use serde::{Deserialize, Serialize};

use super::entity::{Entity, PartitionId};

/// Every entity of one kind, in key order. No filters or orderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    kind: String,
    namespace: Option<String>,
    limit: Option<u32>,
    page_size: Option<u32>,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: None,
            limit: None,
            page_size: None,
        }
    }

    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace_id(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn max_results(&self) -> Option<u32> {
        self.limit
    }

    pub fn max_page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn remaining(&self, fetched: usize) -> Option<u32> {
        self.limit.map(|limit| {
            let fetched = u32::try_from(fetched).unwrap_or(u32::MAX);
            limit.saturating_sub(fetched)
        })
    }

    pub fn to_request(
        &self,
        project_id: &str,
        start_cursor: Option<&str>,
        fetched: usize,
    ) -> RunQueryRequest {
        let limit = match (self.remaining(fetched), self.page_size) {
            (Some(remaining), Some(page)) => Some(remaining.min(page)),
            (remaining, page) => remaining.or(page),
        };
        RunQueryRequest {
            partition_id: PartitionId {
                project_id: project_id.to_string(),
                namespace_id: self.namespace.clone(),
            },
            query: QueryBody {
                kind: vec![KindExpression {
                    name: self.kind.clone(),
                }],
                limit,
                start_cursor: start_cursor.map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub partition_id: PartitionId,
    pub query: QueryBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody {
    pub kind: Vec<KindExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindExpression {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(default)]
    pub batch: QueryResultBatch,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultBatch {
    #[serde(default)]
    pub entity_results: Vec<EntityResult>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub more_results: MoreResults,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntityResult {
    #[serde(default)]
    pub entity: Entity,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoreResults {
    NotFinished,
    MoreResultsAfterLimit,
    MoreResultsAfterCursor,
    NoMoreResults,
    #[default]
    #[serde(other)]
    Unspecified,
}
