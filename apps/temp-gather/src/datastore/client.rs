use super::entity::Entity;
use super::query::{MoreResults, Query, RunQueryRequest, RunQueryResponse};
use crate::error::{DatastoreError, DatastoreResult};

pub trait Transport {
    fn run_query(
        &self,
        project_id: &str,
        request: &RunQueryRequest,
    ) -> DatastoreResult<RunQueryResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn run_query(
        &self,
        project_id: &str,
        request: &RunQueryRequest,
    ) -> DatastoreResult<RunQueryResponse> {
        (**self).run_query(project_id, request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn run_query(
        &self,
        project_id: &str,
        request: &RunQueryRequest,
    ) -> DatastoreResult<RunQueryResponse> {
        (**self).run_query(project_id, request)
    }
}

pub struct Client<T> {
    project_id: String,
    namespace: Option<String>,
    transport: T,
}

impl<T: Transport> Client<T> {
    pub fn new(project_id: impl Into<String>, transport: T) -> Self {
        Self {
            project_id: project_id.into(),
            namespace: None,
            transport,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn query(&self, kind: &str) -> Query {
        Query::new(kind).namespace(self.namespace.clone())
    }

    /// Runs `query` to exhaustion and returns every entity in server order.
    pub fn fetch_all(&self, query: &Query) -> DatastoreResult<Vec<Entity>> {
        let mut records: Vec<Entity> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        loop {
            if query.remaining(records.len()) == Some(0) {
                break;
            }

            let request = query.to_request(&self.project_id, cursor.as_deref(), records.len());
            let response = self.transport.run_query(&self.project_id, &request)?;
            page += 1;

            let batch = response.batch;
            let received = batch.entity_results.len();
            records.extend(batch.entity_results.into_iter().map(|result| result.entity));
            tracing::debug!(
                kind = %query.kind(),
                page,
                received,
                total = records.len(),
                more_results = ?batch.more_results,
                "datastore page fetched"
            );

            match batch.more_results {
                MoreResults::NotFinished | MoreResults::MoreResultsAfterLimit => {}
                MoreResults::NoMoreResults | MoreResults::MoreResultsAfterCursor => break,
                MoreResults::Unspecified => {
                    return Err(DatastoreError::UnexpectedMoreResults {
                        kind: query.kind().to_string(),
                        page,
                    })
                }
            }

            let next = batch.end_cursor.filter(|value| !value.is_empty());
            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => {
                    return Err(DatastoreError::StalledCursor {
                        kind: query.kind().to_string(),
                        page,
                    })
                }
            }
        }

        if let Some(limit) = query.max_results() {
            records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(records)
    }
}
