use crate::{QueryId, QueryRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open one streaming request; frames come back tagged with `query_id`.
    StartQueryStream {
        query_id: QueryId,
        request: QueryRequest,
    },
}
