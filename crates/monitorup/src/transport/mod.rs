//! Transport collaborator interface.
//!
//! Connection pooling and the wire protocol live outside this crate; the
//! engine only needs one-shot queries and a paginated stream.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::record::{Event, Filter, TimeRange};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Run one query and collect every matching record
    async fn fetch_events(&self, filter: &Filter) -> Result<Vec<Event>>;

    /// Page through every record matching `filter` inside `range`.
    ///
    /// The stream ends when the range is exhausted. Once `cancel` fires it
    /// yields [`MonitorError::Cancelled`](crate::MonitorError::Cancelled)
    /// and stops.
    fn all_events_iterator(
        &self,
        filter: Filter,
        range: TimeRange,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Event>>;
}
