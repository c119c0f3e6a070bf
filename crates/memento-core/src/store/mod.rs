//! Document store boundary and live subscriptions.
//!
//! A store holds named collections of JSON documents keyed by record id.
//! Subscriptions are push-based and always deliver the *full* set of
//! matching documents; consumers replace their local view on every event.

mod libsql_store;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::{Document, Fields, OwnerId, RecordId};
use crate::Result;

pub use libsql_store::LibSqlDocumentStore;

/// Full set of documents matching a subscription at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its store-assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<RecordId>;

    /// Remove a document owned by `owner`. Removing an absent document, or
    /// one owned by someone else, changes nothing and succeeds.
    async fn delete(&self, collection: &str, owner: &OwnerId, id: &RecordId) -> Result<()>;

    /// Create or overwrite a document under a caller-chosen id.
    async fn set_document(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()>;

    async fn get_document(&self, collection: &str, id: &RecordId) -> Result<Option<Document>>;

    /// Live view of every document in `collection` owned by `owner`.
    ///
    /// The first event carries the current set; later events follow each
    /// change to the collection.
    async fn subscribe(&self, collection: &str, owner: &OwnerId) -> Result<Subscription>;
}

type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>;

/// Cancellable stream of [`Snapshot`]s.
///
/// The listener is released when the subscription is cancelled or dropped,
/// whichever comes first.
pub struct Subscription {
    stream: SnapshotStream,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap any snapshot stream; `release` runs exactly once on teardown.
    pub fn new(
        stream: impl Stream<Item = Result<Snapshot>> + Send + 'static,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            stream: Box::pin(stream),
            release: Some(Box::new(release)),
        }
    }

    /// Subscription fed by a channel, as produced by listener tasks.
    pub fn from_channel(
        receiver: mpsc::Receiver<Result<Snapshot>>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self::new(ReceiverStream::new(receiver), release)
    }

    /// Release the listener now.
    pub fn cancel(mut self) {
        self.release_listener();
    }

    pub const fn is_active(&self) -> bool {
        self.release.is_some()
    }

    fn release_listener(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.release.is_none() {
            return Poll::Ready(None);
        }
        self.stream.as_mut().poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_listener();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
