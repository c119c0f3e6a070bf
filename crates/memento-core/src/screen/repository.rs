//! Per-kind media repository: live list, persistence, delete and share.

use std::collections::HashSet;
use std::marker::PhantomData;

use futures::StreamExt;

use crate::auth::Session;
use crate::capabilities::Capabilities;
use crate::device::Capability;
use crate::models::{AssetUri, MediaKind, MediaRecord, OwnerId, RecordId};
use crate::notice::Notice;
use crate::store::{Snapshot, Subscription};
use crate::util::unix_timestamp_millis_now;
use crate::{Error, Result};

use super::actions::{
    delete_failed_message, deleted_notice, share_draft, share_sent_message, ActionOutcome,
    ActionPrompt, RecordAction, ShareOutcome,
};
use super::ordering::SortOrder;

/// Blocking notice shown when a capture permission is denied.
pub const PERMISSION_NOTICE: &str = "Grant Permissions first to use the app";

/// Live, owner-scoped view of one media collection.
///
/// The local list is replaced wholesale by every snapshot. The only local
/// mutation is the optimistic removal after a successful delete.
pub struct MediaRepository<K: MediaKind> {
    caps: Capabilities,
    owner: Option<OwnerId>,
    subscription: Option<Subscription>,
    records: Vec<MediaRecord>,
    order: Option<SortOrder>,
    _kind: PhantomData<K>,
}

impl<K: MediaKind> MediaRepository<K> {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            owner: None,
            subscription: None,
            records: Vec::new(),
            order: None,
            _kind: PhantomData,
        }
    }

    pub const fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Ask for a device permission before capturing media of this kind.
    ///
    /// Capabilities outside the kind's permission scope are never requested.
    /// On denial a blocking notice is shown and nothing else happens.
    pub(crate) async fn acquire(&self, capability: Capability) -> Result<()> {
        let in_scope = K::KIND.permission_scope().contains(&capability);
        if in_scope && self.caps.permissions.acquire(capability).await {
            return Ok(());
        }
        tracing::warn!("{capability} permission denied for {}", K::KIND);
        self.caps
            .notices
            .present(Notice::blocking(PERMISSION_NOTICE, ""));
        Err(Error::PermissionDenied(capability))
    }

    /// Subscribe to the session owner's records. Remounting drops the old listener.
    pub async fn mount(&mut self, session: &Session) -> Result<()> {
        if !session.email_verified {
            return Err(Error::EmailNotVerified);
        }
        self.unmount();

        let subscription = self
            .caps
            .store
            .subscribe(K::KIND.collection(), &session.id)
            .await
            .map_err(persistence)?;

        tracing::info!("Mounted {} list for {}", K::KIND, session.id);
        self.owner = Some(session.id.clone());
        self.subscription = Some(subscription);
        Ok(())
    }

    pub const fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn owner(&self) -> Result<&OwnerId> {
        self.owner.as_ref().ok_or(Error::NotMounted)
    }

    /// Wait for the next snapshot and apply it.
    ///
    /// Returns `false` once the subscription has ended.
    pub async fn next_snapshot(&mut self) -> Result<bool> {
        let subscription = self.subscription.as_mut().ok_or(Error::NotMounted)?;
        match subscription.next().await {
            Some(Ok(snapshot)) => {
                self.apply_snapshot(&snapshot);
                Ok(true)
            }
            Some(Err(error)) => {
                tracing::warn!("{} subscription delivered an error: {error}", K::KIND);
                Err(persistence(error))
            }
            None => Ok(false),
        }
    }

    /// Replace the local list with `snapshot`.
    ///
    /// Documents owned by someone else, repeated ids, and undecodable
    /// documents are dropped.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let Some(owner) = self.owner.as_ref() else {
            return;
        };

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(snapshot.len());
        for document in &snapshot.documents {
            let record = match MediaRecord::from_document(K::KIND, document) {
                Ok(record) => record,
                Err(error) => {
                    tracing::warn!("Skipping {} document: {error}", K::KIND);
                    continue;
                }
            };
            if &record.owner_id != owner || !seen.insert(record.id.clone()) {
                continue;
            }
            records.push(record);
        }

        if let Some(order) = self.order {
            order.apply(&mut records);
        }
        tracing::debug!("Applied {} snapshot with {} record(s)", K::KIND, records.len());
        self.records = records;
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    pub fn record(&self, id: &RecordId) -> Result<&MediaRecord> {
        self.records
            .iter()
            .find(|record| &record.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub const fn order(&self) -> Option<SortOrder> {
        self.order
    }

    /// Change the ordering policy and re-sort the current list in memory.
    pub(crate) fn set_order(&mut self, order: SortOrder) {
        self.order = Some(order);
        order.apply(&mut self.records);
    }

    /// Create one record pointing at `media_url`.
    pub async fn persist(&self, media_url: &AssetUri) -> Result<RecordId> {
        let owner = self.owner()?;
        let fields =
            MediaRecord::new_fields(K::KIND, owner, media_url, unix_timestamp_millis_now());
        let id = self
            .caps
            .store
            .create(K::KIND.collection(), fields)
            .await
            .map_err(persistence)?;
        tracing::info!("Created {} record {id}", K::KIND);
        Ok(id)
    }

    /// Remove one of the owner's listed records from the store, then from
    /// the local list.
    ///
    /// Ids outside the current list are `NotFound` and never reach the store.
    /// On store failure the local list is left as is until the next snapshot.
    pub async fn delete(&mut self, id: &RecordId) -> Result<()> {
        let owner = self.owner()?;
        self.record(id)?;
        self.caps
            .store
            .delete(K::KIND.collection(), owner, id)
            .await
            .map_err(persistence)?;
        self.records.retain(|record| &record.id != id);
        tracing::info!("Deleted {} record {id}", K::KIND);
        Ok(())
    }

    /// Offer the record's asset through the mail composer.
    pub async fn share(&self, id: &RecordId) -> Result<ShareOutcome> {
        let record = self.record(id)?;
        let notices = &self.caps.notices;

        if !self.caps.mail.is_available().await {
            notices.present(Notice::info("Email is not available", ""));
            return Ok(ShareOutcome::Unavailable);
        }

        match self
            .caps
            .mail
            .compose(share_draft(K::KIND, &record.media_url))
            .await
        {
            Ok(status) => {
                tracing::info!("Mail composer finished with {status:?}");
                notices.present(Notice::info("Email Sent", share_sent_message(K::KIND)));
                Ok(ShareOutcome::Composed(status))
            }
            Err(error) => {
                tracing::warn!("Failed to send {} by email: {error}", K::KIND);
                notices.present(Notice::error("Error", "Failed to send email"));
                Ok(ShareOutcome::Failed)
            }
        }
    }

    pub fn prompt(&self) -> ActionPrompt {
        ActionPrompt::for_kind(K::KIND)
    }

    /// Carry out the user's choice from [`MediaRepository::prompt`].
    pub async fn handle_action(
        &mut self,
        id: &RecordId,
        action: RecordAction,
    ) -> Result<ActionOutcome> {
        match action {
            RecordAction::Share => Ok(ActionOutcome::Shared(self.share(id).await?)),
            RecordAction::Delete => {
                match self.delete(id).await {
                    Ok(()) => {
                        let (title, message) = deleted_notice(K::KIND);
                        self.caps.notices.present(Notice::info(title, message));
                    }
                    Err(error) => {
                        tracing::warn!("Failed to delete {} {id}: {error}", K::KIND);
                        self.caps
                            .notices
                            .present(Notice::error("Error", delete_failed_message(K::KIND)));
                        return Err(error);
                    }
                }
                Ok(ActionOutcome::Deleted)
            }
            RecordAction::Cancel => Ok(ActionOutcome::Cancelled),
        }
    }

    /// Release the listener and forget the local list.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            tracing::info!("Unmounted {} list", K::KIND);
        }
        self.owner = None;
        self.records.clear();
    }
}

pub(crate) fn persistence(error: Error) -> Error {
    match error {
        Error::PersistenceFailed(_) => error,
        other => Error::PersistenceFailed(other.to_string()),
    }
}
