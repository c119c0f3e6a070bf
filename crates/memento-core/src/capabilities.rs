//! The collaborator set handed to screen controllers.

use std::fmt;
use std::sync::Arc;

use crate::device::{MailComposer, PermissionGate};
use crate::notice::NoticeSink;
use crate::store::DocumentStore;

/// Shared backend and device handles, injected instead of global singletons.
#[derive(Clone)]
pub struct Capabilities {
    pub store: Arc<dyn DocumentStore>,
    pub permissions: Arc<dyn PermissionGate>,
    pub mail: Arc<dyn MailComposer>,
    pub notices: Arc<dyn NoticeSink>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
