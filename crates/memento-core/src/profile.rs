//! Registration, sign-in, and email verification flows.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::auth::{AuthError, IdentityProvider, Session};
use crate::models::{RecordId, UserProfile, PROFILES_COLLECTION};
use crate::store::DocumentStore;
use crate::{Error, Result};

const MIN_FIELD_LEN: usize = 4;
const FILL_ALL_FIELDS: &str = "Please fill out all fields.";
const INVALID_CREDENTIALS: &str = "Please enter valid credentials.";

/// How often the verification watcher re-reads the account.
pub const DEFAULT_VERIFICATION_INTERVAL: Duration = Duration::from_millis(3000);

/// Sign-up form.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    /// Reject the form before any provider call is made.
    pub fn validate(&self) -> std::result::Result<(), AuthError> {
        let names_present =
            !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty();
        if names_present && long_enough(&self.email) && long_enough(&self.password) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials(FILL_ALL_FIELDS.to_string()))
        }
    }

    fn profile(&self) -> UserProfile {
        UserProfile {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// Sign-in form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> std::result::Result<(), AuthError> {
        if long_enough(&self.email) && long_enough(&self.password) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials(INVALID_CREDENTIALS.to_string()))
        }
    }
}

fn long_enough(value: &str) -> bool {
    value.trim().chars().count() >= MIN_FIELD_LEN
}

/// Account flows on top of an identity provider and the profile collection.
#[derive(Clone)]
pub struct ProfileService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    verification_interval: Duration,
}

impl ProfileService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            store,
            verification_interval: DEFAULT_VERIFICATION_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_verification_interval(mut self, interval: Duration) -> Self {
        self.verification_interval = interval;
        self
    }

    /// Create the account, then write its profile document.
    ///
    /// A failed profile write is reported even though the account exists.
    pub async fn register(&self, registration: &Registration) -> Result<Session> {
        registration.validate()?;

        let session = self
            .identity
            .register_with_password(registration.email.trim(), &registration.password)
            .await?;
        tracing::info!("Registered account {}", session.id);

        let id: RecordId = session.id.as_str().parse()?;
        let fields = registration.profile().to_fields()?;
        if let Err(error) = self
            .store
            .set_document(PROFILES_COLLECTION, &id, fields)
            .await
        {
            tracing::warn!("Error saving user {}: {error}", session.id);
            return Err(Error::PersistenceFailed(format!("Error saving user: {error}")));
        }

        Ok(session)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;
        let session = self
            .identity
            .sign_in(credentials.email.trim(), &credentials.password)
            .await?;
        tracing::info!("Signed in as {}", session.id);
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.identity.current_session().await?)
    }

    pub async fn profile(&self, session: &Session) -> Result<Option<UserProfile>> {
        let id: RecordId = session.id.as_str().parse()?;
        self.store
            .get_document(PROFILES_COLLECTION, &id)
            .await?
            .map(|document| UserProfile::from_fields(&document.fields))
            .transpose()
    }

    /// `Welcome, {FirstName}` from the stored profile.
    pub async fn welcome(&self, session: &Session) -> Result<String> {
        self.profile(session)
            .await?
            .map(|profile| profile.welcome_message())
            .ok_or_else(|| Error::NotFound(format!("profile for {}", session.id)))
    }

    pub async fn send_verification(&self, session: &Session) -> Result<()> {
        self.identity.send_verification_email(session).await?;
        tracing::info!("Verification email sent to {}", session.id);
        Ok(())
    }

    /// Re-read the account every interval, yielding each refreshed session.
    ///
    /// The first read happens one interval after the call. The stream ends
    /// after yielding an error.
    pub fn watch_verification(&self, session: Session) -> BoxStream<'static, Result<Session>> {
        let identity = Arc::clone(&self.identity);
        let period = self.verification_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        stream::unfold(Some((identity, ticker, session)), |state| async move {
            let (identity, mut ticker, session) = state?;
            ticker.tick().await;
            match identity.reload_session(&session).await {
                Ok(refreshed) => {
                    tracing::debug!(
                        "Verification status for {}: {}",
                        refreshed.id,
                        refreshed.email_verified
                    );
                    let next = refreshed.clone();
                    Some((Ok(refreshed), Some((identity, ticker, next))))
                }
                Err(error) => Some((Err(Error::from(error)), None)),
            }
        })
        .boxed()
    }

    /// Poll until the account is verified.
    pub async fn wait_until_verified(&self, session: Session) -> Result<Session> {
        if session.email_verified {
            return Ok(session);
        }
        let mut updates = self.watch_verification(session);
        while let Some(update) = updates.next().await {
            let session = update?;
            if session.email_verified {
                tracing::info!("Email verified for {}", session.id);
                return Ok(session);
            }
        }
        Err(Error::EmailNotVerified)
    }
}

/// Gate for the media screens.
pub fn require_verified(session: &Session) -> Result<()> {
    if session.email_verified {
        Ok(())
    } else {
        Err(Error::EmailNotVerified)
    }
}
