use std::sync::Arc;
use std::time::Duration;

use memento_core::auth::{IdentityProvider, Session};
use memento_core::profile::{Credentials, ProfileService, Registration};
use memento_core::Error;

use crate::auth::{clear_stored_session, load_stored_session};
use crate::cli::VerifyCommands;
use crate::commands::common::{signed_in, Context};
use crate::error::CliError;

async fn profile_service(context: &Context) -> Result<ProfileService, CliError> {
    let identity = context.identity()?;
    let store = context.open_store().await?;
    Ok(ProfileService::new(Arc::new(identity), Arc::new(store)))
}

pub async fn run_register(context: &Context, registration: Registration) -> Result<(), CliError> {
    let service = profile_service(context).await?;
    let session = service.register(&registration).await?;
    service.send_verification(&session).await?;

    println!(
        "Registered profile '{}' as {}",
        context.profile_name,
        email_label(&session)
    );
    println!("A verification email is on its way. Run `memento verify wait` once you open it.");
    Ok(())
}

pub async fn run_login(context: &Context, credentials: Credentials) -> Result<(), CliError> {
    let service = profile_service(context).await?;
    let session = service.sign_in(&credentials).await?;

    match service.welcome(&session).await {
        Ok(message) => println!("{message}"),
        Err(Error::NotFound(_)) => println!("Signed in as {}", email_label(&session)),
        Err(error) => return Err(error.into()),
    }
    if !session.email_verified {
        println!("Email is not verified yet. Run `memento verify send` to resend the link.");
    }
    Ok(())
}

pub async fn run_logout(context: &Context) -> Result<(), CliError> {
    match context.identity() {
        Ok(identity) => {
            let service = ProfileService::new(Arc::new(identity), Arc::new(context.open_store().await?));
            service.sign_out().await?;
        }
        Err(CliError::BackendNotConfigured(_)) => clear_stored_session(&context.profile_name)?,
        Err(error) => return Err(error),
    }
    println!("Signed out profile '{}'", context.profile_name);
    Ok(())
}

pub async fn run_whoami(context: &Context) -> Result<(), CliError> {
    let identity = match context.identity() {
        Ok(identity) => identity,
        Err(CliError::BackendNotConfigured(_)) => {
            match load_stored_session(&context.profile_name)? {
                Some(session) => println!(
                    "Profile '{}' has a stored session for {} but no Firebase config",
                    context.profile_name,
                    email_label(&session)
                ),
                None => println!("Profile '{}' is not signed in.", context.profile_name),
            }
            return Ok(());
        }
        Err(error) => return Err(error),
    };
    let service = ProfileService::new(Arc::new(identity), Arc::new(context.open_store().await?));
    let Some(session) = service.current_session().await? else {
        println!("Profile '{}' is not signed in.", context.profile_name);
        return Ok(());
    };

    let name = service
        .profile(&session)
        .await?
        .map(|profile| format!("{} {}", profile.first_name, profile.last_name));
    println!(
        "Profile '{}' is signed in as {}{} (verified={})",
        context.profile_name,
        email_label(&session),
        name.map(|name| format!(" ({name})")).unwrap_or_default(),
        session.email_verified
    );
    Ok(())
}

pub async fn run_verify(context: &Context, command: VerifyCommands) -> Result<(), CliError> {
    let identity = context.identity()?;
    let session = signed_in(&identity).await?;

    match command {
        VerifyCommands::Status => {
            let refreshed = identity.reload_session(&session).await?;
            print_verification(&refreshed);
        }
        VerifyCommands::Send => {
            let service = ProfileService::new(Arc::new(identity), Arc::new(context.open_store().await?));
            service.send_verification(&session).await?;
            println!("Verification email sent to {}", email_label(&session));
        }
        VerifyCommands::Wait {
            interval_ms,
            timeout,
        } => {
            let service = ProfileService::new(Arc::new(identity), Arc::new(context.open_store().await?))
                .with_verification_interval(Duration::from_millis(interval_ms.max(1)));
            println!("Waiting for {} to be verified...", email_label(&session));
            let waiting = service.wait_until_verified(session);
            let verified = match timeout {
                Some(seconds) => tokio::select! {
                    result = tokio::time::timeout(Duration::from_secs(seconds), waiting) => {
                        result.map_err(|_| Error::EmailNotVerified)??
                    }
                    _ = tokio::signal::ctrl_c() => return Ok(()),
                },
                None => tokio::select! {
                    result = waiting => result?,
                    _ = tokio::signal::ctrl_c() => return Ok(()),
                },
            };
            print_verification(&verified);
        }
    }
    Ok(())
}

fn print_verification(session: &Session) {
    if session.email_verified {
        println!("{} is verified", email_label(session));
    } else {
        println!("{} is not verified yet", email_label(session));
    }
}

fn email_label(session: &Session) -> &str {
    session.email.as_deref().unwrap_or("(no email)")
}
