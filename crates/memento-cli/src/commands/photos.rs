use std::path::PathBuf;
use std::sync::Arc;

use memento_core::device::PhotoSource;
use memento_core::models::Kind;
use memento_core::screen::{CaptureResult, PhotoScreen, RecordAction, SortOrder};

use crate::adapters::TerminalPicker;
use crate::cli::PhotoCommands;
use crate::commands::common::{
    describe_outcome, print_records, prompt_action, resolve_record_id, watch_records, Context,
};
use crate::error::CliError;

/// Open the photo screen for the signed-in owner with the first snapshot applied.
async fn mounted_screen(
    context: &Context,
    library_file: Option<PathBuf>,
) -> Result<PhotoScreen, CliError> {
    let session = context.media_session().await?;
    let store = context.open_store().await?;
    let picker = TerminalPicker::new(
        context.profile.photos_dir(),
        library_file,
        context.profile.camera_command(),
    );

    let mut screen = PhotoScreen::new(context.capabilities(store), Arc::new(picker));
    screen.mount(&session).await?;
    screen.next_snapshot().await?;
    Ok(screen)
}

pub async fn run_photos(context: &Context, command: PhotoCommands) -> Result<(), CliError> {
    match command {
        PhotoCommands::Add { path } => {
            let mut screen = mounted_screen(context, Some(path)).await?;
            let result = screen.capture(PhotoSource::Library).await;
            screen.unmount();
            print_capture(result?);
        }
        PhotoCommands::Capture => {
            if context.profile.camera_command().is_none() {
                return Err(CliError::CameraNotConfigured);
            }
            let mut screen = mounted_screen(context, None).await?;
            let result = screen.capture(PhotoSource::Camera).await;
            screen.unmount();
            print_capture(result?);
        }
        PhotoCommands::List { sort, json, watch } => {
            let mut screen = mounted_screen(context, None).await?;
            screen.sort_by(SortOrder::from(sort));
            let listed = if watch {
                watch_records(&mut *screen, json).await
            } else {
                print_records(Kind::Photo, screen.records(), json)
            };
            screen.unmount();
            listed?;
        }
        PhotoCommands::Open { id } => run_action(context, &id, None).await?,
        PhotoCommands::Share { id } => run_action(context, &id, Some(RecordAction::Share)).await?,
        PhotoCommands::Delete { id } => {
            run_action(context, &id, Some(RecordAction::Delete)).await?;
        }
    }
    Ok(())
}

/// Resolve the record, ask for an action when none was given, and carry it out.
async fn run_action(
    context: &Context,
    query: &str,
    action: Option<RecordAction>,
) -> Result<(), CliError> {
    let mut screen = mounted_screen(context, None).await?;
    let outcome = async {
        let id = resolve_record_id(screen.records(), query)?;
        let action = match action {
            Some(action) => action,
            None => prompt_action(&screen.prompt())?,
        };
        Ok::<_, CliError>(screen.handle_action(&id, action).await?)
    }
    .await;
    screen.unmount();

    println!("{}", describe_outcome(Kind::Photo, outcome?));
    Ok(())
}

fn print_capture(result: CaptureResult) {
    match result {
        CaptureResult::Saved(id) => println!("Saved photo {id}"),
        CaptureResult::Cancelled => println!("Cancelled"),
    }
}
