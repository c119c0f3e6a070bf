use std::io::{self, Write};
use std::sync::Arc;

use memento_core::models::Kind;
use memento_core::screen::{AudioScreen, PlaybackState, Progress, RecordAction};

use crate::adapters::TerminalAudio;
use crate::cli::AudioCommands;
use crate::commands::common::{
    describe_outcome, print_records, prompt_action, resolve_record_id, watch_records, Context,
};
use crate::error::CliError;

async fn mounted_screen(
    context: &Context,
    audio: &Arc<TerminalAudio>,
) -> Result<AudioScreen, CliError> {
    let session = context.media_session().await?;
    let store = context.open_store().await?;

    let mut screen = AudioScreen::new(context.capabilities(store), audio.clone());
    screen.mount(&session).await?;
    screen.next_snapshot().await?;
    Ok(screen)
}

pub async fn run_audio(context: &Context, command: AudioCommands) -> Result<(), CliError> {
    let audio = Arc::new(TerminalAudio::new(
        context.profile.clips_dir(),
        context.profile.player_command(),
    ));
    let mut screen = mounted_screen(context, &audio).await?;

    let result = match command {
        AudioCommands::Record { no_upload } => record(&mut screen, &audio, no_upload).await,
        AudioCommands::List { json, watch } => {
            if watch {
                watch_records(&mut *screen, json).await
            } else {
                print_records(Kind::Audio, screen.records(), json)
            }
        }
        AudioCommands::Play { id } => play(&mut screen, &id).await,
        AudioCommands::Open { id } => run_action(&mut screen, &id, None).await,
        AudioCommands::Share { id } => {
            run_action(&mut screen, &id, Some(RecordAction::Share)).await
        }
        AudioCommands::Delete { id } => {
            run_action(&mut screen, &id, Some(RecordAction::Delete)).await
        }
    };

    screen.teardown().await;
    result
}

/// Record until stdin closes or Ctrl-C, then store the clip unless told not to.
async fn record(
    screen: &mut AudioScreen,
    audio: &TerminalAudio,
    no_upload: bool,
) -> Result<(), CliError> {
    screen.start_recording().await?;
    eprintln!("Recording PCM16 from stdin. Close the input or press Ctrl-C to stop.");

    tokio::select! {
        () = audio.input_closed() => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    let uri = screen.stop_recording().await?.clone();
    println!("Clip saved at {uri}");
    if no_upload {
        return Ok(());
    }

    match screen.upload().await {
        Ok(id) => {
            println!("Uploaded clip {id}");
            Ok(())
        }
        Err(error) => {
            if let Some(flag) = screen.upload_error() {
                eprintln!("{flag}");
            }
            Err(error.into())
        }
    }
}

/// Play a clip to the end, showing elapsed time. Ctrl-C stops playback.
async fn play(screen: &mut AudioScreen, query: &str) -> Result<(), CliError> {
    let id = resolve_record_id(screen.records(), query)?;
    screen.play_record(&id).await?;

    let mut stderr = io::stderr();
    loop {
        tokio::select! {
            status = screen.next_status() => {
                let Some(status) = status? else {
                    break;
                };
                let mut shown = Progress::default();
                shown.update(&status);
                write!(stderr, "\r{}", shown.clock())?;
                stderr.flush()?;
                if screen.state() == PlaybackState::Idle {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                screen.stop().await?;
                break;
            }
        }
    }
    writeln!(stderr)?;
    Ok(())
}

async fn run_action(
    screen: &mut AudioScreen,
    query: &str,
    action: Option<RecordAction>,
) -> Result<(), CliError> {
    let id = resolve_record_id(screen.records(), query)?;
    let action = match action {
        Some(action) => action,
        None => prompt_action(&screen.prompt())?,
    };
    let outcome = screen.handle_action(&id, action).await?;
    println!("{}", describe_outcome(Kind::Audio, outcome));
    Ok(())
}
