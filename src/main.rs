//! Tunedeck - headless library front end
//!
//! Usage: `tunedeck [FILES...]`
//!
//! Imports the given audio files into managed storage and prints the
//! resulting catalog. Without arguments it only reports the catalog and
//! storage diagnostics.

use std::{env::args, path::PathBuf, sync::Arc};

use {
    anyhow::{Error, Result},
    tracing::info,
    tracing_subscriber::EnvFilter,
};

use tunedeck::{
    AppServices, AppState, ImportResult, SettingsManager,
    audio::HeadlessEngine,
    error::{ErrorReporter, ResultExt},
    library::picker::PathListPicker,
};

/// Main entry point for the Tunedeck binary.
#[tokio::main]
async fn main() -> Result<()> {
    let settings_manager = SettingsManager::new().add_context("Failed to load settings")?;
    let settings = settings_manager.get_settings().clone();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let paths: Vec<PathBuf> = args().skip(1).map(PathBuf::from).collect();
    let importing = !paths.is_empty();

    let (engine, events) = HeadlessEngine::new();
    let services = AppServices::local(
        Arc::new(PathListPicker::new(paths)),
        Arc::new(engine),
    );
    let state = AppState::initialize(&settings, services)
        .await
        .add_context("Failed to initialize library")?;

    let coordinator = Arc::clone(&state.coordinator);
    tokio::spawn(async move { coordinator.run(events).await });

    if importing {
        match state.importer.open_file_picker().await {
            Ok(Some(files)) => {
                let result = state
                    .importer
                    .import_tracks(&files, |done, total| {
                        info!("Imported {done}/{total}");
                    })
                    .await;
                println!("{}", import_summary(&result));
            }
            Ok(None) => println!("No audio files selected"),
            Err(e) => {
                let error = Error::from(e);
                ErrorReporter::error(&error, "file selection");
                eprintln!("{}", ErrorReporter::to_user_message(&error));
            }
        }
    }

    print_catalog(&state).await?;
    Ok(())
}

fn import_summary(result: &ImportResult) -> String {
    let mut summary = format!("Imported {} of {} files", result.imported.len(), result.total());
    if !result.duplicates.is_empty() {
        summary.push_str(&format!(
            "\nAlready in library: {}",
            result.duplicates.join(", ")
        ));
    }
    if !result.failed.is_empty() {
        summary.push_str(&format!("\nFailed: {}", result.failed.join(", ")));
    }
    summary
}

async fn print_catalog(state: &AppState) -> Result<()> {
    let tracks = state.catalog.tracks();
    println!(
        "{} tracks in {}",
        tracks.len(),
        state.importer.music_directory().display()
    );
    for track in &tracks {
        println!(
            "  {} - {}",
            track.artist.as_deref().unwrap_or("Unknown Artist"),
            track.display_title()
        );
    }

    for track in state.importer.dangling_tracks().await {
        println!("Missing file for {}: {}", track.file_name, track.file_path);
    }
    let untracked = state
        .importer
        .untracked_files()
        .await
        .add_context("Failed to list managed storage")?;
    for path in untracked {
        println!("Not in catalog: {}", path.display());
    }
    Ok(())
}
