use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use coachdesk::api::client::BackendClient;
use coachdesk::api::models::UploadFile;
use coachdesk::app::{AppConfig, Session};
use coachdesk::cache::ConversationCache;
use coachdesk::components::routine_card::RoutineCardView;
use coachdesk::error::ApiError;
use coachdesk::services::{MessageService, RoutineService, StorageService};
use coachdesk::unread::UnreadTracker;
use coachdesk::utils::RUNTIME;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "coachdesk", about = "Coachdesk without the GTK front end")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log the unread total whenever it changes, until Ctrl-C (default).
    Watch,
    /// Print the routine blocks scheduled for a day.
    Routines {
        /// Local date, `YYYY-MM-DD`; today when omitted.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Upload a profile image and print its public URL.
    UploadAvatar {
        path: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete a profile image by its public URL.
    DeleteAvatar { url: String },
}

pub fn run(cli: Cli, config: AppConfig) -> Result<(), ApiError> {
    let backend = Arc::new(BackendClient::from_config(&config)?);
    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            let Some(session) = require_session(&config) else {
                return Ok(());
            };
            watch_unread(backend, session);
            Ok(())
        }
        Command::Routines { date } => {
            let Some(session) = require_session(&config) else {
                return Ok(());
            };
            let day = date.unwrap_or_else(|| Local::now().date_naive());
            let routines = RoutineService::new(backend);
            let list = RUNTIME.block_on(routines.list_for_day(&session.user_id, day, &Local))?;
            if list.is_empty() {
                println!("Nothing scheduled for {day}");
            }
            for routine in &list {
                let view = RoutineCardView::new(routine, &Local);
                println!(
                    "{}  {} [{}] {} / {}",
                    view.time_range, view.title, view.block_type, view.effort.label, view.status.label
                );
            }
            Ok(())
        }
        Command::UploadAvatar { path, content_type } => {
            let Some(session) = require_session(&config) else {
                return Ok(());
            };
            let storage = StorageService::new(backend).with_bucket(&config.avatar_bucket);
            let url = RUNTIME.block_on(async move {
                let mut file = UploadFile::from_path(&path).await?;
                if let Some(kind) = content_type {
                    file.content_type = Some(kind);
                }
                storage.upload_profile_image(file, &session.user_id).await
            })?;
            println!("{url}");
            Ok(())
        }
        Command::DeleteAvatar { url } => {
            let storage = StorageService::new(backend).with_bucket(&config.avatar_bucket);
            RUNTIME.block_on(storage.delete_profile_image(&url));
            Ok(())
        }
    }
}

fn require_session(config: &AppConfig) -> Option<Session> {
    let session = config.session();
    if session.is_none() {
        log::warn!("No user id configured (user_id or COACHDESK_USER_ID)");
    }
    session
}

fn watch_unread(backend: Arc<BackendClient>, session: Session) {
    let mut messages = MessageService::new(backend);
    match ConversationCache::open_default() {
        Ok(cache) => messages = messages.with_cache(Arc::new(cache)),
        Err(err) => log::warn!("Conversation cache unavailable: {err}"),
    }

    RUNTIME.block_on(async move {
        let user_id = session.user_id.as_str();
        let cached = messages.cached_conversations(user_id, 200);
        log::info!("{} cached conversations", cached.len());
        match messages.get_conversations(user_id).await {
            Ok(list) => log::info!("{} conversations on the backend", list.len()),
            Err(err) => log::warn!("Could not load conversations: {err}"),
        }

        let mut tracker = UnreadTracker::new(Arc::new(messages));
        let mut state = tracker.watch();
        tracker.set_user(Some(user_id));

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *state.borrow_and_update();
                    if !current.loading {
                        log::info!("Unread messages: {}", current.unread_count);
                    }
                }
                _ = &mut ctrl_c => break,
            }
        }
        tracker.shutdown();
    });
}
