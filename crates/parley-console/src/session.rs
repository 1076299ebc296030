//! A console conversation: one turn per input line.

use std::sync::Arc;

use parley_core::activity::{Activity, ActivityType};
use parley_core::clock::{Clock, SystemClock};
use parley_core::error::EngineError;
use parley_core::output::OutputSink;
use parley_core::storage::Storage;
use parley_dialogs::application::dialog_manager::DialogManager;
use parley_dialogs::application::turn_handlers::handle_turn;
use parley_dialogs::domain::dialog::DialogTurnResult;
use parley_storage::{FileStorage, MemoryStorage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::bot::build_manager;
use crate::config::{ConsoleConfig, Identity};
use crate::error::ConsoleError;
use crate::output::LineOutput;

/// Shared collaborators for one console conversation.
#[derive(Clone)]
pub struct Session {
    manager: Arc<DialogManager>,
    storage: Arc<dyn Storage>,
    output: Arc<dyn OutputSink>,
    clock: Arc<dyn Clock>,
    identity: Identity,
}

impl Session {
    #[must_use]
    pub fn new(
        manager: DialogManager,
        storage: Arc<dyn Storage>,
        output: Arc<dyn OutputSink>,
        clock: Arc<dyn Clock>,
        identity: Identity,
    ) -> Self {
        Self {
            manager: Arc::new(manager),
            storage,
            output,
            clock,
            identity,
        }
    }

    /// Wires the sample tree to stdout, the system clock and the storage
    /// `config` selects.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Engine` if the dialog tree is mis-wired.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let storage: Arc<dyn Storage> = match &config.state_dir {
            Some(dir) => {
                info!(state_dir = %dir.display(), "using file storage");
                Arc::new(FileStorage::new(dir))
            }
            None => {
                info!("using in-memory storage; state is lost on exit");
                Arc::new(MemoryStorage::new())
            }
        };
        Ok(Self::new(
            build_manager(config.engine)?,
            storage,
            Arc::new(LineOutput::stdout()),
            Arc::new(SystemClock),
            config.identity.clone(),
        ))
    }

    fn activity(&self, text: &str) -> Activity {
        Activity::message(
            &self.identity.channel_id,
            &self.identity.conversation_id,
            &self.identity.user_id,
            text,
        )
    }

    async fn dispatch(&self, mut activity: Activity) -> Result<DialogTurnResult, EngineError> {
        activity.timestamp = self.clock.now();
        handle_turn(
            activity,
            &self.manager,
            self.storage.as_ref(),
            Arc::clone(&self.output),
            self.clock.as_ref(),
        )
        .await
    }

    /// Runs one turn for a line the user typed.
    ///
    /// # Errors
    ///
    /// Propagates engine failures; the turn's state is not persisted.
    pub async fn send_line(&self, text: &str) -> Result<DialogTurnResult, EngineError> {
        self.dispatch(self.activity(text)).await
    }

    /// Announces the user joining, which starts the root dialog on a new
    /// conversation and otherwise continues where it left off.
    ///
    /// # Errors
    ///
    /// Propagates engine failures.
    pub async fn start(&self) -> Result<DialogTurnResult, EngineError> {
        let mut activity = self.activity("");
        activity.activity_type = ActivityType::ConversationUpdate;
        activity.text = None;
        self.dispatch(activity).await
    }

    /// Starts the conversation and feeds it every line from `reader` until
    /// end of input. Failed turns are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Io` if reading fails.
    pub async fn run<R>(&self, reader: R) -> Result<(), ConsoleError>
    where
        R: AsyncBufRead + Unpin,
    {
        if let Err(e) = self.start().await {
            warn!(error = %e, "start turn failed");
        }

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            match self.send_line(&line).await {
                Ok(result) => info!(status = ?result.status, "turn finished"),
                Err(e) => warn!(error = %e, "turn failed; state not saved"),
            }
        }
        info!("input closed");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("manager", &self.manager)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
