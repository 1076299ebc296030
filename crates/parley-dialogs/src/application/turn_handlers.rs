//! Storage-backed turn handling.
//!
//! Loads the dialog stack and both shared scopes, runs the turn, and
//! commits all three in one batch. A failed turn commits nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_core::activity::Activity;
use parley_core::clock::Clock;
use parley_core::error::EngineError;
use parley_core::output::OutputSink;
use parley_core::state::StateMap;
use parley_core::storage::{StateKeys, Storage, StoredItem};
use serde_json::Value;
use tracing::{info, instrument};

use super::dialog_manager::DialogManager;
use crate::domain::dialog::DialogTurnResult;
use crate::domain::stack::DialogState;
use crate::domain::turn::TurnContext;

/// Conversation-scope key holding the time of the last committed turn.
pub const LAST_ACCESS_KEY: &str = "_last_access";

fn version_of(item: Option<&StoredItem>) -> i64 {
    item.map_or(0, |item| item.version)
}

fn next_item(key: String, value: Value, loaded: Option<&StoredItem>) -> StoredItem {
    StoredItem {
        key,
        value,
        version: version_of(loaded),
    }
}

fn scope_from(item: Option<&StoredItem>) -> StateMap {
    item.map(|item| StateMap::from_value(item.value.clone()))
        .unwrap_or_default()
}

/// Decodes a persisted dialog stack.
///
/// # Errors
///
/// Returns `EngineError::Serialization` if the stored value is not a
/// dialog stack.
fn dialog_state_from(item: Option<&StoredItem>) -> Result<DialogState, EngineError> {
    Ok(item
        .map(|item| serde_json::from_value::<DialogState>(item.value.clone()))
        .transpose()?
        .unwrap_or_default())
}

fn is_expired(
    conversation: &StateMap,
    now: DateTime<Utc>,
    expire_after: chrono::Duration,
) -> Result<Option<chrono::Duration>, EngineError> {
    let last_access = conversation.get_as::<DateTime<Utc>>(LAST_ACCESS_KEY)?;
    Ok(last_access
        .map(|last| now - last)
        .filter(|idle| *idle > expire_after))
}

/// Handles one inbound activity: load state, expire stale conversations,
/// run the turn, commit state.
///
/// # Errors
///
/// Returns `EngineError::Infrastructure` if storage or output fails,
/// `EngineError::ConcurrencyConflict` if another turn committed first, or
/// whatever the dialogs raise. Nothing is persisted on error.
#[instrument(
    skip_all,
    fields(
        activity_id = %activity.id,
        conversation_id = %activity.conversation_id,
    )
)]
pub async fn handle_turn(
    activity: Activity,
    manager: &DialogManager,
    storage: &dyn Storage,
    output: Arc<dyn OutputSink>,
    clock: &dyn Clock,
) -> Result<DialogTurnResult, EngineError> {
    let keys = StateKeys::for_activity(&activity);
    let dialog_item = storage.load(&keys.dialog_state).await?;
    let conversation_item = storage.load(&keys.conversation).await?;
    let user_item = storage.load(&keys.user).await?;

    let mut dialog_state = dialog_state_from(dialog_item.as_ref())?;
    let mut turn = TurnContext::with_state(
        activity,
        output,
        scope_from(user_item.as_ref()),
        scope_from(conversation_item.as_ref()),
    );
    let now = clock.now();
    info!(depth = dialog_state.depth(), "turn started");

    if let Some(expire_after) = manager.config().expire_after {
        if let Some(idle) = is_expired(&turn.conversation_state, now, expire_after)? {
            info!(idle_secs = idle.num_seconds(), "conversation expired; resetting dialog stack");
            manager
                .cancel_all_dialogs(&mut turn, &mut dialog_state)
                .await?;
        }
    }

    let result = manager.run_turn(&mut turn, &mut dialog_state).await?;

    turn.conversation_state.set_as(LAST_ACCESS_KEY, &now)?;
    let (user_state, conversation_state) = turn.into_scopes();
    let items = [
        next_item(
            keys.dialog_state,
            serde_json::to_value(&dialog_state)?,
            dialog_item.as_ref(),
        ),
        next_item(
            keys.conversation,
            conversation_state.into_value(),
            conversation_item.as_ref(),
        ),
        next_item(keys.user, user_state.into_value(), user_item.as_ref()),
    ];
    storage.save(&items).await?;

    info!(status = ?result.status, depth = dialog_state.depth(), "turn committed");
    Ok(result)
}
