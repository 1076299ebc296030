//! Activity builders addressed to a fixed test channel, conversation and
//! user.

use parley_core::activity::{Activity, ActivityType};

use crate::clock::fixed_now;

const CHANNEL: &str = "test";
const CONVERSATION: &str = "conversation-1";
const USER: &str = "user-1";

/// A user message in the test conversation.
#[must_use]
pub fn message(text: &str) -> Activity {
    let mut activity = Activity::message(CHANNEL, CONVERSATION, USER, text);
    activity.timestamp = fixed_now();
    activity
}

/// A named event in the test conversation.
#[must_use]
pub fn event(name: &str) -> Activity {
    let mut activity = Activity::event(CHANNEL, CONVERSATION, USER, name);
    activity.timestamp = fixed_now();
    activity
}

/// A conversation-update activity, as channels send when a user joins.
#[must_use]
pub fn conversation_update() -> Activity {
    let mut activity = event("conversationUpdate");
    activity.activity_type = ActivityType::ConversationUpdate;
    activity.name = None;
    activity
}
