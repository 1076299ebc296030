//! Console configuration read from the environment.

use std::path::PathBuf;

use parley_dialogs::application::config::EngineConfig;

use crate::error::ConsoleError;

/// Directory for YAML state files. In-memory storage when unset.
pub const STATE_DIR_VAR: &str = "PARLEY_STATE_DIR";

/// Conversation id used for every turn.
pub const CONVERSATION_VAR: &str = "PARLEY_CONVERSATION_ID";

/// User id used for every turn.
pub const USER_VAR: &str = "PARLEY_USER_ID";

pub const CHANNEL_ID: &str = "console";

const DEFAULT_CONVERSATION: &str = "local";
const DEFAULT_USER: &str = "local-user";

/// Who is talking, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub channel_id: String,
    pub conversation_id: String,
    pub user_id: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            channel_id: CHANNEL_ID.to_owned(),
            conversation_id: DEFAULT_CONVERSATION.to_owned(),
            user_id: DEFAULT_USER.to_owned(),
        }
    }
}

/// Everything the console needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub engine: EngineConfig,
    pub state_dir: Option<PathBuf>,
    pub identity: Identity,
}

impl ConsoleConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Config` if a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine =
            EngineConfig::from_lookup(&lookup).map_err(|e| ConsoleError::Config(e.to_string()))?;

        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let state_dir = non_blank(STATE_DIR_VAR).map(PathBuf::from);

        let mut identity = Identity::default();
        if let Some(conversation_id) = non_blank(CONVERSATION_VAR) {
            if conversation_id.contains('/') {
                return Err(ConsoleError::Config(format!(
                    "{CONVERSATION_VAR} must not contain '/'"
                )));
            }
            identity.conversation_id = conversation_id;
        }
        if let Some(user_id) = non_blank(USER_VAR) {
            if user_id.contains('/') {
                return Err(ConsoleError::Config(format!("{USER_VAR} must not contain '/'")));
            }
            identity.user_id = user_id;
        }

        Ok(Self {
            engine,
            state_dir,
            identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ConsoleConfig, ConsoleError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ConsoleConfig::from_lookup(|name: &str| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_use_memory_storage_and_local_identity() {
        let config = config_from(&[]).unwrap();

        assert!(config.state_dir.is_none());
        assert_eq!(config.identity, Identity::default());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_reads_state_dir_identity_and_engine_settings() {
        // Arrange
        let vars = [
            (STATE_DIR_VAR, "/tmp/parley"),
            (CONVERSATION_VAR, "demo"),
            (USER_VAR, "ada"),
            ("PARLEY_EXPIRE_AFTER_SECS", "60"),
        ];

        // Act
        let config = config_from(&vars).unwrap();

        // Assert
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/parley")));
        assert_eq!(config.identity.conversation_id, "demo");
        assert_eq!(config.identity.user_id, "ada");
        assert!(config.engine.expire_after.is_some());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [(USER_VAR, "a/b")],
            [("PARLEY_SHOULD_PROCESS_TIE_BREAK", "nearest")],
        ] {
            let result = config_from(&vars);

            match result {
                Err(ConsoleError::Config(_)) => {}
                other => panic!("expected Config error for {vars:?}, got {other:?}"),
            }
        }
    }
}
