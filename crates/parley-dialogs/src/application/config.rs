//! Engine configuration read from the environment.

use chrono::Duration;
use parley_core::error::EngineError;

use crate::domain::consultation::TieBreak;

/// Seconds of inactivity after which a conversation's dialog stack is reset.
pub const EXPIRE_AFTER_VAR: &str = "PARLEY_EXPIRE_AFTER_SECS";

/// `innermost` or `outermost`.
pub const TIE_BREAK_VAR: &str = "PARLEY_SHOULD_PROCESS_TIE_BREAK";

/// Turn-handling settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Winner among frames that all report `ShouldProcess`.
    pub should_process_tie_break: TieBreak,
    /// Idle time after which the dialog stack is cancelled. `None` never
    /// expires.
    pub expire_after: Option<Duration>,
}

impl EngineConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if a variable is set to an invalid
    /// value.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if set.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if a variable is set to an invalid
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let should_process_tie_break = lookup(TIE_BREAK_VAR)
            .map(|raw| raw.parse::<TieBreak>())
            .transpose()?
            .unwrap_or_default();

        let expire_after = lookup(EXPIRE_AFTER_VAR)
            .map(|raw| parse_expiry(&raw))
            .transpose()?;

        Ok(Self {
            should_process_tie_break,
            expire_after,
        })
    }

    #[must_use]
    pub fn with_expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = Some(expire_after);
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.should_process_tie_break = tie_break;
        self
    }
}

fn parse_expiry(raw: &str) -> Result<Duration, EngineError> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|e| EngineError::Config(format!("{EXPIRE_AFTER_VAR} must be an integer: {e}")))?;
    if secs <= 0 {
        return Err(EngineError::Config(format!(
            "{EXPIRE_AFTER_VAR} must be positive, got {secs}"
        )));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| EngineError::Config(format!("{EXPIRE_AFTER_VAR} is out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.should_process_tie_break, TieBreak::Innermost);
        assert!(config.expire_after.is_none());
    }

    #[test]
    fn test_reads_expiry_and_tie_break() {
        // Arrange
        let vars = [(EXPIRE_AFTER_VAR, "900"), (TIE_BREAK_VAR, "outermost")];

        // Act
        let config = EngineConfig::from_lookup(lookup_from(&vars)).unwrap();

        // Assert
        assert_eq!(config.expire_after, Some(Duration::minutes(15)));
        assert_eq!(config.should_process_tie_break, TieBreak::Outermost);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for vars in [
            [(EXPIRE_AFTER_VAR, "soon")],
            [(EXPIRE_AFTER_VAR, "0")],
            [(TIE_BREAK_VAR, "sideways")],
        ] {
            let result = EngineConfig::from_lookup(lookup_from(&vars));

            match result {
                Err(EngineError::Config(_)) => {}
                other => panic!("expected Config error for {vars:?}, got {other:?}"),
            }
        }
    }
}
