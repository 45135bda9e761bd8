use crate::{ConfigError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt::Write;

/// Per-invocation controls
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Authorization code (or the full redirect URL) supplied up front
    pub code: Option<String>,

    /// Empty the whole cache before doing anything else
    pub flush_cache: bool,

    /// Build the archive but do not upload it
    pub skip_upload: bool,

    /// Reuse this run folder name instead of the current time
    pub run_timestamp: Option<String>,
}

/// Source of an authorization code when none is supplied or cached
pub trait CodePrompt {
    /// Shows `authorization_url` to the user and returns what they enter
    fn ask(&mut self, authorization_url: &str) -> std::io::Result<String>;
}

/// Prompt that never has a code, for unattended runs
pub struct NoPrompt;

impl CodePrompt for NoPrompt {
    fn ask(&mut self, _authorization_url: &str) -> std::io::Result<String> {
        Ok(String::new())
    }
}

/// Picks the run folder name
///
/// An explicit timestamp wins; otherwise `now` is rendered with `format`.
pub fn run_timestamp<Tz>(explicit: Option<&str>, format: &str, now: DateTime<Tz>) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let timestamp = match explicit {
        Some(explicit) => explicit.trim().to_string(),
        None => {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(invalid(format!("invalid timestamp format '{}'", format)));
            }
            let mut rendered = String::new();
            write!(rendered, "{}", now.format(format))
                .map_err(|_| invalid(format!("cannot render timestamp format '{}'", format)))?;
            rendered
        }
    };

    if timestamp.is_empty()
        || timestamp == "."
        || timestamp == ".."
        || timestamp.contains(['/', '\\'])
    {
        return Err(invalid(format!(
            "run timestamp '{}' is not a usable folder name",
            timestamp
        )));
    }

    Ok(timestamp)
}

fn invalid(message: String) -> crate::BackupError {
    ConfigError::Validation(message).into()
}
