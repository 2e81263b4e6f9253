//! Process inputs consulted during value resolution.
//!
//! [`Sources`] is an immutable snapshot of the argument map and the
//! environment, taken when a [`Configuration`](crate::Configuration) is
//! created. Values from both maps enter resolution as JSON strings and are
//! then coerced by the leaf's format.
//!
//! Command-line parsing belongs to the application: it builds its own
//! [`clap::Command`] and hands the resulting [`ArgMatches`] to
//! [`Sources::with_matches`]. Only values typed on the command line are
//! taken, so clap defaults never outrank loaded configuration.

use std::collections::HashMap;

use clap::ArgMatches;
use clap::parser::ValueSource as ClapSource;
use tracing::debug;

/// Snapshot of argument and environment inputs.
///
/// # Examples
///
/// ```
/// use config_schema_core::Sources;
///
/// let sources = Sources::new()
///     .with_arg("port", "7000")
///     .with_env("PORT", "6000");
/// assert_eq!(sources.arg("port"), Some("7000"));
/// assert_eq!(sources.env("PORT"), Some("6000"));
/// assert_eq!(sources.env("HOME"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sources {
    args: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl Sources {
    /// Creates an empty snapshot (no arguments, no environment).
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the environment of the current process.
    ///
    /// Entries whose name or value is not valid Unicode are skipped. The
    /// argument map starts empty; see [`with_matches`](Self::with_matches).
    pub fn from_process() -> Self {
        let env = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self {
            args: HashMap::new(),
            env,
        }
    }

    /// Builds a snapshot from explicit maps.
    pub fn from_maps(args: HashMap<String, String>, env: HashMap<String, String>) -> Self {
        Self { args, env }
    }

    /// Builds an argument-only snapshot from parsed command-line matches.
    pub fn from_arg_matches(matches: &ArgMatches) -> Self {
        Self::new().with_matches(matches)
    }

    /// Adds every argument that was given on the command line.
    ///
    /// Each entry is keyed by the clap argument id. Values supplied by a
    /// clap default are skipped; for repeated arguments the last value wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::{Arg, ArgAction, Command};
    /// use config_schema_core::Sources;
    ///
    /// let matches = Command::new("app")
    ///     .arg(Arg::new("port").long("port"))
    ///     .arg(Arg::new("host").long("host").default_value("localhost"))
    ///     .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
    ///     .get_matches_from(["app", "--port", "7000", "--verbose"]);
    ///
    /// let sources = Sources::new().with_matches(&matches);
    /// assert_eq!(sources.arg("port"), Some("7000"));
    /// assert_eq!(sources.arg("verbose"), Some("true"));
    /// assert_eq!(sources.arg("host"), None);
    /// ```
    pub fn with_matches(mut self, matches: &ArgMatches) -> Self {
        for id in matches.ids() {
            let id = id.as_str();
            if matches.value_source(id) != Some(ClapSource::CommandLine) {
                continue;
            }
            let Ok(Some(raw)) = matches.try_get_raw(id) else {
                continue;
            };
            match raw.last().map(|value| value.to_str()) {
                Some(Some(value)) => {
                    self.args.insert(id.to_string(), value.to_string());
                }
                Some(None) => debug!(arg = id, "Skipping argument that is not valid Unicode"),
                None => {}
            }
        }
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    pub fn env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }
}
