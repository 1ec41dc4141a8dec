//! Log output for city runs.
//!
//! The crate logs through the `log` facade and re-exports its five macros (`error!`, `warn!`,
//! `info!`, `debug!` and `trace!`):
//!
//! ```rust
//! use epi_city::info;
//!
//! pub fn open_the_city() {
//!     info!("The city is open.");
//! }
//! ```
//!
//! City construction reports each phase at `info`. Household allocation logs every opened
//! household at `debug`, population assignment logs every agent at `trace`, and locations log
//! admission queueing and contamination at `trace`.
//!
//! Logging is off until a level is set. The runner's `--log-level` takes comma-separated
//! directives: a bare level sets the global level and `target=level` filters one module of this
//! crate. Targets may be given relative to the crate, so `warn,city::population=trace` is the same
//! as `warn,epi_city::city::population=trace`. The same directives can be applied from code:
//!
//! ```rust
//! use epi_city::log::apply_directives;
//!
//! pub fn setup_logging() {
//!     apply_directives("info,location=trace").unwrap();
//! }
//! ```
//!
//! The targets in [`PER_AGENT_TARGETS`] are capped at [`PER_AGENT_CAP`] unless a directive names
//! them, so a global `trace` does not print one line per agent of a large city.
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
pub use log::{debug, error, info, trace, warn, LevelFilter};

use crate::error::CityError;

const CRATE_TARGET: &str = "epi_city";

/// Modules that emit a record per agent or household while the city is built.
pub const PER_AGENT_TARGETS: [&str; 2] = ["epi_city::city::population", "epi_city::city::households"];

/// Highest level the [`PER_AGENT_TARGETS`] log at when no directive names them.
pub const PER_AGENT_CAP: LevelFilter = LevelFilter::Debug;

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// The installed filters. Only the singleton behind [`LOG_CONFIGURATION`] exists; the public
/// functions lock it, change it and reapply it.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    pub(in crate::log) level: LevelFilter,
    /// Explicit per-target filters, in the order they were set.
    pub(in crate::log) targets: IndexMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    handle: Option<log4rs::Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        LogConfiguration {
            level: LevelFilter::Off,
            targets: IndexMap::new(),

            #[cfg(feature = "logging")]
            handle: None,
        }
    }
}

impl LogConfiguration {
    /// The filters handed to the logger: the per-agent caps (never above the global level) for
    /// targets without an explicit filter, then the explicit filters.
    pub(in crate::log) fn effective_filters(&self) -> Vec<(String, LevelFilter)> {
        let mut filters: Vec<(String, LevelFilter)> = PER_AGENT_TARGETS
            .iter()
            .filter(|target| !self.targets.contains_key(**target))
            .map(|target| ((*target).to_string(), self.level.min(PER_AGENT_CAP)))
            .collect();
        filters.extend(
            self.targets
                .iter()
                .map(|(target, level)| (target.clone(), *level)),
        );
        filters
    }

    /// The most verbose level any record can pass at.
    pub(in crate::log) fn max_level(&self) -> LevelFilter {
        self.targets.values().copied().fold(self.level, Ord::max)
    }

    fn apply_directives(&mut self, directives: LogDirectives) -> Result<(), CityError> {
        if let Some(level) = directives.level {
            self.level = level;
        }
        for (target, level) in directives.targets {
            self.targets.insert(target, level);
        }
        self.apply()
    }
}

/// Parsed `--log-level` directives.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogDirectives {
    /// Global level, if a bare level was given. The last one wins.
    pub level: Option<LevelFilter>,
    /// Per-target levels with targets expanded to full module paths.
    pub targets: Vec<(String, LevelFilter)>,
}

impl FromStr for LogDirectives {
    type Err = CityError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut directives = LogDirectives::default();
        for directive in spec.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                None => directives.level = Some(parse_level(directive)?),
                Some((target, level)) => {
                    let target = target.trim();
                    if target.is_empty() {
                        return Err(CityError::config(format!(
                            "log directive {directive:?} has no target"
                        )));
                    }
                    directives
                        .targets
                        .push((qualify_target(target), parse_level(level.trim())?));
                }
            }
        }
        Ok(directives)
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, CityError> {
    level
        .parse()
        .map_err(|e| CityError::config(format!("invalid log level {level:?}: {e}")))
}

/// Prefixes targets that do not already start with the crate name.
fn qualify_target(target: &str) -> String {
    if target == CRATE_TARGET || target.starts_with("epi_city::") {
        target.to_string()
    } else {
        format!("{CRATE_TARGET}::{target}")
    }
}

fn log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Parses and applies `--log-level` directives such as `info` or `warn,city::households=debug`.
/// Directives are added to what is already configured.
pub fn apply_directives(spec: &str) -> Result<(), CityError> {
    let directives: LogDirectives = spec.parse()?;
    log_configuration().apply_directives(directives)
}

/// Sets the global level. `LevelFilter::Off` disables logging apart from explicit target filters.
pub fn set_log_level(level: LevelFilter) -> Result<(), CityError> {
    log_configuration().apply_directives(LogDirectives {
        level: Some(level),
        targets: Vec::new(),
    })
}

/// Sets the level of one module; `target` may be relative to the crate.
pub fn set_module_filter(target: &str, level: LevelFilter) -> Result<(), CityError> {
    log_configuration().apply_directives(LogDirectives {
        level: None,
        targets: vec![(qualify_target(target), level)],
    })
}

/// Turns all output off and forgets the target filters.
pub fn disable_logging() -> Result<(), CityError> {
    let mut configuration = log_configuration();
    configuration.level = LevelFilter::Off;
    configuration.targets.clear();
    configuration.apply()
}
