//! Console output through `log4rs`.
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use super::LogConfiguration;
use crate::error::CityError;

// Timestamp, padded colored level, emitting module, message.
const PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l:<5})} {M} - {m}{n}";
const APPENDER: &str = "console";

impl LogConfiguration {
    /// Installs the logger on first use and reconfigures it afterwards. Records go to stderr so
    /// the runner's stdout only carries results.
    pub(in crate::log) fn apply(&mut self) -> Result<(), CityError> {
        let console = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();
        let loggers = self
            .effective_filters()
            .into_iter()
            .map(|(target, level)| Logger::builder().build(target, level));
        let config = Config::builder()
            .appender(Appender::builder().build(APPENDER, Box::new(console)))
            .loggers(loggers)
            .build(Root::builder().appender(APPENDER).build(self.level))
            .map_err(|e| CityError::config(format!("invalid log configuration: {e}")))?;

        match &self.handle {
            Some(handle) => handle.set_config(config),
            None => match log4rs::init_config(config) {
                Ok(handle) => self.handle = Some(handle),
                // Another logger was installed first; only the facade's filter can be honored.
                Err(_) => log::set_max_level(self.max_level()),
            },
        }
        Ok(())
    }
}
