//! Without the `logging` feature nothing is printed; only the facade's filter follows the
//! configuration, so disabled records are not even formatted.
use super::LogConfiguration;
use crate::error::CityError;

impl LogConfiguration {
    #[allow(clippy::unnecessary_wraps)]
    pub(in crate::log) fn apply(&mut self) -> Result<(), CityError> {
        log::set_max_level(self.max_level());
        Ok(())
    }
}
