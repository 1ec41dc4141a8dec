//! Surface contamination left behind by infectious visitors.
//!
//! Each infectious admission stamps the location with the current instant and samples a
//! persistence horizon in whole days from the location's day-bin distribution. The location keeps
//! the largest horizon ever sampled. It counts as contaminated while the time since the last
//! infectious admission does not exceed that horizon, and the probability of picking up an
//! infection from its surfaces decays linearly from the social contact factor to zero over the
//! horizon.

use chrono::{Duration, NaiveDateTime};
use log::trace;

use super::Location;
use crate::random::RandomStream;

const SECONDS_PER_DAY: f64 = 86_400.0;

impl Location {
    pub(super) fn contaminate(&mut self, now: NaiveDateTime, rng: &mut RandomStream) {
        self.contaminated_at = Some(now);
        let sampled = rng.sample_categorical(&self.profile.surface_prob);
        let sampled = u32::try_from(sampled).unwrap_or(u32::MAX);
        self.max_contamination_days = self.max_contamination_days.max(sampled);
        trace!(
            "{} contaminated at {now} (sampled {sampled} days, horizon {} days)",
            self.name,
            self.max_contamination_days
        );
    }

    /// Instant of the most recent infectious admission, if any.
    #[must_use]
    pub fn contaminated_at(&self) -> Option<NaiveDateTime> {
        self.contaminated_at
    }

    /// Largest persistence horizon sampled so far, in days. Never decreases.
    #[must_use]
    pub fn max_contamination_days(&self) -> u32 {
        self.max_contamination_days
    }

    /// True while no more than the persistence horizon has elapsed since the last infectious
    /// admission. Always false before the first one, and whenever the horizon is 0.
    #[must_use]
    pub fn is_contaminated(&self, now: NaiveDateTime) -> bool {
        match self.contaminated_at {
            Some(contaminated_at) if self.max_contamination_days > 0 => {
                now - contaminated_at <= Duration::days(i64::from(self.max_contamination_days))
            }
            _ => false,
        }
    }

    /// Probability of infection from the surfaces at `now`:
    /// `social_contact_factor * (1 - elapsed_days / horizon)` while contaminated, 0 otherwise.
    #[must_use]
    pub fn contamination_probability(&self, now: NaiveDateTime) -> f64 {
        let Some(contaminated_at) = self.contaminated_at else {
            return 0.0;
        };
        if !self.is_contaminated(now) {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let elapsed_days = (now - contaminated_at).num_seconds() as f64 / SECONDS_PER_DAY;
        let decay = 1.0 - elapsed_days / f64::from(self.max_contamination_days);
        self.profile.social_contact_factor * decay
    }
}
