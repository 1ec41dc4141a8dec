use serde::Serialize;

use super::{Location, LocationKind};
use crate::error::CityError;

/// The static description of a location, for logging. Occupancy, waiters, residents and the
/// contamination instant are left out; this is not a restart format. The contamination horizon
/// is kept.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationSnapshot {
    pub name: String,
    pub location_type: LocationKind,
    pub lat: i64,
    pub lon: i64,
    pub area: f64,
    pub capacity: Option<usize>,
    pub social_contact_factor: f64,
    pub surface_prob: Vec<f64>,
    pub max_contamination_days: u32,
}

impl Location {
    #[must_use]
    pub fn snapshot(&self) -> LocationSnapshot {
        LocationSnapshot {
            name: self.name.clone(),
            location_type: self.kind,
            lat: self.x,
            lon: self.y,
            area: self.area,
            capacity: self.capacity,
            social_contact_factor: self.profile.social_contact_factor,
            surface_prob: self.profile.surface_prob.probabilities().to_vec(),
            max_contamination_days: self.max_contamination_days,
        }
    }
}

impl LocationSnapshot {
    pub fn to_json(&self) -> Result<String, CityError> {
        Ok(serde_json::to_string(self)?)
    }
}
