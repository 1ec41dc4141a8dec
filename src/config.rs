//! City parameters.
//!
//! A [`CityConfig`] carries every table the city is built from: facility kinds with their
//! population divisors, area shares, capacities and contamination day-bins; the age-bin table
//! that drives population assignment; and the global constants of household allocation. It is
//! loaded from JSON with [`CityConfig::from_json_file`] or taken from the built-in
//! [`CityConfig::default`], and is always checked by [`CityConfig::validate`] before a city is
//! built from it.
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::agent::Profession;
use crate::error::CityError;
use crate::location::{LocationKind, ICU_SHARE_PERCENT};
use crate::random::Categorical;

/// Number of household sizes (1 through 5) a house-size distribution ranges over.
pub const HOUSE_SIZES: usize = 5;

/// Facility kinds every configuration must describe.
pub const REQUIRED_KINDS: [LocationKind; 8] = [
    LocationKind::Household,
    LocationKind::SeniorResidency,
    LocationKind::Hospital,
    LocationKind::School,
    LocationKind::Workplace,
    LocationKind::Store,
    LocationKind::Park,
    LocationKind::Misc,
];

/// How one kind of facility is scaled, sized and contaminated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FacilitySpec {
    /// One instance per this many people (rounded up). For households this is the average
    /// household size and is informational only; households are opened on demand.
    pub population_divisor: f64,
    /// Fraction of the city's total area shared by all instances of this kind.
    pub area_share: f64,
    pub social_contact_factor: f64,
    /// Half-open `[low, high)` range each instance's capacity is drawn from; `None` is unbounded.
    #[serde(default)]
    pub capacity: Option<(usize, usize)>,
    /// Day-bin distribution of how long surfaces stay contaminated.
    pub surface_prob: Categorical,
}

/// Relative weight of each profession within an age bin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfessionProfile {
    pub healthcare: f64,
    pub school: f64,
    pub others: f64,
    pub retired: f64,
}

impl ProfessionProfile {
    fn weight(&self, profession: Profession) -> f64 {
        match profession {
            Profession::Healthcare => self.healthcare,
            Profession::School => self.school,
            Profession::Others => self.others,
            Profession::Retired => self.retired,
        }
    }

    /// The profile as a distribution over [`Profession::ALL`].
    pub fn categorical(&self) -> Result<Categorical, CityError> {
        Categorical::new(Profession::ALL.iter().map(|p| self.weight(*p)).collect())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgeBinSpec {
    /// Inclusive lower bound of the ages sampled in this bin.
    pub lower: u32,
    /// Exclusive upper bound.
    pub upper: u32,
    /// Share of the population in this bin; the bin gets `ceil(fraction * population)` agents.
    pub fraction: f64,
    pub profession_profile: ProfessionProfile,
    /// Probability that an agent of this bin lives in a senior residency.
    pub senior_residency_preference: f64,
    /// Distribution over household sizes 1 through 5 used when this bin's agents open a
    /// household.
    pub house_size_preference: Categorical,
}

impl AgeBinSpec {
    #[must_use]
    pub fn contains(&self, age: u32) -> bool {
        (self.lower..self.upper).contains(&age)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CityConfig {
    pub population: usize,
    /// Half-open range of x coordinates.
    pub x_range: (i64, i64),
    /// Half-open range of y coordinates.
    pub y_range: (i64, i64),
    pub start_time: NaiveDateTime,
    pub sim_days: u32,
    /// Probability that an agent starts out infected.
    pub init_percent_sick: f64,
    pub minutes_per_tick: u32,
    /// A household only admits an agent if the resulting average age stays above this.
    pub min_avg_house_age: f64,
    /// Split of the "others" profession over workplaces, stores and miscs.
    pub others_workplace_choice: Categorical,
    /// Number of contamination day-bins in every facility's `surface_prob`.
    pub max_contamination_days: usize,
    /// Household size distribution used when no household is open.
    pub house_size_preference: Categorical,
    pub locations: IndexMap<LocationKind, FacilitySpec>,
    pub age_bins: Vec<AgeBinSpec>,
    /// Reproduces the historical allocator, where a household's vacancy is only decremented in a
    /// temporary and households keep absorbing residents beyond their drawn size.
    #[serde(default)]
    pub legacy_vacancy_accounting: bool,
}

impl CityConfig {
    /// Reads, parses and validates a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<CityConfig, CityError> {
        let path = path.as_ref();
        debug!("loading city configuration from {}", path.display());
        let data = fs::read_to_string(path)?;
        let config: CityConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, CityError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `(x_max - x_min) * (y_max - y_min)`. Saturates for ranges [`CityConfig::validate`]
    /// rejects.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let area = grid_area(self.x_range, self.y_range).unwrap_or(i64::MAX) as f64;
        area
    }

    /// Settings of `kind`; fails if the configuration does not describe it.
    pub fn facility(&self, kind: LocationKind) -> Result<&FacilitySpec, CityError> {
        self.locations
            .get(&kind)
            .ok_or_else(|| CityError::config(format!("no facility settings for {kind}")))
    }

    /// Checks every value the city draws from. Called by [`CityConfig::from_json_file`] and by
    /// city construction.
    pub fn validate(&self) -> Result<(), CityError> {
        if self.population == 0 {
            return Err(CityError::config("population must be positive"));
        }
        for (axis, (low, high)) in [("x_range", self.x_range), ("y_range", self.y_range)] {
            if low >= high {
                return Err(CityError::config(format!(
                    "{axis} [{low}, {high}) is empty"
                )));
            }
        }
        if grid_area(self.x_range, self.y_range).is_none() {
            return Err(CityError::config(format!(
                "grid {:?} x {:?} is too large to measure",
                self.x_range, self.y_range
            )));
        }
        if self.minutes_per_tick == 0 {
            return Err(CityError::config("minutes_per_tick must be positive"));
        }
        check_probability("init_percent_sick", self.init_percent_sick)?;
        if !self.min_avg_house_age.is_finite() {
            return Err(CityError::config("min_avg_house_age must be finite"));
        }
        if self.others_workplace_choice.len() != 3 {
            return Err(CityError::config(
                "others_workplace_choice must have three weights (workplace, store, misc)",
            ));
        }
        check_house_sizes("house_size_preference", &self.house_size_preference)?;
        if self.max_contamination_days == 0 {
            return Err(CityError::config("max_contamination_days must be positive"));
        }

        for kind in REQUIRED_KINDS {
            if !self.locations.contains_key(&kind) {
                return Err(CityError::config(format!("no facility settings for {kind}")));
            }
        }
        if self.locations.contains_key(&LocationKind::HospitalIcu) {
            return Err(CityError::config(
                "ICUs are carved out of hospitals and cannot be configured on their own",
            ));
        }
        for (kind, spec) in &self.locations {
            self.check_facility(*kind, spec)?;
        }
        match self.facility(LocationKind::Hospital)?.capacity {
            None => return Err(CityError::config("hospitals need a capacity range")),
            // The smallest hospital must still get an ICU bed.
            Some((low, _)) if low.saturating_mul(ICU_SHARE_PERCENT) / 100 == 0 => {
                return Err(CityError::config(format!(
                    "hospital capacity starts at {low}, too small to carve out an ICU"
                )));
            }
            Some(_) => {}
        }

        if self.age_bins.is_empty() {
            return Err(CityError::config("at least one age bin is required"));
        }
        for bin in &self.age_bins {
            let label = format!("age bin [{}, {})", bin.lower, bin.upper);
            if bin.lower >= bin.upper {
                return Err(CityError::config(format!("{label} is empty")));
            }
            check_probability(&format!("{label} fraction"), bin.fraction)?;
            check_probability(
                &format!("{label} senior_residency_preference"),
                bin.senior_residency_preference,
            )?;
            bin.profession_profile
                .categorical()
                .map_err(|e| CityError::config(format!("{label} profession_profile: {e}")))?;
            check_house_sizes(&format!("{label} house_size_preference"), &bin.house_size_preference)?;
        }
        Ok(())
    }

    fn check_facility(&self, kind: LocationKind, spec: &FacilitySpec) -> Result<(), CityError> {
        if !(spec.population_divisor.is_finite() && spec.population_divisor > 0.0) {
            return Err(CityError::config(format!(
                "{kind}: population_divisor must be positive"
            )));
        }
        check_probability(&format!("{kind} area_share"), spec.area_share)?;
        if !(spec.social_contact_factor.is_finite() && spec.social_contact_factor >= 0.0) {
            return Err(CityError::config(format!(
                "{kind}: social_contact_factor must be non-negative"
            )));
        }
        if let Some((low, high)) = spec.capacity {
            if low == 0 || low >= high {
                return Err(CityError::config(format!(
                    "{kind}: capacity range [{low}, {high}) must be non-empty and start at 1 or more"
                )));
            }
        }
        if spec.surface_prob.len() != self.max_contamination_days {
            return Err(CityError::config(format!(
                "{kind}: surface_prob has {} bins, expected {}",
                spec.surface_prob.len(),
                self.max_contamination_days
            )));
        }
        Ok(())
    }
}

fn grid_area((x_min, x_max): (i64, i64), (y_min, y_max): (i64, i64)) -> Option<i64> {
    x_max.checked_sub(x_min)?.checked_mul(y_max.checked_sub(y_min)?)
}

fn check_probability(name: &str, p: f64) -> Result<(), CityError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(CityError::config(format!("{name} must lie in [0, 1], got {p}")))
    }
}

fn check_house_sizes(name: &str, categorical: &Categorical) -> Result<(), CityError> {
    if categorical.len() == HOUSE_SIZES {
        Ok(())
    } else {
        Err(CityError::config(format!(
            "{name} must have {HOUSE_SIZES} weights, got {}",
            categorical.len()
        )))
    }
}

// Only used for the built-in tables, which are valid distributions.
fn categorical(probabilities: &[f64]) -> Categorical {
    Categorical::new(probabilities.to_vec()).unwrap_or_else(|e| panic!("built-in table: {e}"))
}

fn facility(
    population_divisor: f64,
    area_share: f64,
    social_contact_factor: f64,
    capacity: Option<(usize, usize)>,
) -> FacilitySpec {
    FacilitySpec {
        population_divisor,
        area_share,
        social_contact_factor,
        capacity,
        surface_prob: categorical(&[0.2; 5]),
    }
}

fn age_bin(
    (lower, upper): (u32, u32),
    fraction: f64,
    [healthcare, school, others, retired]: [f64; 4],
    senior_residency_preference: f64,
    house_size_preference: &[f64],
) -> AgeBinSpec {
    AgeBinSpec {
        lower,
        upper,
        fraction,
        profession_profile: ProfessionProfile {
            healthcare,
            school,
            others,
            retired,
        },
        senior_residency_preference,
        house_size_preference: categorical(house_size_preference),
    }
}

impl Default for CityConfig {
    fn default() -> Self {
        let start_time = NaiveDate::from_ymd_opt(2020, 2, 28)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);
        let locations = IndexMap::from([
            (LocationKind::Store, facility(50.0, 0.15, 0.6, Some((30, 50)))),
            (LocationKind::Workplace, facility(30.0, 0.2, 0.3, None)),
            (LocationKind::School, facility(100.0, 0.05, 0.8, None)),
            (LocationKind::SeniorResidency, facility(100.0, 0.05, 0.8, None)),
            (LocationKind::Household, facility(2.6, 0.30, 1.0, None)),
            (LocationKind::Park, facility(50.0, 0.05, 0.2, None)),
            (LocationKind::Misc, facility(30.0, 0.15, 0.3, None)),
            (LocationKind::Hospital, facility(100.0, 0.05, 0.1, Some((20, 50)))),
        ]);
        let age_bins = vec![
            age_bin((1, 20), 0.2, [0.0, 1.0, 0.0, 0.0], 0.0, &[0.0, 0.2, 0.3, 0.3, 0.2]),
            age_bin((20, 40), 0.3, [0.1, 0.1, 0.8, 0.0], 0.0, &[0.2, 0.3, 0.25, 0.15, 0.1]),
            age_bin((40, 60), 0.3, [0.1, 0.1, 0.8, 0.0], 0.0, &[0.05, 0.3, 0.3, 0.15, 0.2]),
            age_bin((60, 80), 0.1, [0.05, 0.05, 0.3, 0.6], 0.05, &[0.1, 0.5, 0.2, 0.1, 0.1]),
            age_bin((80, 100), 0.1, [0.0, 0.0, 0.0, 1.0], 0.3, &[0.3, 0.5, 0.1, 0.05, 0.05]),
        ];
        CityConfig {
            population: 1000,
            x_range: (0, 1000),
            y_range: (0, 1000),
            start_time,
            sim_days: 30,
            init_percent_sick: 0.01,
            minutes_per_tick: 2,
            min_avg_house_age: 22.0,
            others_workplace_choice: categorical(&[0.45, 0.45, 0.10]),
            max_contamination_days: 5,
            house_size_preference: categorical(&[0.30, 0.30, 0.15, 0.15, 0.10]),
            locations,
            age_bins,
            legacy_vacancy_accounting: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_is_valid() {
        let config = CityConfig::default();
        config.validate().unwrap();
        assert_almost_eq!(config.total_area(), 1_000_000.0, 1e-9);
        assert_eq!(config.start_time.to_string(), "2020-02-28 00:00:00");
    }

    #[test]
    fn default_profiles_are_distributions() {
        for bin in &CityConfig::default().age_bins {
            assert_eq!(bin.profession_profile.categorical().unwrap().len(), 4);
        }
    }

    #[test]
    fn json_round_trip_through_file() {
        let config = CityConfig::default();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = CityConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.population, config.population);
        assert_eq!(
            loaded.locations.keys().collect::<Vec<_>>(),
            config.locations.keys().collect::<Vec<_>>()
        );
        assert_eq!(loaded.start_time, config.start_time);
        assert!(!loaded.legacy_vacancy_accounting);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CityConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(CityError::IoError(_))));
    }

    #[test]
    fn malformed_distribution_fails_at_load() {
        let mut value = serde_json::to_value(CityConfig::default()).unwrap();
        value["house_size_preference"] = serde_json::json!([0.5, 0.5, 0.5, 0.0, 0.0]);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        assert!(matches!(
            CityConfig::from_json_file(file.path()),
            Err(CityError::JsonError(_))
        ));
    }

    #[test]
    fn rejects_missing_hospital_capacity() {
        let mut config = CityConfig::default();
        config
            .locations
            .get_mut(&LocationKind::Hospital)
            .unwrap()
            .capacity = None;
        assert!(matches!(config.validate(), Err(CityError::ConfigError(_))));
    }

    #[test]
    fn rejects_hospitals_too_small_for_an_icu() {
        let mut config = CityConfig::default();
        let hospital = config.locations.get_mut(&LocationKind::Hospital).unwrap();
        hospital.capacity = Some((5, 6));
        assert!(matches!(config.validate(), Err(CityError::ConfigError(_))));

        // Ten beds leave one for the ICU.
        config
            .locations
            .get_mut(&LocationKind::Hospital)
            .unwrap()
            .capacity = Some((10, 11));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_grids_whose_area_overflows() {
        let mut config = CityConfig::default();
        config.x_range = (-(1 << 62), 1 << 62);
        assert!(matches!(config.validate(), Err(CityError::ConfigError(_))));

        let mut config = CityConfig::default();
        config.x_range = (0, 1 << 32);
        config.y_range = (0, 1 << 32);
        assert!(matches!(config.validate(), Err(CityError::ConfigError(_))));
        assert_almost_eq!(config.total_area(), i64::MAX as f64, 1.0);
    }

    #[test]
    fn rejects_configured_icu() {
        let mut config = CityConfig::default();
        let spec = config.locations[&LocationKind::Hospital].clone();
        config.locations.insert(LocationKind::HospitalIcu, spec);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_kind() {
        let mut config = CityConfig::default();
        config.locations.shift_remove(&LocationKind::Park);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = CityConfig::default();
        config.x_range = (5, 5);
        assert!(config.validate().is_err());

        let mut config = CityConfig::default();
        config.init_percent_sick = 1.5;
        assert!(config.validate().is_err());

        let mut config = CityConfig::default();
        config.age_bins[0].upper = config.age_bins[0].lower;
        assert!(config.validate().is_err());

        let mut config = CityConfig::default();
        config.age_bins[1].profession_profile.others = 0.0;
        assert!(config.validate().is_err());

        let mut config = CityConfig::default();
        config.locations.get_mut(&LocationKind::Store).unwrap().capacity = Some((0, 10));
        assert!(config.validate().is_err());

        let mut config = CityConfig::default();
        config.max_contamination_days = 3;
        assert!(config.validate().is_err());

        let mut config = CityConfig::default();
        config.population = 0;
        assert!(config.validate().is_err());
    }
}
