//! Non-household facility generation.
//!
//! Every configured kind except households gets `ceil(population / population_divisor)`
//! instances placed uniformly on the grid, sharing the kind's slice of the city's area through a
//! random partition. Each hospital also carves out its ICU.

use log::{debug, info};

use crate::config::{CityConfig, FacilitySpec};
use crate::error::CityError;
use crate::location::{ContactProfile, Location, LocationId, LocationKind};
use crate::random::RandomStream;

/// Number of instances of a facility for `population` people.
#[must_use]
pub fn facility_count(population: usize, population_divisor: f64) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let count = (population as f64 / population_divisor).ceil() as usize;
    count
}

pub(crate) fn contact_profile(spec: &FacilitySpec) -> ContactProfile {
    ContactProfile {
        social_contact_factor: spec.social_contact_factor,
        surface_prob: spec.surface_prob.clone(),
    }
}

/// Draws a site's x, y and (if the kind is bounded) capacity, in that order.
pub(crate) fn draw_site(
    config: &CityConfig,
    spec: &FacilitySpec,
    rng: &mut RandomStream,
) -> ((i64, i64), Option<usize>) {
    let x = rng.sample_range(config.x_range.0..config.x_range.1);
    let y = rng.sample_range(config.y_range.0..config.y_range.1);
    let capacity = spec
        .capacity
        .map(|(low, high)| rng.sample_range(low..high));
    ((x, y), capacity)
}

/// Builds every non-household facility, in configuration order. Ids are positions in the returned
/// vector; a hospital's ICU directly follows its ward.
pub fn generate_facilities(
    config: &CityConfig,
    rng: &mut RandomStream,
) -> Result<Vec<Location>, CityError> {
    let total_area = config.total_area();
    let mut locations = Vec::new();

    for (&kind, spec) in &config.locations {
        if kind == LocationKind::Household {
            continue;
        }
        let count = facility_count(config.population, spec.population_divisor);
        let areas = rng.random_partition(count, spec.area_share * total_area);
        for (i, area) in areas.into_iter().enumerate() {
            let name = format!("{kind}:{i}");
            let (coordinates, capacity) = draw_site(config, spec, rng);
            let id = LocationId(locations.len());
            if kind == LocationKind::Hospital {
                let capacity = capacity
                    .ok_or_else(|| CityError::config("hospitals need a capacity range"))?;
                let icu_id = LocationId(locations.len() + 1);
                let (ward, icu) = Location::hospital(
                    id,
                    icu_id,
                    name,
                    coordinates,
                    area,
                    capacity,
                    contact_profile(spec),
                );
                debug!("created {ward} with {icu}");
                locations.push(ward);
                locations.push(icu);
            } else {
                locations.push(Location::new(
                    id,
                    name,
                    kind,
                    coordinates,
                    area,
                    capacity,
                    contact_profile(spec),
                ));
            }
        }
        info!("created {count} {kind} locations");
    }
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;

    fn generate(seed: u64) -> (CityConfig, Vec<Location>) {
        let config = CityConfig::default();
        let mut rng = RandomStream::new(seed);
        let locations = generate_facilities(&config, &mut rng).unwrap();
        (config, locations)
    }

    #[test]
    fn counts_round_up() {
        assert_eq!(facility_count(1000, 30.0), 34);
        assert_eq!(facility_count(1000, 50.0), 20);
        assert_eq!(facility_count(1, 100.0), 1);
    }

    #[test]
    fn one_instance_per_divisor() {
        let (config, locations) = generate(7);
        for (&kind, spec) in &config.locations {
            let count = locations.iter().filter(|l| l.kind() == kind).count();
            if kind == LocationKind::Household {
                assert_eq!(count, 0);
            } else {
                assert_eq!(count, facility_count(config.population, spec.population_divisor));
            }
        }
        let hospitals = locations
            .iter()
            .filter(|l| l.kind() == LocationKind::Hospital)
            .count();
        let icus = locations
            .iter()
            .filter(|l| l.kind() == LocationKind::HospitalIcu)
            .count();
        assert_eq!(hospitals, icus);
    }

    #[test]
    fn areas_fill_each_share() {
        let (config, locations) = generate(7);
        for (&kind, spec) in &config.locations {
            if kind == LocationKind::Household {
                continue;
            }
            let total: f64 = locations
                .iter()
                .filter(|l| {
                    l.kind() == kind
                        || (kind == LocationKind::Hospital && l.kind() == LocationKind::HospitalIcu)
                })
                .map(Location::area)
                .sum();
            assert_almost_eq!(total, spec.area_share * config.total_area(), 1e-6);
        }
    }

    #[test]
    fn sites_respect_bounds_and_capacity_ranges() {
        let (config, locations) = generate(11);
        for (i, location) in locations.iter().enumerate() {
            assert_eq!(location.id(), LocationId(i));
            let (x, y) = location.coordinates();
            assert!((config.x_range.0..config.x_range.1).contains(&x));
            assert!((config.y_range.0..config.y_range.1).contains(&y));
            if location.kind() == LocationKind::Store {
                let capacity = location.capacity().unwrap();
                assert!((30..50).contains(&capacity));
            }
            if location.kind() == LocationKind::Park {
                assert_eq!(location.capacity(), None);
            }
        }
    }

    #[test]
    fn icu_follows_its_ward() {
        let (_, locations) = generate(3);
        for ward in locations.iter().filter(|l| l.kind() == LocationKind::Hospital) {
            let icu_id = ward.icu().unwrap();
            assert_eq!(icu_id.index(), ward.id().index() + 1);
            let icu = &locations[icu_id.index()];
            assert_eq!(icu.name(), format!("{}-icu", ward.name()));
            // Ward keeps 90% of the drawn capacity, rounded down; the ICU gets 10%.
            let ward_capacity = ward.capacity().unwrap();
            let icu_capacity = icu.capacity().unwrap();
            assert!(icu_capacity >= 2);
            assert!(ward_capacity + icu_capacity <= 50);
        }
    }

    #[test]
    fn same_seed_same_facilities() {
        let (_, a) = generate(99);
        let (_, b) = generate(99);
        let describe = |locations: &[Location]| {
            locations
                .iter()
                .map(|l| (l.name().to_string(), l.coordinates(), l.capacity()))
                .collect::<Vec<_>>()
        };
        assert_eq!(describe(&a), describe(&b));
    }
}
