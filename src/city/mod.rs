//! City construction and the location graph.
//!
//! [`City::build`] runs the construction pipeline against a single random stream:
//!
//! 1. [`facilities`] builds every non-household location,
//! 2. [`population`] creates the agents and resolves their workplaces,
//! 3. [`households`] houses everyone not living in a senior residency,
//! 4. [`preferences`] weights each agent's stores and parks by distance from home.
//!
//! Afterwards the city owns the agent roster, the location arena and the random stream. Its
//! only mutations are admissions to and releases from locations.
pub mod facilities;
pub mod households;
pub mod population;
pub mod preferences;

use chrono::NaiveDateTime;
use log::{info, trace};
use rustc_hash::FxHashMap;

use crate::agent::{Agent, AgentId, AgentSeed};
use crate::config::CityConfig;
use crate::error::CityError;
use crate::location::{Admission, Location, LocationId, LocationKind};
use crate::random::RandomStream;
use facilities::generate_facilities;
use households::HouseholdAllocator;
use population::assign_population;
use preferences::preference_weights;

/// Location ids grouped by kind (in id order) and keyed by name.
#[derive(Debug, Default)]
pub struct LocationIndex {
    by_kind: FxHashMap<LocationKind, Vec<LocationId>>,
    by_name: FxHashMap<String, LocationId>,
}

impl LocationIndex {
    #[must_use]
    pub fn new(locations: &[Location]) -> Self {
        let mut index = LocationIndex::default();
        index.extend(locations);
        index
    }

    fn extend(&mut self, locations: &[Location]) {
        for location in locations {
            self.by_kind
                .entry(location.kind())
                .or_default()
                .push(location.id());
            self.by_name
                .insert(location.name().to_string(), location.id());
        }
    }

    /// Ids of every location of `kind`.
    #[must_use]
    pub fn ids(&self, kind: LocationKind) -> &[LocationId] {
        self.by_kind
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<LocationId> {
        self.by_name.get(name).copied()
    }
}

pub struct City<A> {
    agents: Vec<A>,
    locations: Vec<Location>,
    index: LocationIndex,
    x_range: (i64, i64),
    y_range: (i64, i64),
    total_area: f64,
    start_time: NaiveDateTime,
    sim_days: u32,
    store_preferences: Vec<Vec<f64>>,
    park_preferences: Vec<Vec<f64>>,
    rng: RandomStream,
}

impl<A: Agent> City<A> {
    /// Validates `config` and builds the city, creating each agent with `factory`.
    pub fn build<F>(
        config: &CityConfig,
        mut rng: RandomStream,
        mut factory: F,
    ) -> Result<Self, CityError>
    where
        F: FnMut(AgentSeed) -> A,
    {
        config.validate()?;
        info!(
            "building a city of {} people (seed {})",
            config.population,
            rng.base_seed()
        );

        let mut locations = generate_facilities(config, &mut rng)?;
        let mut index = LocationIndex::new(&locations);

        let population = assign_population(config, &mut rng, &index, &mut factory)?;
        let mut agents = population.agents;

        let households = HouseholdAllocator::new(config, locations.len())?.allocate(
            &mut rng,
            &mut agents,
            &population.age_bins,
        )?;
        index.extend(&households);
        locations.extend(households);

        for (i, agent) in agents.iter_mut().enumerate() {
            let household = agent
                .household()
                .ok_or_else(|| CityError::from(format!("agent {i} has no household")))?;
            if agent.workplace().is_none() {
                agent.assign_workplace(household);
            }
        }

        let mut city = City {
            agents,
            locations,
            index,
            x_range: config.x_range,
            y_range: config.y_range,
            total_area: config.total_area(),
            start_time: config.start_time,
            sim_days: config.sim_days,
            store_preferences: Vec::new(),
            park_preferences: Vec::new(),
            rng,
        };
        city.compute_preferences()?;
        city.log_static_info();
        Ok(city)
    }

    fn compute_preferences(&mut self) -> Result<(), CityError> {
        let stores: Vec<&Location> = self.locations_of(LocationKind::Store).collect();
        let parks: Vec<&Location> = self.locations_of(LocationKind::Park).collect();
        let mut store_preferences = Vec::with_capacity(self.agents.len());
        let mut park_preferences = Vec::with_capacity(self.agents.len());
        for (i, agent) in self.agents.iter().enumerate() {
            let home = agent
                .household()
                .and_then(|id| self.locations.get(id.0))
                .ok_or_else(|| CityError::from(format!("agent {i} has no household")))?;
            store_preferences.push(preference_weights(home, stores.iter().copied()));
            park_preferences.push(preference_weights(home, parks.iter().copied()));
        }
        info!(
            "computed preferences over {} stores and {} parks",
            stores.len(),
            parks.len()
        );
        self.store_preferences = store_preferences;
        self.park_preferences = park_preferences;
        Ok(())
    }

    /// Logs each agent's static description at trace level.
    pub fn log_static_info(&self) {
        for (i, agent) in self.agents.iter().enumerate() {
            trace!(
                "agent {i}: age={} profession={:?} household={:?} workplace={:?}",
                agent.age(),
                agent.profession(),
                agent.household().and_then(|id| self.location(id)).map(Location::name),
                agent.workplace().and_then(|id| self.location(id)).map(Location::name),
            );
        }
    }

    #[must_use]
    pub fn agents(&self) -> &[A] {
        &self.agents
    }

    #[must_use]
    pub fn agent(&self, agent_id: AgentId) -> Option<&A> {
        self.agents.get(agent_id.0)
    }

    /// Mutable access for the model layer (disease state, infectious flag).
    pub fn agent_mut(&mut self, agent_id: AgentId) -> Option<&mut A> {
        self.agents.get_mut(agent_id.0)
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> {
        (0..self.agents.len()).map(AgentId)
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn location(&self, location_id: LocationId) -> Option<&Location> {
        self.locations.get(location_id.0)
    }

    #[must_use]
    pub fn location_ids(&self, kind: LocationKind) -> &[LocationId] {
        self.index.ids(kind)
    }

    /// Locations of `kind`, in id order.
    pub fn locations_of(&self, kind: LocationKind) -> impl Iterator<Item = &Location> + '_ {
        self.index
            .ids(kind)
            .iter()
            .filter_map(|id| self.locations.get(id.0))
    }

    #[must_use]
    pub fn location_by_name(&self, name: &str) -> Option<&Location> {
        self.index.by_name(name).and_then(|id| self.location(id))
    }

    /// The ICU owned by a hospital ward.
    #[must_use]
    pub fn icu_of(&self, hospital: LocationId) -> Option<&Location> {
        self.location(hospital)?.icu().and_then(|id| self.location(id))
    }

    /// Households in the order they were first occupied.
    #[must_use]
    pub fn households(&self) -> &[LocationId] {
        self.index.ids(LocationKind::Household)
    }

    #[must_use]
    pub fn x_range(&self) -> (i64, i64) {
        self.x_range
    }

    #[must_use]
    pub fn y_range(&self) -> (i64, i64) {
        self.y_range
    }

    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.total_area
    }

    #[must_use]
    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    /// Length of the simulation in days.
    #[must_use]
    pub fn sim_days(&self) -> u32 {
        self.sim_days
    }

    /// Un-normalized weights of `agent_id` over the stores, in [`LocationKind::Store`] id order.
    #[must_use]
    pub fn store_preferences(&self, agent_id: AgentId) -> &[f64] {
        self.store_preferences
            .get(agent_id.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Un-normalized weights of `agent_id` over the parks, in [`LocationKind::Park`] id order.
    #[must_use]
    pub fn park_preferences(&self, agent_id: AgentId) -> &[f64] {
        self.park_preferences
            .get(agent_id.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn rng_mut(&mut self) -> &mut RandomStream {
        &mut self.rng
    }

    /// Asks for a slot at `location_id` on behalf of `agent_id`. See [`Location::request`].
    pub fn request(
        &mut self,
        agent_id: AgentId,
        location_id: LocationId,
        now: NaiveDateTime,
    ) -> Result<Admission, CityError> {
        let location = self
            .locations
            .get_mut(location_id.0)
            .ok_or_else(|| unknown_location(location_id))?;
        let agent = self
            .agents
            .get_mut(agent_id.0)
            .ok_or_else(|| unknown_agent(agent_id))?;
        location.request(agent_id, agent, now, &mut self.rng)
    }

    /// Releases `agent_id` from `location_id` and hands the freed slot to the longest waiter,
    /// whose id is returned.
    pub fn release(
        &mut self,
        agent_id: AgentId,
        location_id: LocationId,
        now: NaiveDateTime,
    ) -> Result<Option<AgentId>, CityError> {
        let location = self
            .locations
            .get_mut(location_id.0)
            .ok_or_else(|| unknown_location(location_id))?;
        let agent = self
            .agents
            .get_mut(agent_id.0)
            .ok_or_else(|| unknown_agent(agent_id))?;
        location.release(agent_id, agent)?;

        let Some(waiter_id) = location.next_waiter() else {
            return Ok(None);
        };
        // Waiters were checked against the roster when they queued.
        let waiter = self
            .agents
            .get_mut(waiter_id.0)
            .ok_or_else(|| unknown_agent(waiter_id))?;
        location.admit_waiter(waiter_id, waiter, now, &mut self.rng);
        Ok(Some(waiter_id))
    }
}

fn unknown_location(location_id: LocationId) -> CityError {
    CityError::location(format!("unknown location {location_id}"))
}

fn unknown_agent(agent_id: AgentId) -> CityError {
    CityError::location(format!("unknown agent {agent_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Person, Profession};
    use crate::assert_almost_eq;

    fn build(seed: u64) -> City<Person> {
        let mut config = CityConfig::default();
        config.population = 300;
        City::build(&config, RandomStream::new(seed), Person::from_seed).unwrap()
    }

    #[test]
    fn everyone_has_a_home_and_a_workplace() {
        let city = build(1);
        for agent in city.agents() {
            let household = city.location(agent.household.unwrap()).unwrap();
            assert!(household.kind().is_residential());
            assert!(city.location(agent.workplace.unwrap()).is_some());
            if agent.profession == Profession::Retired {
                assert_eq!(agent.workplace, agent.household);
            }
            if household.kind() == LocationKind::Household {
                assert!(household.residents().contains(&agent.id));
            }
        }
    }

    #[test]
    fn households_follow_facilities() {
        let city = build(2);
        let first = city.households()[0];
        assert!(city
            .locations()
            .iter()
            .take(first.index())
            .all(|l| l.kind() != LocationKind::Household));
        for (i, location) in city.locations().iter().enumerate() {
            assert_eq!(location.id().index(), i);
            assert_eq!(city.location_by_name(location.name()).unwrap().id(), location.id());
        }
    }

    #[test]
    fn household_areas_fill_their_share() {
        let city = build(3);
        let total: f64 = city.locations_of(LocationKind::Household).map(Location::area).sum();
        assert_almost_eq!(total, 0.30 * city.total_area(), 1e-6);
    }

    #[test]
    fn preferences_cover_stores_and_parks() {
        let city = build(4);
        let stores = city.location_ids(LocationKind::Store).len();
        let parks = city.location_ids(LocationKind::Park).len();
        for id in city.agent_ids() {
            assert_eq!(city.store_preferences(id).len(), stores);
            assert_eq!(city.park_preferences(id).len(), parks);
            assert!(city.store_preferences(id).iter().all(|w| *w > 0.0 && *w <= 10.0));
        }
    }

    #[test]
    fn icus_are_reachable_from_hospitals() {
        let city = build(5);
        for &hospital in city.location_ids(LocationKind::Hospital) {
            let icu = city.icu_of(hospital).unwrap();
            assert_eq!(icu.kind(), LocationKind::HospitalIcu);
        }
        assert!(city.icu_of(city.households()[0]).is_none());
    }

    #[test]
    fn release_wakes_the_longest_waiter() {
        let mut city = build(6);
        let store = city.location_ids(LocationKind::Store)[0];
        let capacity = city.location(store).unwrap().capacity().unwrap();
        let now = city.start_time();

        for i in 0..capacity {
            assert_eq!(city.request(AgentId(i), store, now).unwrap(), Admission::Admitted);
        }
        assert_eq!(
            city.request(AgentId(capacity), store, now).unwrap(),
            Admission::Queued { position: 0 }
        );
        assert_eq!(
            city.request(AgentId(capacity + 1), store, now).unwrap(),
            Admission::Queued { position: 1 }
        );
        assert_eq!(city.release(AgentId(0), store, now).unwrap(), Some(AgentId(capacity)));
        assert!(city.location(store).unwrap().is_present(AgentId(capacity)));
        assert_eq!(city.location(store).unwrap().occupancy(), capacity);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut city = build(7);
        let now = city.start_time();
        assert!(matches!(
            city.request(AgentId(0), LocationId(usize::MAX), now),
            Err(CityError::LocationError(_))
        ));
        let park = city.location_ids(LocationKind::Park)[0];
        assert!(city.request(AgentId(usize::MAX), park, now).is_err());
    }

    #[test]
    fn hospital_admission_flags_the_agent() {
        let mut city = build(8);
        let hospital = city.location_ids(LocationKind::Hospital)[0];
        let icu = city.icu_of(hospital).unwrap().id();
        let now = city.start_time();
        city.request(AgentId(3), icu, now).unwrap();
        let agent = city.agent(AgentId(3)).unwrap();
        assert!(agent.hospitalized && agent.in_icu);
        city.release(AgentId(3), icu, now).unwrap();
        let agent = city.agent(AgentId(3)).unwrap();
        assert!(!agent.hospitalized && !agent.in_icu);
    }
}
