//! Household allocation.
//!
//! Agents without a senior residency are housed in roster order. The allocator keeps a list of
//! open households, each with a remaining vacancy, and places an agent in the first one whose
//! average resident age would stay strictly above the configured minimum. When none qualifies
//! the agent opens a new household sized from its own age bin's preference. Nothing is ever
//! revisited, so the age rule holds at each admission but is not a global guarantee.
//!
//! Households are registered the first time someone moves in; a household that was opened but
//! never used gets no id and no area. Once everyone is housed, the household area budget is
//! partitioned over the registered households in registration order.

use indexmap::IndexSet;
use log::{debug, info};

use super::facilities::{contact_profile, draw_site};
use crate::agent::{Agent, AgentId};
use crate::config::{CityConfig, FacilitySpec};
use crate::error::CityError;
use crate::location::{Location, LocationId, LocationKind};
use crate::random::{Categorical, RandomStream};

/// A household that has been opened but not yet turned into a [`Location`].
struct Draft {
    name: String,
    coordinates: (i64, i64),
    capacity: Option<usize>,
    residents: Vec<AgentId>,
    age_sum: u64,
}

impl Draft {
    #[allow(clippy::cast_precision_loss)]
    fn average_age_with(&self, age: u32) -> f64 {
        (self.age_sum + u64::from(age)) as f64 / (self.residents.len() + 1) as f64
    }
}

struct OpenSlot {
    draft: usize,
    vacancy: usize,
}

pub struct HouseholdAllocator<'a> {
    config: &'a CityConfig,
    spec: &'a FacilitySpec,
    first_id: usize,
    drafts: Vec<Draft>,
    open: Vec<OpenSlot>,
    registry: IndexSet<usize>,
}

impl<'a> HouseholdAllocator<'a> {
    /// Households will be numbered from `first_id` on, following the facilities already built.
    pub fn new(config: &'a CityConfig, first_id: usize) -> Result<Self, CityError> {
        Ok(HouseholdAllocator {
            config,
            spec: config.facility(LocationKind::Household)?,
            first_id,
            drafts: Vec::new(),
            open: Vec::new(),
            registry: IndexSet::new(),
        })
    }

    /// Houses every agent that has no household yet. `age_bins[i]` is the age bin agent `i` was
    /// drawn from.
    pub fn allocate<A: Agent>(
        mut self,
        rng: &mut RandomStream,
        agents: &mut [A],
        age_bins: &[usize],
    ) -> Result<Vec<Location>, CityError> {
        let config = self.config;
        for (i, agent) in agents.iter_mut().enumerate() {
            if agent.household().is_some() {
                continue;
            }
            let house_size = age_bins
                .get(i)
                .and_then(|&bin| config.age_bins.get(bin))
                .map(|bin| &bin.house_size_preference)
                .ok_or_else(|| CityError::config(format!("agent {i} has no age bin")))?;
            let draft = self.place(rng, agent.age(), house_size);
            let id = self.register(draft, AgentId(i), agent.age());
            agent.assign_household(id);
        }
        info!(
            "housed agents in {} households ({} opened)",
            self.registry.len(),
            self.drafts.len()
        );
        Ok(self.finish(rng))
    }

    /// Picks (or opens) the household for an agent of the given age.
    fn place(&mut self, rng: &mut RandomStream, age: u32, house_size: &Categorical) -> usize {
        if self.open.is_empty() {
            let size = sample_house_size(rng, &self.config.house_size_preference);
            let draft = self.open_household(rng, size);
            self.open.push(OpenSlot {
                draft,
                vacancy: size,
            });
        }

        let min_age = self.config.min_avg_house_age;
        let matched = self
            .open
            .iter()
            .position(|slot| self.drafts[slot.draft].average_age_with(age) > min_age);
        if let Some(position) = matched {
            let slot = &mut self.open[position];
            let draft = slot.draft;
            let remaining = slot.vacancy.saturating_sub(1);
            if !self.config.legacy_vacancy_accounting {
                slot.vacancy = remaining;
            }
            if remaining == 0 {
                self.open.remove(position);
            }
            return draft;
        }

        let size = sample_house_size(rng, house_size);
        let draft = self.open_household(rng, size);
        if size > 1 {
            self.open.push(OpenSlot {
                draft,
                vacancy: size - 1,
            });
        }
        draft
    }

    fn open_household(&mut self, rng: &mut RandomStream, size: usize) -> usize {
        let name = format!("{}:{}", LocationKind::Household, self.drafts.len());
        let (coordinates, capacity) = draw_site(self.config, self.spec, rng);
        debug!("opened {name} for {size} residents at {coordinates:?}");
        self.drafts.push(Draft {
            name,
            coordinates,
            capacity,
            residents: Vec::new(),
            age_sum: 0,
        });
        self.drafts.len() - 1
    }

    fn register(&mut self, draft: usize, agent_id: AgentId, age: u32) -> LocationId {
        let household = &mut self.drafts[draft];
        household.residents.push(agent_id);
        household.age_sum += u64::from(age);
        let (position, _) = self.registry.insert_full(draft);
        LocationId(self.first_id + position)
    }

    fn finish(self, rng: &mut RandomStream) -> Vec<Location> {
        let budget = self.spec.area_share * self.config.total_area();
        let areas = rng.random_partition(self.registry.len(), budget);
        let mut drafts: Vec<Option<Draft>> = self.drafts.into_iter().map(Some).collect();
        self.registry
            .iter()
            .zip(areas)
            .enumerate()
            .filter_map(|(position, (&draft, area))| {
                let draft = drafts[draft].take()?;
                let mut household = Location::new(
                    LocationId(self.first_id + position),
                    draft.name,
                    LocationKind::Household,
                    draft.coordinates,
                    area,
                    draft.capacity,
                    contact_profile(self.spec),
                );
                for resident in draft.residents {
                    household.add_resident(resident);
                }
                Some(household)
            })
            .collect()
    }
}

/// Draws a household size in `1..=5`.
fn sample_house_size(rng: &mut RandomStream, distribution: &Categorical) -> usize {
    rng.sample_categorical(distribution) + 1
}
