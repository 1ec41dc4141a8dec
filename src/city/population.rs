//! Agent creation and workplace resolution.
//!
//! Agents are created age bin by age bin. Within a bin all ages are drawn first, then all
//! professions, and then each agent in turn draws its senior-residency decision, its workplace
//! and whether it starts out infected.

use log::{info, trace};

use super::LocationIndex;
use crate::agent::{Agent, AgentId, AgentSeed, Profession};
use crate::config::CityConfig;
use crate::error::CityError;
use crate::location::{LocationId, LocationKind};
use crate::random::RandomStream;

/// The roster produced by population assignment.
pub struct Population<A> {
    pub agents: Vec<A>,
    /// Index into the configuration's age bins of the bin each agent was drawn from.
    pub age_bins: Vec<usize>,
}

/// Number of agents drawn for an age bin.
#[must_use]
pub fn bin_size(fraction: f64, population: usize) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let size = (fraction * population as f64).ceil() as usize;
    size
}

fn choose(
    rng: &mut RandomStream,
    pool: &[LocationId],
    what: &str,
) -> Result<LocationId, CityError> {
    rng.choose(pool)
        .copied()
        .ok_or_else(|| CityError::config(format!("no {what} to choose from")))
}

pub fn assign_population<A, F>(
    config: &CityConfig,
    rng: &mut RandomStream,
    index: &LocationIndex,
    factory: &mut F,
) -> Result<Population<A>, CityError>
where
    A: Agent,
    F: FnMut(AgentSeed) -> A,
{
    let senior_residencies = index.ids(LocationKind::SeniorResidency);
    let healthcare: Vec<LocationId> = index
        .ids(LocationKind::Hospital)
        .iter()
        .chain(senior_residencies)
        .copied()
        .collect();
    let schools = index.ids(LocationKind::School);
    let others = [
        index.ids(LocationKind::Workplace),
        index.ids(LocationKind::Store),
        index.ids(LocationKind::Misc),
    ];

    let mut population = Population {
        agents: Vec::new(),
        age_bins: Vec::new(),
    };
    for (bin_index, bin) in config.age_bins.iter().enumerate() {
        let n = bin_size(bin.fraction, config.population);
        let ages: Vec<u32> = (0..n)
            .map(|_| rng.sample_range(bin.lower..bin.upper))
            .collect();
        let profile = bin.profession_profile.categorical()?;
        let professions: Vec<Profession> = (0..n)
            .map(|_| Profession::ALL[rng.sample_categorical(&profile)])
            .collect();

        for (age, profession) in ages.into_iter().zip(professions) {
            let id = AgentId(population.agents.len());
            let household = if rng.sample_bool(bin.senior_residency_preference) {
                Some(choose(rng, senior_residencies, "senior residency")?)
            } else {
                None
            };
            let workplace = match profession {
                Profession::Healthcare => Some(choose(rng, &healthcare, "hospital")?),
                Profession::School => Some(choose(rng, schools, "school")?),
                Profession::Others => {
                    let bucket = rng.sample_categorical(&config.others_workplace_choice);
                    Some(choose(rng, others[bucket], "workplace")?)
                }
                Profession::Retired => household,
            };
            let infection_timestamp = rng
                .sample_bool(config.init_percent_sick)
                .then_some(config.start_time);

            let seed = AgentSeed {
                id,
                age,
                profession,
                household,
                workplace,
                infection_timestamp,
            };
            trace!("created agent {seed:?}");
            population.agents.push(factory(seed));
            population.age_bins.push(bin_index);
        }
    }
    info!("created {} agents", population.agents.len());
    Ok(population)
}
