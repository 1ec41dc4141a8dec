//! A synthetic city for agent-based epidemic models
//!
//! `epi-city` builds a reproducible city of agents and shared, capacity-bounded locations and
//! keeps the locations' occupancy and surface contamination up to date as agents move. Disease
//! progression and movement policy are left to the model: it implements [`Agent`] and drives the
//! [`Context`].
//!
//! Construction happens once, from a [`CityConfig`] and a seeded [`RandomStream`]:
//! * Facility generation places hospitals (with their ICUs), schools, workplaces, stores, parks,
//!   senior residencies and miscellaneous sites on the grid.
//! * Population assignment creates agents from an age-bin table and resolves their workplaces.
//! * Household allocation houses everyone not living in a senior residency.
//! * Every agent gets distance-based visiting weights over stores and parks.
//!
//! The same seed and configuration always yield the same city.
//!
//! During a run, the [`Context`] owns a [`Clock`], a plan queue and the [`City`]. Agents ask for
//! slots with [`Context::request_location`]; a full location queues them in arrival order and
//! [`Context::leave_location`] wakes the longest waiter.
pub mod agent;
pub mod city;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod location;
pub mod log;
mod macros;
pub mod numeric;
pub mod plan;
pub mod prelude;
pub mod random;
pub mod runner;

pub use crate::agent::{Agent, AgentId, AgentSeed, Person, Profession};
pub use crate::city::City;
pub use crate::clock::Clock;
pub use crate::config::CityConfig;
pub use crate::context::Context;
pub use crate::error::CityError;
pub use crate::location::{Admission, Location, LocationId, LocationKind};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::random::{Categorical, RandomStream};
pub use crate::runner::{run_with_args, BaseArgs};

// Re-exported for models that draw from the city's stream with their own distributions.
pub use rand;
