//! The agent contract the city relies on.
//!
//! Agents live in the city's roster and are addressed by [`AgentId`]; locations are addressed by
//! [`LocationId`]. A household stores the ids of its residents and an agent stores the id of its
//! household, so neither side owns the other. Disease progression and movement decisions belong
//! to the model that implements [`Agent`]; the city only reads the age, profession and infectious
//! flag, writes the household and workplace once, and lets hospital wards toggle the
//! hospitalization flags.

use std::fmt::{self, Display};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::location::LocationId;

/// Index of an agent in the city roster.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profession {
    Healthcare,
    School,
    Others,
    Retired,
}

impl Profession {
    /// Professions in the order their weights appear in an age bin's profile.
    pub const ALL: [Profession; 4] = [
        Profession::Healthcare,
        Profession::School,
        Profession::Others,
        Profession::Retired,
    ];
}

/// Everything the city decides about an agent before handing it to the model's constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSeed {
    pub id: AgentId,
    pub age: u32,
    pub profession: Profession,
    /// Pre-assigned senior residency, if any. Everyone else is housed after creation.
    pub household: Option<LocationId>,
    /// `None` only for retirees still waiting for a household.
    pub workplace: Option<LocationId>,
    /// Set for agents infected at the start of the simulation.
    pub infection_timestamp: Option<NaiveDateTime>,
}

pub trait Agent {
    fn age(&self) -> u32;

    fn profession(&self) -> Profession;

    fn is_infectious(&self) -> bool;

    fn household(&self) -> Option<LocationId>;

    /// Called exactly once per agent that was not pre-assigned a senior residency.
    fn assign_household(&mut self, household: LocationId);

    fn workplace(&self) -> Option<LocationId>;

    /// Called once for retirees whose workplace is their household.
    fn assign_workplace(&mut self, workplace: LocationId);

    fn set_hospitalized(&mut self, hospitalized: bool);

    fn set_in_icu(&mut self, in_icu: bool);
}

/// A plain agent carrying just the fields the city reads and writes.
#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: AgentId,
    pub age: u32,
    pub profession: Profession,
    pub household: Option<LocationId>,
    pub workplace: Option<LocationId>,
    pub infection_timestamp: Option<NaiveDateTime>,
    pub infectious: bool,
    pub hospitalized: bool,
    pub in_icu: bool,
}

impl Person {
    #[must_use]
    pub fn from_seed(seed: AgentSeed) -> Person {
        Person {
            id: seed.id,
            age: seed.age,
            profession: seed.profession,
            household: seed.household,
            workplace: seed.workplace,
            infectious: seed.infection_timestamp.is_some(),
            infection_timestamp: seed.infection_timestamp,
            hospitalized: false,
            in_icu: false,
        }
    }

    pub fn set_infectious(&mut self, infectious: bool) {
        self.infectious = infectious;
    }
}

impl From<AgentSeed> for Person {
    fn from(seed: AgentSeed) -> Self {
        Person::from_seed(seed)
    }
}

impl Agent for Person {
    fn age(&self) -> u32 {
        self.age
    }

    fn profession(&self) -> Profession {
        self.profession
    }

    fn is_infectious(&self) -> bool {
        self.infectious
    }

    fn household(&self) -> Option<LocationId> {
        self.household
    }

    fn assign_household(&mut self, household: LocationId) {
        debug_assert!(self.household.is_none(), "household assigned twice");
        self.household = Some(household);
    }

    fn workplace(&self) -> Option<LocationId> {
        self.workplace
    }

    fn assign_workplace(&mut self, workplace: LocationId) {
        debug_assert!(self.workplace.is_none(), "workplace assigned twice");
        self.workplace = Some(workplace);
    }

    fn set_hospitalized(&mut self, hospitalized: bool) {
        self.hospitalized = hospitalized;
    }

    fn set_in_icu(&mut self, in_icu: bool) {
        self.in_icu = in_icu;
    }
}
