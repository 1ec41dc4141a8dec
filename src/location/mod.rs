//! Capacity-bounded locations.
//!
//! A [`Location`] is a shared place agents enter and leave. It tracks who is currently present (in
//! arrival order), who is waiting for a free slot, and how long its surfaces stay contaminated
//! after an infectious visit. Households, hospital wards and ICUs are the same type; their
//! behavior differs only through the [`LocationKind`] tag:
//!
//! * residential kinds keep a resident list distinct from the present set,
//! * hospital wards flag admitted agents as hospitalized,
//! * ICUs flag admitted agents as hospitalized and in intensive care.
//!
//! Admission behaves like a counting semaphore with a FIFO wait queue. [`Location::request`]
//! either admits the agent or queues it; [`Location::release`] frees a slot, after which
//! [`Location::next_waiter`] hands the slot to the longest-waiting agent.
mod contamination;
mod snapshot;

use std::collections::VecDeque;
use std::fmt::{self, Display};

use chrono::NaiveDateTime;
use indexmap::IndexSet;
use log::trace;
use serde::{Deserialize, Serialize};

pub use snapshot::LocationSnapshot;

use crate::agent::{Agent, AgentId};
use crate::error::CityError;
use crate::random::{Categorical, RandomStream};

/// Share of a hospital's configured capacity and area reserved for its ICU, in percent.
pub const ICU_SHARE_PERCENT: usize = 10;

/// Index of a location in the city's location arena.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub(crate) usize);

impl LocationId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Household,
    SeniorResidency,
    Hospital,
    #[serde(rename = "hospital-icu")]
    HospitalIcu,
    School,
    Workplace,
    Store,
    Park,
    Misc,
}

impl LocationKind {
    /// Every kind, in the order the city reports them.
    pub const ALL: [LocationKind; 9] = [
        LocationKind::Household,
        LocationKind::SeniorResidency,
        LocationKind::Hospital,
        LocationKind::HospitalIcu,
        LocationKind::School,
        LocationKind::Workplace,
        LocationKind::Store,
        LocationKind::Park,
        LocationKind::Misc,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LocationKind::Household => "household",
            LocationKind::SeniorResidency => "senior_residency",
            LocationKind::Hospital => "hospital",
            LocationKind::HospitalIcu => "hospital-icu",
            LocationKind::School => "school",
            LocationKind::Workplace => "workplace",
            LocationKind::Store => "store",
            LocationKind::Park => "park",
            LocationKind::Misc => "misc",
        }
    }

    /// Residential kinds keep a list of residents.
    #[must_use]
    pub fn is_residential(self) -> bool {
        matches!(self, LocationKind::Household | LocationKind::SeniorResidency)
    }

    /// Side effect of entering (`admitted = true`) or leaving a location of this kind.
    fn mark_agent<A: Agent>(self, agent: &mut A, admitted: bool) {
        match self {
            LocationKind::Hospital => agent.set_hospitalized(admitted),
            LocationKind::HospitalIcu => {
                agent.set_hospitalized(admitted);
                agent.set_in_icu(admitted);
            }
            _ => {}
        }
    }
}

impl Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly a location mixes its visitors and how long its surfaces stay contaminated.
#[derive(Clone, Debug)]
pub struct ContactProfile {
    pub social_contact_factor: f64,
    /// Distribution over the number of days surfaces stay contaminated after an infectious
    /// visit; bin `d` stands for `d` days.
    pub surface_prob: Categorical,
}

/// Outcome of [`Location::request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The location is full (or others are already waiting); the agent holds this position in
    /// the wait queue, 0 being next.
    Queued { position: usize },
}

#[derive(Debug, Clone)]
pub struct Location {
    id: LocationId,
    name: String,
    kind: LocationKind,
    x: i64,
    y: i64,
    area: f64,
    capacity: Option<usize>,
    profile: ContactProfile,
    present: IndexSet<AgentId>,
    waiting: VecDeque<AgentId>,
    contaminated_at: Option<NaiveDateTime>,
    max_contamination_days: u32,
    residents: Vec<AgentId>,
    icu: Option<LocationId>,
}

impl Location {
    /// Creates a location. `capacity = None` means unbounded.
    #[must_use]
    pub fn new(
        id: LocationId,
        name: String,
        kind: LocationKind,
        (x, y): (i64, i64),
        area: f64,
        capacity: Option<usize>,
        profile: ContactProfile,
    ) -> Location {
        Location {
            id,
            name,
            kind,
            x,
            y,
            area,
            capacity,
            profile,
            present: IndexSet::new(),
            waiting: VecDeque::new(),
            contaminated_at: None,
            max_contamination_days: 0,
            residents: Vec::new(),
            icu: None,
        }
    }

    /// Creates a hospital ward and the ICU it owns. The ICU receives `ICU_SHARE_PERCENT` of the
    /// given capacity and area (capacity rounded down) and is named `{name}-icu`; the ward keeps
    /// the rest.
    #[must_use]
    pub fn hospital(
        ward_id: LocationId,
        icu_id: LocationId,
        name: String,
        coordinates: (i64, i64),
        area: f64,
        capacity: usize,
        profile: ContactProfile,
    ) -> (Location, Location) {
        #[allow(clippy::cast_precision_loss)]
        let icu_area_share = ICU_SHARE_PERCENT as f64 / 100.0;
        let icu = Location::new(
            icu_id,
            format!("{name}-icu"),
            LocationKind::HospitalIcu,
            coordinates,
            area * icu_area_share,
            Some(capacity * ICU_SHARE_PERCENT / 100),
            profile.clone(),
        );
        let mut ward = Location::new(
            ward_id,
            name,
            LocationKind::Hospital,
            coordinates,
            area * (1.0 - icu_area_share),
            Some(capacity * (100 - ICU_SHARE_PERCENT) / 100),
            profile,
        );
        ward.icu = Some(icu_id);
        (ward, icu)
    }

    #[must_use]
    pub fn id(&self) -> LocationId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    #[must_use]
    pub fn coordinates(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[must_use]
    pub fn social_contact_factor(&self) -> f64 {
        self.profile.social_contact_factor
    }

    #[must_use]
    pub fn surface_prob(&self) -> &Categorical {
        &self.profile.surface_prob
    }

    /// The ICU owned by a hospital ward.
    #[must_use]
    pub fn icu(&self) -> Option<LocationId> {
        self.icu
    }

    /// Long-term residents; empty for non-residential kinds.
    #[must_use]
    pub fn residents(&self) -> &[AgentId] {
        &self.residents
    }

    pub(crate) fn add_resident(&mut self, agent_id: AgentId) {
        debug_assert!(self.kind.is_residential());
        self.residents.push(agent_id);
    }

    /// Agents currently present, in order of arrival.
    pub fn present(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.present.iter().copied()
    }

    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.present.len()
    }

    #[must_use]
    pub fn is_present(&self, agent_id: AgentId) -> bool {
        self.present.contains(&agent_id)
    }

    /// Agents waiting for a slot, longest-waiting first.
    pub fn waiting(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.waiting.iter().copied()
    }

    #[must_use]
    pub fn has_vacancy(&self) -> bool {
        self.capacity
            .is_none_or(|capacity| self.present.len() < capacity)
    }

    /// Whether any present agent is infectious. `agents` is the roster the ids index into.
    pub fn infectious_present<A: Agent>(&self, agents: &[A]) -> bool {
        self.present
            .iter()
            .any(|id| agents.get(id.0).is_some_and(|agent| agent.is_infectious()))
    }

    /// One-line description: name, occupancy over capacity and whether anyone infectious is in.
    pub fn summary<A: Agent>(&self, agents: &[A]) -> String {
        format!("{self} - I:{}", self.infectious_present(agents))
    }

    /// Asks for a slot. The agent is admitted if a slot is free and nobody is waiting ahead of
    /// it; otherwise it joins the back of the wait queue.
    ///
    /// Returns an error if the agent is already present or already waiting here.
    pub fn request<A: Agent>(
        &mut self,
        agent_id: AgentId,
        agent: &mut A,
        now: NaiveDateTime,
        rng: &mut RandomStream,
    ) -> Result<Admission, CityError> {
        if self.present.contains(&agent_id) || self.waiting.contains(&agent_id) {
            return Err(CityError::location(format!(
                "agent {agent_id} already holds or awaits a slot at {}",
                self.name
            )));
        }
        if self.waiting.is_empty() && self.has_vacancy() {
            self.enter(agent_id, agent, now, rng);
            Ok(Admission::Admitted)
        } else {
            self.waiting.push_back(agent_id);
            let position = self.waiting.len() - 1;
            trace!(
                "agent {agent_id} queued at {} (position {position})",
                self.name
            );
            Ok(Admission::Queued { position })
        }
    }

    /// Removes a present agent and undoes the kind's side effects. Does not admit a waiter;
    /// follow up with [`Location::next_waiter`].
    pub fn release<A: Agent>(&mut self, agent_id: AgentId, agent: &mut A) -> Result<(), CityError> {
        if !self.present.shift_remove(&agent_id) {
            return Err(CityError::location(format!(
                "agent {agent_id} is not present at {}",
                self.name
            )));
        }
        self.kind.mark_agent(agent, false);
        Ok(())
    }

    /// Pops the longest-waiting agent if a slot is free. The caller must then complete its
    /// admission with [`Location::admit_waiter`].
    pub fn next_waiter(&mut self) -> Option<AgentId> {
        if self.has_vacancy() {
            self.waiting.pop_front()
        } else {
            None
        }
    }

    /// Completes the admission of an agent returned by [`Location::next_waiter`].
    pub fn admit_waiter<A: Agent>(
        &mut self,
        agent_id: AgentId,
        agent: &mut A,
        now: NaiveDateTime,
        rng: &mut RandomStream,
    ) {
        trace!("agent {agent_id} woken at {}", self.name);
        self.enter(agent_id, agent, now, rng);
    }

    fn enter<A: Agent>(
        &mut self,
        agent_id: AgentId,
        agent: &mut A,
        now: NaiveDateTime,
        rng: &mut RandomStream,
    ) {
        self.present.insert(agent_id);
        self.kind.mark_agent(agent, true);
        if agent.is_infectious() {
            self.contaminate(now, rng);
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capacity {
            Some(capacity) => write!(f, "{} - occ:{}/{}", self.name, self.occupancy(), capacity),
            None => write!(f, "{} - occ:{}/inf", self.name, self.occupancy()),
        }
    }
}
