//! The simulation context.
//!
//! A [`Context`] owns the clock, the city and two queues of work: plans scheduled for a future
//! tick and callbacks to run as soon as possible. [`Context::execute`] always drains pending
//! callbacks before moving the clock to the next plan, and stops once the queue is exhausted,
//! [`Context::shutdown`] was called, or the next plan lies past the simulation horizon.
//!
//! Location admission is exposed as continuation passing. [`Context::request_location`] runs the
//! continuation immediately (as a callback) if the agent was admitted, and otherwise parks it
//! until [`Context::leave_location`] hands the agent a freed slot.
use std::collections::VecDeque;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::agent::{Agent, AgentId, AgentSeed, Person};
use crate::city::City;
use crate::clock::Clock;
use crate::config::CityConfig;
use crate::error::CityError;
use crate::location::{Admission, LocationId};
use crate::plan::{Id as PlanId, Queue};
use crate::random::RandomStream;

type Callback<A> = dyn FnOnce(&mut Context<A>);

pub struct Context<A: Agent = Person> {
    clock: Clock,
    city: City<A>,
    plan_queue: Queue<Box<Callback<A>>>,
    callback_queue: VecDeque<Box<Callback<A>>>,
    suspended: FxHashMap<(LocationId, AgentId), Box<Callback<A>>>,
    horizon: u64,
    shutdown_requested: bool,
}

impl<A: Agent> Context<A> {
    /// Builds the city described by `config` from a fresh random stream seeded with `seed`.
    pub fn new<F>(config: &CityConfig, seed: u64, factory: F) -> Result<Context<A>, CityError>
    where
        F: FnMut(AgentSeed) -> A,
    {
        let city = City::build(config, RandomStream::new(seed), factory)?;
        let clock = Clock::new(config.start_time, config.minutes_per_tick);
        Ok(Context::from_city(city, clock))
    }

    /// Wraps an already built city. The horizon is the city's `sim_days` in ticks of `clock`.
    #[must_use]
    pub fn from_city(city: City<A>, clock: Clock) -> Context<A> {
        let horizon = clock.ticks_for_days(city.sim_days());
        Context {
            clock,
            city,
            plan_queue: Queue::new(),
            callback_queue: VecDeque::new(),
            suspended: FxHashMap::default(),
            horizon,
            shutdown_requested: false,
        }
    }

    /// Add a plan to the future event list at the specified tick
    ///
    /// Returns a `PlanId` for the newly-added plan that can be used to cancel it if needed.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is earlier than the current tick.
    pub fn add_plan(
        &mut self,
        tick: u64,
        callback: impl FnOnce(&mut Context<A>) + 'static,
    ) -> PlanId {
        assert!(tick >= self.clock.tick(), "Invalid time value");
        self.plan_queue.add_plan(tick, Box::new(callback))
    }

    /// Cancel a plan that has been added to the queue
    ///
    /// # Panics
    ///
    /// This function panics if you cancel a plan which has already been cancelled or executed.
    pub fn cancel_plan(&mut self, id: &PlanId) {
        self.plan_queue.cancel_plan(id);
    }

    /// Add a callback to be run before the next plan, in FIFO order with other callbacks.
    pub fn queue_callback(&mut self, callback: impl FnOnce(&mut Context<A>) + 'static) {
        self.callback_queue.push_back(Box::new(callback));
    }

    /// Stops `execute` after the callback that is currently running.
    pub fn shutdown(&mut self) {
        debug!("shutdown requested at tick {}", self.clock.tick());
        self.shutdown_requested = true;
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Last tick at which plans still run.
    #[must_use]
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    #[must_use]
    pub fn city(&self) -> &City<A> {
        &self.city
    }

    pub fn city_mut(&mut self) -> &mut City<A> {
        &mut self.city
    }

    pub fn rng_mut(&mut self) -> &mut RandomStream {
        self.city.rng_mut()
    }

    /// Requests a slot at `location` for `agent`. If admitted, `on_admitted` is queued as a
    /// callback. If the location is full, or others are already waiting, the agent is suspended
    /// and `on_admitted` runs once a release hands it the slot.
    pub fn request_location(
        &mut self,
        agent: AgentId,
        location: LocationId,
        on_admitted: impl FnOnce(&mut Context<A>) + 'static,
    ) -> Result<Admission, CityError> {
        let now = self.clock.timestamp();
        let admission = self.city.request(agent, location, now)?;
        match admission {
            Admission::Admitted => self.queue_callback(on_admitted),
            Admission::Queued { position } => {
                trace!("agent {agent} suspended at location {location} (position {position})");
                self.suspended.insert((location, agent), Box::new(on_admitted));
            }
        }
        Ok(admission)
    }

    /// Releases `agent` from `location`. If a suspended agent receives the freed slot, its
    /// continuation is queued.
    pub fn leave_location(&mut self, agent: AgentId, location: LocationId) -> Result<(), CityError> {
        let now = self.clock.timestamp();
        if let Some(woken) = self.city.release(agent, location, now)? {
            trace!("agent {woken} resumed at location {location}");
            if let Some(continuation) = self.suspended.remove(&(location, woken)) {
                self.callback_queue.push_back(continuation);
            }
        }
        Ok(())
    }

    /// Number of agents suspended on a full location.
    #[must_use]
    pub fn suspended_count(&self) -> usize {
        self.suspended.len()
    }

    /// Runs callbacks and plans until there is nothing left to do, a shutdown is requested, or
    /// the next plan lies past the horizon.
    pub fn execute(&mut self) {
        debug!("executing until tick {}", self.horizon);
        loop {
            if self.shutdown_requested {
                break;
            }

            // If there is a callback, run it.
            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            // There aren't any callbacks, so look at the first plan.
            match self.plan_queue.next_tick() {
                Some(tick) if tick <= self.horizon => {}
                _ => break,
            }
            if let Some(plan) = self.plan_queue.get_next_plan() {
                self.clock.advance_to(plan.tick);
                (plan.data)(self);
            }
        }
        debug!("stopped at {}", self.clock.time_of_day());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context() -> Context {
        let mut config = CityConfig::default();
        config.population = 200;
        config.sim_days = 1;
        Context::new(&config, 42, Person::from_seed).unwrap()
    }

    type Log = Rc<RefCell<Vec<u32>>>;

    fn add_plan(context: &mut Context, tick: u64, value: u32, log: &Log) {
        let log = Rc::clone(log);
        context.add_plan(tick, move |_| log.borrow_mut().push(value));
    }

    #[test]
    fn empty_context() {
        let mut context = context();
        context.execute();
        assert_eq!(context.current_tick(), 0);
    }

    #[test]
    #[should_panic(expected = "Invalid time value")]
    fn plan_in_the_past() {
        let mut context = context();
        context.add_plan(5, |context| {
            context.add_plan(4, |_| {});
        });
        context.execute();
    }

    #[test]
    fn callback_before_timed_plan() {
        let mut context = context();
        let log = Log::default();
        let callback_log = Rc::clone(&log);
        context.queue_callback(move |_| callback_log.borrow_mut().push(1));
        add_plan(&mut context, 1, 2, &log);
        context.execute();
        assert_eq!(context.current_tick(), 1);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn plans_at_same_tick_fire_in_order() {
        let mut context = context();
        let log = Log::default();
        add_plan(&mut context, 3, 1, &log);
        add_plan(&mut context, 3, 2, &log);
        add_plan(&mut context, 2, 0, &log);
        context.execute();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn timed_plan_adds_callback_and_timed_plan() {
        let mut context = context();
        let log = Log::default();
        let outer = Rc::clone(&log);
        context.add_plan(1, move |context| {
            outer.borrow_mut().push(1);
            // We add the plan first, but the callback will fire first.
            add_plan(context, 2, 3, &outer);
            let inner = Rc::clone(&outer);
            context.queue_callback(move |_| inner.borrow_mut().push(2));
        });
        context.execute();
        assert_eq!(context.current_tick(), 2);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn cancel_plan() {
        let mut context = context();
        let log = Log::default();
        let to_cancel = context.add_plan(2, {
            let log = Rc::clone(&log);
            move |_| log.borrow_mut().push(1)
        });
        context.add_plan(1, move |context| context.cancel_plan(&to_cancel));
        context.execute();
        assert_eq!(context.current_tick(), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stops_at_the_horizon() {
        let mut context = context();
        // One day at two minutes per tick.
        assert_eq!(context.horizon(), 720);
        let log = Log::default();
        add_plan(&mut context, 720, 1, &log);
        add_plan(&mut context, 721, 2, &log);
        context.execute();
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(context.current_tick(), 720);
    }

    #[test]
    fn shutdown_stops_execution() {
        let mut context = context();
        let log = Log::default();
        context.add_plan(1, |context| context.shutdown());
        add_plan(&mut context, 2, 1, &log);
        context.execute();
        assert!(log.borrow().is_empty());
        assert_eq!(context.current_tick(), 1);
    }

    #[test]
    fn suspended_agents_resume_in_arrival_order() {
        let mut context = context();
        let store = context.city().location_ids(LocationKind::Store)[0];
        let capacity = context.city().location(store).unwrap().capacity().unwrap();
        let log = Log::default();

        for i in 0..capacity + 2 {
            let log = Rc::clone(&log);
            let value = u32::try_from(i).unwrap();
            context
                .request_location(AgentId(i), store, move |_| log.borrow_mut().push(value))
                .unwrap();
        }
        assert_eq!(context.suspended_count(), 2);
        context.execute();
        assert_eq!(log.borrow().len(), capacity);

        // Releasing two agents later wakes the waiters in the order they arrived.
        context.add_plan(10, move |context| {
            context.leave_location(AgentId(5), store).unwrap();
            context.leave_location(AgentId(0), store).unwrap();
        });
        context.execute();
        let log = log.borrow();
        let expected_tail = [
            u32::try_from(capacity).unwrap(),
            u32::try_from(capacity + 1).unwrap(),
        ];
        assert_eq!(&log[capacity..], &expected_tail);
        assert_eq!(context.suspended_count(), 0);
        assert_eq!(context.city().location(store).unwrap().occupancy(), capacity);
    }

    #[test]
    fn leaving_an_unvisited_location_is_an_error() {
        let mut context = context();
        let park = context.city().location_ids(LocationKind::Park)[0];
        assert!(matches!(
            context.leave_location(AgentId(0), park),
            Err(CityError::LocationError(_))
        ));
    }
}
