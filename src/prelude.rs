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
