use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};
use log::info;

use crate::agent::Person;
use crate::config::CityConfig;
use crate::context::Context;
use crate::error::CityError;

/// Default cli arguments for the city runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a JSON city configuration; the built-in city is used otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log directives: a level (off, error, warn, info, debug or trace) and optional
    /// `module=level` filters, e.g. `info,city::population=trace`
    #[arg(short, long)]
    pub log_level: Option<String>,
}

fn create_city_cli() -> Command {
    let cli = Command::new("epi-city");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with default cli arguments
///
/// This function parses command line arguments, builds the city and lets you define a setup
/// function that schedules the model's work before the context executes.
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Context` and the `BaseArgs`
///
/// # Errors
/// Returns an error if argument parsing, configuration loading, city construction or the setup
/// function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context<Person>, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context<Person>, &BaseArgs) -> Result<(), CityError>,
{
    let matches = create_city_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(&args, setup_fn)?)
}

pub(crate) fn run_with_args_internal<F>(
    args: &BaseArgs,
    setup_fn: F,
) -> Result<Context<Person>, CityError>
where
    F: Fn(&mut Context<Person>, &BaseArgs) -> Result<(), CityError>,
{
    if let Some(directives) = &args.log_level {
        crate::log::apply_directives(directives)?;
    }

    // Optionally load the city from a file
    let config = match &args.config {
        Some(path) => {
            info!("loading city configuration from {}", path.display());
            CityConfig::from_json_file(path)?
        }
        None => CityConfig::default(),
    };

    let mut context = Context::new(&config, args.random_seed, Person::from_seed)?;

    // Run the provided Fn
    setup_fn(&mut context, args)?;

    // Execute the context
    context.execute();
    Ok(context)
}
