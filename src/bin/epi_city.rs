use epi_city::prelude::*;

fn main() {
    let result = run_with_args(|context, args| {
        let city = context.city();
        println!(
            "built a city of {} agents with seed {}",
            city.agents().len(),
            args.random_seed
        );
        for kind in LocationKind::ALL {
            println!("{kind}: {}", city.location_ids(kind).len());
        }
        Ok(())
    });
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
