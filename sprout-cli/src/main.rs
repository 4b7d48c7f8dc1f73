use std::path::PathBuf;
use std::process;

use clap::Parser;
use sprout::Project;

#[derive(Parser, Debug)]
#[clap(name = "sprout", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Path to the project manifest.
    #[clap(short, long, default_value = "sprout.yml")]
    config: PathBuf,

    /// Empty each template set's output directory before generating it.
    #[clap(long)]
    clean: bool,

    /// Which template set(s) to generate. All of them if none are given.
    sets: Vec<String>,
}

fn main() {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })
    .unwrap();

    match generate(&args) {
        Ok(count) => log::info!("Success! Generated {} file(s)", count),
        Err(e) => {
            log::error!("Failed: {:?}", e);
            process::exit(1);
        }
    }
}

fn generate(args: &Args) -> eyre::Result<usize> {
    let project = Project::load(&args.config)?;
    if args.sets.is_empty() {
        project.generate_all(args.clean)
    } else {
        project.generate(&args.sets[..], args.clean)
    }
}
