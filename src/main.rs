//! Demo binary: print a generated statement stream for a given seed.

use clap::Parser;
use rand::RngCore;
use sqlsurge::{Generator, Profile, State};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlsurge")]
#[command(about = "Randomized SQL workload generator for differential testing")]
struct Args {
    /// Random seed; a fresh one is drawn when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of statements to generate.
    #[arg(long, default_value_t = 100)]
    steps: usize,
    /// Force index-rich tables and index-merge predicate shapes.
    #[arg(long)]
    index_merge: bool,
    /// Enable the drop/truncate + flashback pair.
    #[arg(long)]
    flashback: bool,
    /// Enable select-into-outfile / load-data statements.
    #[arg(long)]
    outfile: bool,
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(|| rand::rng().next_u64());
    eprintln!("seed = {seed}");

    let mut profile = Profile::default();
    profile.query_index_merge = args.index_merge;
    profile.can_read_gc_save_point = args.flashback;
    profile.enable_select_outfile_and_load_data = args.outfile;

    let mut generator = Generator::new(State::new(seed, profile));
    for _ in 0..args.steps {
        let sql = generator.generate();
        if sql.is_empty() {
            continue;
        }
        println!("{sql};");
    }
    Ok(())
}

fn init_logger() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}
