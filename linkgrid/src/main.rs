mod dispatch;
#[cfg(test)]
mod fixtures;
mod links;
mod obstruction;
mod options;
mod pathloss;
mod progress;
mod report;
mod sample;

use anyhow::Result;
use clap::Parser;
use options::Cli;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let report = match cli {
        Cli::Sample(sample) => sample.run(),
        Cli::Obstruction(obstruction) => obstruction.run(),
        Cli::Pathloss(pathloss) => pathloss.run(),
    }?;
    println!("{report}");
    Ok(())
}
