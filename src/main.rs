use clap::Parser;
use tracing_subscriber::EnvFilter;

use swerve_runtime::config;

/// Swerve drivetrain control runtime (simulated hardware backend)
#[derive(Parser)]
struct Args {
    /// Control loop frequency, Hz
    #[arg(long, default_value_t = config::LOOP_HZ)]
    hz: u64,

    /// Odometry samples generated per control tick
    #[arg(long, default_value_t = config::SIM_SAMPLES_PER_TICK)]
    samples_per_tick: usize,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    if let Err(e) = swerve_runtime::runtime::run(args.hz, args.samples_per_tick).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
