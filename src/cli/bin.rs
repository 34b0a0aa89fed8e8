#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
pub fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = csvedit::cli::start_main_loop() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

// Placeholder for binary
#[cfg(not(feature = "cli"))]
pub fn main() {}
