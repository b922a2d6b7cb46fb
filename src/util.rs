use std::str::FromStr;
use flexi_logger::{Logger, LogSpecBuilder};
use log::*;

/// Initializes logging for the application using the provided log level.
///
/// Logs go to stderr so stdout carries nothing but the occupancy reports. Actors do not
/// initialize logging, it is done for them in `main` before the graph is started.
///
/// # Errors
/// Returns an error for an unknown level string or if a logger is already installed.
///
/// # Examples
/// ```
/// if let Err(e) = carpark::init_logging("info") {
///     eprintln!("Logger initialization failed: {:?}", e);
/// }
/// ```
pub fn carpark_logging_init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = LogSpecBuilder::new();
    builder.default(LevelFilter::from_str(level)?); // Set the default level
    let log_spec = builder.build();

    Logger::with(log_spec)
        .format(flexi_logger::colored_with_thread)
        .log_to_stderr()
        .start()?;

    trace!("logging started at level {}", level);
    Ok(())
}
