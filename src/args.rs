use std::time::Duration;
use structopt::StructOpt;
use crate::config::*;

#[derive(StructOpt, Debug, PartialEq, Clone)]
#[structopt(name = "carpark", about = "Parking lot simulation with concurrent arrivals and departures")]
pub struct Args {
    /// Number of parking slots
    #[structopt(name = "carparksize", validator = capacity_validator)]
    pub capacity: usize,

    #[structopt(short = "p", long = "producers"
              , default_value = "2"
              , validator = actor_count_validator)]
    pub producers: usize,

    #[structopt(short = "c", long = "consumers"
              , default_value = "2"
              , validator = actor_count_validator)]
    pub consumers: usize,

    /// Seconds between occupancy reports
    #[structopt(short = "t", long = "period_secs"
              , default_value = "2"
              , validator = period_validator)]
    pub period_secs: u64,

    /// Longest random pause before a car arrives or leaves
    #[structopt(short = "d", long = "max_delay_ms"
              , default_value = "1000"
              , validator = max_delay_validator)]
    pub max_delay_ms: u64,

    #[structopt(short = "v", long = "value_range"
              , default_value = "10"
              , validator = value_range_validator)]
    pub value_range: i32,

    /// Stop after this many seconds, 0 runs until killed
    #[structopt(short = "r", long = "run_seconds"
              , default_value = "0"
              , validator = run_duration_validator)]
    pub run_seconds: u64,

    #[structopt(short = "l", long = "loglevel"
                , default_value = "warn"
                , possible_values = log_variants()
                , validator = validate_logging_level
                , case_insensitive = true)]
    pub loglevel: String,
}

impl Args {
    pub fn to_config(&self) -> CarparkConfig {
        CarparkConfig {
            capacity: self.capacity,
            producers: self.producers,
            consumers: self.consumers,
            period: Duration::from_secs(self.period_secs),
            max_delay: Duration::from_millis(self.max_delay_ms),
            value_range: self.value_range,
        }
    }

    /// `None` means run until the process is killed.
    pub fn run_duration(&self) -> Option<Duration> {
        if self.run_seconds > 0 {
            Some(Duration::from_secs(self.run_seconds))
        } else {
            None
        }
    }
}

pub fn usage(program: &str) -> String {
    format!("Usage: {} carparksize", program)
}

fn capacity_validator(val: String) -> Result<(), String> {
    match val.parse::<usize>() {
        Ok(i) if i > 0 => Ok(()),
        _ => Err(format!("carpark size must be a positive integer, got {:?}", val)),
    }
}

fn actor_count_validator(val: String) -> Result<(), String> {
    match val.parse::<usize>() {
        Ok(i) if i > 0 => Ok(()),
        _ => Err(String::from("actor count must be at least 1.")),
    }
}

fn period_validator(val: String) -> Result<(), String> {
    match val.parse::<u64>() {
        Ok(i) if i > 0 && i <= MAX_PERIOD_SECS => Ok(()),
        _ => Err(format!("period must be between 1 and {} seconds.", MAX_PERIOD_SECS)),
    }
}

fn max_delay_validator(val: String) -> Result<(), String> {
    match val.parse::<u64>() {
        Ok(i) if i <= MAX_DELAY_MS => Ok(()),
        _ => Err(format!("delay must be {} ms or less.", MAX_DELAY_MS)),
    }
}

fn run_duration_validator(val: String) -> Result<(), String> {
    match val.parse::<u64>() {
        Ok(i) if i <= MAX_RUN_SECONDS => Ok(()),
        _ => Err(format!("run must be {} seconds or less.", MAX_RUN_SECONDS)),
    }
}

fn value_range_validator(val: String) -> Result<(), String> {
    match val.parse::<i32>() {
        Ok(i) if i > 0 => Ok(()),
        _ => Err(String::from("value range must be at least 1.")),
    }
}

fn log_variants() -> &'static [&'static str] {
    &["error", "warn", "info", "debug", "trace"]
}

fn validate_logging_level(level: String) -> Result<(), String> {
    let level_lower = level.to_lowercase();
    let valid_levels = log_variants();
    if valid_levels.contains(&level_lower.as_str()) {
        Ok(())
    } else {
        Err(String::from("Invalid logging level format."))
    }
}
