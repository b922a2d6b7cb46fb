use std::process::exit;
use log::*;
use structopt::StructOpt;
use structopt::clap::ErrorKind;
use carpark::*;
use carpark::args::usage;
use carpark::config::SHUTDOWN_TIMEOUT;

// Keep main small: read the args, start logging, build and start the graph, then
// wait. Bad arguments and a carpark that can not be built fail fast with status 1.
fn main() {
    let program = std::env::args().next().unwrap_or_else(|| String::from("carpark"));
    let opt = match Args::from_iter_safe(std::env::args()) {
        Ok(opt) => opt,
        Err(e) if e.kind == ErrorKind::HelpDisplayed || e.kind == ErrorKind::VersionDisplayed => {
            e.exit()
        }
        Err(e) => {
            println!("{}", usage(&program));
            println!("{}", e.message);
            exit(1);
        }
    };

    if let Err(e) = init_logging(&opt.loglevel) {
        //do not use logger to report logger could not start
        eprintln!("Warning: Logger initialization failed with {:?}. There will be no logging.", e);
    }
    debug!("args: {:?}", &opt);

    let mut graph = match CarparkGraph::new(opt.to_config()) {
        Ok(graph) => graph,
        Err(e) => {
            println!("{}", e);
            exit(1);
        }
    };

    if let Err(e) = graph.start(Box::new(ConsoleSink::stdout())) {
        println!("{}", e);
        exit(1);
    }

    // without a run duration nothing ever requests a stop, the process runs until killed
    if let Some(duration) = opt.run_duration() {
        if !graph.liveliness().wait_for_stop(duration) {
            graph.request_shutdown();
        }
    }

    match graph.block_until_stopped(SHUTDOWN_TIMEOUT) {
        Ok(report) => {
            info!("parked {} cars, released {} cars, {} left inside"
                  , report.parked, report.released, report.final_snapshot.occupied);
            if report.monitor.defects > 0 {
                error!("{} monitor observations had a nonzero delta", report.monitor.defects);
            }
        }
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    }
}
