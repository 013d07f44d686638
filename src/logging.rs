use std::io;

pub use log::LevelFilter::*;

pub fn setup_logging(verbosity: log::LevelFilter) {
    let result = fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| out.finish(format_args!("({}) {}: {}", record.level(), record.target(), message)))
        .chain(io::stderr())
        .apply();

    // A second call keeps the logger installed by the first one.
    if let Err(err) = result {
        log::debug!("Logging already configured: {}", err);
    }
}
