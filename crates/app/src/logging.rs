use std::io;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Installs a stderr fmt subscriber. Events from this workspace pass at
/// `level`; everything else only at WARN and above.
pub(crate) fn setup_tracing(level: LevelFilter) {
    let filter_layer = tracing_subscriber::filter::filter_fn(move |metadata| {
        let target = metadata.target();
        let ours = target.starts_with("bathyfilter") || target.starts_with("bathy_core");
        let effective = if ours { level } else { LevelFilter::WARN };
        match effective.into_level() {
            Some(max) => metadata.level() <= &max,
            None => false,
        }
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .init();
}

pub(crate) fn level_for(verbose: bool, quiet: bool) -> LevelFilter {
    match (verbose, quiet) {
        (true, _) => LevelFilter::from_level(Level::DEBUG),
        (false, true) => LevelFilter::WARN,
        (false, false) => LevelFilter::INFO,
    }
}
