use log::LevelFilter;
use simple_logger::SimpleLogger;

pub(crate) fn logger_init(log_level: &Option<String>) {
    let log = log_level
        .as_ref()
        .and_then(|log| match log.to_lowercase().as_str() {
            "off" | "none" => Some(LevelFilter::Off),
            "trace" => Some(LevelFilter::Trace),
            "debug" => Some(LevelFilter::Debug),
            "info" => Some(LevelFilter::Info),
            "error" => Some(LevelFilter::Error),
            _ => None,
        })
        .unwrap_or(LevelFilter::Warn);
    if let Err(e) = SimpleLogger::new().with_level(log).init() {
        eprintln!("logger already initialized: {e}");
    }
}
