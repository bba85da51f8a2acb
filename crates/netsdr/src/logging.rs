use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Extra `target=level` directives, comma separated, applied on top of
/// `--log-level` (e.g. `netsdr_transport=trace,tokio=debug`).
pub const LOG_ENV: &str = "NETSDR_LOG";

/// Crates whose events follow `--log-level`. Everything else is capped
/// at warn.
const WORKSPACE_TARGETS: [&str; 4] = [
    "netsdr",
    "netsdr_frame",
    "netsdr_session",
    "netsdr_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-crate filter: workspace crates at `level`, third-party crates at
/// warn or quieter, then any `overrides` directives.
pub fn targets(
    level: LogLevel,
    overrides: Option<&str>,
) -> Result<Targets, tracing_subscriber::filter::ParseError> {
    let level = level.as_filter();
    let base = WORKSPACE_TARGETS
        .iter()
        .fold(
            Targets::new().with_default(level.min(LevelFilter::WARN)),
            |targets, name| targets.with_target(*name, level),
        );

    match overrides.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(base),
        Some(directives) => {
            let extra: Targets = directives.parse()?;
            let base = match extra.default_level() {
                Some(default) => base.with_default(default),
                None => base,
            };
            Ok(base.with_targets(extra))
        }
    }
}

/// Install the stderr subscriber. Event targets name the emitting crate
/// module (`netsdr_session::session`, `netsdr_transport::udp`, ...).
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let overrides = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = match targets(level, overrides.as_deref()) {
        Ok(filter) => (filter, None),
        Err(err) => (targets_or_default(level), Some(err)),
    };

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(filter).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(filter).try_init();
        }
    }

    if let Some(err) = rejected {
        tracing::warn!(error = %err, var = LOG_ENV, "ignoring malformed log directives");
    }
}

fn targets_or_default(level: LogLevel) -> Targets {
    targets(level, None).unwrap_or_else(|_| Targets::new().with_default(level.as_filter()))
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn workspace_crates_follow_requested_level() {
        let filter = targets(LogLevel::Debug, None).unwrap();

        assert!(filter.would_enable("netsdr_session::session", &Level::DEBUG));
        assert!(filter.would_enable("netsdr_transport::udp", &Level::DEBUG));
        assert!(!filter.would_enable("netsdr_frame::codec", &Level::TRACE));
    }

    #[test]
    fn other_crates_are_capped_at_warn() {
        let filter = targets(LogLevel::Trace, None).unwrap();

        assert!(filter.would_enable("tokio::runtime", &Level::WARN));
        assert!(!filter.would_enable("tokio::runtime", &Level::INFO));

        let quiet = targets(LogLevel::Error, None).unwrap();
        assert!(!quiet.would_enable("tokio::runtime", &Level::WARN));
        assert!(!quiet.would_enable("netsdr_session", &Level::WARN));
    }

    #[test]
    fn env_directives_override_per_crate() {
        let filter = targets(LogLevel::Info, Some("netsdr_transport=trace,tokio=debug")).unwrap();

        assert!(filter.would_enable("netsdr_transport::tcp", &Level::TRACE));
        assert!(filter.would_enable("tokio::net", &Level::DEBUG));
        assert!(!filter.would_enable("netsdr_session::sink", &Level::DEBUG));
    }

    #[test]
    fn blank_directives_are_ignored() {
        let filter = targets(LogLevel::Info, Some("  ")).unwrap();
        assert!(filter.would_enable("netsdr", &Level::INFO));
    }

    #[test]
    fn malformed_directives_are_rejected() {
        assert!(targets(LogLevel::Info, Some("netsdr_session=loud")).is_err());
    }
}
