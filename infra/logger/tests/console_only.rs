use sbus_logger::{LevelFilter, Logger};
use tracing::Level;

#[test]
fn signal_directive_coexists_with_env_filter() {
    let logger = Logger::builder()
        .name("integration-console-only")
        .console(true)
        .level(LevelFilter::INFO)
        .signals(LevelFilter::TRACE)
        .env_filter("sbusd=debug")
        .init()
        .expect("logger should initialize");

    assert!(logger.guard().is_none(), "console-only logger should not create a file guard");

    assert!(tracing::enabled!(target: "sbus", Level::TRACE), "signal records should pass at TRACE");
    assert!(tracing::enabled!(target: "sbusd", Level::DEBUG), "env filter directive was dropped");
    assert!(!tracing::enabled!(target: "sbusd", Level::TRACE));
    assert!(!tracing::enabled!(target: "worker", Level::DEBUG), "default level should stay at INFO");
    assert!(tracing::enabled!(target: "worker", Level::INFO));
}
