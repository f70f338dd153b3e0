use sbus_logger::{LevelFilter, Logger, LoggerError};
use tracing::Level;

#[test]
fn second_init_keeps_first_signal_level() {
    let _logger = Logger::builder()
        .name("integration-init-twice")
        .level(LevelFilter::WARN)
        .signals(LevelFilter::DEBUG)
        .init()
        .expect("first init should succeed");

    let err = Logger::builder()
        .name("integration-init-twice-bad")
        .signals(LevelFilter::TRACE)
        .env_filter("sbus=[")
        .init()
        .expect_err("invalid directives should be rejected before installing");
    assert!(
        matches!(err, LoggerError::InvalidConfiguration { .. }),
        "expected configuration error, got {err:?}"
    );

    let err = Logger::builder()
        .name("integration-init-twice-second")
        .signals(LevelFilter::TRACE)
        .init()
        .expect_err("second init should fail");
    assert!(
        matches!(err, LoggerError::Subscriber { .. }),
        "expected subscriber error for second init"
    );

    assert!(tracing::enabled!(target: "sbus", Level::DEBUG));
    assert!(!tracing::enabled!(target: "sbus", Level::TRACE), "second builder replaced the filter");
    assert!(!tracing::enabled!(target: "sbusd", Level::INFO));
}
