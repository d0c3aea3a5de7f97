use super::logging;
use tracing::Level;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("ERROR"), Level::ERROR);
    assert_eq!(logging::parse_level(" warning "), Level::WARN);
    assert_eq!(logging::parse_level("trace"), Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), Level::INFO);
}
