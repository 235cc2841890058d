// Kept in its own test binary: installing touches process-global state.

use rag_core::logging::{LogConfig, Logging};
use rag_core::Error;

#[test]
fn second_install_is_rejected() {
    let first = Logging::from_config(&LogConfig::fallback("WARNING"), std::io::sink).expect("build");
    let _guard = first.install().expect("first install");

    let second = Logging::from_config(&LogConfig::fallback("DEBUG"), std::io::sink).expect("build");
    assert!(matches!(second.install(), Err(Error::LoggingInstalled)));
}
