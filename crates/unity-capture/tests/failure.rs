use std::fs;

use UnityCapturePlugin::failure::Ignore;
use test_helper::logger::init_logger;

#[test]
fn ignored_errors_are_dropped() {
    init_logger();

    let missing = std::env::temp_dir().join(format!(
        "unity-capture-ignore-{}/missing",
        std::process::id()
    ));

    fs::remove_file(&missing).ignore();
    Ok::<_, &str>(1).ignore();
    Err::<(), _>("not acted on").ignore();
}
