pub const ECOBEE_DISPLAY_VERSION: &str = env!("ECOBEE_DISPLAY_VERSION");
pub const ECOBEE_BUILD_N: &str = env!("ECOBEE_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "EcoBEE {}\nBuild {}\nHoney-bee evolution simulation engine (protocol {})",
        ECOBEE_DISPLAY_VERSION,
        ECOBEE_BUILD_N,
        ecobee_protocol::PROTOCOL_VERSION
    )
}
