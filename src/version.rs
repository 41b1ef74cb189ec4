//! Build and version identity surfaced by `--version` and the `build_info`
//! metric.

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit the binary was built from, injected at build time via
/// `APTOS_GUARDIAN_COMMIT`.
pub const COMMIT: &str = match option_env!("APTOS_GUARDIAN_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

/// Build date, injected at build time via `APTOS_GUARDIAN_BUILD_DATE`.
pub const BUILD_DATE: &str = match option_env!("APTOS_GUARDIAN_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};
