//! Build information module.
//!
//! Compile-time facts about this binary (version, commit, toolchain, target)
//! plus the plugin protocol version it speaks.

use cloudctl_plugin_api::PROTOCOL_VERSION;

#[cfg(feature = "build-info")]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get formatted version information.
///
/// Output:
/// ```text
/// cloudctl 0.3.0 (x86_64-unknown-linux-gnu)
/// Plugin protocol: 1
/// Built: Sun, 18 Oct 2026 12:34:56 +0000
/// Commit: a1b2c3d
/// Rustc: 1.83.0
/// ```
#[cfg(feature = "build-info")]
pub fn version_info() -> String {
    format!(
        "{} {} ({})\nPlugin protocol: {}\nBuilt: {}\nCommit: {}\nRustc: {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET,
        PROTOCOL_VERSION,
        built_info::BUILT_TIME_UTC,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
        built_info::RUSTC_VERSION
    )
}

#[cfg(feature = "build-info")]
pub fn version_short() -> &'static str {
    built_info::PKG_VERSION
}

#[cfg(feature = "build-info")]
pub fn package_name() -> &'static str {
    built_info::PKG_NAME
}

// Fallback implementations when build-info feature is disabled
#[cfg(not(feature = "build-info"))]
pub fn version_info() -> String {
    format!(
        "{} {}\nPlugin protocol: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    )
}

#[cfg(not(feature = "build-info"))]
pub fn version_short() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(not(feature = "build-info"))]
pub fn package_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
