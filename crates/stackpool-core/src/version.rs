//! Build-time version constants.

const fn parse(digits: &str) -> u32 {
    let bytes = digits.as_bytes();
    let mut value = 0u32;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    value
}

/// Major version of this build.
pub const VERSION_MAJOR: u32 = parse(env!("CARGO_PKG_VERSION_MAJOR"));

/// Minor version of this build.
pub const VERSION_MINOR: u32 = parse(env!("CARGO_PKG_VERSION_MINOR"));

/// Patch version of this build.
pub const VERSION_PATCH: u32 = parse(env!("CARGO_PKG_VERSION_PATCH"));

/// Major version of this build.
pub fn version_major() -> u32 {
    VERSION_MAJOR
}

/// Minor version of this build.
pub fn version_minor() -> u32 {
    VERSION_MINOR
}

/// Patch version of this build.
pub fn version_patch() -> u32 {
    VERSION_PATCH
}

/// Full version string, e.g. `"0.1.0"`.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
