//! Version scanning for tool probe output.

use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("static regex"))
}

/// Find the first version-like token in a tool's output.
///
/// Tools report versions in many shapes (`gcc (Ubuntu ...) 5.4.0`,
/// `javac 1.8.0_151`, `Scala code runner version 2.11.6`); the first
/// `major.minor[.patch]` run wins, with a missing patch read as zero.
pub fn detect_version(output: &str) -> Option<Version> {
    let caps = version_re().captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .map_or(Some(0), |m| m.as_str().parse().ok())?;
    Some(Version::new(major, minor, patch))
}
