//! The pkg-config front for native package resolution.
//!
//! Resolution asks pkg-config before touching the filesystem: a package
//! that ships metadata knows its own flags better than convention-based
//! probing does. Any failure here (missing binary, unknown package,
//! unsatisfied version) sends the caller to the fallback path.

use semver::VersionReq;

use crate::env::Env;
use crate::options::{BuildOption, OptionList};
use crate::platform::ObjectFormat;
use crate::safe_str::Value;
use crate::shell;
use crate::util::process::{Accept, OutputMode};
use crate::version::detect_version;

use super::{CommonPackage, PackageKind, PackageResolutionError};

fn query(env: &Env, name: &str, args: &[&str]) -> Result<String, PackageResolutionError> {
    let command = env.getvar("PKG_CONFIG", "pkg-config");
    let mut argv = shell::split(&command);
    if argv.is_empty() {
        argv.push("pkg-config".to_string());
    }
    argv.extend(args.iter().map(|s| s.to_string()));
    argv.push(name.to_string());

    env.execute(&argv, OutputMode::Pipe, OutputMode::DevNull, Accept::Success)
        .map(|output| output.stdout)
        .map_err(|_| PackageResolutionError::PackageNotFound(name.to_string()))
}

/// Resolve a package through pkg-config.
pub fn resolve(
    env: &Env,
    name: &str,
    format: ObjectFormat,
    version: Option<&VersionReq>,
    kind: PackageKind,
) -> Result<CommonPackage, PackageResolutionError> {
    let modversion = query(env, name, &["--modversion"])?;
    let found = detect_version(&modversion);
    if let Some(required) = version {
        let satisfied = found.as_ref().is_some_and(|v| required.matches(v));
        if !satisfied {
            return Err(PackageResolutionError::VersionMismatch {
                name: name.to_string(),
                found: modversion.trim().to_string(),
                required: required.to_string(),
            });
        }
    }

    let mut compile_options = OptionList::new();
    for flag in shell::split(&query(env, name, &["--cflags"])?) {
        compile_options.push(BuildOption::Raw(flag));
    }

    let libs_args: &[&str] = if kind == PackageKind::Static {
        &["--libs", "--static"]
    } else {
        &["--libs"]
    };
    let mut link_options = OptionList::new();
    for flag in shell::split(&query(env, name, libs_args)?) {
        // Library tokens belong in the library position of the link
        // line; everything else is an ordinary flag.
        if flag.starts_with("-l") {
            link_options.push(BuildOption::LibLiteral(Value::raw(flag)));
        } else {
            link_options.push(BuildOption::Raw(flag));
        }
    }

    Ok(CommonPackage {
        name: name.to_string(),
        format,
        version: found,
        compile_options,
        link_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Backend;
    use crate::platform::{HostPlatform, TargetPlatform};
    use crate::test_support::ScriptedRunner;
    use indexmap::IndexMap;
    use std::sync::Arc;

    fn env_with(runner: ScriptedRunner) -> Env {
        Env::with_runner(
            HostPlatform::posix(),
            TargetPlatform::posix(),
            Backend::Ninja,
            IndexMap::new(),
            Arc::new(runner),
        )
    }

    fn scripted() -> ScriptedRunner {
        // ScriptedRunner keys on the last argument, which is always the
        // package name here; use distinct packages per query shape in
        // the individual tests instead.
        ScriptedRunner::new()
    }

    #[test]
    fn test_missing_pkg_config_is_resolution_error() {
        let env = env_with(scripted());
        let err = resolve(&env, "zlib", ObjectFormat::Elf, None, PackageKind::Any).unwrap_err();
        assert!(matches!(err, PackageResolutionError::PackageNotFound(_)));
    }

    #[test]
    fn test_version_mismatch() {
        let runner = ScriptedRunner::new().on("zlib", "1.2.3\n", "");
        let env = env_with(runner);
        let required = VersionReq::parse(">=2").unwrap();
        let err = resolve(
            &env,
            "zlib",
            ObjectFormat::Elf,
            Some(&required),
            PackageKind::Any,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PackageResolutionError::VersionMismatch { .. }
        ));
    }

    #[test]
    fn test_resolved_package_options() {
        // All three queries end with the package name, so one response
        // covers them; flag splitting is what's under test.
        let runner = ScriptedRunner::new().on("libpng", "-I/usr/include/libpng16 -lpng16\n", "");
        let env = env_with(runner);
        let pkg = resolve(&env, "libpng", ObjectFormat::Elf, None, PackageKind::Any).unwrap();
        assert_eq!(pkg.name, "libpng");
        let compile: Vec<_> = pkg.compile_options.iter().cloned().collect();
        assert!(compile.contains(&BuildOption::Raw("-I/usr/include/libpng16".to_string())));
        let link: Vec<_> = pkg.link_options.iter().cloned().collect();
        assert!(link.contains(&BuildOption::LibLiteral(Value::raw("-lpng16"))));
    }
}
