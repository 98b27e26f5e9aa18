//! Build tool discovery for `depsmith doctor`
//!
//! Checks that the external build tools the recipes shell out to are
//! installed, and reports issues with suggestions.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::core::build_env::{BuildEnvironment, Platform};

/// Outcome of looking for one tool
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub error: Option<String>,
    pub suggestion: Option<String>,
    /// Optional tools only matter to a handful of recipes
    pub required: bool,
}

impl CheckResult {
    fn found(spec: &ToolSpec, path: PathBuf, version: Option<String>) -> Self {
        Self {
            name: spec.label.to_string(),
            passed: true,
            path: Some(path),
            version,
            error: None,
            suggestion: None,
            required: spec.required,
        }
    }

    fn missing(spec: &ToolSpec) -> Self {
        Self {
            name: spec.label.to_string(),
            passed: false,
            path: None,
            version: None,
            error: Some(format!("{} not found in PATH", spec.candidates.join(" / "))),
            suggestion: Some(spec.suggestion.to_string()),
            required: spec.required,
        }
    }
}

/// Everything `doctor` found
#[derive(Debug, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
    /// Problems with the selected environment rather than with a tool
    pub config_issues: Vec<String>,
}

impl DoctorReport {
    /// True when a build could start: every required tool is present and
    /// the environment is coherent
    pub fn all_required_passed(&self) -> bool {
        self.config_issues.is_empty() && self.checks.iter().all(|c| c.passed || !c.required)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count()
    }
}

/// A tool to look for, with alternatives tried in order
struct ToolSpec {
    label: &'static str,
    candidates: &'static [&'static str],
    version_arg: &'static str,
    required: bool,
    suggestion: &'static str,
}

/// Tools needed on a platform
fn tools_for(platform: Platform) -> Vec<ToolSpec> {
    let mut tools = vec![ToolSpec {
        label: "CMake",
        candidates: &["cmake"],
        version_arg: "--version",
        required: true,
        suggestion: "Install CMake from https://cmake.org/download/ or use your package manager",
    }];

    if platform == Platform::Windows {
        tools.push(ToolSpec {
            label: "MSBuild",
            candidates: &["msbuild"],
            version_arg: "-version",
            required: true,
            suggestion: "Run from a Visual Studio Developer Command Prompt",
        });
        tools.push(ToolSpec {
            label: "C compiler",
            candidates: &["cl"],
            version_arg: "",
            required: true,
            suggestion: "Install the Visual Studio C++ build tools",
        });
    } else {
        tools.push(ToolSpec {
            label: "Make",
            candidates: &["make", "gmake"],
            version_arg: "--version",
            required: true,
            suggestion: "Install make (e.g., build-essential or Xcode command line tools)",
        });
        tools.push(ToolSpec {
            label: "C compiler",
            candidates: &["cc", "gcc", "clang"],
            version_arg: "--version",
            required: true,
            suggestion: "Install GCC or Clang",
        });
    }

    tools.push(ToolSpec {
        label: "Perl",
        candidates: &["perl"],
        version_arg: "--version",
        required: true,
        suggestion: "Install Perl; the OpenSSL build scripts need it",
    });
    tools.push(ToolSpec {
        label: "Python",
        candidates: &["python3", "python"],
        version_arg: "--version",
        required: false,
        suggestion: "Install Python 3; only the botan recipe needs it",
    });

    tools
}

fn check_tool(spec: &ToolSpec) -> CheckResult {
    spec.candidates
        .iter()
        .find_map(|candidate| which::which(candidate).ok())
        .map(|path| {
            let version = probe_version(&path, spec.version_arg);
            CheckResult::found(spec, path, version)
        })
        .unwrap_or_else(|| CheckResult::missing(spec))
}

/// Best-effort version from `<tool> <version_arg>`; MSVC `cl` prints its
/// banner on stderr with no argument at all
fn probe_version(tool: &Path, version_arg: &str) -> Option<String> {
    let mut cmd = Command::new(tool);
    if !version_arg.is_empty() {
        cmd.arg(version_arg);
    }
    let output = cmd.output().ok()?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    parse_version(&text)
}

/// First dotted number in the text, e.g. `3.27.1` or `5.36.0`
fn parse_version(text: &str) -> Option<String> {
    let dotted = regex::Regex::new(r"v?(\d+\.\d+(?:\.\d+)?(?:-\w+)?)").ok()?;
    let found = dotted.captures(text)?.get(1)?;
    Some(found.as_str().to_string())
}

/// Check whether the generator's own build tool is present
fn check_generator(env: &BuildEnvironment) -> Option<String> {
    let generator = env.generator.to_ascii_lowercase();
    let tool = if generator.contains("ninja") {
        "ninja"
    } else if generator.contains("nmake") {
        "nmake"
    } else {
        return None;
    };
    which::which(tool)
        .is_err()
        .then(|| format!("Generator '{}' needs '{tool}' in PATH", env.generator))
}

/// Look for every tool the platform's recipes shell out to and sanity-check
/// the environment
pub fn run_doctor(env: &BuildEnvironment) -> DoctorReport {
    let checks = tools_for(env.platform).iter().map(check_tool).collect();
    let config_issues = env
        .validate()
        .err()
        .map(|e| e.to_string())
        .into_iter()
        .chain(check_generator(env))
        .collect();
    DoctorReport {
        checks,
        config_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(label: &'static str, required: bool) -> ToolSpec {
        ToolSpec {
            label,
            candidates: &["depsmith-missing-tool-a", "depsmith-missing-tool-b"],
            version_arg: "--version",
            required,
            suggestion: "install it",
        }
    }

    #[test]
    fn test_optional_miss_does_not_block() {
        let cmake = CheckResult::found(&spec("CMake", true), PathBuf::from("/usr/bin/cmake"), Some("3.27.1".into()));
        let python = CheckResult::missing(&spec("Python", false));
        let mut report = DoctorReport {
            checks: vec![cmake, python],
            config_issues: Vec::new(),
        };

        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.all_required_passed());

        report.checks.push(CheckResult::missing(&spec("Perl", true)));
        assert!(!report.all_required_passed());
    }

    #[test]
    fn test_environment_issue_blocks() {
        let report = DoctorReport {
            checks: Vec::new(),
            config_issues: vec!["generator needs ninja".to_string()],
        };
        assert!(!report.all_required_passed());
    }

    #[test]
    fn test_parse_version_from_banners() {
        assert_eq!(
            parse_version("cmake version 3.27.1\n\nCMake suite maintained").as_deref(),
            Some("3.27.1")
        );
        assert_eq!(
            parse_version("This is perl 5, version 36, subversion 0 (v5.36.0)").as_deref(),
            Some("5.36.0")
        );
        assert_eq!(parse_version("GNU Make 4.3").as_deref(), Some("4.3"));
        assert_eq!(parse_version("no digits here"), None);
    }

    #[test]
    fn test_windows_swaps_make_for_msbuild() {
        let labels = |p| tools_for(p).iter().map(|t| t.label).collect::<Vec<_>>();
        assert!(labels(Platform::Linux).contains(&"Make"));
        assert!(!labels(Platform::Linux).contains(&"MSBuild"));
        assert!(labels(Platform::Windows).contains(&"MSBuild"));
    }

    #[test]
    fn test_missing_tool_lists_every_candidate() {
        let result = check_tool(&spec("Imaginary", true));
        assert!(!result.passed);
        assert_eq!(result.suggestion.as_deref(), Some("install it"));
        assert!(result
            .error
            .unwrap()
            .contains("depsmith-missing-tool-a / depsmith-missing-tool-b"));
    }
}
