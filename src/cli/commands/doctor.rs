//! CLI implementation for `depsmith doctor`

use anyhow::{bail, Result};

use crate::cli::commands::{load_environment, EnvArgs};
use crate::cli::output::{is_json, is_quiet, print_detail, print_info, print_success, print_warning, status};
use crate::core::build_env::BuildEnvironment;
use crate::core::doctor::{run_doctor, CheckResult, DoctorReport};

/// Execute the doctor command
pub fn execute(args: &EnvArgs) -> Result<()> {
    let (_, env) = load_environment(args)?;
    let report = run_doctor(&env);

    if is_json() {
        print_json(&env, &report)?;
    } else if is_quiet() {
        for check in missing_required(&report) {
            eprintln!("{} Missing required: {}", status::ERROR, check.name);
        }
        for issue in &report.config_issues {
            eprintln!("{} {issue}", status::ERROR);
        }
    } else {
        print_human(&env, &report);
    }

    if !report.all_required_passed() {
        bail!("Required build tools are missing");
    }
    Ok(())
}

fn missing_required(report: &DoctorReport) -> impl Iterator<Item = &CheckResult> {
    report.checks.iter().filter(|c| c.required && !c.passed)
}

fn print_json(env: &BuildEnvironment, report: &DoctorReport) -> Result<()> {
    let verdict = match (report.all_required_passed(), report.failed_count()) {
        (false, _) => "error",
        (true, 0) => "success",
        (true, _) => "warning",
    };
    let body = serde_json::json!({
        "status": verdict,
        "platform": env.platform.to_string(),
        "root": env.root,
        "checks": report.checks,
        "config_issues": report.config_issues,
        "passed_count": report.passed_count(),
        "total_count": report.checks.len(),
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn print_human(env: &BuildEnvironment, report: &DoctorReport) {
    print_info(&format!(
        "Tools for {} {}-{} builds:",
        env.platform, env.build_mode, env.link_mode
    ));

    for check in &report.checks {
        let tag = if check.required { "" } else { " (optional)" };
        if check.passed {
            let version = check.version.as_deref().map(|v| format!(" {v}")).unwrap_or_default();
            println!("  {} {}{version}{tag}", status::SUCCESS, check.name);
        } else {
            println!("  {} {}{tag}", status::ERROR, check.name);
            if let Some(error) = &check.error {
                print_detail(error);
            }
            if let Some(suggestion) = &check.suggestion {
                print_detail(&format!("fix: {suggestion}"));
            }
        }
    }

    if !report.config_issues.is_empty() {
        print_warning("Environment:");
        for issue in &report.config_issues {
            print_detail(issue);
        }
    }

    let summary = format!("{}/{} checks passed", report.passed_count(), report.checks.len());
    if !report.all_required_passed() {
        println!("{} {summary}", status::ERROR);
    } else if report.failed_count() > 0 {
        print_warning(&format!("{summary}; recipes needing the missing optional tools will fail"));
    } else {
        print_success(&summary);
    }
}
