use std::fs;
use std::path::Path;

use ragdeck_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_module_catalog(&config));
            checks.push(check_data_dir(&config.storage.data_dir));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["module_catalog", "data_dir_writable"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_module_catalog(config: &AppConfig) -> DoctorCheck {
    let loaded = config.load_catalog().and_then(|catalog| catalog.validate().map(|()| catalog));
    match loaded {
        Ok(catalog) => {
            let flow_count: usize = catalog.modules.values().map(|module| module.flows.len()).sum();
            DoctorCheck {
                name: "module_catalog",
                status: CheckStatus::Pass,
                details: format!(
                    "{} module(s), {flow_count} flow(s) configured",
                    catalog.modules.len()
                ),
            }
        }
        Err(error) => DoctorCheck {
            name: "module_catalog",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_data_dir(data_dir: &Path) -> DoctorCheck {
    let marker = data_dir.join(".ragdeck-doctor");
    let result = fs::create_dir_all(data_dir)
        .and_then(|()| fs::write(&marker, b"ok"))
        .and_then(|()| fs::remove_file(&marker));

    match result {
        Ok(()) => DoctorCheck {
            name: "data_dir_writable",
            status: CheckStatus::Pass,
            details: format!("`{}` is writable", data_dir.display()),
        },
        Err(error) => DoctorCheck {
            name: "data_dir_writable",
            status: CheckStatus::Fail,
            details: format!("`{}` is not writable: {error}", data_dir.display()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
