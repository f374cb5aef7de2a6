//! `wayfinder config validate` / `wayfinder config show`.

use wf_domain::config::{Config, ConfigSeverity};

/// Print validation issues.  Returns `false` when any error-severity issue
/// exists (the caller exits non-zero).
pub fn validate(config: &Config, path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("{path}: OK");
        return true;
    }

    for issue in &issues {
        println!("{issue}");
    }

    let has_errors = issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error);
    if has_errors {
        println!("{path}: FAILED");
    } else {
        println!("{path}: OK (with warnings)");
    }
    !has_errors
}

/// Print the effective configuration as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}
