//! Configuration section definitions.
//!
//! Each module corresponds to a section in `scriptveil.toml`:
//!
//! | Module      | TOML Section                       | Purpose                       |
//! |-------------|------------------------------------|-------------------------------|
//! | `build`     | `[build]`                          | Input and output documents    |
//! | `transform` | `[transform]`, `[transform.builtin]` | Script transform adapter    |
//! | `finish`    | `[finish]`                         | Document finisher             |

mod build;
mod finish;
mod transform;

pub use build::BuildConfig;
pub use finish::{FinishConfig, FinishEngine};
pub use transform::{BuiltinConfig, TransformConfig, TransformEngine};

use std::time::Duration;

use crate::config::{ConfigDiagnostics, FieldPath};

/// Package runners may fetch the real program on first use.
const PACKAGE_RUNNERS: &[&str] = &["npx", "bunx", "pnpx", "yarn", "dlx"];

/// Seconds to an optional limit, `0` meaning no limit.
fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Check that an external command is configured and installed.
fn validate_command(command: &[String], field: FieldPath, diag: &mut ConfigDiagnostics) {
    let Some(program) = command.first() else {
        diag.error_with_hint(
            field,
            "command is empty",
            format!("set {field} or pick the builtin engine"),
        );
        return;
    };

    if which::which(program).is_ok() {
        return;
    }
    if PACKAGE_RUNNERS.contains(&program.as_str()) {
        if let Some(package) = command.get(1) {
            diag.hint(
                field,
                format!("`{package}` via `{program}`, ensure the package is installed"),
            );
        }
    } else {
        diag.error_with_hint(
            field,
            format!("`{program}` not found"),
            format!("install the command or update {field}"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: FieldPath = FieldPath::new("transform.command");

    #[test]
    fn test_seconds() {
        assert_eq!(seconds(0), None);
        assert_eq!(seconds(5), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_validate_command_installed() {
        let mut diag = ConfigDiagnostics::new();
        validate_command(&["sh".into()], FIELD, &mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_validate_command_empty() {
        let mut diag = ConfigDiagnostics::new();
        validate_command(&[], FIELD, &mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field, FIELD);
    }

    #[test]
    fn test_validate_command_missing() {
        let mut diag = ConfigDiagnostics::new();
        validate_command(&["scriptveil-no-such-tool".into()], FIELD, &mut diag);
        assert_eq!(diag.len(), 1);
        assert!(diag.errors()[0].message.contains("not found"));
    }
}
