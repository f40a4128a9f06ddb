use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        platform_check(),
        port_check(args.port_dev.as_deref()),
        storage_check(args.storage_dir.as_deref()),
    ];

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Pretty => {
            println!("cyflowrec doctor\n");
            for c in &output.checks {
                println!("  [{:>4}] {:<12} {}", status_text(c.status), c.name, c.detail);
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_check() -> CheckResult {
    if cfg!(unix) {
        CheckResult::new("platform", CheckStatus::Pass, "termios serial devices available")
    } else {
        CheckResult::new("platform", CheckStatus::Fail, "serial devices require a Unix platform")
    }
}

fn port_check(port_dev: Option<&Path>) -> CheckResult {
    const NAME: &str = "port";
    let Some(path) = port_dev else {
        return CheckResult::new(NAME, CheckStatus::Skip, "no --port-dev given");
    };

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            return CheckResult::new(NAME, CheckStatus::Fail, format!("{}: {err}", path.display()))
        }
    };

    if is_char_device(&metadata) {
        CheckResult::new(NAME, CheckStatus::Pass, format!("{} is a character device", path.display()))
    } else {
        CheckResult::new(
            NAME,
            CheckStatus::Warn,
            format!("{} is not a character device; use --skip-line-setup", path.display()),
        )
    }
}

#[cfg(unix)]
fn is_char_device(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;

    metadata.file_type().is_char_device()
}

#[cfg(not(unix))]
fn is_char_device(_metadata: &std::fs::Metadata) -> bool {
    false
}

fn storage_check(storage_dir: Option<&Path>) -> CheckResult {
    const NAME: &str = "storage";
    let Some(dir) = storage_dir else {
        return CheckResult::new(NAME, CheckStatus::Skip, "no --storage-dir given");
    };

    if !dir.exists() {
        return CheckResult::new(
            NAME,
            CheckStatus::Warn,
            format!("{} does not exist; receive with --create-dirs", dir.display()),
        );
    }
    if !dir.is_dir() {
        return CheckResult::new(NAME, CheckStatus::Fail, format!("{} is not a directory", dir.display()));
    }

    let probe: PathBuf = dir.join(format!(".cyflowrec-doctor-{}", std::process::id()));
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckResult::new(NAME, CheckStatus::Pass, format!("{} is writable", dir.display()))
        }
        Err(err) => CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("{} is not writable: {err}", dir.display()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cyflowrec-doctor-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_inputs_are_skipped() {
        assert_eq!(port_check(None).status, CheckStatus::Skip);
        assert_eq!(storage_check(None).status, CheckStatus::Skip);
    }

    #[test]
    fn writable_storage_passes() {
        let dir = temp_dir("writable");
        assert_eq!(storage_check(Some(&dir)).status, CheckStatus::Pass);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn storage_file_fails() {
        let dir = temp_dir("file");
        let file = dir.join("plain");
        std::fs::write(&file, b"").unwrap();

        assert_eq!(storage_check(Some(&file)).status, CheckStatus::Fail);
        assert_eq!(storage_check(Some(&dir.join("absent"))).status, CheckStatus::Warn);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_port_fails_and_regular_file_warns() {
        let dir = temp_dir("port");
        assert_eq!(port_check(Some(&dir.join("ttyNOPE"))).status, CheckStatus::Fail);

        let file = dir.join("capture.bin");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(port_check(Some(&file)).status, CheckStatus::Warn);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dev_null_is_a_character_device() {
        assert_eq!(port_check(Some(Path::new("/dev/null"))).status, CheckStatus::Pass);
    }
}
