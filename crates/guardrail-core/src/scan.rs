use crate::error::{GuardrailError, Result};
use crate::normalize;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Build the argument list for invoking a supported scanner over the given
/// code paths. Every adapter-supported tool has an invocation shape that
/// emits the JSON its normalizer expects on stdout.
pub fn scanner_args(tool: &str, code_paths: &[String]) -> Result<Vec<String>> {
    match tool {
        "bandit" => {
            // bandit takes targets between -r and the format flags
            let mut args = vec!["-r".to_string()];
            args.extend(code_paths.iter().cloned());
            args.extend(["-f".into(), "json".into(), "-q".into()]);
            Ok(args)
        }
        "semgrep" => {
            let mut args = vec!["scan".to_string(), "--json".to_string(), "--quiet".to_string()];
            args.extend(code_paths.iter().cloned());
            Ok(args)
        }
        "trufflehog" => {
            let mut args = vec!["filesystem".to_string(), "--json".to_string()];
            args.extend(code_paths.iter().cloned());
            Ok(args)
        }
        // pip-audit resolves the environment itself; paths don't apply.
        "pip-audit" => Ok(vec!["-f".into(), "json".into()]),
        _ => Err(GuardrailError::UnsupportedTool(tool.to_string())),
    }
}

/// Invoke a scanner binary over `code_paths` and return its stdout.
///
/// The scanner's exit code is ignored: these tools exit non-zero when they
/// find issues, and the JSON report is on stdout either way. A missing
/// binary is `UnsupportedTool` (the caller degrades to reduced coverage);
/// exceeding `timeout` kills the process and is `ScanTimeout` (the caller
/// degrades the practice to incomplete).
pub fn run_scanner(
    tool: &str,
    code_paths: &[String],
    root: &Path,
    timeout: Duration,
) -> Result<String> {
    if !normalize::is_supported_tool(tool) {
        return Err(GuardrailError::UnsupportedTool(tool.to_string()));
    }
    let binary = which::which(tool)
        .map_err(|_| GuardrailError::UnsupportedTool(tool.to_string()))?;
    let args = scanner_args(tool, code_paths)?;

    tracing::info!(tool, ?timeout, "running scanner");

    let mut child = Command::new(&binary)
        .args(&args)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GuardrailError::ScannerSpawnFailed(format!("{tool}: {e}")))?;

    let child_pid = child.id();

    // Read stdout/stderr in dedicated threads to avoid pipe-buffer deadlocks.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stdout_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stderr_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });

    // Waiter thread + mpsc channel for timeout support. The child is moved
    // to the thread; on timeout we kill by PID and the waiter unblocks once
    // the killed process exits.
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(child.wait());
    });

    let wait_result = match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => {
            kill_process(child_pid);
            let seconds = timeout.as_secs();
            tracing::warn!(tool, seconds, "scanner timed out");
            return Err(GuardrailError::ScanTimeout {
                tool: tool.to_string(),
                seconds,
            });
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    match wait_result {
        Ok(status) if !status.success() => {
            tracing::debug!(tool, code = ?status.code(), stderr = %stderr, "scanner exited non-zero");
        }
        Ok(_) => {}
        Err(e) => return Err(GuardrailError::ScannerSpawnFailed(format!("{tool}: wait failed: {e}"))),
    }

    Ok(stdout)
}

/// Terminate a process by PID using SIGKILL. Best-effort.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandit_args_place_targets_before_format() {
        let args = scanner_args("bandit", &["src/".to_string(), "app/".to_string()]).unwrap();
        assert_eq!(args, vec!["-r", "src/", "app/", "-f", "json", "-q"]);
    }

    #[test]
    fn semgrep_and_trufflehog_append_targets() {
        let args = scanner_args("semgrep", &["src/".to_string()]).unwrap();
        assert_eq!(args, vec!["scan", "--json", "--quiet", "src/"]);

        let args = scanner_args("trufflehog", &["src/".to_string()]).unwrap();
        assert_eq!(args, vec!["filesystem", "--json", "src/"]);
    }

    #[test]
    fn pip_audit_ignores_paths() {
        let args = scanner_args("pip-audit", &["src/".to_string()]).unwrap();
        assert_eq!(args, vec!["-f", "json"]);
    }

    #[test]
    fn unknown_tool_is_unsupported() {
        let err = scanner_args("grype", &[]).unwrap_err();
        assert!(matches!(err, GuardrailError::UnsupportedTool(_)));

        let err = run_scanner(
            "grype",
            &[],
            Path::new("."),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, GuardrailError::UnsupportedTool(_)));
    }
}
