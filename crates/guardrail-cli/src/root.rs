use std::path::{Path, PathBuf};

/// Resolve the guardrail root directory.
///
/// Priority:
/// 1. `--root` flag / `GUARDRAIL_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.guardrail/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    for marker in [".guardrail", ".git"] {
        let mut dir = cwd.clone();
        loop {
            if dir.join(marker).is_dir() {
                return dir;
            }
            match dir.parent() {
                Some(p) => dir = p.to_path_buf(),
                None => break,
            }
        }
    }

    cwd
}
