//! Artifact discovery over prioritized candidate paths

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use farmgate_core::{GatewayError, GatewayResult};
use tracing::debug;

/// Resolve a candidate against the workspace root
fn rooted(root: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

/// A bare command name such as `python3`, to be looked up through `PATH`
pub fn is_bare_command(candidate: &Path) -> bool {
    let s = candidate.to_string_lossy();
    !s.is_empty() && !s.contains(['/', '\\'])
}

/// Return the first candidate file that exists.
///
/// Fails with `ConfigurationError` listing every searched path.
pub fn find_artifact(root: &Path, candidates: &[PathBuf], what: &str) -> GatewayResult<PathBuf> {
    for candidate in candidates {
        let path = rooted(root, candidate);
        if path.is_file() {
            debug!(artifact = what, path = %path.display(), "Found artifact");
            return Ok(path);
        }
    }

    let searched: Vec<String> = candidates
        .iter()
        .map(|c| rooted(root, c).display().to_string())
        .collect();
    Err(GatewayError::ConfigurationError(format!(
        "{} not found (searched: {})",
        what,
        searched.join(", ")
    )))
}

/// Pick the interpreter: the first candidate that can be located. Paths are
/// resolved against the workspace root, bare command names through `PATH`.
pub fn find_interpreter(root: &Path, candidates: &[PathBuf]) -> Option<PathBuf> {
    let search_path = std::env::var_os("PATH");
    find_interpreter_in(root, candidates, search_path.as_deref())
}

fn find_interpreter_in(
    root: &Path,
    candidates: &[PathBuf],
    search_path: Option<&OsStr>,
) -> Option<PathBuf> {
    candidates.iter().find_map(|candidate| {
        if is_bare_command(candidate) {
            on_search_path(candidate, search_path)
        } else {
            let path = rooted(root, candidate);
            path.is_file().then_some(path)
        }
    })
}

fn on_search_path(command: &Path, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let found = std::env::split_paths(search_path?)
        .map(|dir| dir.join(command))
        .find(|path| path.is_file());
    if found.is_none() {
        debug!(command = %command.display(), "Interpreter not on PATH");
    }
    found
}
