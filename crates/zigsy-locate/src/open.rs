use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread::JoinHandle;

use tracing::{debug, info};

use zigsy_core::error::{Result, ZigsyError};

#[cfg(windows)]
const FILE_MANAGER: &str = "explorer";
#[cfg(target_os = "macos")]
const FILE_MANAGER: &str = "open";
#[cfg(not(any(windows, target_os = "macos")))]
const FILE_MANAGER: &str = "xdg-open";

/// Open the platform file manager at `path`. A file path opens its parent.
///
/// The file manager is spawned and left running; returns the folder that was
/// opened.
pub fn open_folder(path: &Path) -> Result<PathBuf> {
    let folder = resolve_folder(path)?;
    launch(FILE_MANAGER, &folder)?;
    info!(folder = %folder.display(), "Opened file manager");
    Ok(folder)
}

/// Spawn `program` on `folder` and reap it on a detached thread.
fn launch(program: &str, folder: &Path) -> Result<JoinHandle<()>> {
    let mut child = Command::new(program)
        .arg(folder)
        .spawn()
        .map_err(|e| ZigsyError::Io(std::io::Error::new(e.kind(), format!("{}: {}", program, e))))?;

    let program = program.to_string();
    let reaper = std::thread::Builder::new()
        .name("zigsy-open-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!(program = %program, %status, "File manager exited"),
            Err(e) => debug!(program = %program, error = %e, "File manager wait failed"),
        })?;
    Ok(reaper)
}

fn resolve_folder(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let cleaned = PathBuf::from(raw.trim().trim_matches(|c| c == '"' || c == '\''));

    let folder = if cleaned.is_file() {
        cleaned
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cleaned.clone())
    } else {
        cleaned
    };

    if !folder.exists() {
        return Err(ZigsyError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not find '{}'.", folder.display()),
        )));
    }
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_resolves_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(resolve_folder(&file).unwrap(), dir.path());
    }

    #[test]
    fn test_quoted_folder_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let quoted = PathBuf::from(format!("\"{}\"", dir.path().display()));
        assert_eq!(resolve_folder(&quoted).unwrap(), dir.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_launched_process_is_reaped() {
        let dir = tempfile::tempdir().unwrap();
        let reaper = launch("true", dir.path()).unwrap();
        reaper.join().unwrap();
    }

    #[test]
    fn test_missing_program_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = launch("zigsy-no-such-file-manager", dir.path()).unwrap_err();
        assert!(matches!(err, ZigsyError::Io(_)));
        assert!(err.to_string().contains("zigsy-no-such-file-manager"));
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(resolve_folder(&missing), Err(ZigsyError::Io(_))));
    }
}
