//! Post-commit hook that keeps a repository's devlog current.

use crate::error::{Error, Result};
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};

/// Set this in the environment to make the hook do nothing.
pub const SKIP_HOOK_ENV: &str = "GITJOURNAL_SKIP_HOOK";

const MARKER: &str = "# Installed by gitjournal.";

/// Script body for the hook of the repository at `repo_path`.
pub fn script(repo_path: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         {MARKER} Regenerates the devlog after each commit.\n\
         [ -n \"${SKIP_HOOK_ENV}\" ] && exit 0\n\
         command -v gitjournal >/dev/null 2>&1 || exit 0\n\
         gitjournal hook --path {} || true\n",
        shell_quote(&repo_path.to_string_lossy())
    )
}

/// Write the post-commit hook for the repository at `repo_path` and return
/// its location. A hook we installed earlier is replaced; any other hook is
/// left alone and reported as [`Error::HookConflict`].
pub fn install(repo_path: &Path) -> Result<PathBuf> {
    let repo =
        Repository::open(repo_path).map_err(|_| Error::NotAGitRepository(repo_path.to_path_buf()))?;
    let workdir = repo.workdir().unwrap_or(repo_path).to_path_buf();
    let hook = repo.path().join("hooks").join("post-commit");

    if let Ok(existing) = fs::read_to_string(&hook) {
        if !existing.contains(MARKER) {
            return Err(Error::HookConflict(hook));
        }
    }

    if let Some(parent) = hook.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&hook, script(&workdir))?;
    make_executable(&hook)?;

    tracing::info!("Installed post-commit hook at {:?}", hook);
    Ok(hook)
}

/// Whether the repository at `repo_path` carries our hook.
pub fn is_installed(repo_path: &Path) -> bool {
    Repository::open(repo_path)
        .ok()
        .and_then(|repo| fs::read_to_string(repo.path().join("hooks").join("post-commit")).ok())
        .is_some_and(|content| content.contains(MARKER))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_script_honours_skip_variable() {
        let script = script(Path::new("/work/it's here"));

        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("[ -n \"$GITJOURNAL_SKIP_HOOK\" ] && exit 0"));
        assert!(script.contains("gitjournal hook --path '/work/it'\\''s here'"));
    }

    #[test]
    fn test_install_and_reinstall() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();

        assert!(!is_installed(dir.path()));
        let hook = install(dir.path()).unwrap();
        assert!(hook.ends_with("hooks/post-commit"));
        assert!(is_installed(dir.path()));

        // Ours, so replacing it is fine.
        install(dir.path()).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&hook).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_foreign_hook_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let hook = repo.path().join("hooks").join("post-commit");
        fs::create_dir_all(hook.parent().unwrap()).unwrap();
        fs::write(&hook, "#!/bin/sh\necho mine\n").unwrap();

        assert!(matches!(install(dir.path()), Err(Error::HookConflict(_))));
        assert_eq!(fs::read_to_string(&hook).unwrap(), "#!/bin/sh\necho mine\n");
    }

    #[test]
    fn test_install_outside_repository() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(install(dir.path()), Err(Error::NotAGitRepository(_))));
    }
}
