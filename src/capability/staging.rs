//! Staging of helper executables into a volatile directory.
//!
//! Destructors may wipe the filesystem that holds the tools they invoke, so
//! each tool is copied into a RAM-backed directory before the countdown is
//! armed. Destructive invocations only ever reference the staged copy.
//!
//! # Design Decisions
//! - Copies land in a private (0700) per-run directory under the staging
//!   root, created on first use; the root itself may be world-writable
//! - Each copy gets a unique `<n>-<basename>` name and is created with
//!   `create_new`, so nothing pre-existing is ever opened or followed

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Preferred staging directory (tmpfs on Linux).
pub const DEFAULT_STAGING_DIR: &str = "/dev/shm";

const RUN_DIR_PREFIX: &str = "deadswitch-";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("`{program}` not found in PATH")]
    NotFound { program: String },

    #[error("staging directory {dir:?} is unusable: {source}")]
    Directory { dir: PathBuf, source: io::Error },

    #[error("failed to copy {src:?} to {dst:?}: {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        source: io::Error,
    },

    #[error("failed to make {path:?} executable: {source}")]
    Permissions { path: PathBuf, source: io::Error },
}

/// A helper executable copied into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTool {
    /// Program name as configured.
    pub program: String,
    /// Where it was found on disk.
    pub origin: PathBuf,
    /// The staged copy; the only path destructive code may execute.
    pub path: PathBuf,
}

/// Copies helper executables into a private directory under `root`.
#[derive(Debug)]
pub struct StagingCopier {
    root: PathBuf,
    run_dir: Mutex<Option<PathBuf>>,
    staged: AtomicUsize,
}

impl StagingCopier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            run_dir: Mutex::new(None),
            staged: AtomicUsize::new(0),
        }
    }

    /// `/dev/shm` when it exists, the OS temp dir otherwise.
    pub fn default_dir() -> PathBuf {
        let shm = Path::new(DEFAULT_STAGING_DIR);
        if shm.is_dir() {
            shm.to_path_buf()
        } else {
            std::env::temp_dir()
        }
    }

    /// Resolve `program`, copy it into the run directory and mark it executable.
    pub fn stage(&self, program: &str) -> Result<StagedTool, StagingError> {
        let origin = lookup_executable(program).ok_or_else(|| StagingError::NotFound {
            program: program.to_string(),
        })?;

        let run_dir = self.run_dir()?;
        let base = origin
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(program));
        let index = self.staged.fetch_add(1, Ordering::Relaxed);
        let mut file_name = OsString::from(format!("{index}-"));
        file_name.push(base);
        let path = run_dir.join(file_name);

        copy_synced(&origin, &path).map_err(|source| StagingError::Copy {
            src: origin.clone(),
            dst: path.clone(),
            source,
        })?;
        make_executable(&path).map_err(|source| StagingError::Permissions {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            program = %program,
            origin = %origin.display(),
            staged = %path.display(),
            "Helper executable staged"
        );

        Ok(StagedTool {
            program: program.to_string(),
            origin,
            path,
        })
    }

    /// The private run directory, created on first call and kept for the
    /// life of the process.
    fn run_dir(&self) -> Result<PathBuf, StagingError> {
        let mut guard = match self.run_dir.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(dir) = guard.as_ref() {
            return Ok(dir.clone());
        }

        let dir_error = |source| StagingError::Directory {
            dir: self.root.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(dir_error)?;
        let dir = tempfile::Builder::new()
            .prefix(RUN_DIR_PREFIX)
            .tempdir_in(&self.root)
            .map_err(dir_error)?
            .keep();

        tracing::debug!(dir = %dir.display(), "Staging directory created");
        *guard = Some(dir.clone());
        Ok(dir)
    }
}

/// Resolve a program the way a shell would: paths are taken as-is,
/// bare names are searched in `PATH`.
pub fn lookup_executable(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

/// Copy into a file that must not exist yet; an existing entry at `dst`,
/// symlink or not, fails with `AlreadyExists`.
fn copy_synced(src: &Path, dst: &Path) -> io::Result<()> {
    let mut source = File::open(src)?;
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o700);
    }
    let mut dest = options.open(dst)?;
    io::copy(&mut source, &mut dest)?;
    dest.sync_all()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn stages_absolute_path_with_exec_bits() {
        let src_dir = tempfile::tempdir().unwrap();
        let stage_dir = tempfile::tempdir().unwrap();
        let tool = write_script(src_dir.path(), "wipe-helper", 0o700);

        let staged = StagingCopier::new(stage_dir.path())
            .stage(tool.to_str().unwrap())
            .unwrap();

        assert_eq!(staged.origin, tool);
        assert_eq!(staged.path.file_name().unwrap(), "0-wipe-helper");
        let mode = fs::metadata(&staged.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read(&staged.path).unwrap(), fs::read(&tool).unwrap());
    }

    #[test]
    fn copies_live_in_a_private_run_dir() {
        let src_dir = tempfile::tempdir().unwrap();
        let stage_dir = tempfile::tempdir().unwrap();
        let tool = write_script(src_dir.path(), "helper", 0o755);

        let staged = StagingCopier::new(stage_dir.path())
            .stage(tool.to_str().unwrap())
            .unwrap();

        let run_dir = staged.path.parent().unwrap();
        assert_eq!(run_dir.parent().unwrap(), stage_dir.path());
        assert!(run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(RUN_DIR_PREFIX));
        let mode = fs::metadata(run_dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn same_basename_tools_get_distinct_copies() {
        let src_dir = tempfile::tempdir().unwrap();
        let stage_dir = tempfile::tempdir().unwrap();
        fs::create_dir(src_dir.path().join("a")).unwrap();
        fs::create_dir(src_dir.path().join("b")).unwrap();
        let first = src_dir.path().join("a").join("wipe");
        let second = src_dir.path().join("b").join("wipe");
        fs::write(&first, "#!/bin/sh\necho A\n").unwrap();
        fs::write(&second, "#!/bin/sh\necho B\n").unwrap();
        for tool in [&first, &second] {
            fs::set_permissions(tool, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let copier = StagingCopier::new(stage_dir.path());
        let staged_a = copier.stage(first.to_str().unwrap()).unwrap();
        let staged_b = copier.stage(second.to_str().unwrap()).unwrap();

        assert_ne!(staged_a.path, staged_b.path);
        assert_eq!(staged_a.path.parent(), staged_b.path.parent());
        assert_eq!(fs::read_to_string(&staged_a.path).unwrap(), "#!/bin/sh\necho A\n");
        assert_eq!(fs::read_to_string(&staged_b.path).unwrap(), "#!/bin/sh\necho B\n");
    }

    #[test]
    fn planted_symlink_in_root_is_never_written() {
        let work = tempfile::tempdir().unwrap();
        let stage_dir = tempfile::tempdir().unwrap();
        let victim = work.path().join("victim.conf");
        fs::write(&victim, "keep me\n").unwrap();
        for name in ["sh", "0-sh"] {
            std::os::unix::fs::symlink(&victim, stage_dir.path().join(name)).unwrap();
        }

        let staged = StagingCopier::new(stage_dir.path()).stage("sh").unwrap();

        assert_eq!(fs::read_to_string(&victim).unwrap(), "keep me\n");
        assert!(!fs::symlink_metadata(&staged.path).unwrap().file_type().is_symlink());
        assert!(staged.path.parent().unwrap() != stage_dir.path());
    }

    #[test]
    fn copy_refuses_an_existing_destination() {
        let work = tempfile::tempdir().unwrap();
        let tool = write_script(work.path(), "helper", 0o755);
        let victim = work.path().join("victim.conf");
        fs::write(&victim, "keep me\n").unwrap();
        let link = work.path().join("link");
        std::os::unix::fs::symlink(&victim, &link).unwrap();

        let err = copy_synced(&tool, &link).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&victim).unwrap(), "keep me\n");
    }

    #[test]
    fn staged_copy_survives_original_removal() {
        let src_dir = tempfile::tempdir().unwrap();
        let stage_dir = tempfile::tempdir().unwrap();
        let tool = write_script(src_dir.path(), "helper", 0o755);

        let staged = StagingCopier::new(stage_dir.path())
            .stage(tool.to_str().unwrap())
            .unwrap();
        fs::remove_file(&tool).unwrap();

        assert!(staged.path.is_file());
    }

    #[test]
    fn creates_missing_staging_dir() {
        let src_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let tool = write_script(src_dir.path(), "helper", 0o755);

        let staged = StagingCopier::new(&nested).stage(tool.to_str().unwrap()).unwrap();
        assert!(staged.path.starts_with(&nested));
    }

    #[test]
    fn missing_program_is_an_error() {
        let stage_dir = tempfile::tempdir().unwrap();
        let err = StagingCopier::new(stage_dir.path())
            .stage("definitely-not-a-real-program-8c1f")
            .unwrap_err();
        assert!(matches!(err, StagingError::NotFound { .. }));
    }

    #[test]
    fn non_executable_path_is_not_found() {
        let src_dir = tempfile::tempdir().unwrap();
        let tool = write_script(src_dir.path(), "plain", 0o644);
        assert!(lookup_executable(tool.to_str().unwrap()).is_none());
    }

    #[test]
    fn finds_sh_in_path() {
        let found = lookup_executable("sh").expect("sh in PATH");
        assert!(found.is_absolute() || found.components().count() > 1);
    }
}
