//! Executable verification (smoke tests)
//!
//! Every declared executable is marked executable and run once with the
//! package's test arguments before anything is installed.

use std::fs;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::AddError;
use crate::package::{DistributionType, Package};

/// Add the execute bits (`u+x,g+x,o+x`) to `path`, keeping the rest of its mode.
///
/// # Errors
///
/// Returns an I/O error if the metadata cannot be read or written.
pub fn set_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        fs::metadata(path)?;
    }
    Ok(())
}

/// Smoke-test every executable of `package` unpacked at `root`.
///
/// Executables run in declaration order with `test_args` and detached
/// standard streams. Archive executables run with `root` as their working
/// directory. All of them run even after a failure; the result is their
/// logical AND and the first failure is the one reported.
///
/// # Errors
///
/// Returns [`AddError::ExecuteProcessFailed`] if any executable cannot be
/// spawned, exits unsuccessfully or outlives `timeout`.
pub fn execute(package: &Package, root: &Path, timeout: Option<Duration>) -> Result<(), AddError> {
    let mut first_failure = None;

    for entry in &package.executable_paths {
        let path = package.executable_location(root, entry);
        match run_one(package, root, &path, timeout) {
            Ok(()) => debug!(path = %path.display(), "smoke test passed"),
            Err(reason) => {
                warn!(path = %path.display(), %reason, "smoke test failed");
                first_failure.get_or_insert(AddError::ExecuteProcessFailed { path, reason });
            }
        }
    }

    first_failure.map_or(Ok(()), Err)
}

fn run_one(
    package: &Package,
    root: &Path,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<(), String> {
    set_executable(path).map_err(|e| format!("cannot mark executable: {e}"))?;

    let mut cmd = Command::new(path);
    cmd.args(&package.test_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if package.distribution != DistributionType::Binary {
        cmd.current_dir(root);
    }

    debug!(?cmd, "running smoke test");
    let mut child = cmd.spawn().map_err(|e| format!("failed to spawn: {e}"))?;

    let status = match timeout {
        None => child.wait().map_err(|e| e.to_string())?,
        Some(limit) => match child.wait_timeout(limit).map_err(|e| e.to_string())? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {limit:?}"));
            }
        },
    };

    check_status(status)
}

fn check_status(status: ExitStatus) -> Result<(), String> {
    if status.success() {
        Ok(())
    } else {
        Err(status.code().map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exited with status {code}"),
        ))
    }
}
