//! Standard stream redirection targets for a detached daemon.
//!
//! Each target is an independent filesystem path. The input target is opened
//! read-only; the output and error targets are opened for appending so
//! repeated start cycles accumulate into the same files.

use camino::{Utf8Path, Utf8PathBuf};

use crate::defaults::NULL_DEVICE;

/// Redirection targets for the daemon's standard input, output, and error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRedirection {
    stdin: Utf8PathBuf,
    stdout: Utf8PathBuf,
    stderr: Utf8PathBuf,
}

impl Default for StreamRedirection {
    fn default() -> Self {
        Self {
            stdin: Utf8PathBuf::from(NULL_DEVICE),
            stdout: Utf8PathBuf::from(NULL_DEVICE),
            stderr: Utf8PathBuf::from(NULL_DEVICE),
        }
    }
}

impl StreamRedirection {
    /// Builds a redirection from explicit targets.
    #[must_use]
    pub fn new(
        stdin: impl Into<Utf8PathBuf>,
        stdout: impl Into<Utf8PathBuf>,
        stderr: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            stdin: stdin.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Replaces the input source.
    #[must_use]
    pub fn with_stdin(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.stdin = path.into();
        self
    }

    /// Replaces the output target.
    #[must_use]
    pub fn with_stdout(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.stdout = path.into();
        self
    }

    /// Replaces the error target.
    #[must_use]
    pub fn with_stderr(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.stderr = path.into();
        self
    }

    /// Input source, opened read-only.
    #[must_use]
    pub fn stdin(&self) -> &Utf8Path {
        &self.stdin
    }

    /// Output target, opened for appending.
    #[must_use]
    pub fn stdout(&self) -> &Utf8Path {
        &self.stdout
    }

    /// Error target, opened for appending.
    #[must_use]
    pub fn stderr(&self) -> &Utf8Path {
        &self.stderr
    }

    /// Anchors relative targets at `base`, leaving absolute targets untouched.
    #[must_use]
    pub fn anchored_at(&self, base: &Utf8Path) -> Self {
        Self {
            stdin: anchor(base, &self.stdin),
            stdout: anchor(base, &self.stdout),
            stderr: anchor(base, &self.stderr),
        }
    }
}

fn anchor(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
