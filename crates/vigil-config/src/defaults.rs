use crate::logging::LogFormat;

/// Platform null device used when a standard stream is not redirected.
pub const NULL_DEVICE: &str = "/dev/null";

/// Default log filter expression used by the binaries.
///
/// The controlling CLI shares its error stream with the operator, so only
/// warnings and errors are shown unless the filter is raised.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Directory name nested under the runtime directory for derived pid files.
pub const RUNTIME_NAMESPACE: &str = "vigil";

/// Extension appended to derived pid file names.
pub const PID_FILE_EXTENSION: &str = "pid";

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
