use crate::severity::LogSeverity;
use crate::time::now;
use once_cell::sync::OnceCell;

static MIN_SEVERITY: OnceCell<LogSeverity> = OnceCell::new();

/// Sets the process-wide minimum severity. Only the first call takes effect;
/// returns whether this call was the one that set it.
pub fn init(min_severity: LogSeverity) -> bool {
    MIN_SEVERITY.set(min_severity).is_ok()
}

/// Whether a message of this severity would be printed.
pub fn enabled(log_severity: LogSeverity) -> bool {
    log_severity >= *MIN_SEVERITY.get().unwrap_or(&LogSeverity::Info)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if enabled(log_severity) {
        println!("[{}] {} {}", log_severity, now(), msg);
    }
}
