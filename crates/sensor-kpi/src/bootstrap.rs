use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log-level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`) to a
/// tracing filter directive. Unknown names pass through lower-cased.
pub fn normalize_log_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Falls back to `"info"` if the level string is not a valid directive.
/// Logs go to stderr so stdout carries only the report.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalize_log_level(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_log_level_cli_names() {
        assert_eq!(normalize_log_level("DEBUG"), "debug");
        assert_eq!(normalize_log_level("INFO"), "info");
        assert_eq!(normalize_log_level("WARNING"), "warn");
        assert_eq!(normalize_log_level("ERROR"), "error");
    }

    #[test]
    fn test_normalize_log_level_case_insensitive() {
        assert_eq!(normalize_log_level("warning"), "warn");
        assert_eq!(normalize_log_level("Debug"), "debug");
    }

    #[test]
    fn test_normalize_log_level_passthrough() {
        assert_eq!(normalize_log_level("TRACE"), "trace");
        assert!(EnvFilter::try_new(normalize_log_level("TRACE")).is_ok());
    }
}
