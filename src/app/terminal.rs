//! Terminal capabilities and tracing setup.

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(
    no_color_flag: bool,
    no_color_env: bool,
    dumb_terminal: bool,
) -> bool {
    no_color_flag || no_color_env || dumb_terminal
}

pub(crate) fn should_show_progress(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Picks the default log level: `-q` > `-v` > config verbosity > `info`.
///
/// `RUST_LOG` still wins over the returned level in [`init_tracing`].
pub(crate) fn default_log_level(quiet: bool, verbose: u8, config_level: Option<&str>) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => config_level.unwrap_or("info").to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

pub(crate) fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level_priority() {
        assert_eq!(default_log_level(true, 2, Some("debug")), "error");
        assert_eq!(default_log_level(false, 1, Some("error")), "debug");
        assert_eq!(default_log_level(false, 3, None), "trace");
        assert_eq!(default_log_level(false, 0, Some("error")), "error");
        assert_eq!(default_log_level(false, 0, None), "info");
    }

    #[test]
    fn test_should_disable_color_any_signal() {
        assert!(should_disable_color(true, false, false));
        assert!(should_disable_color(false, true, false));
        assert!(should_disable_color(false, false, true));
        assert!(!should_disable_color(false, false, false));
    }

    #[test]
    fn test_should_show_progress_requires_interactive_stderr() {
        assert!(should_show_progress(true, false, false));
        assert!(!should_show_progress(false, false, false));
        assert!(!should_show_progress(true, true, false));
        assert!(!should_show_progress(true, false, true));
    }
}
