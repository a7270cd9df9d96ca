//! Logging bootstrap

/// Initialize the global logger
///
/// `RUST_LOG` takes precedence over `level` when it is set. Calling this more
/// than once is harmless; later calls are ignored.
///
/// # Parameters
///
/// * `level` - Default log level (error, warn, info, debug, trace)
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice() {
        // The global logger can only be installed once per process.
        init_logger("debug");
        init_logger("info");
    }
}
