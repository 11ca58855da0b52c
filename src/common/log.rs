//! Logger initialisation

/// Initialise the global logger
///
/// `RUST_LOG` wins when set; otherwise `level` is used as the filter.
/// Calling this more than once is harmless: later calls are ignored.
///
/// # Parameters
///
/// * `level` - Fallback log level (error, warn, info, debug, trace)
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .try_init();
}
