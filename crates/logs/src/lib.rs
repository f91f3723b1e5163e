/// Log macros that forward to `tracing` and compile down to nothing when the
/// matching feature is off, so server hot paths carry no logging cost in
/// stripped builds.

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {
        if cfg!(feature = "log_info") {
            tracing::info!($($t)*);
        }
    };
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {
        if cfg!(feature = "log_warnings") {
            tracing::warn!($($t)*);
        }
    };
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {
        if cfg!(feature = "log_debug") {
            tracing::debug!($($t)*);
        }
    };
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {
        if cfg!(feature = "log_errors") {
            tracing::error!($($t)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn should_emit_enabled_levels() {
        info!("bound listener on {}", 8080);
        warn!("maxport below port");
        error!("bind failed: {:?}", "address in use");

        assert!(logs_contain("bound listener on 8080"));
        assert!(logs_contain("maxport below port"));
        assert!(logs_contain("bind failed"));
    }

    #[test]
    #[traced_test]
    fn should_compile_out_disabled_levels() {
        debug!("accept loop tick");

        assert!(!logs_contain("accept loop tick"));
    }
}
