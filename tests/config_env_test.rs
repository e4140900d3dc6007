//! 配置环境变量覆盖测试（独立进程，避免与其他测试共享环境变量）

#[cfg(test)]
mod tests {
    use brahman::config::{load_config, reload_config};

    #[test]
    fn test_env_overrides_file() {
        std::env::set_var("BRAHMAN__RUNTIME__MAX_NESTING_DEPTH", "3");
        std::env::set_var("BRAHMAN__LOGGING__FILTER", "warn");

        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.runtime.max_nesting_depth, 3);
        assert_eq!(cfg.logging.filter, "warn");
        assert_eq!(cfg.runtime.start_zone_field, "start_zone");

        std::env::remove_var("BRAHMAN__RUNTIME__MAX_NESTING_DEPTH");
        std::env::remove_var("BRAHMAN__LOGGING__FILTER");

        let cfg = reload_config().unwrap();
        assert_eq!(cfg.runtime.max_nesting_depth, 8);
        assert_eq!(cfg.logging.filter, "info");
    }
}
