use super::*;

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            password: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            accept_invalid_certs: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            console_output: true,
            json_format: false,
            backup_count: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}
