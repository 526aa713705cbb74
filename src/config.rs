use std::env;
use anyhow::{bail, Context, Result};

const DEFAULT_FANOUT_MAX_CONCURRENCY: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub environment: String,
    pub dynamodb_endpoint_url: Option<String>,
    pub bootstrap_table: bool,
    pub in_memory_store: bool,
    pub fanout_max_concurrency: usize,
    pub service_port: u16,
    pub service_host: String,
    pub lambda_runtime_api: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// `from_env` is the production entry point; tests pass a map so they
    /// never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table_name = lookup("TABLE_NAME")
            .filter(|value| !value.trim().is_empty())
            .context("TABLE_NAME environment variable is required")?;

        let environment = lookup("ENVIRONMENT")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "dev".to_string());

        let dynamodb_endpoint_url = lookup("DYNAMODB_ENDPOINT_URL")
            .filter(|value| !value.trim().is_empty());

        let bootstrap_table = match lookup("BOOTSTRAP_TABLE") {
            Some(value) => parse_flag(&value)
                .context("BOOTSTRAP_TABLE must be one of: true, false, 1, 0, yes, no, on, off")?,
            None => dynamodb_endpoint_url.is_some(),
        };

        let in_memory_store = match lookup("IN_MEMORY_STORE") {
            Some(value) => parse_flag(&value)
                .context("IN_MEMORY_STORE must be one of: true, false, 1, 0, yes, no, on, off")?,
            None => false,
        };

        let fanout_max_concurrency = match lookup("FANOUT_MAX_CONCURRENCY") {
            Some(value) => {
                let parsed = value
                    .trim()
                    .parse::<usize>()
                    .context("FANOUT_MAX_CONCURRENCY must be a positive integer")?;
                if parsed == 0 {
                    bail!("FANOUT_MAX_CONCURRENCY must be a positive integer, got 0");
                }
                parsed
            }
            None => DEFAULT_FANOUT_MAX_CONCURRENCY,
        };

        let service_port = lookup("SERVICE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = lookup("SERVICE_HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let lambda_runtime_api = lookup("AWS_LAMBDA_RUNTIME_API");

        Ok(Config {
            table_name,
            environment,
            dynamodb_endpoint_url,
            bootstrap_table,
            in_memory_store,
            fanout_max_concurrency,
            service_port,
            service_host,
            lambda_runtime_api,
        })
    }

    /// True when the process was started by the Lambda runtime.
    pub fn runs_on_lambda(&self) -> bool {
        self.lambda_runtime_api.is_some()
    }

    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        match self.environment.as_str() {
            "prod" => "warn",
            _ => "info",
        }
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Environment: {}", self.environment);
        if self.in_memory_store {
            tracing::info!("  Record store: in-memory (records are lost on exit)");
        }
        tracing::info!("  DynamoDB table: {}", self.table_name);
        tracing::info!("  DynamoDB endpoint: {}",
            self.dynamodb_endpoint_url.as_deref().unwrap_or("default (AWS)"));
        tracing::info!("  Table bootstrap: {}", if self.bootstrap_table { "enabled" } else { "disabled" });
        tracing::info!("  Fan-out concurrency: {}", self.fanout_max_concurrency);
        if self.runs_on_lambda() {
            tracing::info!("  Mode: lambda");
        } else {
            tracing::info!("  Mode: local server on {}:{}", self.service_host, self.service_port);
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        table_name: "SampleTable".to_string(),
        environment: "dev".to_string(),
        dynamodb_endpoint_url: None,
        bootstrap_table: false,
        in_memory_store: false,
        fanout_max_concurrency: DEFAULT_FANOUT_MAX_CONCURRENCY,
        service_port: 3000,
        service_host: "0.0.0.0".to_string(),
        lambda_runtime_api: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_with_all_vars() {
        let config = config_from(&[
            ("TABLE_NAME", "SampleTable"),
            ("ENVIRONMENT", "PROD"),
            ("DYNAMODB_ENDPOINT_URL", "http://localhost:8000"),
            ("BOOTSTRAP_TABLE", "no"),
            ("IN_MEMORY_STORE", "yes"),
            ("FANOUT_MAX_CONCURRENCY", "8"),
            ("SERVICE_PORT", "8080"),
            ("SERVICE_HOST", "127.0.0.1"),
            ("AWS_LAMBDA_RUNTIME_API", "127.0.0.1:9001"),
        ])
        .unwrap();

        assert_eq!(config.table_name, "SampleTable");
        assert_eq!(config.environment, "prod");
        assert_eq!(config.dynamodb_endpoint_url, Some("http://localhost:8000".to_string()));
        assert!(!config.bootstrap_table);
        assert!(config.in_memory_store);
        assert_eq!(config.fanout_max_concurrency, 8);
        assert_eq!(config.service_port, 8080);
        assert_eq!(config.service_host, "127.0.0.1");
        assert!(config.runs_on_lambda());
    }

    #[test]
    fn test_config_with_defaults() {
        let config = config_from(&[("TABLE_NAME", "SampleTable")]).unwrap();

        assert_eq!(config.environment, "dev");
        assert_eq!(config.dynamodb_endpoint_url, None);
        assert!(!config.bootstrap_table);
        assert!(!config.in_memory_store);
        assert_eq!(config.fanout_max_concurrency, 100);
        assert_eq!(config.service_port, 3000);
        assert_eq!(config.service_host, "0.0.0.0");
        assert!(!config.runs_on_lambda());
    }

    #[test]
    fn test_bootstrap_follows_endpoint_override() {
        let config = config_from(&[
            ("TABLE_NAME", "SampleTable"),
            ("DYNAMODB_ENDPOINT_URL", "http://localhost:8000"),
        ])
        .unwrap();

        assert!(config.bootstrap_table);
    }

    #[test]
    fn test_missing_table_name() {
        let error = config_from(&[("ENVIRONMENT", "dev")]).unwrap_err();
        assert!(error.to_string().contains("TABLE_NAME"));

        let error = config_from(&[("TABLE_NAME", "  ")]).unwrap_err();
        assert!(error.to_string().contains("TABLE_NAME"));
    }

    #[test]
    fn test_log_level_per_environment() {
        let prod = config_from(&[("TABLE_NAME", "t"), ("ENVIRONMENT", "prod")]).unwrap();
        assert_eq!(prod.default_log_level(), "warn");

        let dev = config_from(&[("TABLE_NAME", "t"), ("ENVIRONMENT", "dev")]).unwrap();
        assert_eq!(dev.default_log_level(), "info");

        let staging = config_from(&[("TABLE_NAME", "t"), ("ENVIRONMENT", "staging")]).unwrap();
        assert_eq!(staging.default_log_level(), "info");
    }

    #[test]
    fn test_invalid_fanout_concurrency() {
        let error = config_from(&[("TABLE_NAME", "t"), ("FANOUT_MAX_CONCURRENCY", "0")]).unwrap_err();
        assert!(error.to_string().contains("FANOUT_MAX_CONCURRENCY"));

        let error = config_from(&[("TABLE_NAME", "t"), ("FANOUT_MAX_CONCURRENCY", "many")]).unwrap_err();
        assert!(error.to_string().contains("FANOUT_MAX_CONCURRENCY"));
    }

    #[test]
    fn test_invalid_bootstrap_flag() {
        let error = config_from(&[("TABLE_NAME", "t"), ("BOOTSTRAP_TABLE", "maybe")]).unwrap_err();
        assert!(error.to_string().contains("BOOTSTRAP_TABLE"));
    }

    #[test]
    fn test_invalid_port() {
        let error = config_from(&[("TABLE_NAME", "t"), ("SERVICE_PORT", "not-a-number")]).unwrap_err();
        assert!(error.to_string().contains("SERVICE_PORT"));
    }

    #[test]
    fn test_port_out_of_range() {
        let result = config_from(&[("TABLE_NAME", "t"), ("SERVICE_PORT", "99999")]);
        assert!(result.is_err());
    }
}
