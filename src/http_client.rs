use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::config::ProbeConfig;

/// Build the header map sent with every probe from the configured pairs.
pub fn build_headers(config: &ProbeConfig) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in config.effective_headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name '{}'", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("invalid value for header '{}'", name))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Create the probe client: one pooled client shared by every worker.
pub fn create_probe_client(config: &ProbeConfig) -> anyhow::Result<Client> {
    let headers = build_headers(config)?;
    ClientBuilder::new()
        // Connection pooling - one idle slot per concurrent worker
        .pool_max_idle_per_host(config.concurrency_limit)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_nodelay(true)

        // Timeouts
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(5))

        // Compression
        .gzip(true)
        .brotli(true)

        .use_rustls_tls()
        .default_headers(headers)

        // Certificate validation stays off unless --verify-tls
        .danger_accept_invalid_certs(!config.verify_tls)

        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let cfg = ProbeConfig::default();
        assert!(create_probe_client(&cfg).is_ok());
    }

    #[test]
    fn test_headers_from_config() {
        let cfg = ProbeConfig::default();
        let headers = build_headers(&cfg).unwrap();
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "cors");
        assert_eq!(headers.len(), cfg.headers.len());
    }

    #[test]
    fn test_foreign_host_header_is_not_sent() {
        let cfg = ProbeConfig {
            url_template: "https://example.org/data?l={i}".to_string(),
            ..Default::default()
        };
        let headers = build_headers(&cfg).unwrap();
        assert!(headers.get("host").is_none());
        assert_eq!(headers.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let mut cfg = ProbeConfig::default();
        cfg.headers.insert("X-Bad".to_string(), "line\nbreak".to_string());
        assert!(build_headers(&cfg).is_err());
    }
}
