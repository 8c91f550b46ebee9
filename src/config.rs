use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use once_cell::sync::Lazy;
use serde::Deserialize;
use url::Url;

/// Placeholder substituted with the probed integer.
pub const TARGET_PLACEHOLDER: &str = "{i}";
/// Placeholder substituted with the resolved Next.js build id.
pub const BUILD_ID_PLACEHOLDER: &str = "{build_id}";

/// Browser-like header set sent with every probe.
pub static DEFAULT_HEADERS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("Host", "www.propertyfinder.ae"),
        ("X-Nextjs-Data", "1"),
        ("Sec-Ch-Ua-Platform", "\"Linux\""),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Sec-Ch-Ua", "\"Not)A;Brand\";v=\"8\", \"Chromium\";v=\"138\""),
        ("User-Agent", "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36"),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Accept", "*/*"),
        ("Sec-Fetch-Site", "same-origin"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Dest", "empty"),
        ("Priority", "u=1, i"),
    ]
});

/// Everything a probe run needs. Loaded from defaults, then an optional JSON
/// file, then CLI overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub range_start: u64,
    pub range_end: u64,
    pub concurrency_limit: usize,
    pub url_template: String,
    pub match_pattern: String,
    pub label_prefix: String,
    pub label_suffix: String,
    pub expected_status: u16,
    /// Exact number of pattern occurrences that counts as a match.
    pub expected_count: usize,
    pub timeout_secs: u64,
    pub verify_tls: bool,
    pub build_id: Option<String>,
    /// Page fetched to discover the build id when the template needs one.
    pub build_id_page: String,
    pub headers: BTreeMap<String, String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            range_start: 1,
            range_end: 8,
            concurrency_limit: 20,
            url_template: "https://www.propertyfinder.ae/search/_next/data/{build_id}/en/search.json?l={i}&c=2&fu=0&rp=y&ob=mr".to_string(),
            match_pattern: r#"{"title":"Properties for rent"#.to_string(),
            label_prefix: r#"{"title":"Properties for rent "#.to_string(),
            label_suffix: r#"","path":""#.to_string(),
            expected_status: 200,
            expected_count: 2,
            timeout_secs: 10,
            verify_tls: false,
            build_id: None,
            build_id_page: "https://www.propertyfinder.ae/search/_next/data/v/en/search.json?l=1&c=2&fu=0&rp=y&ob=mr".to_string(),
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ProbeConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: ProbeConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.range_start > self.range_end {
            bail!("range start {} is greater than range end {}", self.range_start, self.range_end);
        }
        if self.concurrency_limit == 0 {
            bail!("concurrency limit must be at least 1");
        }
        if self.match_pattern.is_empty() {
            bail!("match pattern must not be empty");
        }
        if !self.url_template.contains(TARGET_PLACEHOLDER) {
            bail!("url template must contain {}", TARGET_PLACEHOLDER);
        }
        if self.expected_count == 0 {
            bail!("expected match count must be at least 1");
        }
        if self.range_end.checked_sub(self.range_start) == Some(u64::MAX) {
            bail!("range {}..={} has more values than can be counted", self.range_start, self.range_end);
        }
        Ok(())
    }

    pub fn needs_build_id(&self) -> bool {
        self.url_template.contains(BUILD_ID_PLACEHOLDER)
    }

    pub fn targets(&self) -> std::ops::RangeInclusive<u64> {
        self.range_start..=self.range_end
    }

    pub fn target_count(&self) -> u64 {
        self.range_end
            .saturating_sub(self.range_start)
            .saturating_add(1)
    }

    /// Host the url template points at, if the template parses as a url.
    pub fn template_host(&self) -> Option<String> {
        let url = Url::parse(&self.url_for(0)).ok()?;
        url.host_str().map(|h| h.to_string())
    }

    /// Configured headers minus a `Host` that names a different host than the
    /// url template, which would misroute every request.
    pub fn effective_headers(&self) -> Vec<(&str, &str)> {
        let host = self.template_host();
        self.headers
            .iter()
            .filter(|(name, value)| {
                if !name.eq_ignore_ascii_case("host") {
                    return true;
                }
                let Some(host) = host.as_deref() else { return true };
                let value_host = value.rsplit_once(':').map_or(value.as_str(), |(h, _)| h);
                let keep = value_host.eq_ignore_ascii_case(host);
                if !keep {
                    tracing::debug!(header = %value, template_host = host, "dropping mismatched Host header");
                }
                keep
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    pub fn url_for(&self, target: u64) -> String {
        let url = self.url_template.replace(TARGET_PLACEHOLDER, &target.to_string());
        match &self.build_id {
            Some(id) => url.replace(BUILD_ID_PLACEHOLDER, id),
            None => url,
        }
    }

    /// Apply a `Name: value` header override; an empty value removes the header.
    pub fn set_header(&mut self, raw: &str) -> anyhow::Result<()> {
        let (name, value) = raw
            .split_once(':')
            .with_context(|| format!("header '{}' is not in 'Name: value' form", raw))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("header '{}' has an empty name", raw);
        }
        let value = value.trim();
        // case-insensitive replace so `-H user-agent:` overrides the default
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        if !value.is_empty() {
            self.headers.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }
}
