use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::transport::Transport;

static NEXT_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script id="__NEXT_DATA__" type="application/json">(.*?)</script>"#)
        .expect("valid __NEXT_DATA__ regex")
});

/// Pull `buildId` out of the `__NEXT_DATA__` blob of a Next.js page.
pub fn extract_build_id(html: &str) -> Option<String> {
    let caps = NEXT_DATA.captures(html)?;
    let data: serde_json::Value = serde_json::from_str(caps.get(1)?.as_str()).ok()?;
    data.get("buildId")?.as_str().map(|s| s.to_string())
}

/// Fetch `page_url` and return the deployment build id it advertises.
pub async fn resolve_build_id(transport: &dyn Transport, page_url: &str) -> anyhow::Result<String> {
    tracing::debug!(page_url, "resolving build id");
    let outcome = transport
        .fetch(page_url)
        .await
        .with_context(|| format!("fetching {}", page_url))?;
    extract_build_id(&outcome.body)
        .ok_or_else(|| anyhow!("no buildId in {} (status {})", page_url, outcome.status_line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_build_id() {
        let html = r#"<html><script id="__NEXT_DATA__" type="application/json">
            {"props":{},"page":"/search","buildId":"OJefluvpw_53_FSTVIQCT"}
        </script></html>"#;
        assert_eq!(extract_build_id(html).as_deref(), Some("OJefluvpw_53_FSTVIQCT"));
    }

    #[test]
    fn missing_or_broken_blob() {
        assert!(extract_build_id("<html></html>").is_none());
        let broken = r#"<script id="__NEXT_DATA__" type="application/json">{not json</script>"#;
        assert!(extract_build_id(broken).is_none());
        let no_id = r#"<script id="__NEXT_DATA__" type="application/json">{"page":"/"}</script>"#;
        assert!(extract_build_id(no_id).is_none());
    }
}
