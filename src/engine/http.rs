//! Blocking HTTP client for the engine's JSON control API.
//!
//! The engine serves views and actions under `/JSON/<component>/...` and
//! raw report renderings under `/OTHER/core/other/...`. Numeric values come
//! back as JSON strings ("status": "57"), so responses are decoded into a
//! generic `Value` and converted at the edge.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use super::{EngineClient, Finding, Rule};
use crate::error::{Result, ScanError};

pub struct HttpEngineClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl HttpEngineClient {
    /// Build a client for an engine listening on the given local port.
    pub fn new(port: u16) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base: format!("http://127.0.0.1:{}", port),
            http,
        })
    }

    fn call(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/JSON/{}", self.base, path);
        trace!(%url, "engine API call");
        let resp = self.http.get(&url).query(query).send()?.error_for_status()?;
        Ok(resp.json()?)
    }

    fn call_raw(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/OTHER/{}", self.base, path);
        trace!(%url, "engine API call (raw)");
        let resp = self.http.get(&url).send()?.error_for_status()?;
        Ok(resp.bytes()?.to_vec())
    }
}

/// Pull a string-or-number field out of an API response and parse it.
fn numeric_field<T: std::str::FromStr>(value: &Value, key: &str) -> Result<T> {
    let field = &value[key];
    let text = match field {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(ScanError::Protocol(format!(
                "missing or non-numeric field '{}' in {}",
                key, value
            )))
        }
    };
    text.parse()
        .map_err(|_| ScanError::Protocol(format!("field '{}' not parseable: {}", key, text)))
}

fn string_field(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

impl EngineClient for HttpEngineClient {
    fn probe_ready(&self) -> bool {
        match self.call("core/view/version/", &[]) {
            Ok(v) => {
                debug!(version = %string_field(&v, "version"), "engine is up");
                true
            }
            Err(e) => {
                trace!(error = %e, "engine not ready yet");
                false
            }
        }
    }

    fn open(&self, target: &str) -> Result<()> {
        self.call("core/action/accessUrl/", &[("url", target)])?;
        Ok(())
    }

    fn start_crawl(&self, target: &str) -> Result<String> {
        let v = self.call("spider/action/scan/", &[("url", target)])?;
        match &v["scan"] {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(ScanError::Protocol(format!(
                "crawl start returned no scan handle: {}",
                v
            ))),
        }
    }

    fn crawl_progress(&self, handle: &str) -> Result<u8> {
        let v = self.call("spider/view/status/", &[("scanId", handle)])?;
        numeric_field(&v, "status")
    }

    fn passive_backlog(&self) -> Result<u64> {
        let v = self.call("pscan/view/recordsToScan/", &[])?;
        numeric_field(&v, "recordsToScan")
    }

    fn list_findings(&self) -> Result<Vec<Finding>> {
        let v = self.call("core/view/alerts/", &[])?;
        let alerts = v["alerts"]
            .as_array()
            .ok_or_else(|| ScanError::Protocol("alert list missing from response".into()))?;
        Ok(alerts
            .iter()
            .map(|a| Finding {
                rule_id: string_field(a, "pluginId"),
                title: string_field(a, "alert"),
                target_url: string_field(a, "url"),
                raw: a.clone(),
            })
            .collect())
    }

    fn list_rules(&self) -> Result<Vec<Rule>> {
        let v = self.call("pscan/view/scanners/", &[])?;
        let scanners = v["scanners"]
            .as_array()
            .ok_or_else(|| ScanError::Protocol("scanner list missing from response".into()))?;
        Ok(scanners
            .iter()
            .map(|s| Rule {
                rule_id: string_field(s, "id"),
                display_name: string_field(s, "name"),
            })
            .collect())
    }

    fn visited_urls(&self) -> Result<Vec<String>> {
        let v = self.call("core/view/urls/", &[])?;
        let urls = v["urls"]
            .as_array()
            .ok_or_else(|| ScanError::Protocol("url list missing from response".into()))?;
        Ok(urls
            .iter()
            .filter_map(|u| u.as_str().map(str::to_string))
            .collect())
    }

    fn render_html_report(&self) -> Result<Vec<u8>> {
        self.call_raw("core/other/htmlreport/")
    }

    fn render_xml_report(&self) -> Result<Vec<u8>> {
        self.call_raw("core/other/xmlreport/")
    }

    fn shutdown(&self) -> Result<()> {
        self.call("core/action/shutdown/", &[])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn numeric_field_accepts_string_encoded_numbers() {
        let v = json!({"status": "57"});
        let n: u8 = numeric_field(&v, "status").unwrap();
        assert_eq!(n, 57);
    }

    #[test]
    fn numeric_field_accepts_plain_numbers() {
        let v = json!({"recordsToScan": 0});
        let n: u64 = numeric_field(&v, "recordsToScan").unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn numeric_field_rejects_missing_key() {
        let v = json!({"other": "1"});
        let r: Result<u8> = numeric_field(&v, "status");
        assert!(r.is_err());
    }
}
