// 🩺 Backend Health Probe - One GET, one verdict
// Whatever goes wrong (refused, timeout, garbage body) collapses to the
// same Disconnected display; the detail goes to stderr

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use crate::config::Settings;

const PROBE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Reached the backend; holds the reported status string
    Connected(String),

    Disconnected,
}

impl BackendStatus {
    pub fn display(&self) -> String {
        match self {
            BackendStatus::Connected(status) => format!("Backend: {}", status),
            BackendStatus::Disconnected => "Backend: Disconnected".to_string(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, BackendStatus::Connected(_))
    }
}

pub struct HealthProbe {
    url: String,
}

impl HealthProbe {
    pub fn new(url: &str) -> Self {
        HealthProbe {
            url: url.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.health_url)
    }

    /// Issue a single GET against the health endpoint.
    /// Never errors: failures are reported on stderr and shown as Disconnected.
    pub fn probe(&self) -> BackendStatus {
        match self.fetch_status() {
            Ok(status) => BackendStatus::Connected(status),
            Err(e) => {
                eprintln!("⚠️  Health check failed: {:#}", e);
                BackendStatus::Disconnected
            }
        }
    }

    fn fetch_status(&self) -> Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        let body: serde_json::Value = client
            .get(&self.url)
            .send()
            .with_context(|| format!("GET {} failed", self.url))?
            .json()
            .context("Health response was not JSON")?;

        body.get("status")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Health response has no status field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one HTTP response on an ephemeral port, then shut down
    fn one_shot_server(body: &'static str) -> String {
        one_shot_server_with_status("200 OK", body)
    }

    fn one_shot_server_with_status(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{}/api/health", addr)
    }

    #[test]
    fn test_probe_reads_status_field() {
        let url = one_shot_server(r#"{"status":"ok","accounts":12}"#);
        let status = HealthProbe::new(&url).probe();

        assert_eq!(status, BackendStatus::Connected("ok".to_string()));
        assert!(status.is_connected());
        assert_eq!(status.display(), "Backend: ok");
        assert!(status.display().contains("ok"));
    }

    #[test]
    fn test_probe_passes_through_degraded_status() {
        let url = one_shot_server(r#"{"status":"degraded"}"#);
        let status = HealthProbe::new(&url).probe();

        assert_eq!(status.display(), "Backend: degraded");
    }

    #[test]
    fn test_probe_reads_status_from_error_response() {
        // An HTTP error status with a readable status body is still a
        // status report, not a disconnect
        let url =
            one_shot_server_with_status("503 Service Unavailable", r#"{"status":"degraded"}"#);
        let status = HealthProbe::new(&url).probe();

        assert_eq!(status, BackendStatus::Connected("degraded".to_string()));
        assert!(status.is_connected());
        assert_eq!(status.display(), "Backend: degraded");
    }

    #[test]
    fn test_probe_connection_refused() {
        // Bind to grab a free port, then drop it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let status = HealthProbe::new(&format!("http://{}/api/health", addr)).probe();

        assert_eq!(status, BackendStatus::Disconnected);
        assert!(!status.is_connected());
        assert_eq!(status.display(), "Backend: Disconnected");
    }

    #[test]
    fn test_probe_rejects_non_json_body() {
        let url = one_shot_server("<html>it lives</html>");
        let status = HealthProbe::new(&url).probe();

        assert_eq!(status, BackendStatus::Disconnected);
    }

    #[test]
    fn test_probe_rejects_missing_status_field() {
        let url = one_shot_server(r#"{"healthy":true}"#);
        let status = HealthProbe::new(&url).probe();

        assert_eq!(status.display(), "Backend: Disconnected");
    }
}
