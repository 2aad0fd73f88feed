//! HTTP backend for a single generate endpoint (Ollama `/api/generate` shape).

use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::request::{DecodingOptions, InferenceRequest, InferenceResponse};
use crate::{InferenceBackend, Result};

/// Backend posting JSON to one configured endpoint.
///
/// The underlying client pools connections and is safe to share.
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    stream: bool,
    options: &'a DecodingOptions,
}

impl<'a> GenerateBody<'a> {
    fn from_request(request: &'a InferenceRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            images: request.image.as_ref().map(|png| vec![STANDARD.encode(png)]),
            stream: false,
            options: &request.options,
        }
    }
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

impl HttpBackend {
    /// Create a backend for `endpoint` with a 10 second connect timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_connect_timeout(endpoint, Duration::from_secs(10))
    }

    /// Create a backend with an explicit connect timeout.
    pub fn with_connect_timeout(endpoint: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The endpoint this backend posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout(timeout)
    } else {
        InferenceError::Transport(err.to_string())
    }
}

impl InferenceBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn generate(&self, request: &InferenceRequest, timeout: Duration) -> Result<InferenceResponse> {
        let body = GenerateBody::from_request(request);
        debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            has_image = request.image.is_some(),
            timeout_secs = timeout.as_secs(),
            "Sending generate request to {}",
            self.endpoint
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&body)
            .send()
            .map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response
                .text()
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            warn!("Generate endpoint returned HTTP {}", status);
            return Err(InferenceError::Status { status, body });
        }

        let payload = response.text().map_err(|e| classify(e, timeout))?;
        let reply: GenerateReply = serde_json::from_str(&payload)
            .map_err(|e| InferenceError::InvalidResponse(format!("{}: {}", e, payload)))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!("Received {} chars in {}ms", reply.response.len(), elapsed_ms);

        Ok(InferenceResponse {
            text: reply.response,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    fn read_request_body(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                return String::new();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let len = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse::<usize>().unwrap())
                    .unwrap_or(0);
                let start = pos + 4;
                while buf.len() < start + len {
                    let n = stream.read(&mut chunk).unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                return String::from_utf8_lossy(&buf[start..start + len]).into_owned();
            }
        }
    }

    /// Serve exactly one request, writing `response` verbatim after `delay`.
    fn serve_raw(response: String, delay: Duration) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request_body(&mut stream);
            thread::sleep(delay);
            let _ = stream.write_all(response.as_bytes());
            request
        });
        (url, handle)
    }

    /// Serve exactly one request, answering with `status` and `body` after `delay`.
    fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> (String, JoinHandle<String>) {
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        serve_raw(response, delay)
    }

    #[test]
    fn test_success_returns_raw_response_text() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"model":"llava:13b","response":"{\"TOTAL\": \"1.00\"","done":true}"#,
            Duration::ZERO,
        );
        let backend = HttpBackend::new(url).unwrap();
        let request = InferenceRequest::new("llava:13b", "extract").with_image(vec![1, 2, 3]);

        let response = backend.generate(&request, Duration::from_secs(5)).unwrap();
        assert_eq!(response.text, r#"{"TOTAL": "1.00""#);

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({
                "model": "llava:13b",
                "prompt": "extract",
                "images": ["AQID"],
                "stream": false,
                "options": {"temperature": 0.1, "num_predict": 1500, "stop": ["}"]}
            })
        );
    }

    #[test]
    fn test_text_request_omits_images() {
        let (url, server) = serve_once("200 OK", r#"{"response":"ok"}"#, Duration::ZERO);
        let backend = HttpBackend::new(url).unwrap();

        backend
            .generate(&InferenceRequest::new("mistral", "p"), Duration::from_secs(5))
            .unwrap();

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert!(sent.get("images").is_none());
    }

    #[test]
    fn test_non_200_is_status_error_with_body() {
        let (url, server) = serve_once("500 Internal Server Error", "model not found", Duration::ZERO);
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .generate(&InferenceRequest::new("mistral", "p"), Duration::from_secs(5))
            .unwrap_err();
        server.join().unwrap();

        match err {
            InferenceError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_error_body_is_kept_in_status_error() {
        let (url, server) = serve_raw(
            "HTTP/1.1 502 Bad Gateway\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial".to_string(),
            Duration::ZERO,
        );
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .generate(&InferenceRequest::new("mistral", "p"), Duration::from_secs(5))
            .unwrap_err();
        server.join().unwrap();

        match err {
            InferenceError::Status { status, body } => {
                assert_eq!(status, 502);
                assert!(body.starts_with("<failed to read body: "), "{body}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_slow_service_times_out() {
        let (url, server) = serve_once("200 OK", r#"{"response":"late"}"#, Duration::from_millis(1500));
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .generate(&InferenceRequest::new("mistral", "p"), Duration::from_millis(200))
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, InferenceError::Timeout(_)), "got {err:?}");
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());
        drop(listener);

        let backend = HttpBackend::new(url).unwrap();
        let err = backend
            .generate(&InferenceRequest::new("mistral", "p"), Duration::from_secs(2))
            .unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
    }

    #[test]
    fn test_body_without_response_field_is_invalid() {
        let (url, server) = serve_once("200 OK", r#"{"error":"oops"}"#, Duration::ZERO);
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .generate(&InferenceRequest::new("mistral", "p"), Duration::from_secs(5))
            .unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, InferenceError::InvalidResponse(_)));
    }
}
