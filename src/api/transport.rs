use anyhow::{Context, Result};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Multipart file upload; the backend expects the file under a named
    /// form field.
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_file(mut self, field: &str, file_name: &str, bytes: Vec<u8>) -> Self {
        self.body = RequestBody::Multipart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            bytes,
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Trait for performing HTTP exchanges - allows for mocking in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Real implementation over a shared reqwest client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("text/csv")?;
                builder.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };

        let response = builder
            .send()
            .await
            .with_context(|| format!("network request to {} failed", request.url))?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse { status, body })
    }
}

pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    enum Canned {
        Http { status: u16, body: Vec<u8> },
        NetworkError(String),
    }

    struct Matcher {
        path_contains: String,
        queue: VecDeque<Canned>,
        sticky: Option<Canned>,
    }

    /// Mock transport for testing. Responses are scripted per URL fragment;
    /// a matcher serves its queue in order, then its sticky response (if
    /// any) forever. Every exchange is recorded.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        matchers: Arc<Mutex<Vec<Matcher>>>,
        call_history: Arc<Mutex<Vec<ApiRequest>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn matcher_entry(&self, path_contains: &str) -> usize {
            let mut matchers = self.matchers.lock();
            if let Some(idx) = matchers
                .iter()
                .position(|m| m.path_contains == path_contains)
            {
                return idx;
            }
            matchers.push(Matcher {
                path_contains: path_contains.to_string(),
                queue: VecDeque::new(),
                sticky: None,
            });
            matchers.len() - 1
        }

        /// Queue one JSON response for requests whose URL contains
        /// `path_contains`.
        pub fn respond_json(&self, path_contains: &str, status: u16, body: serde_json::Value) {
            let idx = self.matcher_entry(path_contains);
            self.matchers.lock()[idx].queue.push_back(Canned::Http {
                status,
                body: body.to_string().into_bytes(),
            });
        }

        /// Queue one raw-bytes response (CSV blobs).
        pub fn respond_bytes(&self, path_contains: &str, status: u16, body: Vec<u8>) {
            let idx = self.matcher_entry(path_contains);
            self.matchers.lock()[idx]
                .queue
                .push_back(Canned::Http { status, body });
        }

        /// Serve this JSON response for every request once the queue for the
        /// matcher is exhausted.
        pub fn respond_json_forever(&self, path_contains: &str, status: u16, body: serde_json::Value) {
            let idx = self.matcher_entry(path_contains);
            self.matchers.lock()[idx].sticky = Some(Canned::Http {
                status,
                body: body.to_string().into_bytes(),
            });
        }

        /// Queue one simulated network failure.
        pub fn fail_once(&self, path_contains: &str, message: &str) {
            let idx = self.matcher_entry(path_contains);
            self.matchers.lock()[idx]
                .queue
                .push_back(Canned::NetworkError(message.to_string()));
        }

        pub fn call_history(&self) -> Vec<ApiRequest> {
            self.call_history.lock().clone()
        }

        /// Number of requests whose URL contains the fragment.
        pub fn calls_to(&self, path_contains: &str) -> usize {
            self.call_history
                .lock()
                .iter()
                .filter(|r| r.url.contains(path_contains))
                .count()
        }

        pub fn assert_header_sent(&self, path_contains: &str, name: &str, value: &str) -> bool {
            self.call_history.lock().iter().any(|r| {
                r.url.contains(path_contains)
                    && r.headers
                        .iter()
                        .any(|(n, v)| n.eq_ignore_ascii_case(name) && v == value)
            })
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.call_history.lock().push(request.clone());

            // Most specific fragment wins, so "/x/" and "/x/status/" can
            // coexist as matchers.
            let mut matchers = self.matchers.lock();
            let matcher = matchers
                .iter_mut()
                .filter(|m| request.url.contains(&m.path_contains))
                .max_by_key(|m| m.path_contains.len());

            let Some(matcher) = matcher else {
                anyhow::bail!("no mock response registered for {}", request.url);
            };

            let canned = match matcher.queue.pop_front() {
                Some(canned) => canned,
                None => match &matcher.sticky {
                    Some(Canned::Http { status, body }) => Canned::Http {
                        status: *status,
                        body: body.clone(),
                    },
                    Some(Canned::NetworkError(msg)) => Canned::NetworkError(msg.clone()),
                    None => anyhow::bail!("mock responses for {} exhausted", request.url),
                },
            };

            match canned {
                Canned::Http { status, body } => Ok(ApiResponse { status, body }),
                Canned::NetworkError(msg) => Err(anyhow::anyhow!("network error: {}", msg)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_queue_then_sticky() {
        let transport = MockTransport::new();
        transport.respond_json("/status/", 200, serde_json::json!({"n": 1}));
        transport.respond_json_forever("/status/", 200, serde_json::json!({"n": 2}));

        let req = || ApiRequest::new(HttpMethod::Get, "http://api/jobs/1/status/");

        let first = transport.execute(req()).await.unwrap();
        assert!(first.text().contains("1"));
        let second = transport.execute(req()).await.unwrap();
        assert!(second.text().contains("2"));
        let third = transport.execute(req()).await.unwrap();
        assert!(third.text().contains("2"));
        assert_eq!(transport.calls_to("/status/"), 3);
    }

    #[tokio::test]
    async fn test_mock_network_failure() {
        let transport = MockTransport::new();
        transport.fail_once("/status/", "connection reset");

        let result = transport
            .execute(ApiRequest::new(HttpMethod::Get, "http://api/x/status/"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_most_specific_matcher_wins() {
        let transport = MockTransport::new();
        transport.respond_json("/jobs/", 200, serde_json::json!({"which": "base"}));
        transport.respond_json("/jobs/1/status/", 200, serde_json::json!({"which": "status"}));

        let response = transport
            .execute(ApiRequest::new(HttpMethod::Get, "http://api/jobs/1/status/"))
            .await
            .unwrap();
        assert!(response.text().contains("status"));
    }

    #[tokio::test]
    async fn test_unmatched_request_is_an_error() {
        let transport = MockTransport::new();
        let result = transport
            .execute(ApiRequest::new(HttpMethod::Get, "http://api/none"))
            .await;
        assert!(result.is_err());
    }
}
