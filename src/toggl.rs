use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Method, StatusCode};
use reqwest::blocking::Client as HttpClient;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::Credentials;
use crate::models::{Client, DataEnvelope, Project, TimeEntry, User, UserEnvelope};

#[derive(Debug, Clone, Error)]
pub enum TogglError {
    #[error("Toggl rejected the credentials (check ~/.togglrc.json)")]
    Unauthorized,
    #[error("Toggl requires a paid plan for this request")]
    PaymentRequired,
    #[error("Toggl rate limit reached, try again shortly")]
    RateLimited,
    #[error("{0}")]
    ServerError(String),
    #[error("Toggl API error: {status}: {body}")]
    Request { status: u16, body: String },
    #[error("{0}")]
    Network(String),
    #[error("Unexpected response from Toggl: {0}")]
    Decode(String),
}

/// One call against the API, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

/// Sends an authenticated request and returns the raw response text.
pub trait Transport {
    fn send(&self, request: &Request) -> Result<String, TogglError>;
}

pub struct HttpTransport {
    client: HttpClient,
    base_url: String,
    authorization: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, credentials: &Credentials) -> Result<Self, TogglError> {
        let client = HttpClient::builder()
            .user_agent(concat!("toggl-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TogglError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: basic_auth(credentials),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<String, TogglError> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|err| TogglError::Network(err.to_string()))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header("Content-Type", "application/json")
            .header("Authorization", &self.authorization);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .map_err(|err| TogglError::Network(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|err| TogglError::Network(err.to_string()))?;

        if status.is_success() {
            return Ok(text);
        }

        if let Some(body) = &request.body {
            debug!(sent = %body, "request rejected");
        }

        Err(map_status(status, text))
    }
}

fn map_status(status: StatusCode, body: String) -> TogglError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TogglError::Unauthorized,
        StatusCode::PAYMENT_REQUIRED => TogglError::PaymentRequired,
        StatusCode::TOO_MANY_REQUESTS => TogglError::RateLimited,
        status if status.is_server_error() => {
            TogglError::ServerError(format!("Toggl API error: {status}"))
        }
        status => TogglError::Request {
            status: status.as_u16(),
            body: body.trim().to_string(),
        },
    }
}

fn basic_auth(credentials: &Credentials) -> String {
    let pair = match credentials {
        Credentials::Token(token) => format!("{token}:api_token"),
        Credentials::Password { username, password } => format!("{username}:{password}"),
    };
    format!("Basic {}", STANDARD.encode(pair))
}

/// Typed access to the resources the CLI works with.
pub struct TogglClient<T> {
    transport: T,
}

impl<T: Transport> TogglClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn me(&self) -> Result<User, TogglError> {
        let envelope: UserEnvelope = self.fetch(&Request::new(Method::GET, "/me"))?;
        Ok(envelope.data)
    }

    pub fn clients(&self) -> Result<Vec<Client>, TogglError> {
        let clients: Option<Vec<Client>> = self.fetch(&Request::new(Method::GET, "/clients"))?;
        Ok(clients.unwrap_or_default())
    }

    pub fn projects(&self, workspace_id: u64) -> Result<Vec<Project>, TogglError> {
        let path = format!("/workspaces/{workspace_id}/projects");
        let projects: Option<Vec<Project>> = self.fetch(&Request::new(Method::GET, path))?;
        Ok(projects.unwrap_or_default())
    }

    pub fn time_entries(&self, start: &str, end: &str) -> Result<Vec<TimeEntry>, TogglError> {
        let request = Request::new(Method::GET, "/time_entries")
            .query("start_date", start)
            .query("end_date", end);
        let entries: Option<Vec<TimeEntry>> = self.fetch(&request)?;
        Ok(entries.unwrap_or_default())
    }

    pub fn create_time_entry(&self, payload: String) -> Result<TimeEntry, TogglError> {
        let request = Request::new(Method::POST, "/time_entries").body(payload);
        self.fetch_entry(&request)
    }

    pub fn start_time_entry(&self, payload: String) -> Result<TimeEntry, TogglError> {
        let request = Request::new(Method::POST, "/time_entries/start").body(payload);
        self.fetch_entry(&request)
    }

    pub fn update_time_entry(&self, id: u64, payload: String) -> Result<TimeEntry, TogglError> {
        let request = Request::new(Method::PUT, format!("/time_entries/{id}")).body(payload);
        self.fetch_entry(&request)
    }

    pub fn delete_time_entry(&self, id: u64) -> Result<(), TogglError> {
        let request = Request::new(Method::DELETE, format!("/time_entries/{id}"));
        self.transport.send(&request)?;
        Ok(())
    }

    fn fetch_entry(&self, request: &Request) -> Result<TimeEntry, TogglError> {
        let envelope: DataEnvelope<TimeEntry> = self.fetch(request)?;
        Ok(envelope.data)
    }

    fn fetch<R: DeserializeOwned>(&self, request: &Request) -> Result<R, TogglError> {
        let text = self.transport.send(request)?;
        serde_json::from_str(&text).map_err(|err| TogglError::Decode(err.to_string()))
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::{Request, TogglError, Transport};

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    pub struct RecordingTransport {
        responses: RefCell<VecDeque<Result<String, TogglError>>>,
        requests: RefCell<Vec<Request>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, body: impl Into<String>) -> Self {
            self.responses.borrow_mut().push_back(Ok(body.into()));
            self
        }

        pub fn fail(self, err: TogglError) -> Self {
            self.responses.borrow_mut().push_back(Err(err));
            self
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.borrow().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: &Request) -> Result<String, TogglError> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TogglError::Network(format!("no response queued for {}", request.path))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;

    #[test]
    fn token_credentials_use_api_token_password() {
        let header = basic_auth(&Credentials::Token("abc123".to_string()));
        assert_eq!(header, format!("Basic {}", STANDARD.encode("abc123:api_token")));
    }

    #[test]
    fn password_credentials_encode_username_and_password() {
        let header = basic_auth(&Credentials::Password {
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
        });
        assert_eq!(
            header,
            format!("Basic {}", STANDARD.encode("user@example.com:secret"))
        );
    }

    #[test]
    fn auth_failures_map_to_unauthorized() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            assert!(matches!(
                map_status(status, String::new()),
                TogglError::Unauthorized
            ));
        }
    }

    #[test]
    fn quota_statuses_have_their_own_errors() {
        assert!(matches!(
            map_status(StatusCode::PAYMENT_REQUIRED, String::new()),
            TogglError::PaymentRequired
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            TogglError::RateLimited
        ));
    }

    #[test]
    fn server_errors_carry_the_status() {
        let err = map_status(StatusCode::BAD_GATEWAY, "<html>".to_string());
        assert_eq!(err.to_string(), "Toggl API error: 502 Bad Gateway");
    }

    #[test]
    fn other_failures_keep_the_trimmed_body() {
        let err = map_status(StatusCode::BAD_REQUEST, "  bad duration\n".to_string());
        assert!(matches!(
            &err,
            TogglError::Request { status: 400, body } if body == "bad duration"
        ));
        assert_eq!(err.to_string(), "Toggl API error: 400: bad duration");
    }

    #[test]
    fn me_unwraps_data_envelope() {
        let transport = RecordingTransport::new()
            .respond(r#"{"since": 1, "data": {"id": 5, "default_wid": 777}}"#);
        let client = TogglClient::new(transport);

        let user = client.me().unwrap();
        assert_eq!(user.default_wid, 777);

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, "/me");
    }

    #[test]
    fn null_lists_are_empty() {
        let transport = RecordingTransport::new().respond("null").respond("null");
        let client = TogglClient::new(transport);
        assert!(client.clients().unwrap().is_empty());
        assert!(client.projects(777).unwrap().is_empty());
        assert_eq!(
            client.transport().requests()[1].path,
            "/workspaces/777/projects"
        );
    }

    #[test]
    fn time_entries_sends_date_range_as_query() {
        let transport = RecordingTransport::new().respond("[]");
        let client = TogglClient::new(transport);
        client
            .time_entries("2014-01-01T00:00:00+00:00", "2014-01-02T23:59:59+00:00")
            .unwrap();

        let request = &client.transport().requests()[0];
        assert_eq!(request.path, "/time_entries");
        assert_eq!(
            request.query,
            vec![
                (
                    "start_date".to_string(),
                    "2014-01-01T00:00:00+00:00".to_string()
                ),
                (
                    "end_date".to_string(),
                    "2014-01-02T23:59:59+00:00".to_string()
                ),
            ]
        );
    }

    #[test]
    fn update_and_delete_address_entry_by_id() {
        let transport = RecordingTransport::new()
            .respond(r#"{"data": {"id": 9, "duration": 60}}"#)
            .respond("");
        let client = TogglClient::new(transport);

        let updated = client.update_time_entry(9, "{}".to_string()).unwrap();
        assert_eq!(updated.id, Some(9));
        client.delete_time_entry(9).unwrap();

        let requests = client.transport().requests();
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(requests[0].path, "/time_entries/9");
        assert_eq!(requests[0].body.as_deref(), Some("{}"));
        assert_eq!(requests[1].method, Method::DELETE);
        assert_eq!(requests[1].path, "/time_entries/9");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let transport = RecordingTransport::new().respond("<html>");
        let client = TogglClient::new(transport);
        assert!(matches!(client.clients(), Err(TogglError::Decode(_))));
    }

    #[test]
    fn transport_errors_propagate() {
        let transport = RecordingTransport::new().fail(TogglError::Unauthorized);
        let client = TogglClient::new(transport);
        assert!(matches!(client.me(), Err(TogglError::Unauthorized)));
    }
}
