#![allow(clippy::expect_used, clippy::missing_panics_doc)]
//! Arbor integration test support.
//!
//! Builds the full salvo service over an in-memory store and offers
//! seeding shortcuts plus a small request/response wrapper.

use std::sync::Arc;

use salvo::http::header::{self, HeaderMap, HeaderName};
use salvo::http::{Method, StatusCode};
use salvo::prelude::Service;
use salvo::test::{RequestBuilder, ResponseExt};
use serde_json::Value;

use arbor_app::app::service_router;
use arbor_core::config::{
    AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig, Settings, StorageBackend,
    StorageConfig, TicketConfig,
};
use arbor_core::constants::API_ROUTE_PREFIX;
use arbor_core::types::ResourceType;
use arbor_db::db::memory::{MemoryState, MemoryStore};
use arbor_db::model::resource::{NewResource, Resource};

pub const TOKEN_HEADER: &str = "x-arbor-auth-token";
pub const TICKET_COOKIE: &str = "auth_tkt";
pub const TICKET_SECRET: &str = "integration-secret";

/// Settings used by every test service.
#[must_use]
pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            run_migrations: false,
        },
        auth: AuthConfig {
            token_header: TOKEN_HEADER.to_string(),
            ticket: TicketConfig {
                secret: TICKET_SECRET.to_string(),
                cookie_name: TICKET_COOKIE.to_string(),
                max_age_secs: 3600,
            },
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
    }
}

/// A user seeded together with an API token.
#[derive(Debug, Clone)]
pub struct SeededUser {
    pub id: i32,
    pub token: String,
}

/// The full service wired to a fresh in-memory store.
pub struct TestApp {
    pub store: MemoryStore,
    pub service: Service,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let router = service_router(Arc::new(store.clone()), test_settings())
            .expect("test settings build a router");
        Self {
            store,
            service: Service::new(router),
        }
    }

    pub async fn seed<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        self.store.with_state(f).await
    }

    /// Seeds a user holding the given global permissions, with token `{name}-token`.
    pub async fn user(&self, name: &str, permissions: &[&str]) -> SeededUser {
        let token = format!("{name}-token");
        let id = self
            .seed(|s| {
                let user = s.add_user(name, &format!("{name}@example.com"), "unused");
                for permission in permissions {
                    s.grant_user_permission(user.id, permission);
                }
                s.add_token(user.id, &token, None);
                user.id
            })
            .await;
        SeededUser { id, token }
    }

    /// Seeds an entry appended as the last child of `parent_id`.
    pub async fn entry(&self, name: &str, parent_id: Option<i32>, owner: Option<i32>) -> Resource {
        self.seed(|s| {
            let ordering = i32::try_from(s.children(parent_id).len()).expect("small tree") + 1;
            s.insert_resource(NewResource {
                resource_name: name.to_string(),
                resource_type: ResourceType::Entry.as_str().to_string(),
                parent_id,
                ordering,
                owner_user_id: owner,
                owner_group_id: None,
                note: None,
            })
        })
        .await
    }

    /// `(name, ordering)` of the children of `parent_id`, in order.
    pub async fn positions(&self, parent_id: Option<i32>) -> Vec<(String, i32)> {
        self.seed(|s| {
            s.children(parent_id)
                .into_iter()
                .map(|r| (r.resource_name.clone(), r.ordering))
                .collect()
        })
        .await
    }
}

/// Test request builder relative to the versioned API prefix.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(HeaderName, String)>,
    json: Option<Value>,
}

impl TestRequest {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            json: None,
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn token(mut self, token: &str) -> Self {
        self.headers
            .push((HeaderName::from_static(TOKEN_HEADER), token.to_string()));
        self
    }

    #[must_use]
    pub fn ticket(mut self, ticket: &str) -> Self {
        self.headers
            .push((header::COOKIE, format!("{TICKET_COOKIE}={ticket}")));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{API_ROUTE_PREFIX}{}", self.path);
        let mut client = RequestBuilder::new(url, self.method);
        for (name, value) in self.headers {
            client = client.add_header(name, value, true);
        }
        if let Some(body) = &self.json {
            client = client.json(body);
        }

        let mut response = client.send(service).await;
        let status = response.status_code.unwrap_or(StatusCode::OK);
        let headers = response.headers().clone();
        let ticket = response
            .cookie(TICKET_COOKIE)
            .map(|cookie| cookie.value().to_string());
        let body = response.take_string().await.unwrap_or_default();

        TestResponse {
            status,
            headers,
            body,
            ticket,
        }
    }
}

/// Represents an HTTP test response for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    ticket: Option<String>,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        self.expect_status(expected);
        self
    }

    /// Statement form of [`Self::assert_status`] for responses that are not inspected further.
    pub fn expect_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {expected} but got {}: {}",
            self.status, self.body
        );
    }

    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of the ticket cookie set by this response, if any.
    #[must_use]
    pub fn ticket_cookie(&self) -> Option<String> {
        if self.ticket.is_some() {
            return self.ticket.clone();
        }
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix(&format!("{TICKET_COOKIE}=")).map(str::to_owned))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }
}
