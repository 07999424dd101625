//! Immutable request descriptors.
//!
//! A [`RequestDescriptor`] captures everything needed to send one HTTP
//! request. It is built once through [`RequestBuilder`] and never mutated,
//! so the executor can resend the same descriptor on every retry attempt.

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;

use crate::error::{Error, Result};

/// Body payload of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document, sent as `application/json`.
    Json(serde_json::Value),
    /// URL-encoded form fields, sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Raw bytes with an explicit content type.
    Bytes {
        /// Content-Type header value.
        content_type: String,
        /// Payload.
        data: Bytes,
    },
}

/// Description of one HTTP request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
    accept_status: Vec<u16>,
}

impl RequestDescriptor {
    /// Start a request with an arbitrary method.
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            inner: RequestDescriptor {
                method,
                path: path.into(),
                query: Vec::new(),
                headers: Vec::new(),
                body: None,
                accept_status: Vec::new(),
            },
        }
    }

    /// Start a GET request.
    pub fn get(path: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::GET, path)
    }

    /// Start a POST request.
    pub fn post(path: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::POST, path)
    }

    /// Start a PUT request.
    pub fn put(path: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::PUT, path)
    }

    /// Start a DELETE request.
    pub fn delete(path: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::DELETE, path)
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the session base URL, or an absolute URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Per-request headers, applied on top of the session defaults.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Whether a response with this status counts as success.
    ///
    /// Any 2xx is accepted, plus statuses explicitly allowed on the builder.
    pub fn accepts(&self, status: u16) -> bool {
        (200..300).contains(&status) || self.accept_status.contains(&status)
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for [`RequestDescriptor`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    inner: RequestDescriptor,
}

impl RequestBuilder {
    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner
            .query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a header, replacing any previous value with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.inner
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.inner.headers.push((name, value.into()));
        self
    }

    /// Set a bearer token `Authorization` header.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::Config(format!("Failed to serialize request body: {}", e)))?;
        self.inner.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Attach a form body.
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.inner.body = Some(RequestBody::Form(fields));
        self
    }

    /// Attach a raw body.
    pub fn bytes(mut self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.inner.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Treat an extra non-2xx status as success (e.g. a 302 that must not be followed).
    pub fn accept_status(mut self, status: u16) -> Self {
        self.inner.accept_status.push(status);
        self
    }

    /// Finish building.
    pub fn build(self) -> RequestDescriptor {
        self.inner
    }
}
