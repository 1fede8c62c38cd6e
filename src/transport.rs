//! HTTP transport seam.
//!
//! [`Client`](crate::Client) talks to the vendor endpoints only through [`Transport`], so the
//! request sequencing can be tested without a network.

use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use std::io::Read;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Sent as `application/x-www-form-urlencoded` when present.
    pub form: Option<Vec<(String, String)>>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form: None,
        }
    }

    pub fn post_form(url: impl Into<String>, form: &[(&str, &str)]) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form: Some(
                form.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

pub struct ByteStream {
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

pub trait Transport {
    /// Sends a request and buffers the whole response body as text.
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;

    /// Opens a GET whose body is read incrementally by the caller.
    fn open_stream(&self, url: &str, authorization: &str) -> Result<ByteStream>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        (**self).execute(request)
    }

    fn open_stream(&self, url: &str, authorization: &str) -> Result<ByteStream> {
        (**self).open_stream(url, authorization)
    }
}

/// Blocking reqwest implementation.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: HttpClient,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("oneatlas-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("oneatlas-rs")),
        );

        // Archives can be several GB; only bound the connect phase.
        let http = HttpClient::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()?;

        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut req = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(form) = &request.form {
            req = req.form(form);
        }

        let resp = req.send()?;
        let status = resp.status();
        let body = resp.text()?;
        Ok(ApiResponse { status, body })
    }

    fn open_stream(&self, url: &str, authorization: &str) -> Result<ByteStream> {
        let resp = self.http.get(url).header(AUTHORIZATION, authorization).send()?;
        Ok(ByteStream {
            status: resp.status(),
            content_length: resp.content_length(),
            body: Box::new(resp),
        })
    }
}
