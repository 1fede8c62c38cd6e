#![allow(dead_code)]

use oneatlas::transport::{ApiRequest, ApiResponse, ByteStream, Transport};
use oneatlas::{Client, ClientConfig};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

pub const AUTH_URL: &str = "https://auth.test/token";
pub const DATA_URL: &str = "https://data.test/api/v1";
pub const SEARCH_URL: &str = "https://search.test/opensearch";
pub const VALID_KEY: &str = "ABC123";

pub struct FakeProduct {
    pub id: String,
    pub resource_id: String,
    pub acquisition_date: String,
    pub body: Vec<u8>,
    pub geometry: Value,
}

impl FakeProduct {
    pub fn new(id: &str, resource_id: &str, body: &[u8]) -> Self {
        let n = id.len() as f64;
        Self {
            id: id.to_string(),
            resource_id: resource_id.to_string(),
            acquisition_date: format!("2021-0{}-01T10:00:00Z", id.len().min(9)),
            body: body.to_vec(),
            geometry: json!({"type": "Polygon", "coordinates": [[[n, n], [n + 1.0, n], [n + 1.0, n + 1.0], [n, n]]]}),
        }
    }

    fn feature(&self) -> Value {
        json!({
            "type": "Feature",
            "geometry": self.geometry,
            "properties": {
                "id": self.id,
                "acquisitionDate": self.acquisition_date,
                "processingLevel": "ORTHO",
                "productType": "bundle"
            },
            "_links": {"download": [
                {"href": format!("https://dl.test/quicklook/{}", self.id)},
                {"href": format!("https://dl.test/archive/{}", self.id), "resourceId": self.resource_id}
            ]}
        })
    }
}

/// In-memory stand-in for the three OneAtlas services plus the archive host.
pub struct FakeOneAtlas {
    pub products: Vec<FakeProduct>,
    /// Product ids whose lookup returns no feature.
    pub hidden: Vec<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeOneAtlas {
    pub fn new(products: Vec<FakeProduct>) -> Self {
        Self {
            products,
            hidden: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn count(&self, kind: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == kind).count()
    }

    fn query<'a>(req: &'a ApiRequest, name: &str) -> Option<&'a str> {
        req.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn authorized(req: &ApiRequest) -> bool {
        req.headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer tok-1")
    }

    fn ok(body: Value) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    fn status(code: StatusCode, body: &str) -> ApiResponse {
        ApiResponse {
            status: code,
            body: body.to_string(),
        }
    }
}

impl Transport for FakeOneAtlas {
    fn execute(&self, req: &ApiRequest) -> oneatlas::Result<ApiResponse> {
        if req.url == AUTH_URL {
            self.calls.borrow_mut().push("token".into());
            let form = req.form.clone().unwrap_or_default();
            let key = form
                .iter()
                .find(|(k, _)| k == "apikey")
                .map(|(_, v)| v.clone());
            let grant_ok = form.contains(&("grant_type".into(), "api_key".into()))
                && form.contains(&("client_id".into(), "IDP".into()));
            if grant_ok && key.as_deref() == Some(VALID_KEY) {
                return Ok(Self::ok(json!({"access_token": "tok-1", "expires_in": 3600})));
            }
            return Ok(Self::status(
                StatusCode::UNAUTHORIZED,
                r#"{"error":"invalid_grant","error_description":"Invalid API key"}"#,
            ));
        }

        if !Self::authorized(req) {
            return Ok(Self::status(StatusCode::UNAUTHORIZED, ""));
        }

        if req.url == format!("{}/me", DATA_URL) {
            self.calls.borrow_mut().push("me".into());
            return Ok(Self::ok(json!({"contract": {"workspaceId": "ws-1"}})));
        }

        if req.url == SEARCH_URL {
            if Self::query(req, "workspace") == Some("ws-1") {
                self.calls.borrow_mut().push("list".into());
                let features: Vec<Value> = self.products.iter().map(FakeProduct::feature).collect();
                return Ok(Self::ok(json!({"type": "FeatureCollection", "features": features})));
            }
            if Self::query(req, "workspaceid") == Some("ws-1") {
                self.calls.borrow_mut().push("lookup".into());
                let id = Self::query(req, "id").unwrap_or_default();
                let features: Vec<Value> = self
                    .products
                    .iter()
                    .filter(|p| p.id == id && !self.hidden.contains(&p.id))
                    .map(FakeProduct::feature)
                    .collect();
                return Ok(Self::ok(json!({"type": "FeatureCollection", "features": features})));
            }
        }

        Ok(Self::status(StatusCode::NOT_FOUND, "no such endpoint"))
    }

    fn open_stream(&self, url: &str, authorization: &str) -> oneatlas::Result<ByteStream> {
        self.calls.borrow_mut().push("stream".into());
        let product = self
            .products
            .iter()
            .find(|p| url == format!("https://dl.test/archive/{}", p.id));
        let (status, body) = match product {
            Some(p) if authorization == "Bearer tok-1" => (StatusCode::OK, p.body.clone()),
            Some(_) => (StatusCode::FORBIDDEN, Vec::new()),
            None => (StatusCode::NOT_FOUND, Vec::new()),
        };
        Ok(ByteStream {
            status,
            content_length: Some(body.len() as u64),
            body: Box::new(Cursor::new(body)),
        })
    }
}

pub fn client(fake: &FakeOneAtlas) -> Client<&FakeOneAtlas> {
    let config = ClientConfig {
        auth_url: AUTH_URL.to_string(),
        data_url: DATA_URL.to_string(),
        search_url: SEARCH_URL.to_string(),
    };
    Client::with_transport(config, fake)
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zw = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zw.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zw.write_all(data.as_bytes()).unwrap();
    }
    zw.finish().unwrap().into_inner()
}

pub fn write_file(path: &Path, data: &[u8]) {
    File::create(path).unwrap().write_all(data).unwrap();
}
