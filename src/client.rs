use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{BearerToken, MeResponse, TokenResponse, WorkspaceId};
use crate::catalog::{Feature, FeatureCollection, ProductDownloadInfo, ProductSummary, summarize};
use crate::config::{ClientConfig, load_config};
use crate::download::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result, format_api_error};
use crate::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::util::{is_plain_file_name, urljoin};

pub(crate) const ITEMS_PER_PAGE: u32 = 100;
pub(crate) const SORT_BY: &str = "-publicationDate";

#[derive(Debug, Clone)]
pub struct Client<T: Transport = ReqwestTransport> {
    pub(crate) config: ClientConfig,
    pub(crate) transport: T,
    pub(crate) progress: bool,
    pub(crate) chunk_size: usize,
}

impl Client<ReqwestTransport> {
    /// Creates a client against the vendor endpoints (or their `ONEATLAS_*_URL` overrides).
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_transport(load_config(), ReqwestTransport::new()?))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            progress: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Exchanges an API key for a bearer token.
    ///
    /// Any non-2xx response or a reply without `access_token` is an [`Error::Auth`].
    pub fn token(&self, api_key: &str) -> Result<BearerToken> {
        let request = ApiRequest::post_form(
            &self.config.auth_url,
            &[
                ("client_id", "IDP"),
                ("grant_type", "api_key"),
                ("apikey", api_key.trim()),
            ],
        );
        let reply: TokenResponse = self.api_json(&request).map_err(auth_error)?;
        let token = reply
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Auth("token response has no access_token".to_string()))?;
        info!("obtained access token");
        Ok(BearerToken::new(&token))
    }

    /// Returns `contract.workspaceId` of the current user.
    pub fn workspace_id(&self, token: &BearerToken) -> Result<WorkspaceId> {
        let url = urljoin(&self.config.data_url, "me");
        let request = ApiRequest::get(url).header("Authorization", token.as_header());
        let me: MeResponse = self.api_json(&request).map_err(auth_error)?;
        let id = me
            .workspace_id()
            .ok_or_else(|| Error::Auth("user record has no contract.workspaceId".to_string()))?;
        debug!(workspace = %id, "resolved workspace");
        Ok(id)
    }

    /// Lists the products delivered to a workspace, newest publication first.
    ///
    /// Malformed features are logged and skipped; they never fail the listing.
    pub fn list_products(
        &self,
        token: &BearerToken,
        workspace: &WorkspaceId,
    ) -> Result<Vec<ProductSummary>> {
        let request = self
            .search_request(token)
            .query("itemsPerPage", ITEMS_PER_PAGE)
            .query("startPage", 1)
            .query("sortBy", SORT_BY)
            .query("workspace", workspace.as_str());
        let collection: FeatureCollection = self.api_json(&request)?;

        let total = collection.features.len();
        let products: Vec<ProductSummary> =
            collection.features.iter().filter_map(summarize).collect();
        if products.len() < total {
            warn!(
                skipped = total - products.len(),
                total, "some catalog features were skipped"
            );
        }
        info!(count = products.len(), workspace = %workspace, "listed products");
        Ok(products)
    }

    /// Resolves the archive link of one product.
    pub fn product_download_info(
        &self,
        token: &BearerToken,
        workspace: &WorkspaceId,
        product_id: &str,
    ) -> Result<ProductDownloadInfo> {
        let feature = self.lookup(token, workspace, product_id)?;
        let link = feature.download_link().ok_or_else(|| Error::Schema {
            product_id: product_id.to_string(),
            detail: "no archive entry in _links.download".to_string(),
        })?;
        let (Some(href), Some(resource_id)) = (&link.href, &link.resource_id) else {
            return Err(Error::Schema {
                product_id: product_id.to_string(),
                detail: "archive link lacks href or resourceId".to_string(),
            });
        };
        // The archive is written as `<download dir>/<resourceId>`.
        if !is_plain_file_name(resource_id) {
            return Err(Error::Schema {
                product_id: product_id.to_string(),
                detail: format!("resourceId {:?} is not a plain file name", resource_id),
            });
        }
        Ok(ProductDownloadInfo {
            href: href.clone(),
            resource_id: resource_id.clone(),
        })
    }

    /// Returns the GeoJSON footprint of one product.
    pub fn product_geometry(
        &self,
        token: &BearerToken,
        workspace: &WorkspaceId,
        product_id: &str,
    ) -> Result<Value> {
        let feature = self.lookup(token, workspace, product_id)?;
        feature
            .geometry
            .filter(|g| !g.is_null())
            .ok_or_else(|| Error::Schema {
                product_id: product_id.to_string(),
                detail: "feature has no geometry".to_string(),
            })
    }

    fn lookup(
        &self,
        token: &BearerToken,
        workspace: &WorkspaceId,
        product_id: &str,
    ) -> Result<Feature> {
        let request = self
            .search_request(token)
            .query("workspaceid", workspace.as_str())
            .query("id", product_id);
        let collection: FeatureCollection = self.api_json(&request)?;

        let count = collection.features.len();
        let Some(first) = collection.features.into_iter().next() else {
            return Err(Error::NotFound {
                product_id: product_id.to_string(),
                workspace_id: workspace.to_string(),
            });
        };
        if count > 1 {
            warn!(product_id, count, "lookup matched several features; using the first");
        }

        serde_json::from_value(first).map_err(|e| Error::Schema {
            product_id: product_id.to_string(),
            detail: format!("unexpected feature layout: {}", e),
        })
    }

    fn search_request(&self, token: &BearerToken) -> ApiRequest {
        ApiRequest::get(&self.config.search_url)
            .header("Cache-Control", "no-cache")
            .header("Authorization", token.as_header())
            .header("Content-Type", "application/json")
    }

    fn api_json<TResp: DeserializeOwned>(&self, request: &ApiRequest) -> Result<TResp> {
        let resp = self.transport.execute(request)?;
        let status = resp.status;
        if !status.is_success() {
            return Err(Error::Api(format_api_error(status, &request.url, &resp.body)));
        }

        serde_json::from_str::<TResp>(&resp.body).map_err(|e| {
            Error::Api(format!(
                "failed to parse API JSON (url={}, status={}): {}",
                request.url, status, e
            ))
        })
    }
}

fn auth_error(e: Error) -> Error {
    match e {
        Error::Api(msg) => Error::Auth(msg),
        other => other,
    }
}
