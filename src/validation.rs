//! Dialog validation for a desktop GIS host.
//!
//! The host's object model is reached only through [`Host`]. Every parameter change event is
//! handled by [`Validator::resync`], which takes the current dialog state and returns the new
//! one after pushing updates to the host.

use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::auth::{BearerToken, WorkspaceId, is_valid_api_key};
use crate::catalog::{parse_acquisition_date, parse_product_id};
use crate::client::Client;
use crate::config::{CredentialStore, Credentials};
use crate::error::Result;
use crate::geometry::{Extent, union_extent};
use crate::transport::Transport;

pub const API_KEY_PROMPT: &str = "Enter your valid OneAtlas Data API Key here";
pub const DOWNLOAD_DIR_PROMPT: &str = "Select directory for downloading";
pub const NO_SELECTION_ERROR: &str = "No product selection has been made.";
/// The map is zoomed to the footprint extent grown by this factor.
pub const ZOOM_PADDING: f64 = 1.2;

/// Dialog parameters, in tool order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    ApiKey,
    Product,
    AllProducts,
    DownloadDir,
    Extract,
    Token,
}

/// What the validation layer needs from the GIS host.
pub trait Host {
    fn set_value(&mut self, param: Param, value: &str);
    fn set_enabled(&mut self, param: Param, enabled: bool);
    fn set_options(&mut self, param: Param, options: &[String]);
    fn add_message(&mut self, msg: &str);
    fn set_error(&mut self, param: Param, msg: &str);

    /// Deletes every rendered footprint feature.
    fn clear_footprints(&mut self) -> Result<()>;
    /// Inserts a polygon feature with an `acquisitiondate` attribute.
    fn insert_footprint(&mut self, geometry: &Value, acquisition_date: &str) -> Result<()>;
    fn recalculate_extent(&mut self) -> Result<()>;
    fn zoom_to(&mut self, extent: Extent);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogState {
    pub api_key: String,
    /// Selected line of the product list (`..., ID=<id>`).
    pub selected_product: Option<String>,
    pub all_products: bool,
    pub download_dir: String,
    pub token: Option<BearerToken>,
    pub workspace: Option<WorkspaceId>,
    /// Product list as shown to the user.
    pub products: Vec<String>,
}

pub struct Validator<'a, T: Transport> {
    client: &'a Client<T>,
    store: CredentialStore,
}

impl<'a, T: Transport> Validator<'a, T> {
    pub fn new(client: &'a Client<T>, store: CredentialStore) -> Self {
        Self { client, store }
    }

    /// Fills the dialog from stored settings when it opens.
    pub fn initialize(&self, host: &mut dyn Host) -> Result<DialogState> {
        info!("validator initializing");
        host.set_enabled(Param::Product, false);
        let creds = self.store.load()?;

        let mut state = DialogState::default();
        if is_valid_api_key(&creds.api_key) {
            state.api_key = creds.api_key.clone();
            host.set_value(Param::ApiKey, &state.api_key);
            self.refresh_products(&mut state, host)?;
            host.set_enabled(Param::Product, true);
        } else {
            host.set_value(Param::ApiKey, API_KEY_PROMPT);
        }

        if Path::new(&creds.download_dir).is_dir() {
            state.download_dir = creds.download_dir;
        } else {
            debug!("no valid download directory stored");
            state.download_dir = DOWNLOAD_DIR_PROMPT.to_string();
        }
        host.set_value(Param::DownloadDir, &state.download_dir);
        Ok(state)
    }

    /// Re-synchronizes host and settings with the dialog after any parameter change.
    pub fn resync(&self, mut state: DialogState, host: &mut dyn Host) -> Result<DialogState> {
        debug!(products = state.products.len(), "resync");
        host.set_enabled(Param::Token, false);
        state.api_key = state.api_key.trim().to_string();
        let key_valid = is_valid_api_key(&state.api_key);

        if key_valid {
            host.set_enabled(Param::Product, true);
            host.set_enabled(Param::AllProducts, true);
            host.set_enabled(Param::Extract, true);
            self.refresh_products(&mut state, host)?;
        } else {
            host.set_value(Param::ApiKey, API_KEY_PROMPT);
            host.set_enabled(Param::Product, false);
            host.set_enabled(Param::AllProducts, false);
            host.set_enabled(Param::Extract, false);
            state.token = None;
            state.workspace = None;
            state.products.clear();
        }

        if let (Some(token), Some(workspace)) = (&state.token, &state.workspace) {
            self.render_footprints(&state, token, workspace, host)?;
        }

        self.persist(&state, key_valid)?;

        if key_valid {
            host.set_enabled(Param::Product, !state.all_products);
        }
        Ok(state)
    }

    /// Field-level checks run after the host's own validation.
    pub fn validate_messages(&self, state: &DialogState, host: &mut dyn Host) {
        let nothing_selected = state
            .selected_product
            .as_deref()
            .is_none_or(|s| s.trim().is_empty());
        if nothing_selected && !state.all_products {
            host.set_error(Param::Product, NO_SELECTION_ERROR);
        }
    }

    fn refresh_products(&self, state: &mut DialogState, host: &mut dyn Host) -> Result<()> {
        let token = self.client.token(&state.api_key)?;
        let workspace = self.client.workspace_id(&token)?;
        let products = self.client.list_products(&token, &workspace)?;

        host.set_value(Param::Token, token.as_header());
        state.products = products.iter().map(|p| p.to_string()).collect();
        host.set_options(Param::Product, &state.products);
        state.token = Some(token);
        state.workspace = Some(workspace);
        Ok(())
    }

    fn render_footprints(
        &self,
        state: &DialogState,
        token: &BearerToken,
        workspace: &WorkspaceId,
        host: &mut dyn Host,
    ) -> Result<()> {
        let lines: Vec<&str> = if state.all_products {
            state.products.iter().map(String::as_str).collect()
        } else {
            state.selected_product.iter().map(String::as_str).collect()
        };
        if lines.is_empty() {
            return Ok(());
        }

        host.clear_footprints()?;
        let mut rendered: Vec<Value> = Vec::with_capacity(lines.len());
        for line in lines {
            let product_id = parse_product_id(line);
            let geometry = match self.client.product_geometry(token, workspace, product_id) {
                Ok(g) => g,
                Err(e) if e.is_recoverable() => {
                    warn!(product_id, "no footprint: {}", e);
                    host.add_message(&format!("No footprint for product {}: {}", product_id, e));
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(product_id, geometry = %geometry, "footprint");
            host.insert_footprint(&geometry, parse_acquisition_date(line))?;
            rendered.push(geometry);
        }

        host.recalculate_extent()?;
        if let Some(extent) = union_extent(&rendered) {
            host.zoom_to(extent.scaled(ZOOM_PADDING));
        }
        Ok(())
    }

    fn persist(&self, state: &DialogState, key_valid: bool) -> Result<()> {
        let download_dir = if Path::new(&state.download_dir).is_dir() {
            state.download_dir.clone()
        } else {
            DOWNLOAD_DIR_PROMPT.to_string()
        };
        let api_key = if key_valid {
            state.api_key.clone()
        } else {
            String::new()
        };
        self.store.save(&Credentials {
            api_key,
            download_dir,
        })
    }
}
