use std::path::PathBuf;
use tracing::{error, info};

use crate::auth::{BearerToken, WorkspaceId};
use crate::catalog::parse_product_id;
use crate::client::Client;
use crate::download::DownloadOutcome;
use crate::error::{Error, Result};
use crate::extract::extract_product;
use crate::report::Reporter;
use crate::transport::Transport;

/// What to do when one product of an all-products run fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Stop at the first failure and return it.
    #[default]
    Abort,
    /// Record the failure and move on to the next product.
    Continue,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub extracted: Vec<PathBuf>,
    /// `(product id, error)` for products that failed under [`BatchPolicy::Continue`].
    pub failed: Vec<(String, Error)>,
}

/// Sequences token, workspace, catalog, download and extraction for one run.
pub struct Workflow<'a, T: Transport> {
    client: &'a Client<T>,
    download_dir: PathBuf,
    extract: bool,
    policy: BatchPolicy,
}

impl<'a, T: Transport> Workflow<'a, T> {
    pub fn new(client: &'a Client<T>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
            extract: false,
            policy: BatchPolicy::Abort,
        }
    }

    pub fn extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }

    pub fn policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Downloads (and optionally extracts) one product.
    ///
    /// `product` is either a bare product id or a selection line ending in `ID=<id>`.
    pub fn run_single(
        &self,
        api_key: &str,
        product: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<RunSummary> {
        reporter.message("Started processing.");
        let product_id = parse_product_id(product);
        reporter.message(&format!("Selected Product: {}", product_id));
        reporter.message(&format!("Download Directory: {}", self.download_dir.display()));

        let (token, workspace) = self.session(api_key)?;
        let mut summary = RunSummary::default();
        self.handle_product(&token, &workspace, product_id, &mut summary, reporter)?;

        reporter.message("Finished processing.");
        Ok(summary)
    }

    /// Downloads (and optionally extracts) every product of the workspace, in catalog order.
    pub fn run_all(&self, api_key: &str, reporter: &mut dyn Reporter) -> Result<RunSummary> {
        reporter.message("Started processing.");
        reporter.message("All products selected");
        reporter.message(&format!("Download Directory: {}", self.download_dir.display()));

        let (token, workspace) = self.session(api_key)?;
        let products = self.client.list_products(&token, &workspace)?;
        let total = products.len();

        let mut summary = RunSummary::default();
        for (i, product) in products.iter().enumerate() {
            reporter.message(&format!("Handling product {} of {}", i + 1, total));
            let result = self.handle_product(
                &token,
                &workspace,
                &product.product_id,
                &mut summary,
                reporter,
            );
            if let Err(e) = result {
                match self.policy {
                    BatchPolicy::Abort => return Err(e),
                    BatchPolicy::Continue => {
                        error!(product_id = %product.product_id, "product failed: {}", e);
                        reporter.message(&format!(
                            "Product {} failed: {}",
                            product.product_id, e
                        ));
                        summary.failed.push((product.product_id.clone(), e));
                    }
                }
            }
        }

        reporter.message("Finished processing.");
        Ok(summary)
    }

    fn session(&self, api_key: &str) -> Result<(BearerToken, WorkspaceId)> {
        let token = self.client.token(api_key)?;
        let workspace = self.client.workspace_id(&token)?;
        info!(workspace = %workspace, "session established");
        Ok((token, workspace))
    }

    fn handle_product(
        &self,
        token: &BearerToken,
        workspace: &WorkspaceId,
        product_id: &str,
        summary: &mut RunSummary,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let info = self
            .client
            .product_download_info(token, workspace, product_id)?;
        match self
            .client
            .download(token, &info, &self.download_dir, reporter)?
        {
            DownloadOutcome::Skipped(path) => summary.skipped.push(path),
            DownloadOutcome::Downloaded { path, .. } => summary.downloaded.push(path),
        }

        if self.extract {
            let out = extract_product(&self.download_dir, &info.resource_id, reporter)?;
            summary.extracted.push(out);
        }
        Ok(())
    }
}
