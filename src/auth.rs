use std::fmt;

/// Value of the `Authorization` header, `"Bearer <access_token>"`.
///
/// Tokens are short-lived; nothing here tracks expiry. Fetch a new one per run.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(access_token: &str) -> Self {
        Self(format!("Bearer {}", access_token.trim()))
    }

    pub fn as_header(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs.
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct MeResponse {
    #[serde(default)]
    pub(crate) contract: Option<Contract>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Contract {
    #[serde(default, rename = "workspaceId")]
    pub(crate) workspace_id: Option<String>,
}

impl MeResponse {
    pub(crate) fn workspace_id(&self) -> Option<WorkspaceId> {
        self.contract
            .as_ref()
            .and_then(|c| c.workspace_id.as_deref())
            .filter(|id| !id.is_empty())
            .map(|id| WorkspaceId(id.to_string()))
    }
}

/// A usable key is non-empty and has no embedded whitespace.
pub fn is_valid_api_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !key.contains(char::is_whitespace)
}
