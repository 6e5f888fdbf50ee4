use super::IdentityProvider;
use crate::types::OwnerId;

/// Identity fixed at startup (from `[identity].owner` or `--owner`).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    owner: Option<OwnerId>,
}

impl StaticIdentity {
    pub fn new(owner: Option<OwnerId>) -> Self {
        Self { owner }
    }

    /// An empty or blank id means nobody is signed in.
    pub fn from_config(owner: &str) -> Self {
        let owner = owner.trim();
        Self::new((!owner.is_empty()).then(|| OwnerId(owner.to_string())))
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }
}

impl IdentityProvider for StaticIdentity {
    async fn current_owner(&self) -> Option<OwnerId> {
        self.owner.clone()
    }
}
