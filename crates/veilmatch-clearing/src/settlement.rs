//! The settlement collaborator seam.

use veilmatch_types::{Result, SettlementRef};

/// Authorizes token transfers on the settlement network.
#[allow(async_fn_in_trait)]
pub trait SettlementClient {
    /// Authorize one transfer from a payer address to a provider address.
    /// Returns the network's settlement reference on success.
    async fn authorize_transfer(
        &self,
        payer_address: &str,
        provider_address: &str,
        amount: u64,
    ) -> Result<SettlementRef>;
}
