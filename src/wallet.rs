use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

/// Account-facing seam. Key custody lives outside the core; all a submission
/// ever asks for is the current sender address, once per direct submission.
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;
}

impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        Signer::address(self)
    }
}

/// A bare address acts as a wallet where no signing key is at hand.
impl Wallet for Address {
    fn address(&self) -> Address {
        *self
    }
}
