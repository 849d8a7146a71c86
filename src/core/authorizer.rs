//! Spend authorization
//!
//! An input carries an unlock proof for the output it spends. The ledger
//! never inspects that proof itself; it asks an [`Authorizer`] to produce
//! one when a transfer is built and to check it when outputs are matched
//! against an address.
//!
//! [`AddressAuthorizer`] is a toy scheme: the proof is the spender's address
//! in plain text, so anyone who knows an address can spend from it. A real
//! signature scheme can replace it without touching transaction or chain code.

/// Produces and checks unlock proofs for a given identity.
pub trait Authorizer {
    /// Proof that `identity` authorizes spending its outputs.
    fn prove(&self, identity: &str) -> String;

    /// Whether `proof` unlocks outputs locked to `address`.
    fn check(&self, proof: &str, address: &str) -> bool;
}

/// Plaintext address as proof. Provides no cryptographic authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressAuthorizer;

impl Authorizer for AddressAuthorizer {
    fn prove(&self, identity: &str) -> String {
        identity.to_string()
    }

    fn check(&self, proof: &str, address: &str) -> bool {
        proof == address
    }
}
