use crate::error::{BlockchainError, Result};
use crate::utils::{base58_decode, base58_encode, new_key_pair, ripemd160_digest, sha256_digest};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde::{Deserialize, Serialize};

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
// version byte + RIPEMD-160 hash + checksum
const ADDRESS_PAYLOAD_LEN: usize = 1 + 20 + ADDRESS_CHECK_SUM_LEN;

#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| {
                    BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        derive_address(self.public_key.as_slice())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

/// base58(version || RIPEMD160(SHA256(public_key)) || checksum)
pub fn derive_address(public_key: &[u8]) -> String {
    convert_address(hash_pub_key(public_key).as_slice())
}

pub fn convert_address(pub_hash_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(pub_hash_key);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    base58_encode(payload.as_slice())
}

/// Public key hash carried by a well-formed address
pub fn pub_key_hash_from_address(address: &str) -> Result<Vec<u8>> {
    let payload = base58_decode(address)?;
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: expected {ADDRESS_PAYLOAD_LEN} bytes, got {}",
            payload.len()
        )));
    }
    Ok(payload[1..payload.len() - ADDRESS_CHECK_SUM_LEN].to_vec())
}

pub fn validate_address(address: &str) -> bool {
    let payload = match base58_decode(address) {
        Ok(payload) => payload,
        Err(_) => return false,
    };
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return false;
    }

    let (body, actual_checksum) = payload.split_at(payload.len() - ADDRESS_CHECK_SUM_LEN);
    checksum(body) == actual_checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wallet_address_is_valid() {
        let wallet = Wallet::new().unwrap();
        let address = wallet.get_address();

        assert!(validate_address(&address));
        assert_eq!(address, derive_address(wallet.get_public_key()));
        assert_eq!(
            pub_key_hash_from_address(&address).unwrap(),
            hash_pub_key(wallet.get_public_key())
        );
    }

    #[test]
    fn test_known_address_validates() {
        assert!(validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
    }

    #[test]
    fn test_corrupted_address_is_rejected() {
        // last character changed, checksum no longer matches
        assert!(!validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb"));
        assert!(!validate_address("M1"));
        assert!(!validate_address("not base58 0OIl"));
        assert!(matches!(
            pub_key_hash_from_address("M1"),
            Err(BlockchainError::InvalidAddress(_))
        ));
    }
}
