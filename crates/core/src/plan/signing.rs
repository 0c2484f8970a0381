use std::str::FromStr;

use alloy::{
    primitives::{B256, hex},
    signers::{
        SignerSync,
        local::{LocalSignerError, PrivateKeySigner},
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{ExecutionPlan, Stage};
use crate::coin::Coin;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("invalid oracle key")]
    InvalidKey(#[source] LocalSignerError),

    #[error("signing failed")]
    Signing(#[from] alloy::signers::Error),

    #[error("failed to encode plan")]
    Encode(#[from] serde_json::Error),
}

/// Raw secp256k1 signature (`r || s`) and the compressed public key that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Produces attestations the unifier contract accepts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthenticitySigner: Send + Sync {
    async fn sign(&self, hash: &[u8; 32]) -> Result<Attestation, SignError>;
}

/// Signs with a locally held oracle key.
pub struct OracleSigner {
    signer: PrivateKeySigner,
}

impl OracleSigner {
    /// Parses a hex encoded secp256k1 private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self, SignError> {
        let signer = PrivateKeySigner::from_str(key).map_err(SignError::InvalidKey)?;
        Ok(Self { signer })
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.signer
            .credential()
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

impl std::fmt::Debug for OracleSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSigner")
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

#[async_trait]
impl AuthenticitySigner for OracleSigner {
    async fn sign(&self, hash: &[u8; 32]) -> Result<Attestation, SignError> {
        let sig = self.signer.sign_hash_sync(&B256::from(*hash))?;
        Ok(Attestation {
            signature: sig.as_bytes()[..64].to_vec(),
            public_key: self.public_key(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSignature {
    pub timestamp: u64,
    /// Hex compressed public key
    pub pubkey: String,
    /// Hex `r || s`
    pub signature: String,
}

/// The `crank` payload of a unifier contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPlan {
    pub stages: Vec<Stage>,
    pub funds: Vec<Coin>,
    pub signature: PlanSignature,
}

#[derive(Serialize)]
struct Signable<'a> {
    stages: &'a [Stage],
    funds: &'a [Coin],
    timestamp: u64,
}

impl SignedPlan {
    /// SHA-256 of the compact JSON `{"stages":..,"funds":..,"timestamp":..}`.
    pub fn digest(plan: &ExecutionPlan, timestamp: u64) -> Result<[u8; 32], SignError> {
        let body = serde_json::to_vec(&Signable {
            stages: &plan.stages,
            funds: &plan.funds,
            timestamp,
        })?;
        Ok(Sha256::digest(body).into())
    }

    pub async fn sign(
        plan: ExecutionPlan,
        timestamp: u64,
        signer: &dyn AuthenticitySigner,
    ) -> Result<Self, SignError> {
        let hash = Self::digest(&plan, timestamp)?;
        let attestation = signer.sign(&hash).await?;

        Ok(Self {
            stages: plan.stages,
            funds: plan.funds,
            signature: PlanSignature {
                timestamp,
                pubkey: hex::encode(attestation.public_key),
                signature: hex::encode(attestation.signature),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn plan() -> ExecutionPlan {
        ExecutionPlan {
            stages: vec![[("pool1", "C")].into_iter().collect()],
            funds: vec![Coin::new("A", 1_000_000u64)],
        }
    }

    #[test]
    fn digest_is_sha256_of_compact_json() {
        let expected: [u8; 32] = Sha256::digest(
            br#"{"stages":[[["pool1","C"]]],"funds":[{"denom":"A","amount":"1000000"}],"timestamp":1700000000}"#,
        )
        .into();
        assert_eq!(SignedPlan::digest(&plan(), 1_700_000_000).unwrap(), expected);
    }

    #[test]
    fn digest_depends_on_timestamp() {
        assert_ne!(
            SignedPlan::digest(&plan(), 1).unwrap(),
            SignedPlan::digest(&plan(), 2).unwrap()
        );
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(matches!(
            OracleSigner::from_hex("not hex"),
            Err(SignError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn oracle_signature_is_64_bytes_with_compressed_key() {
        let signer = OracleSigner::from_hex(KEY).unwrap();
        let attestation = signer.sign(&[7u8; 32]).await.unwrap();
        assert_eq!(attestation.signature.len(), 64);
        assert_eq!(attestation.public_key.len(), 33);
        assert!(matches!(attestation.public_key[0], 0x02 | 0x03));
    }

    #[tokio::test]
    async fn signed_plan_carries_hex_attestation() {
        let mut signer = MockAuthenticitySigner::new();
        let expected = SignedPlan::digest(&plan(), 42).unwrap();
        signer
            .expect_sign()
            .withf(move |hash| hash.as_slice() == expected.as_slice())
            .times(1)
            .returning(|_| {
                Ok(Attestation {
                    signature: vec![0xab; 64],
                    public_key: vec![0x02; 33],
                })
            });

        let signed = SignedPlan::sign(plan(), 42, &signer).await.unwrap();
        assert_eq!(signed.signature.timestamp, 42);
        assert_eq!(signed.signature.signature, "ab".repeat(64));
        assert_eq!(signed.signature.pubkey, "02".repeat(33));
        assert_eq!(signed.stages, plan().stages);
    }
}
