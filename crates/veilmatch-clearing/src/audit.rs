//! The signed audit log.
//!
//! Every transaction record appended here is hashed over a domain prefix
//! and signed with the node's ed25519 key. Mandate hashes are mere
//! commitments; this signature is the node actually vouching for what it
//! recorded.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use tracing::info;
use veilmatch_types::{
    NodeId, Result, TransactionRecord, VeilmatchError, constants::RECORD_HASH_DOMAIN,
};

/// A record plus the node's signature over its canonical hash.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SignedRecord {
    pub record: TransactionRecord,
    /// SHA-256 over `RECORD_HASH_DOMAIN || canonical_json(record)`, hex.
    pub record_hash: String,
    /// ed25519 signature over the hash bytes, hex.
    pub signature: String,
}

/// Append-only log of signed transaction records for one node.
pub struct AuditLog {
    signing_key: SigningKey,
    entries: Vec<SignedRecord>,
}

impl AuditLog {
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            entries: Vec::new(),
        }
    }

    /// The key auditors verify entries against.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The node identity derived from the signing key.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        NodeId::from_pubkey(self.signing_key.verifying_key().to_bytes())
    }

    /// Hash, sign, and append one record.
    pub fn append(&mut self, record: TransactionRecord) -> Result<()> {
        let record_hash = Self::record_hash(&record)?;
        let signature = self.signing_key.sign(record_hash.as_bytes());
        let signed = SignedRecord {
            record,
            record_hash,
            signature: hex::encode(signature.to_bytes()),
        };
        info!(
            record = %signed.record.record_id,
            hash = %signed.record_hash,
            "Record signed and appended to audit log"
        );
        self.entries.push(signed);
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[SignedRecord] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verify one entry against a verifying key: the hash must reproduce
    /// over the record and the signature must check out over the hash.
    pub fn verify_entry(entry: &SignedRecord, key: &VerifyingKey) -> Result<()> {
        let expected = Self::record_hash(&entry.record)?;
        if expected != entry.record_hash {
            return Err(VeilmatchError::Internal(format!(
                "record hash mismatch for {}",
                entry.record.record_id
            )));
        }
        let bytes = hex::decode(&entry.signature)
            .map_err(|err| VeilmatchError::Internal(format!("bad signature hex: {err}")))?;
        let signature = Signature::from_slice(&bytes)
            .map_err(|err| VeilmatchError::Internal(format!("bad signature: {err}")))?;
        key.verify(entry.record_hash.as_bytes(), &signature)
            .map_err(|err| {
                VeilmatchError::Internal(format!(
                    "signature check failed for {}: {err}",
                    entry.record.record_id
                ))
            })
    }

    /// Export the full log as pretty JSON.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    fn record_hash(record: &TransactionRecord) -> Result<String> {
        let json = serde_json::to_vec(record)?;
        let mut hasher = Sha256::new();
        hasher.update(RECORD_HASH_DOMAIN.as_bytes());
        hasher.update(&json);
        Ok(hex::encode(hasher.finalize()))
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
