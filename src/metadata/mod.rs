/// Wire-format models for metadata documents.
pub mod models;

/// The closed set of metadata roles and their schema contributions.
pub mod role;

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde_json::{Map, Value};

/// Re-exported signature model for convenience.
pub use models::Signature;
/// Re-exported role type for convenience.
pub use role::Role;

use crate::error::{Error, Result};
use crate::schema;

/// A validated metadata document bound to the role it was fetched for.
///
/// An envelope starts untrusted: its payload has passed schema validation
/// but nobody has checked the signatures yet. Payload reads go through the
/// trust gate until the signature-verification collaborator promotes the
/// envelope with [`Envelope::mark_trusted`]. Promotion is one-way; a
/// superseded envelope is dropped by its owner, never demoted or recycled.
#[derive(Debug)]
pub struct Envelope {
    role: Role,
    signed: Map<String, Value>,
    signatures: Vec<Signature>,
    source: String,
    trusted: AtomicBool,
}

impl Envelope {
    /// Decodes and validates a raw metadata document for a role.
    ///
    /// # Arguments
    /// * `role` - role the caller is fetching metadata for
    /// * `raw` - document text exactly as fetched from the repository
    ///
    /// # Returns
    /// * `Result<Envelope>` - an untrusted envelope preserving `raw`
    ///   byte-for-byte, or the decode error, or the full list of schema
    ///   violations
    pub fn from_json(role: Role, raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        schema::validate(&role, &value)?;
        let document: models::Document = serde_json::from_value(value)?;

        Ok(Self {
            role,
            signed: document.signed,
            signatures: document.signatures,
            source: raw.to_string(),
            trusted: AtomicBool::new(false),
        })
    }

    /// Promotes this envelope through the trust gate.
    ///
    /// Called by the signature-verification collaborator once the signatures
    /// satisfy its policy. Calling it again on an already trusted envelope
    /// has no effect.
    pub fn mark_trusted(&self) {
        let was_trusted = self.trusted.swap(true, Ordering::AcqRel);
        if !was_trusted {
            debug!(
                "'{}' metadata version {} is now trusted",
                self.role.name(),
                payload_version(&self.signed)
            );
        }
    }

    /// Whether this envelope has passed the trust gate.
    pub fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::Acquire)
    }

    /// Signatures over the payload, as fresh copies.
    ///
    /// Deliberately readable without trust: the verification collaborator
    /// needs them to decide whether trust is warranted in the first place.
    pub fn signatures(&self) -> Vec<Signature> {
        self.signatures.clone()
    }

    /// The document text exactly as fetched.
    ///
    /// Signature verification runs over these bytes, and persisting them is
    /// how a trusted baseline survives a restart. Readable without trust.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Deep copy of the signed payload, for callers that passed the gate.
    ///
    /// The copy shares no backing storage with the envelope, so callers can
    /// rearrange it freely without disturbing what was validated.
    pub fn signed(&self) -> Result<Map<String, Value>> {
        self.ensure_trusted()?;
        Ok(self.signed.clone())
    }

    /// Version of the payload.
    pub fn version(&self) -> Result<u64> {
        self.ensure_trusted()?;
        Ok(payload_version(&self.signed))
    }

    /// Expiry of the payload, as the date-time string it was published with.
    pub fn expires(&self) -> Result<&str> {
        self.ensure_trusted()?;
        Ok(payload_expires(&self.signed))
    }

    /// The payload's `_type` value.
    pub fn metadata_type(&self) -> Result<&str> {
        self.ensure_trusted()?;
        Ok(payload_type(&self.signed))
    }

    /// Name of the role this envelope was validated for.
    pub fn role_name(&self) -> Result<&str> {
        self.ensure_trusted()?;
        Ok(self.role.name())
    }

    /// Explicitly untrusted view of the document's claims.
    ///
    /// The single opt-out from the trust gate, for pipeline steps that must
    /// inspect a document before verification: which key policy applies,
    /// which version the repository claims to serve. Claims read through the
    /// view must never feed a security decision.
    pub fn claimed(&self) -> Claimed<'_> {
        Claimed { envelope: self }
    }

    /// The gate itself. Re-checked on every read so a promotion between two
    /// reads on a shared reference is observed.
    fn ensure_trusted(&self) -> Result<()> {
        if self.trusted.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::UntrustedMetadata {
                role: self.role.name().to_string(),
            })
        }
    }
}

/// Borrowed view of an envelope's claims that bypasses the trust gate.
///
/// Obtained only through [`Envelope::claimed`], so every bypass is visible
/// at the call site.
#[derive(Debug, Clone, Copy)]
pub struct Claimed<'a> {
    envelope: &'a Envelope,
}

impl<'a> Claimed<'a> {
    /// Version the document claims, before any verification.
    pub fn version(&self) -> u64 {
        payload_version(&self.envelope.signed)
    }

    /// Expiry date-time string the document claims.
    pub fn expires(&self) -> &'a str {
        payload_expires(&self.envelope.signed)
    }

    /// The `_type` the document claims.
    pub fn metadata_type(&self) -> &'a str {
        payload_type(&self.envelope.signed)
    }

    /// Role the envelope was constructed for.
    pub fn role(&self) -> &'a Role {
        &self.envelope.role
    }

    /// Name of the role the envelope was constructed for.
    pub fn role_name(&self) -> &'a str {
        self.envelope.role.name()
    }

    /// Deep copy of the claimed payload.
    pub fn signed(&self) -> Map<String, Value> {
        self.envelope.signed.clone()
    }
}

// Validation has already pinned the types of these fields, so the fallbacks
// are unreachable.
fn payload_version(signed: &Map<String, Value>) -> u64 {
    signed
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or_default()
}

fn payload_expires(signed: &Map<String, Value>) -> &str {
    signed
        .get("expires")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn payload_type(signed: &Map<String, Value>) -> &str {
    signed
        .get("_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
}
