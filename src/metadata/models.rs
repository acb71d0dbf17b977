use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single signature over the signed portion of a metadata document.
///
/// Signature verification itself is performed by an external collaborator;
/// this type only carries the key reference and the signature value between
/// the repository wire format and that collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Identifier of the key that produced the signature
    pub keyid: String,
    /// Encoded signature value
    pub sig: String,
}

/// Decoded two-part shape of a metadata document.
///
/// Every role's document shares this outer structure: the `signed` payload
/// kept as an ordered mapping so signing-relevant byte order survives the
/// round trip, plus the signatures over it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Document {
    /// Payload the signatures cover, with key order preserved
    pub signed: Map<String, Value>,
    /// Signatures over the canonical form of `signed`
    pub signatures: Vec<Signature>,
}
