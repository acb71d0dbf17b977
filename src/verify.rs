use crate::metadata::Envelope;

/// Signature verification over a metadata envelope.
///
/// Implementations own the key material and the threshold policy; the
/// metadata core only defines the seam. A verifier reads the envelope's
/// signatures and source bytes, both readable without trust, and promotes
/// the envelope once its policy is satisfied.
pub trait SignatureVerifier {
    /// Error the policy reports when the signatures do not satisfy it.
    type Error;

    /// Checks the envelope's signatures against the implementation's policy.
    ///
    /// Must not promote the envelope; [`SignatureVerifier::verify`] does
    /// that once this check passes.
    fn check(&self, metadata: &Envelope) -> Result<(), Self::Error>;

    /// Runs [`SignatureVerifier::check`] and promotes the envelope through
    /// the trust gate on success.
    ///
    /// A failed check takes no action: the envelope stays untrusted and its
    /// payload stays gated.
    fn verify(&self, metadata: &Envelope) -> Result<(), Self::Error> {
        self.check(metadata)?;
        metadata.mark_trusted();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::metadata::Role;

    struct RequireKnownKey {
        keyid: &'static str,
    }

    #[derive(Debug, PartialEq)]
    struct UnknownKey;

    impl SignatureVerifier for RequireKnownKey {
        type Error = UnknownKey;

        fn check(&self, metadata: &Envelope) -> Result<(), UnknownKey> {
            if metadata
                .signatures()
                .iter()
                .any(|signature| signature.keyid == self.keyid)
            {
                Ok(())
            } else {
                Err(UnknownKey)
            }
        }
    }

    fn snapshot_envelope() -> Envelope {
        let raw = json!({
            "signed": {
                "_type": "snapshot",
                "spec_version": "1.0.0",
                "version": 1,
                "expires": "2030-01-01T00:00:00Z",
                "meta": {"targets.json": {"version": 1}}
            },
            "signatures": [
                {"keyid": "2f1a89cd", "sig": "a312b9c4d5"}
            ]
        })
        .to_string();

        Envelope::from_json(Role::Snapshot, &raw).expect("fixture document should validate")
    }

    #[test]
    fn verify_promotes_only_on_success() {
        let envelope = snapshot_envelope();

        let unknown = RequireKnownKey { keyid: "deadbeef" };
        assert_eq!(unknown.verify(&envelope), Err(UnknownKey));
        assert!(
            !envelope.is_trusted(),
            "a failed policy must leave the envelope untrusted"
        );

        let known = RequireKnownKey { keyid: "2f1a89cd" };
        assert_eq!(known.verify(&envelope), Ok(()));
        assert!(envelope.is_trusted());
    }
}
