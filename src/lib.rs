//! Metadata-integrity core for a TUF-style software-update client.
//!
//! This crate provides the validated envelope for signed metadata documents,
//! per-role schema validation, the trust gate that keeps operational code from
//! reading unverified payloads, and the rollback guard that compares
//! successive versions of a role's metadata.

/// Typed errors shared across the crate.
pub mod error;

/// Signed metadata envelopes, roles, and the trust gate.
pub mod metadata;

/// Rollback and pinned-version checks between metadata generations.
pub mod rollback;

/// Role-composed schema validation of decoded documents.
pub mod schema;

/// In-memory set of the currently trusted metadata per role.
pub mod store;

/// Interface of the external signature-verification collaborator.
pub mod verify;
