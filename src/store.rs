use std::collections::HashMap;

use log::debug;

use crate::error::Result;
use crate::metadata::Envelope;
use crate::rollback;

/// In-memory set of the currently trusted metadata, one envelope per role.
///
/// Packages the adoption flow around the rollback guard: a verified incoming
/// document replaces the baseline for its role only after the guard accepts
/// it. Nothing is persisted here; reconstructing the set after a restart
/// means re-validating stored source text and re-promoting the result.
#[derive(Debug, Default)]
pub struct TrustedSet {
    entries: HashMap<String, Envelope>,
}

impl TrustedSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently trusted metadata for a role, if any.
    pub fn trusted(&self, role_name: &str) -> Option<&Envelope> {
        self.entries.get(role_name)
    }

    /// Adopts a verified envelope as the new baseline for its role.
    ///
    /// The envelope must already have passed the trust gate. When a baseline
    /// exists the rollback guard runs against it; on a first adoption a
    /// pinned expected version is still enforced. The superseded envelope is
    /// dropped.
    ///
    /// # Arguments
    /// * `remote` - trusted envelope to adopt
    /// * `expected_version` - exact version the envelope must carry, when
    ///   another role's metadata has already announced it
    ///
    /// # Returns
    /// * `Result<()>` - `Ok` once the baseline is replaced; on any error the
    ///   previous baseline stays in place
    pub fn adopt(&mut self, remote: Envelope, expected_version: Option<u64>) -> Result<()> {
        let role_name = remote.role_name()?.to_string();
        let remote_version = remote.version()?;

        match self.entries.get(&role_name) {
            Some(local) => rollback::check_rollback(local, &remote, expected_version)?,
            None => {
                rollback::check_expected_version(&role_name, remote_version, expected_version)?
            }
        }

        debug!("adopting '{role_name}' metadata version {remote_version}");
        self.entries.insert(role_name, remote);
        Ok(())
    }
}
