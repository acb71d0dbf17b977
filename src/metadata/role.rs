use std::fmt;

use serde_json::{Map, Value};

use crate::error::Violation;
use crate::schema;

/// Metadata role a document is validated and trusted as.
///
/// The set of roles is closed. Delegated targets carry the name of their
/// delegation but share the document type of the top-level targets role, so
/// the two are distinct variants rather than one role with two names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Key and role tables the rest of the repository is verified against
    Root,
    /// Frequently re-signed pointer to the current snapshot
    Timestamp,
    /// Version listing of every metadata file in the repository
    Snapshot,
    /// Top-level listing of downloadable files and their digests
    Targets,
    /// Targets published under a named delegation
    DelegatedTargets {
        /// Name of the delegation, e.g. `django`
        name: String,
    },
}

impl Role {
    /// Value the payload's `_type` field must carry for this role.
    pub fn type_name(&self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Timestamp => "timestamp",
            Role::Snapshot => "snapshot",
            Role::Targets | Role::DelegatedTargets { .. } => "targets",
        }
    }

    /// Name of the role itself.
    ///
    /// Differs from [`Role::type_name`] only for delegated targets, which
    /// answer with the delegation name.
    pub fn name(&self) -> &str {
        match self {
            Role::Root => "root",
            Role::Timestamp => "timestamp",
            Role::Snapshot => "snapshot",
            Role::Targets => "targets",
            Role::DelegatedTargets { name } => name,
        }
    }

    /// Checks the required fields this role adds on top of the base schema.
    ///
    /// Contributions only add constraints; the base constraints on `_type`,
    /// `spec_version`, `version`, and `expires` have already run by the time
    /// this is called.
    pub(crate) fn check_contributed_fields(
        &self,
        signed: &Map<String, Value>,
        violations: &mut Vec<Violation>,
    ) {
        match self {
            Role::Root => check_root_fields(signed, violations),
            Role::Timestamp | Role::Snapshot => check_meta_field(signed, violations),
            Role::Targets | Role::DelegatedTargets { .. } => {
                check_targets_field(signed, violations)
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared `meta` shape of the snapshot and timestamp roles: a non-empty map
/// of metadata filename to an entry carrying at least a `version`. Entries
/// tolerate extra fields such as `hashes` and `length`.
fn check_meta_field(signed: &Map<String, Value>, violations: &mut Vec<Violation>) {
    let Some(value) = schema::require_field(signed, "meta", "signed.meta", violations) else {
        return;
    };
    let Some(meta) = schema::require_object(value, "signed.meta", violations) else {
        return;
    };
    if meta.is_empty() {
        violations.push(Violation::new(
            "signed.meta",
            "must contain at least 1 entry, got 0",
        ));
        return;
    }
    for (filename, entry) in meta {
        let entry_path = format!("signed.meta[\"{filename}\"]");
        let Some(entry) = schema::require_object(entry, &entry_path, violations) else {
            continue;
        };
        let version_path = format!("{entry_path}.version");
        if let Some(version) = schema::require_field(entry, "version", &version_path, violations) {
            schema::require_integer(version, &version_path, 1, violations);
        }
    }
}

/// The targets roles require a `targets` map. The map may be empty; each
/// entry needs a `length` and a non-empty `hashes` map, and tolerates extra
/// fields such as `custom`.
fn check_targets_field(signed: &Map<String, Value>, violations: &mut Vec<Violation>) {
    let Some(value) = schema::require_field(signed, "targets", "signed.targets", violations) else {
        return;
    };
    let Some(targets) = schema::require_object(value, "signed.targets", violations) else {
        return;
    };
    for (target, entry) in targets {
        let entry_path = format!("signed.targets[\"{target}\"]");
        let Some(entry) = schema::require_object(entry, &entry_path, violations) else {
            continue;
        };
        let length_path = format!("{entry_path}.length");
        if let Some(length) = schema::require_field(entry, "length", &length_path, violations) {
            schema::require_integer(length, &length_path, 0, violations);
        }
        let hashes_path = format!("{entry_path}.hashes");
        let Some(hashes) = schema::require_field(entry, "hashes", &hashes_path, violations) else {
            continue;
        };
        let Some(hashes) = schema::require_object(hashes, &hashes_path, violations) else {
            continue;
        };
        if hashes.is_empty() {
            violations.push(Violation::new(
                hashes_path.clone(),
                "must contain at least 1 entry, got 0",
            ));
        }
        for (algorithm, digest) in hashes {
            let digest_path = format!("{hashes_path}[\"{algorithm}\"]");
            schema::require_nonblank_string(digest, &digest_path, violations);
        }
    }
}

/// The root role requires the key table and the role table. Only the shape
/// is checked here; which keys authorize which role is a policy question for
/// the verification collaborator.
fn check_root_fields(signed: &Map<String, Value>, violations: &mut Vec<Violation>) {
    if let Some(value) = schema::require_field(signed, "keys", "signed.keys", violations) {
        if let Some(keys) = schema::require_object(value, "signed.keys", violations) {
            for (keyid, key) in keys {
                check_key_entry(keyid, key, violations);
            }
        }
    }
    if let Some(value) = schema::require_field(signed, "roles", "signed.roles", violations) {
        if let Some(roles) = schema::require_object(value, "signed.roles", violations) {
            for (role_name, entry) in roles {
                check_role_entry(role_name, entry, violations);
            }
        }
    }
}

fn check_key_entry(keyid: &str, key: &Value, violations: &mut Vec<Violation>) {
    let key_path = format!("signed.keys[\"{keyid}\"]");
    let Some(key) = schema::require_object(key, &key_path, violations) else {
        return;
    };
    for field in ["keytype", "scheme"] {
        let field_path = format!("{key_path}.{field}");
        if let Some(value) = schema::require_field(key, field, &field_path, violations) {
            schema::require_nonblank_string(value, &field_path, violations);
        }
    }
    let keyval_path = format!("{key_path}.keyval");
    if let Some(value) = schema::require_field(key, "keyval", &keyval_path, violations) {
        schema::require_object(value, &keyval_path, violations);
    }
}

fn check_role_entry(role_name: &str, entry: &Value, violations: &mut Vec<Violation>) {
    let entry_path = format!("signed.roles[\"{role_name}\"]");
    let Some(entry) = schema::require_object(entry, &entry_path, violations) else {
        return;
    };
    let keyids_path = format!("{entry_path}.keyids");
    if let Some(value) = schema::require_field(entry, "keyids", &keyids_path, violations) {
        if let Some(keyids) = schema::require_array(value, &keyids_path, violations) {
            for (index, keyid) in keyids.iter().enumerate() {
                let keyid_path = format!("{keyids_path}[{index}]");
                schema::require_nonblank_string(keyid, &keyid_path, violations);
            }
        }
    }
    let threshold_path = format!("{entry_path}.threshold");
    if let Some(value) = schema::require_field(entry, "threshold", &threshold_path, violations) {
        schema::require_integer(value, &threshold_path, 1, violations);
    }
}
