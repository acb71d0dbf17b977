use log::warn;

use crate::error::{Error, Result, RollbackAttack};
use crate::metadata::Envelope;

/// Checks an incoming metadata document against the trusted baseline for its
/// role.
///
/// Stateless: on success the caller decides whether to adopt the incoming
/// document as the new baseline. Both envelopes must already be trusted; the
/// versions compared here are read through the trust gate, so handing the
/// guard an unverified envelope fails with
/// [`Error::UntrustedMetadata`](crate::error::Error::UntrustedMetadata)
/// rather than producing a verdict from unverified claims.
///
/// Envelopes are matched by role name, not by document type. Two delegated
/// targets roles share the `targets` type, and comparing types would let the
/// versions of unrelated delegations be played against each other.
///
/// # Arguments
/// * `local` - currently trusted metadata for the role
/// * `remote` - incoming metadata for the same role
/// * `expected_remote_version` - exact version the incoming document must
///   carry, when another role's metadata has already announced it
///
/// # Returns
/// * `Result<()>` - `Ok` when the incoming document may replace the
///   baseline; [`Error::RoleMismatch`](crate::error::Error::RoleMismatch)
///   when the envelopes belong to different roles; a
///   [`RollbackAttack`](crate::error::RollbackAttack) when the version moves
///   backwards or misses the pin
pub fn check_rollback(
    local: &Envelope,
    remote: &Envelope,
    expected_remote_version: Option<u64>,
) -> Result<()> {
    let local_role = local.role_name()?;
    let remote_role = remote.role_name()?;
    if local_role != remote_role {
        return Err(Error::RoleMismatch {
            local: local_role.to_string(),
            remote: remote_role.to_string(),
        });
    }

    let remote_version = remote.version()?;
    check_expected_version(remote_role, remote_version, expected_remote_version)?;

    let local_version = local.version()?;
    if remote_version < local_version {
        let attack = RollbackAttack::VersionRegression {
            role: remote_role.to_string(),
            remote_version,
            local_version,
        };
        warn!("rejecting metadata: {attack}");
        return Err(attack.into());
    }

    Ok(())
}

/// Pinned-version check, shared with first adoption where no baseline exists
/// yet but a pin still binds. A pin of `Some(0)` is enforced like any other
/// value; no valid document can satisfy it.
pub(crate) fn check_expected_version(
    role: &str,
    remote_version: u64,
    expected: Option<u64>,
) -> std::result::Result<(), RollbackAttack> {
    match expected {
        Some(expected_version) if expected_version != remote_version => {
            let attack = RollbackAttack::ExpectedVersion {
                role: role.to_string(),
                remote_version,
                expected_version,
            };
            warn!("rejecting metadata: {attack}");
            Err(attack)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::metadata::Role;

    fn untrusted(role: Role, version: u64) -> Envelope {
        let mut document = json!({
            "signed": {
                "_type": role.type_name(),
                "spec_version": "1.0.0",
                "version": version,
                "expires": "2030-01-01T00:00:00Z"
            },
            "signatures": [
                {"keyid": "2f1a89cd", "sig": "a312b9c4d5"}
            ]
        });
        if role.type_name() == "targets" {
            document["signed"]["targets"] = json!({});
        } else {
            document["signed"]["meta"] = json!({"snapshot.json": {"version": 1}});
        }

        Envelope::from_json(role, &document.to_string()).expect("fixture document should validate")
    }

    fn trusted(role: Role, version: u64) -> Envelope {
        let envelope = untrusted(role, version);
        envelope.mark_trusted();
        envelope
    }

    #[test]
    fn equal_versions_pass() {
        let local = trusted(Role::Snapshot, 5);
        let remote = trusted(Role::Snapshot, 5);
        assert!(check_rollback(&local, &remote, None).is_ok());
    }

    #[test]
    fn newer_remote_passes() {
        let local = trusted(Role::Snapshot, 5);
        let remote = trusted(Role::Snapshot, 6);
        assert!(check_rollback(&local, &remote, None).is_ok());
    }

    #[test]
    fn older_remote_is_a_version_regression() {
        let local = trusted(Role::Snapshot, 5);
        let remote = trusted(Role::Snapshot, 4);

        let err = check_rollback(&local, &remote, None).expect_err("regression must be rejected");
        assert_eq!(
            err.to_string(),
            "remote 'snapshot' metadata version 4 is lower than the trusted version 5"
        );
        assert!(matches!(
            err,
            Error::Rollback(RollbackAttack::VersionRegression {
                remote_version: 4,
                local_version: 5,
                ..
            })
        ));
    }

    #[test]
    fn pinned_version_must_match_exactly() {
        let local = trusted(Role::Snapshot, 5);
        let remote = trusted(Role::Snapshot, 7);

        let err =
            check_rollback(&local, &remote, Some(6)).expect_err("version pin must be enforced");
        assert_eq!(
            err.to_string(),
            "remote 'snapshot' metadata version 7 does not match the expected version 6"
        );

        let matching = trusted(Role::Snapshot, 6);
        assert!(check_rollback(&local, &matching, Some(6)).is_ok());
    }

    #[test]
    fn pin_is_checked_before_regression() {
        let local = trusted(Role::Snapshot, 5);
        let remote = trusted(Role::Snapshot, 4);

        let err = check_rollback(&local, &remote, Some(6)).expect_err("pin must win");
        assert!(
            matches!(
                err,
                Error::Rollback(RollbackAttack::ExpectedVersion { .. })
            ),
            "expected the pin violation to be reported first, got: {err}"
        );
    }

    #[test]
    fn a_pin_of_zero_is_enforced_not_skipped() {
        let local = trusted(Role::Snapshot, 1);
        let remote = trusted(Role::Snapshot, 1);

        let err = check_rollback(&local, &remote, Some(0)).expect_err("zero is a real pin");
        assert!(matches!(
            err,
            Error::Rollback(RollbackAttack::ExpectedVersion {
                expected_version: 0,
                ..
            })
        ));
    }

    #[test]
    fn different_roles_cannot_be_compared() {
        let local = trusted(Role::Snapshot, 5);
        let remote = trusted(Role::Timestamp, 6);

        let err = check_rollback(&local, &remote, None).expect_err("roles must match");
        assert_eq!(
            err.to_string(),
            "rollback check requires matching roles: local is 'snapshot', remote is 'timestamp'"
        );
    }

    #[test]
    fn delegations_compare_by_name_not_by_type() {
        let django = trusted(
            Role::DelegatedTargets {
                name: "django".to_string(),
            },
            5,
        );
        let flask = trusted(
            Role::DelegatedTargets {
                name: "flask".to_string(),
            },
            6,
        );

        // Same document type on both sides, still not comparable.
        let err = check_rollback(&django, &flask, None).expect_err("delegations are distinct");
        assert!(matches!(err, Error::RoleMismatch { .. }), "got: {err}");

        let newer_django = trusted(
            Role::DelegatedTargets {
                name: "django".to_string(),
            },
            6,
        );
        assert!(check_rollback(&django, &newer_django, None).is_ok());
    }

    #[test]
    fn untrusted_envelopes_get_no_verdict() {
        let local = trusted(Role::Snapshot, 5);
        let remote = untrusted(Role::Snapshot, 4);

        let err = check_rollback(&local, &remote, None).expect_err("untrusted remote");
        assert!(
            matches!(err, Error::UntrustedMetadata { .. }),
            "a rollback verdict must not be built from unverified claims, got: {err}"
        );

        let err = check_rollback(&remote, &local, None).expect_err("untrusted local");
        assert!(matches!(err, Error::UntrustedMetadata { .. }), "got: {err}");
    }
}
