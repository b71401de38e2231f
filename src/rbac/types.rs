use std::fmt;
use std::str::FromStr;

use crate::model::Role;

/// Capability flags a role can grant. Each maps to one boolean column on `roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    RegularReview,
    FinalReview,
    Admin,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegularReview => "permit_regular_review",
            Self::FinalReview => "permit_final_review",
            Self::Admin => "permit_admin",
        }
    }

    /// Whether `role` carries this capability.
    pub fn granted_by(self, role: &Role) -> bool {
        match self {
            Self::RegularReview => role.permit_regular_review,
            Self::FinalReview => role.permit_final_review,
            Self::Admin => role.permit_admin,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permit_regular_review" => Ok(Self::RegularReview),
            "permit_final_review" => Ok(Self::FinalReview),
            "permit_admin" => Ok(Self::Admin),
            other => anyhow::bail!("unknown capability: {other}"),
        }
    }
}

/// Decide whether a user holding `role` may pass a gate requiring `required`.
///
/// An empty requirement admits any authenticated user, with or without a
/// role. Otherwise the user needs a role granting every required capability.
pub fn is_authorized(required: &[Capability], role: Option<&Role>) -> bool {
    if required.is_empty() {
        return true;
    }
    role.is_some_and(|role| required.iter().all(|cap| cap.granted_by(role)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    const ALL_CAPABILITIES: &[Capability] = &[
        Capability::RegularReview,
        Capability::FinalReview,
        Capability::Admin,
    ];

    fn role(regular: bool, final_review: bool, admin: bool) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "Test".into(),
            permit_regular_review: regular,
            permit_final_review: final_review,
            permit_admin: admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn roundtrip_all_capabilities() {
        for cap in ALL_CAPABILITIES {
            let parsed: Capability = cap.as_str().parse().unwrap();
            assert_eq!(*cap, parsed);
        }
    }

    #[test]
    fn unknown_capability_errors() {
        assert!("permit_everything".parse::<Capability>().is_err());
    }

    #[test]
    fn empty_requirement_admits_roleless_user() {
        assert!(is_authorized(&[], None));
        assert!(is_authorized(&[], Some(&role(false, false, false))));
    }

    #[test]
    fn requirement_without_role_is_denied() {
        for cap in ALL_CAPABILITIES {
            assert!(!is_authorized(&[*cap], None));
        }
    }

    #[rstest]
    #[case(&[Capability::RegularReview], (true, false, false), true)]
    #[case(&[Capability::RegularReview], (false, true, true), false)]
    #[case(&[Capability::FinalReview], (true, true, false), true)]
    #[case(&[Capability::Admin], (true, true, false), false)]
    #[case(&[Capability::RegularReview, Capability::Admin], (true, false, true), true)]
    #[case(&[Capability::RegularReview, Capability::Admin], (true, false, false), false)]
    #[case(&[Capability::RegularReview, Capability::FinalReview, Capability::Admin], (true, true, true), true)]
    fn superset_rule(
        #[case] required: &[Capability],
        #[case] flags: (bool, bool, bool),
        #[case] expected: bool,
    ) {
        let role = role(flags.0, flags.1, flags.2);
        assert_eq!(is_authorized(required, Some(&role)), expected);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn authorized_iff_every_flag_present(
                need in proptest::array::uniform3(any::<bool>()),
                have in proptest::array::uniform3(any::<bool>()),
            ) {
                let required: Vec<Capability> = ALL_CAPABILITIES
                    .iter()
                    .zip(need)
                    .filter_map(|(cap, n)| n.then_some(*cap))
                    .collect();
                let role = role(have[0], have[1], have[2]);
                let superset = need.iter().zip(have).all(|(n, h)| !n || h);
                prop_assert_eq!(is_authorized(&required, Some(&role)), superset);
            }
        }
    }
}
