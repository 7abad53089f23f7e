//! Role-based access decisions.
//!
//! [`authorize`] is a pure function over the caller's [`Tier`], the requested
//! [`Operation`] and the [`Resource`] class. It never fails; adapters turn a
//! [`Decision::Deny`] into an error through [`DenyReason::into_error`].

use serde_json::json;

use crate::domain::{Error, User, UserId};

/// Ordered capability tiers. Staff and superusers map to [`Tier::Admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// No credentials presented.
    Anonymous,
    /// Ordinary signed-up account.
    User,
    /// May edit or delete anyone's reviews and comments.
    Moderator,
    /// Full control over the catalogue and the user directory.
    Admin,
}

/// Identity of the caller as seen by the access controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    /// Caller without a bearer token.
    Anonymous,
    /// Caller resolved to a stored account.
    Authenticated {
        /// Account key.
        id: UserId,
        /// Tier derived from the account's current role.
        tier: Tier,
    },
}

impl Requester {
    /// Requester for a resolved account, using its current role.
    pub fn from_user(user: &User) -> Self {
        Self::Authenticated {
            id: user.id,
            tier: user.tier(),
        }
    }

    /// Tier of the caller; anonymous callers sit at the bottom.
    pub fn tier(&self) -> Tier {
        match self {
            Self::Anonymous => Tier::Anonymous,
            Self::Authenticated { tier, .. } => *tier,
        }
    }

    /// Account id when authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { id, .. } => Some(*id),
        }
    }
}

/// What the caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// List or retrieve.
    Read,
    /// Add a new resource.
    Create,
    /// Change an existing resource.
    Update,
    /// Remove an existing resource.
    Delete,
}

impl Operation {
    fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Resource class being acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Categories, genres and titles.
    Catalogue,
    /// A review or comment; `owner` is `None` for collection-level creates.
    Authored {
        /// Author of the targeted review or comment.
        owner: Option<UserId>,
    },
    /// Arbitrary accounts in the user directory.
    UserDirectory,
    /// The caller's own profile.
    SelfProfile,
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The operation needs a signed-in caller.
    Unauthenticated,
    /// The caller's tier is below what the operation needs.
    InsufficientRole,
    /// The caller neither wrote the resource nor moderates.
    NotOwner,
}

impl DenyReason {
    /// Wire tag placed in error details.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InsufficientRole => "insufficient_role",
            Self::NotOwner => "not_owner",
        }
    }

    /// Map the refusal onto the error taxonomy: missing credentials are
    /// `unauthorized`, everything else `forbidden`.
    pub fn into_error(self) -> Error {
        let details = json!({ "reason": self.as_str() });
        match self {
            Self::Unauthenticated => {
                Error::unauthorized("authentication credentials were not provided")
                    .with_details(details)
            }
            Self::InsufficientRole => {
                Error::forbidden("your role does not permit this action").with_details(details)
            }
            Self::NotOwner => {
                Error::forbidden("only the author or a moderator may change this")
                    .with_details(details)
            }
        }
    }
}

/// Outcome of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Allow,
    /// The request is refused for the given reason.
    Deny(DenyReason),
}

impl Decision {
    /// Convert into a `Result` for `?` chaining inside services.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason.into_error()),
        }
    }
}

/// Decide whether `requester` may perform `operation` on `resource`.
///
/// # Examples
/// ```
/// use critique::domain::access::{authorize, Decision, DenyReason, Operation, Requester, Resource};
///
/// let decision = authorize(&Requester::Anonymous, Operation::Create, Resource::Catalogue);
/// assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
/// ```
pub fn authorize(requester: &Requester, operation: Operation, resource: Resource) -> Decision {
    match resource {
        Resource::Catalogue => {
            if operation.is_read() {
                return Decision::Allow;
            }
            require_tier(requester, Tier::Admin)
        }
        Resource::Authored { owner } => {
            if operation.is_read() {
                return Decision::Allow;
            }
            let Requester::Authenticated { id, tier } = requester else {
                return Decision::Deny(DenyReason::Unauthenticated);
            };
            if matches!(operation, Operation::Create) {
                return Decision::Allow;
            }
            if *tier >= Tier::Moderator || owner == Some(*id) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        Resource::UserDirectory => require_tier(requester, Tier::Admin),
        Resource::SelfProfile => match requester {
            Requester::Anonymous => Decision::Deny(DenyReason::Unauthenticated),
            Requester::Authenticated { .. } => Decision::Allow,
        },
    }
}

fn require_tier(requester: &Requester, minimum: Tier) -> Decision {
    match requester {
        Requester::Anonymous => Decision::Deny(DenyReason::Unauthenticated),
        Requester::Authenticated { tier, .. } if *tier >= minimum => Decision::Allow,
        Requester::Authenticated { .. } => Decision::Deny(DenyReason::InsufficientRole),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn member(tier: Tier) -> Requester {
        Requester::Authenticated {
            id: UserId::random(),
            tier,
        }
    }

    #[rstest]
    #[case(Operation::Read)]
    #[case(Operation::Create)]
    #[case(Operation::Update)]
    #[case(Operation::Delete)]
    fn admins_may_do_anything_to_the_catalogue(#[case] operation: Operation) {
        assert_eq!(
            authorize(&member(Tier::Admin), operation, Resource::Catalogue),
            Decision::Allow
        );
    }

    #[rstest]
    #[case(Tier::User)]
    #[case(Tier::Moderator)]
    fn lower_tiers_cannot_write_the_catalogue(#[case] tier: Tier) {
        assert_eq!(
            authorize(&member(tier), Operation::Delete, Resource::Catalogue),
            Decision::Deny(DenyReason::InsufficientRole)
        );
    }

    #[rstest]
    fn anonymous_catalogue_writes_are_unauthenticated() {
        assert_eq!(
            authorize(&Requester::Anonymous, Operation::Create, Resource::Catalogue),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            authorize(&Requester::Anonymous, Operation::Read, Resource::Catalogue),
            Decision::Allow
        );
    }

    #[rstest]
    fn any_member_may_create_authored_content() {
        let resource = Resource::Authored { owner: None };
        assert_eq!(
            authorize(&member(Tier::User), Operation::Create, resource),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Requester::Anonymous, Operation::Create, resource),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[rstest]
    #[case(Operation::Update)]
    #[case(Operation::Delete)]
    fn authors_may_change_their_own_content(#[case] operation: Operation) {
        let author = UserId::random();
        let requester = Requester::Authenticated {
            id: author,
            tier: Tier::User,
        };
        let resource = Resource::Authored {
            owner: Some(author),
        };
        assert_eq!(authorize(&requester, operation, resource), Decision::Allow);
    }

    #[rstest]
    #[case(Tier::User, Decision::Deny(DenyReason::NotOwner))]
    #[case(Tier::Moderator, Decision::Allow)]
    #[case(Tier::Admin, Decision::Allow)]
    fn non_authors_need_moderation_rights(#[case] tier: Tier, #[case] expected: Decision) {
        let resource = Resource::Authored {
            owner: Some(UserId::random()),
        };
        assert_eq!(
            authorize(&member(tier), Operation::Delete, resource),
            expected
        );
    }

    #[rstest]
    #[case(Tier::User, Decision::Deny(DenyReason::InsufficientRole))]
    #[case(Tier::Moderator, Decision::Deny(DenyReason::InsufficientRole))]
    #[case(Tier::Admin, Decision::Allow)]
    fn user_directory_is_admin_only(#[case] tier: Tier, #[case] expected: Decision) {
        assert_eq!(
            authorize(&member(tier), Operation::Read, Resource::UserDirectory),
            expected
        );
    }

    #[rstest]
    fn self_profile_requires_authentication() {
        assert_eq!(
            authorize(&member(Tier::User), Operation::Update, Resource::SelfProfile),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Requester::Anonymous, Operation::Read, Resource::SelfProfile),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[rstest]
    #[case(DenyReason::Unauthenticated, ErrorCode::Unauthorized, "unauthenticated")]
    #[case(DenyReason::InsufficientRole, ErrorCode::Forbidden, "insufficient_role")]
    #[case(DenyReason::NotOwner, ErrorCode::Forbidden, "not_owner")]
    fn deny_reasons_map_to_error_codes(
        #[case] reason: DenyReason,
        #[case] code: ErrorCode,
        #[case] tag: &str,
    ) {
        let error = reason.into_error();
        assert_eq!(error.code(), code);
        assert_eq!(
            error.details().and_then(|d| d.get("reason")),
            Some(&serde_json::Value::from(tag))
        );
    }

    #[rstest]
    fn tiers_are_ordered() {
        assert!(Tier::Anonymous < Tier::User);
        assert!(Tier::User < Tier::Moderator);
        assert!(Tier::Moderator < Tier::Admin);
    }
}
