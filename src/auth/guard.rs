//! Rendering gate for protected views, mirrored server-side as a pure
//! decision function so the transition rules are testable. The client
//! resolves its identity once per mount and feeds the outcome in here.

use crate::auth::dto::PublicUser;
use crate::auth::store::Role;

/// Outcome of the asynchronous identity resolution.
#[derive(Debug, Clone)]
pub enum IdentityState {
    /// Resolution still in flight.
    Loading,
    Authenticated(PublicUser),
    Unauthenticated,
}

/// What the guarded view should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render a placeholder; never redirect while loading.
    Pending,
    /// Render the protected children.
    Allow,
    /// Redirect to home, carrying the originating location for an optional
    /// post-login return.
    RedirectHome { from: Option<String> },
}

pub fn is_admin(user: &PublicUser) -> bool {
    user.role == Role::Admin
}

pub fn evaluate(
    identity: &IdentityState,
    admin_only: bool,
    location: Option<&str>,
) -> GuardDecision {
    if matches!(identity, IdentityState::Loading) {
        return GuardDecision::Pending;
    }

    // Admin-only check runs first: an authenticated non-admin is sent home
    // just like an anonymous visitor.
    if admin_only && !matches!(identity, IdentityState::Authenticated(u) if is_admin(u)) {
        return GuardDecision::RedirectHome {
            from: location.map(str::to_owned),
        };
    }

    match identity {
        IdentityState::Authenticated(_) => GuardDecision::Allow,
        _ => GuardDecision::RedirectHome {
            from: location.map(str::to_owned),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> PublicUser {
        PublicUser {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            first_name: "Alice".into(),
            last_name: "A".into(),
            role,
        }
    }

    #[test]
    fn loading_never_redirects() {
        let decision = evaluate(&IdentityState::Loading, true, Some("/admin"));
        assert_eq!(decision, GuardDecision::Pending);
        let decision = evaluate(&IdentityState::Loading, false, None);
        assert_eq!(decision, GuardDecision::Pending);
    }

    #[test]
    fn unauthenticated_redirects_with_origin() {
        let decision = evaluate(&IdentityState::Unauthenticated, false, Some("/store"));
        assert_eq!(
            decision,
            GuardDecision::RedirectHome {
                from: Some("/store".into())
            }
        );
    }

    #[test]
    fn authenticated_user_renders_plain_protected_view() {
        let identity = IdentityState::Authenticated(user_with_role(Role::User));
        assert_eq!(evaluate(&identity, false, None), GuardDecision::Allow);
    }

    #[test]
    fn admin_only_redirects_non_admins_even_when_authenticated() {
        let identity = IdentityState::Authenticated(user_with_role(Role::User));
        assert_eq!(
            evaluate(&identity, true, Some("/admin/dashboard")),
            GuardDecision::RedirectHome {
                from: Some("/admin/dashboard".into())
            }
        );
    }

    #[test]
    fn admin_only_redirects_unresolved_identity() {
        assert_eq!(
            evaluate(&IdentityState::Unauthenticated, true, None),
            GuardDecision::RedirectHome { from: None }
        );
    }

    #[test]
    fn admin_renders_admin_only_view() {
        let identity = IdentityState::Authenticated(user_with_role(Role::Admin));
        assert_eq!(evaluate(&identity, true, None), GuardDecision::Allow);
        assert!(is_admin(&user_with_role(Role::Admin)));
        assert!(!is_admin(&user_with_role(Role::User)));
    }
}
