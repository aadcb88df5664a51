//! Read/write rules for sessions.
//!
//! Completed sessions are public and frozen. Incomplete sessions are visible and
//! writable only to their creator and participants.

use crate::{AccessError, Principal, Session};

pub fn can_read(principal: Option<&Principal>, session: &Session) -> bool {
    if session.is_complete {
        return true;
    }
    principal.is_some_and(|p| session.is_participant(&p.id))
}

pub fn can_write(principal: Option<&Principal>, session: &Session) -> bool {
    if session.is_complete {
        return false;
    }
    principal.is_some_and(|p| session.is_participant(&p.id))
}

pub fn is_owner(principal: Option<&Principal>, session: &Session) -> bool {
    principal.is_some_and(|p| p.id == session.created_by)
}

/// Policy for a signed-in principal who opens an incomplete session they are not part of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Holding the session id is the invitation: the first view joins.
    #[default]
    AutoJoin,
    /// Only existing participants may open the session.
    MembersOnly,
}

impl std::str::FromStr for JoinPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto_join" | "auto-join" | "autojoin" => Ok(JoinPolicy::AutoJoin),
            "members_only" | "members-only" | "membersonly" => Ok(JoinPolicy::MembersOnly),
            other => Err(anyhow::anyhow!("unknown join policy: {}", other)),
        }
    }
}

impl std::fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinPolicy::AutoJoin => write!(f, "auto_join"),
            JoinPolicy::MembersOnly => write!(f, "members_only"),
        }
    }
}

/// What a read request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDecision {
    /// Readable as is.
    Granted,
    /// Readable, and the principal must be appended to `participants`.
    GrantedWithJoin,
}

/// Applies the read rules plus `policy` for a principal who is not yet a participant.
pub fn decide_read(
    principal: Option<&Principal>,
    session: &Session,
    policy: JoinPolicy,
) -> Result<ReadDecision, AccessError> {
    // Completed sessions are immutable, participants included.
    if session.is_complete {
        return Ok(ReadDecision::Granted);
    }

    let principal = principal.ok_or(AccessError::AuthenticationRequired)?;
    if session.participants.contains(&principal.id) {
        return Ok(ReadDecision::Granted);
    }

    if session.created_by == principal.id || policy == JoinPolicy::AutoJoin {
        return Ok(ReadDecision::GrantedWithJoin);
    }

    Err(AccessError::Denied {
        session_id: session.id.clone(),
        principal: principal.id.to_string(),
    })
}

pub fn authorize_write(principal: &Principal, session: &Session) -> Result<(), AccessError> {
    if can_write(Some(principal), session) {
        Ok(())
    } else {
        Err(AccessError::Denied {
            session_id: session.id.clone(),
            principal: principal.id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use sqlx::types::Uuid;

    use super::*;

    fn fixture() -> (Principal, Principal, Session) {
        let owner = Principal::new(Uuid::new_v4());
        let stranger = Principal::new(Uuid::new_v4());
        let session = Session::new(owner.id, "A door appears");
        (owner, stranger, session)
    }

    #[test]
    fn completed_sessions_are_public_and_frozen() {
        let (owner, stranger, mut session) = fixture();
        session.is_complete = true;

        assert!(can_read(None, &session));
        assert!(can_read(Some(&stranger), &session));
        assert!(!can_write(Some(&owner), &session));
        assert!(!can_write(None, &session));
        assert!(is_owner(Some(&owner), &session));
    }

    #[test]
    fn incomplete_sessions_require_membership() {
        let (owner, stranger, mut session) = fixture();

        assert!(!can_read(None, &session));
        assert!(!can_write(None, &session));
        assert!(!can_read(Some(&stranger), &session));
        assert!(!can_write(Some(&stranger), &session));
        assert!(can_read(Some(&owner), &session));
        assert!(can_write(Some(&owner), &session));
        assert!(!is_owner(Some(&stranger), &session));

        session.join(stranger.id);
        assert!(can_read(Some(&stranger), &session));
        assert!(can_write(Some(&stranger), &session));
        assert!(!is_owner(Some(&stranger), &session));
    }

    #[test]
    fn creator_keeps_rights_even_if_missing_from_participants() {
        let (owner, _, mut session) = fixture();
        session.participants.clear();
        assert!(can_write(Some(&owner), &session));
        assert_eq!(
            decide_read(Some(&owner), &session, JoinPolicy::MembersOnly),
            Ok(ReadDecision::GrantedWithJoin)
        );
    }

    #[test]
    fn join_policy_governs_strangers() {
        let (owner, stranger, mut session) = fixture();

        assert_eq!(decide_read(Some(&owner), &session, JoinPolicy::MembersOnly), Ok(ReadDecision::Granted));
        assert_eq!(
            decide_read(Some(&stranger), &session, JoinPolicy::AutoJoin),
            Ok(ReadDecision::GrantedWithJoin)
        );
        assert!(matches!(
            decide_read(Some(&stranger), &session, JoinPolicy::MembersOnly),
            Err(AccessError::Denied { .. })
        ));
        assert_eq!(
            decide_read(None, &session, JoinPolicy::AutoJoin),
            Err(AccessError::AuthenticationRequired)
        );

        session.is_complete = true;
        assert_eq!(decide_read(None, &session, JoinPolicy::MembersOnly), Ok(ReadDecision::Granted));
        assert_eq!(decide_read(Some(&stranger), &session, JoinPolicy::AutoJoin), Ok(ReadDecision::Granted));
    }

    #[test]
    fn join_policy_parses_from_config() -> anyhow::Result<()> {
        assert_eq!("auto_join".parse::<JoinPolicy>()?, JoinPolicy::AutoJoin);
        assert_eq!("MEMBERS-ONLY".parse::<JoinPolicy>()?, JoinPolicy::MembersOnly);
        assert!("everyone".parse::<JoinPolicy>().is_err());
        Ok(())
    }
}
