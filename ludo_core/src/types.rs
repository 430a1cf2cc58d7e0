//! Identifier newtypes and decoded credential claims.

use serde::{Deserialize, Serialize};

/// Characters MongoDB forbids in database names.
const FORBIDDEN_DB_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

/// Name of one tenant's physical database. Immutable once resolved for a
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Validates the raw claim value as a usable database name.
    ///
    /// Rejects empty names, names over 63 bytes (the server-side limit),
    /// and names containing characters the server forbids.
    pub fn new(id: String) -> Option<Self> {
        if id.is_empty() || id.len() > 63 || id.contains(FORBIDDEN_DB_CHARS) {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string()).ok_or_else(|| anyhow::anyhow!("Invalid tenant ID"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: String) -> Option<Self> {
        if id.is_empty() || id.len() > 100 {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string()).ok_or_else(|| anyhow::anyhow!("Invalid user ID"))
    }
}

/// Claims decoded from a bearer access credential.
///
/// Decoding itself (signature checks, expiry) is the auth layer's job;
/// the tenant core only consumes the claims it produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: UserId,
    /// Database claim naming the caller's tenant. Absent for routes served
    /// purely from the system database.
    pub database: Option<String>,
    /// Teams the caller belongs to; drives team-scoped visibility.
    #[serde(default)]
    pub teams: Vec<String>,
}

/// Claims decoded from a refresh credential. Used as the fallback tenant
/// source when no access claims are present (token renewal flows).
///
/// Refresh claims carry no team scope; routes serving team-scoped data
/// must require access claims rather than rely on an empty scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: UserId,
    pub database: Option<String>,
}

/// Everything the auth layer decoded for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    pub access: Option<AccessClaims>,
    pub refresh: Option<RefreshClaims>,
}

impl ClaimSet {
    pub fn from_access(claims: AccessClaims) -> Self {
        Self {
            access: Some(claims),
            refresh: None,
        }
    }

    pub fn from_refresh(claims: RefreshClaims) -> Self {
        Self {
            access: None,
            refresh: Some(claims),
        }
    }

    /// Team scope of the caller, empty when unrestricted.
    ///
    /// Only access claims carry teams, so a refresh-only claim set is
    /// empty here. An empty scope means global visibility downstream;
    /// callers gating team-scoped reads must check [`Self::access`]
    /// instead of treating this as an authorization signal.
    pub fn teams(&self) -> &[String] {
        self.access.as_ref().map_or(&[], |a| a.teams.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_rejects_unusable_database_names() {
        assert!(TenantId::new(String::new()).is_none());
        assert!(TenantId::new("a".repeat(64)).is_none());
        assert!(TenantId::new("has space".to_string()).is_none());
        assert!(TenantId::new("dotted.name".to_string()).is_none());
        assert!(TenantId::new("dollar$".to_string()).is_none());

        let id = TenantId::new("acme-fc".to_string()).unwrap();
        assert_eq!(id.as_str(), "acme-fc");
    }

    #[test]
    fn tenant_id_parses_from_str() {
        let id: TenantId = "other-co".parse().unwrap();
        assert_eq!(id.to_string(), "other-co");
        assert!("bad name".parse::<TenantId>().is_err());
    }

    #[test]
    fn claim_set_exposes_team_scope() {
        let user = UserId::new("u1".to_string()).unwrap();
        let claims = ClaimSet::from_access(AccessClaims {
            user_id: user,
            database: Some("acme-fc".to_string()),
            teams: vec!["T1".to_string()],
        });
        assert_eq!(claims.teams(), &["T1".to_string()]);
        assert!(ClaimSet::default().teams().is_empty());
    }

    #[test]
    fn refresh_only_claims_carry_no_team_scope() {
        let claims = ClaimSet::from_refresh(RefreshClaims {
            user_id: UserId::new("u1".to_string()).unwrap(),
            database: Some("acme-fc".to_string()),
        });
        assert!(claims.teams().is_empty());
        assert!(claims.access.is_none());
    }
}
