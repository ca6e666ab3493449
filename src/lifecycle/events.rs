//! GitHub webhook payload shapes
//!
//! Only the subset of the payload the lifecycle state machine consumes is
//! modeled; everything else is ignored by serde. Delivery is at-least-once
//! and the sender does not usefully retry on errors, so parsing is lenient:
//! a field missing where we need one downgrades the event to "ignored",
//! never to a failure response.

use serde::Deserialize;

/// Event types carried in the `X-GitHub-Event` header
pub const EVENT_INSTALLATION: &str = "installation";
pub const EVENT_INSTALLATION_REPOSITORIES: &str = "installation_repositories";
/// Deprecated alias still delivered by older app configurations
pub const EVENT_LEGACY_INSTALLATION_REPOSITORIES: &str = "integration_installation_repositories";
pub const EVENT_PULL_REQUEST: &str = "pull_request";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ActivityEvent {
    pub action: Option<String>,
    pub installation: Option<Installation>,
    pub organization: Option<Account>,
    pub repository: Option<RepositoryPayload>,
    #[serde(default)]
    pub repositories_added: Vec<RepoRef>,
    #[serde(default)]
    pub repositories_removed: Vec<RepoRef>,
    pub sender: Option<Account>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Installation {
    pub id: Option<i64>,
    pub account: Option<Account>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Account {
    pub login: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RepositoryPayload {
    pub owner: Option<Account>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RepoRef {
    pub id: i64,
    pub name: Option<String>,
    pub full_name: Option<String>,
}

impl ActivityEvent {
    /// Resolve the organization name from an installation event. Payload
    /// variants put it in different places; first hit wins.
    pub fn organization_name(&self) -> Option<&str> {
        if let Some(login) = self
            .installation
            .as_ref()
            .and_then(|i| i.account.as_ref())
            .map(|a| a.login.as_str())
        {
            return Some(login);
        }
        if let Some(ref organization) = self.organization {
            return Some(&organization.login);
        }
        self.repository
            .as_ref()
            .and_then(|r| r.owner.as_ref())
            .map(|a| a.login.as_str())
    }

    pub fn sender_login(&self) -> Option<&str> {
        self.sender.as_ref().map(|s| s.login.as_str())
    }
}

impl RepoRef {
    /// Organization login derived from the "org/repo" full name
    pub fn organization_name(&self) -> Option<&str> {
        self.full_name.as_deref().and_then(|f| f.split('/').next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_name_from_installation_account() {
        let event: ActivityEvent = serde_json::from_str(
            r#"{
                "action": "created",
                "installation": { "id": 42, "account": { "login": "acme" } },
                "organization": { "login": "shadow" }
            }"#,
        )
        .unwrap();
        assert_eq!(event.organization_name(), Some("acme"));
    }

    #[test]
    fn test_org_name_falls_back_to_organization_login() {
        let event: ActivityEvent = serde_json::from_str(
            r#"{
                "action": "created",
                "installation": { "id": 42 },
                "organization": { "login": "acme" }
            }"#,
        )
        .unwrap();
        assert_eq!(event.organization_name(), Some("acme"));
    }

    #[test]
    fn test_org_name_falls_back_to_repository_owner() {
        let event: ActivityEvent = serde_json::from_str(
            r#"{
                "action": "created",
                "repository": { "owner": { "login": "acme" } }
            }"#,
        )
        .unwrap();
        assert_eq!(event.organization_name(), Some("acme"));
    }

    #[test]
    fn test_org_name_unresolvable() {
        let event: ActivityEvent = serde_json::from_str(r#"{ "action": "created" }"#).unwrap();
        assert_eq!(event.organization_name(), None);
    }

    #[test]
    fn test_repo_ref_org_from_full_name() {
        let repo = RepoRef {
            id: 999,
            name: Some("newrepo".into()),
            full_name: Some("acme/newrepo".into()),
        };
        assert_eq!(repo.organization_name(), Some("acme"));
    }

    #[test]
    fn test_removed_payload_parses() {
        let event: ActivityEvent = serde_json::from_str(
            r#"{
                "action": "removed",
                "repositories_removed": [{ "id": 123 }],
                "sender": { "login": "mallory" }
            }"#,
        )
        .unwrap();
        assert_eq!(event.repositories_removed.len(), 1);
        assert_eq!(event.repositories_removed[0].id, 123);
        assert_eq!(event.sender_login(), Some("mallory"));
    }
}
