//! Organization/repository lifecycle state machine
//!
//! Consumes GitHub webhook events and keeps repository enrollment in sync:
//! installation created/deleted, repositories added/removed. Delivery is
//! at-least-once and may be out of order, so every transition is idempotent.
//! Malformed or irrelevant events are logged and dropped; the webhook sender
//! always gets a success response.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::db::schemas::{EventDoc, EventType, RepositoryDoc};
use crate::lifecycle::events::{
    ActivityEvent, EVENT_INSTALLATION, EVENT_INSTALLATION_REPOSITORIES,
    EVENT_LEGACY_INSTALLATION_REPOSITORIES, EVENT_PULL_REQUEST,
};
use crate::lifecycle::notify::{auto_enabled_email, group_by_project, unable_to_check_email};
use crate::notify::EmailService;
use crate::store::LifecycleStore;
use crate::types::TurnstileError;

/// Outcome reported back through the webhook response body. Webhook senders
/// always get a 200-class response; the outcome is informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityOutcome {
    Handled { status: String },
    Ignored,
}

impl ActivityOutcome {
    fn handled(status: impl Into<String>) -> Self {
        ActivityOutcome::Handled { status: status.into() }
    }
}

/// Webhook-driven lifecycle processor
pub struct ActivityProcessor {
    store: Arc<dyn LifecycleStore>,
    mailer: Arc<dyn EmailService>,
    audit: Arc<dyn AuditLog>,
    /// Serializes the auto-enable check-then-create per organization so
    /// concurrent deliveries cannot race the single-CLA-Group invariant.
    org_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ActivityProcessor {
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        mailer: Arc<dyn EmailService>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            mailer,
            audit,
            org_locks: DashMap::new(),
        }
    }

    /// Process one webhook delivery. Never fails outward: business failures
    /// are reflected in the outcome status and logs only.
    pub async fn process(&self, event_type: &str, event: ActivityEvent) -> ActivityOutcome {
        let action = event.action.as_deref().unwrap_or("");
        debug!(event_type, action, "processing github activity event");

        match (event_type, action) {
            (EVENT_INSTALLATION, "created") => self.on_installation_created(&event).await,
            (EVENT_INSTALLATION, "deleted") => self.on_installation_deleted(&event).await,
            (EVENT_INSTALLATION_REPOSITORIES, "removed")
            | (EVENT_LEGACY_INSTALLATION_REPOSITORIES, "removed") => {
                self.on_repositories_removed(&event).await
            }
            (EVENT_INSTALLATION_REPOSITORIES, "added")
            | (EVENT_LEGACY_INSTALLATION_REPOSITORIES, "added") => {
                self.on_repositories_added(&event).await
            }
            (EVENT_PULL_REQUEST, "opened" | "reopened" | "synchronize") => {
                // Per-committer compliance checks run through the
                // authorization endpoint; the webhook only acknowledges.
                debug!("pull request event acknowledged");
                ActivityOutcome::handled("pull request event acknowledged")
            }
            _ => {
                debug!(event_type, action, "ignoring github activity event");
                ActivityOutcome::Ignored
            }
        }
    }

    async fn on_installation_created(&self, event: &ActivityEvent) -> ActivityOutcome {
        let Some(organization_name) = event.organization_name() else {
            warn!("unable to determine organization name from installation created event");
            return ActivityOutcome::Ignored;
        };
        let Some(installation_id) = event.installation.as_ref().and_then(|i| i.id) else {
            warn!(organization_name, "installation created event carries no installation id");
            return ActivityOutcome::Ignored;
        };

        let organization = match self.store.load_organization(organization_name).await {
            Ok(organization) => organization,
            Err(e) => {
                warn!(organization_name, error = %e, "organization lookup failed");
                return ActivityOutcome::Ignored;
            }
        };

        let Some(organization) = organization else {
            warn!(
                organization_name,
                "installation created for an organization not configured here"
            );
            return ActivityOutcome::handled(
                "GitHub organization must be created through the management console.",
            );
        };

        let already_enrolled = organization.installation_id.is_some();
        if let Err(e) = self
            .store
            .set_installation_id(organization_name, installation_id)
            .await
        {
            warn!(organization_name, error = %e, "failed to record installation id");
            return ActivityOutcome::Ignored;
        }

        if already_enrolled {
            // Re-delivery or app re-install: re-sync the id, report distinctly
            info!(organization_name, installation_id, "already enrolled organization updated");
            ActivityOutcome::handled(
                "Already enrolled organization updated. CLA system is operational.",
            )
        } else {
            info!(organization_name, installation_id, "organization enrollment completed");
            let mut audit_event = EventDoc::new(
                EventType::OrganizationEnrolled,
                format!("organization {} enrolled with installation {}", organization_name, installation_id),
            );
            audit_event.event_user_id = event.sender_login().map(|s| s.to_string());
            if let Err(e) = self.audit.record_event(audit_event).await {
                warn!(organization_name, error = %e, "failed to record enrollment audit event");
            }
            ActivityOutcome::handled("Organization enrollment completed. CLA system is operational.")
        }
    }

    async fn on_installation_deleted(&self, event: &ActivityEvent) -> ActivityOutcome {
        let Some(organization_name) = event.organization_name() else {
            warn!("unable to determine organization name from installation deleted event");
            return ActivityOutcome::Ignored;
        };

        // Informational only: repositories keep their state, managers get told
        let repositories = match self.store.repositories_by_organization(organization_name).await {
            Ok(repositories) => repositories,
            Err(e) => {
                warn!(organization_name, error = %e, "repository lookup failed");
                return ActivityOutcome::Ignored;
            }
        };

        self.notify_unable_to_check(&repositories).await;
        ActivityOutcome::handled(format!(
            "project managers notified for {} repositories",
            repositories.len()
        ))
    }

    async fn on_repositories_removed(&self, event: &ActivityEvent) -> ActivityOutcome {
        let sender = event.sender_login().unwrap_or("unknown");

        let mut repositories = Vec::new();
        for removed in &event.repositories_removed {
            match self.store.repository_by_external_id(removed.id).await {
                Ok(Some(repository)) => repositories.push(repository),
                Ok(None) => {
                    debug!(external_id = removed.id, "removed repository not tracked here")
                }
                Err(e) => {
                    warn!(external_id = removed.id, error = %e, "repository lookup failed")
                }
            }
        }

        self.notify_unable_to_check(&repositories).await;

        let mut disabled = 0usize;
        for repository in &repositories {
            let message = format!(
                "Disabling repository {} from GitHub organization {} with URL: {} from the CLA configuration.",
                repository.repository_name,
                repository.repository_organization_name,
                repository.repository_url
            );
            debug!("{}", message);

            let note = format!(
                "{} - Disabled due to GitHub installation_repositories removed event.",
                Utc::now().format("%Y-%m-%d %H:%M:%S")
            );
            if let Err(e) = self
                .store
                .disable_repository(&repository.repository_id, &note)
                .await
            {
                warn!(repository_id = %repository.repository_id, error = %e, "failed to disable repository");
                continue;
            }
            disabled += 1;

            let mut audit_event = EventDoc::new(EventType::RepositoryDisable, message);
            audit_event.event_project_id = Some(repository.repository_project_id.clone());
            audit_event.event_user_id = Some(sender.to_string());
            if let Err(e) = self.audit.record_event(audit_event).await {
                warn!(repository_id = %repository.repository_id, error = %e, "failed to record disable audit event");
            }
        }

        ActivityOutcome::handled(format!("{} repositories disabled", disabled))
    }

    async fn on_repositories_added(&self, event: &ActivityEvent) -> ActivityOutcome {
        if event.repositories_added.is_empty() {
            return ActivityOutcome::Ignored;
        }

        // Every repository in one delivery belongs to the same organization;
        // entries without a full_name cannot name it, so take the first that can
        let Some(organization_name) = event
            .repositories_added
            .iter()
            .find_map(|r| r.organization_name())
        else {
            warn!("no added repository carries a full_name, dropping event");
            return ActivityOutcome::Ignored;
        };
        let organization_name = organization_name.to_string();

        // Hold the per-org lock across the invariant check and the creates
        let lock = self
            .org_locks
            .entry(organization_name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let organization = match self.store.load_organization(&organization_name).await {
            Ok(Some(organization)) => organization,
            Ok(None) => {
                debug!(organization_name, "organization not registered, ignoring added repositories");
                return ActivityOutcome::Ignored;
            }
            Err(e) => {
                warn!(organization_name, error = %e, "organization lookup failed");
                return ActivityOutcome::Ignored;
            }
        };

        if !organization.auto_enabled {
            debug!(
                organization_name,
                "auto-enable not set, not adding repositories"
            );
            return ActivityOutcome::handled(
                "auto-enable not set for organization, repositories not added",
            );
        }

        // Auto-enable only works when the entire organization falls under a
        // single CLA Group: every existing repository must agree on one
        // project id and one SFID, otherwise there is no way to know which
        // group the new repositories belong to.
        let existing = match self.store.repositories_by_organization(&organization_name).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(organization_name, error = %e, "repository lookup failed");
                return ActivityOutcome::Ignored;
            }
        };

        let project_ids: BTreeSet<String> = existing
            .iter()
            .map(|r| r.repository_project_id.clone())
            .collect();
        let sfids: BTreeSet<Option<String>> = existing
            .iter()
            .map(|r| r.repository_sfdc_id.clone())
            .collect();

        if project_ids.len() != 1 || sfids.len() != 1 {
            let violation = TurnstileError::InvariantViolation(format!(
                "organization {} repositories span {} CLA Groups and {} SFIDs",
                organization_name,
                project_ids.len(),
                sfids.len()
            ));
            warn!(error = %violation, "auto-enable aborting batch");
            return ActivityOutcome::handled(
                "auto-enable aborted: organization repositories are not covered by a single CLA Group",
            );
        }

        let project_id = project_ids.into_iter().next().unwrap_or_default();
        let sfdc_id = sfids.into_iter().next().unwrap_or_default();

        let mut created = Vec::new();
        for added in &event.repositories_added {
            let Some(full_name) = added.full_name.as_deref() else {
                warn!(external_id = added.id, "added repository carries no full_name, skipping");
                continue;
            };

            // At-least-once delivery: a repository we already track is a
            // duplicate, not an error
            match self.store.repository_by_external_id(added.id).await {
                Ok(Some(_)) => {
                    debug!(external_id = added.id, "repository already enrolled, skipping");
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(external_id = added.id, error = %e, "repository lookup failed");
                    return ActivityOutcome::handled("auto-enable aborted: repository lookup failed");
                }
            }

            let mut repository = RepositoryDoc::new(
                Uuid::new_v4().to_string(),
                project_id.clone(),
                full_name.to_string(),
                organization_name.clone(),
            );
            repository.repository_external_id = Some(added.id);
            repository.repository_sfdc_id = sfdc_id.clone();

            if let Err(e) = self.store.create_repository(repository.clone()).await {
                warn!(full_name, error = %e, "could not create repository, aborting batch");
                return ActivityOutcome::handled("auto-enable aborted: repository creation failed");
            }

            info!(full_name, project_id = %project_id, "repository auto-enabled");
            let mut audit_event = EventDoc::new(
                EventType::RepositoryAutoEnable,
                format!("repository {} auto-enabled under CLA Group {}", full_name, project_id),
            );
            audit_event.event_project_id = Some(project_id.clone());
            audit_event.event_user_id = event.sender_login().map(|s| s.to_string());
            if let Err(e) = self.audit.record_event(audit_event).await {
                warn!(full_name, error = %e, "failed to record auto-enable audit event");
            }

            created.push(repository);
        }

        // One aggregated notification per project, after the whole batch
        self.notify_auto_enabled(&organization_name, &created).await;

        ActivityOutcome::handled(format!("auto-enabled {} repositories", created.len()))
    }

    /// Send the "unable to check pull requests" email, one per project
    async fn notify_unable_to_check(&self, repositories: &[RepositoryDoc]) {
        for (project_id, urls) in group_by_project(repositories) {
            let Some(project) = self.load_project_logged(&project_id).await else {
                continue;
            };
            let (subject, body) = unable_to_check_email(&project.project_name, &urls);
            if let Err(e) = self.mailer.send(&subject, &body, &project.acl).await {
                warn!(project_id, error = %e, "failed to send manager notification");
            }
        }
    }

    /// Send the "auto-enabled repositories" email, one per project
    async fn notify_auto_enabled(&self, organization_name: &str, repositories: &[RepositoryDoc]) {
        for (project_id, urls) in group_by_project(repositories) {
            let Some(project) = self.load_project_logged(&project_id).await else {
                continue;
            };
            let (subject, body) =
                auto_enabled_email(&project.project_name, organization_name, &urls);
            if let Err(e) = self.mailer.send(&subject, &body, &project.acl).await {
                warn!(project_id, error = %e, "failed to send auto-enable notification");
            }
        }
    }

    async fn load_project_logged(&self, project_id: &str) -> Option<crate::db::schemas::ProjectDoc> {
        match self.store.find_project(project_id).await {
            Ok(Some(project)) => Some(project),
            Ok(None) => {
                warn!(project_id, "unable to load project for notification");
                None
            }
            Err(e) => {
                warn!(project_id, error = %e, "project lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{GithubOrgDoc, ProjectDoc};
    use crate::types::{Result, TurnstileError};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeStore {
        organizations: StdMutex<Vec<GithubOrgDoc>>,
        repositories: StdMutex<Vec<RepositoryDoc>>,
        projects: Vec<ProjectDoc>,
    }

    #[async_trait::async_trait]
    impl LifecycleStore for FakeStore {
        async fn load_organization(&self, organization_name: &str) -> Result<Option<GithubOrgDoc>> {
            Ok(self
                .organizations
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.organization_name == organization_name)
                .cloned())
        }

        async fn set_installation_id(
            &self,
            organization_name: &str,
            installation_id: i64,
        ) -> Result<()> {
            let mut organizations = self.organizations.lock().unwrap();
            match organizations
                .iter_mut()
                .find(|o| o.organization_name == organization_name)
            {
                Some(organization) => {
                    organization.installation_id = Some(installation_id);
                    Ok(())
                }
                None => Err(TurnstileError::NotFound(format!(
                    "organization {}",
                    organization_name
                ))),
            }
        }

        async fn repositories_by_organization(
            &self,
            organization_name: &str,
        ) -> Result<Vec<RepositoryDoc>> {
            Ok(self
                .repositories
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.repository_organization_name == organization_name)
                .cloned()
                .collect())
        }

        async fn repository_by_external_id(
            &self,
            external_id: i64,
        ) -> Result<Option<RepositoryDoc>> {
            Ok(self
                .repositories
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.repository_external_id == Some(external_id))
                .cloned())
        }

        async fn disable_repository(&self, repository_id: &str, note: &str) -> Result<()> {
            let mut repositories = self.repositories.lock().unwrap();
            match repositories
                .iter_mut()
                .find(|r| r.repository_id == repository_id)
            {
                Some(repository) => {
                    repository.enabled = false;
                    repository.notes.push(note.to_string());
                    Ok(())
                }
                None => Err(TurnstileError::NotFound(format!(
                    "repository {}",
                    repository_id
                ))),
            }
        }

        async fn create_repository(&self, repository: RepositoryDoc) -> Result<()> {
            self.repositories.lock().unwrap().push(repository);
            Ok(())
        }

        async fn find_project(&self, project_id: &str) -> Result<Option<ProjectDoc>> {
            Ok(self.projects.iter().find(|p| p.project_id == project_id).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: StdMutex<Vec<(String, Vec<String>, String)>>,
    }

    #[async_trait::async_trait]
    impl EmailService for RecordingMailer {
        async fn send(&self, subject: &str, html_body: &str, recipients: &[String]) -> Result<()> {
            self.sent.lock().unwrap().push((
                subject.to_string(),
                recipients.to_vec(),
                html_body.to_string(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        events: StdMutex<Vec<EventDoc>>,
    }

    #[async_trait::async_trait]
    impl AuditLog for RecordingAudit {
        async fn record_event(&self, event: EventDoc) -> Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct Harness {
        store: Arc<FakeStore>,
        mailer: Arc<RecordingMailer>,
        audit: Arc<RecordingAudit>,
        processor: ActivityProcessor,
    }

    fn harness(store: FakeStore) -> Harness {
        let store = Arc::new(store);
        let mailer = Arc::new(RecordingMailer::default());
        let audit = Arc::new(RecordingAudit::default());
        let processor = ActivityProcessor::new(
            Arc::clone(&store) as Arc<dyn LifecycleStore>,
            Arc::clone(&mailer) as Arc<dyn EmailService>,
            Arc::clone(&audit) as Arc<dyn AuditLog>,
        );
        Harness {
            store,
            mailer,
            audit,
            processor,
        }
    }

    fn registered_org(name: &str, auto_enabled: bool) -> GithubOrgDoc {
        let mut organization = GithubOrgDoc::new(name.into(), Some("S1".into()));
        organization.auto_enabled = auto_enabled;
        organization
    }

    fn tracked_repo(id: &str, project_id: &str, full_name: &str, external_id: i64) -> RepositoryDoc {
        let mut repository = RepositoryDoc::new(
            id.into(),
            project_id.into(),
            full_name.into(),
            full_name.split('/').next().unwrap().into(),
        );
        repository.repository_external_id = Some(external_id);
        repository.repository_sfdc_id = Some("S1".into());
        repository
    }

    fn managed_project(project_id: &str, name: &str) -> ProjectDoc {
        let mut project = ProjectDoc::new(project_id.into(), name.into());
        project.acl = vec!["manager@example.org".into()];
        project
    }

    fn installation_created(org: &str, installation_id: i64) -> ActivityEvent {
        serde_json::from_value(serde_json::json!({
            "action": "created",
            "installation": { "id": installation_id, "account": { "login": org } },
            "sender": { "login": "octocat" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_installation_created_enrolls_then_updates() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", false)]),
            ..Default::default()
        };
        let h = harness(store);

        let first = h
            .processor
            .process(EVENT_INSTALLATION, installation_created("acme", 42))
            .await;
        assert_eq!(
            first,
            ActivityOutcome::handled("Organization enrollment completed. CLA system is operational.")
        );

        // Same event delivered again: state is unchanged, message differs
        let second = h
            .processor
            .process(EVENT_INSTALLATION, installation_created("acme", 42))
            .await;
        assert_eq!(
            second,
            ActivityOutcome::handled("Already enrolled organization updated. CLA system is operational.")
        );

        let organizations = h.store.organizations.lock().unwrap();
        assert_eq!(organizations[0].installation_id, Some(42));
    }

    #[tokio::test]
    async fn test_installation_created_unregistered_org() {
        let h = harness(FakeStore::default());
        let outcome = h
            .processor
            .process(EVENT_INSTALLATION, installation_created("ghost", 42))
            .await;
        assert_eq!(
            outcome,
            ActivityOutcome::handled(
                "GitHub organization must be created through the management console."
            )
        );
    }

    #[tokio::test]
    async fn test_malformed_installation_event_dropped() {
        let h = harness(FakeStore::default());
        let event: ActivityEvent =
            serde_json::from_value(serde_json::json!({ "action": "created" })).unwrap();
        let outcome = h.processor.process(EVENT_INSTALLATION, event).await;
        assert_eq!(outcome, ActivityOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_installation_deleted_notifies_managers() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", false)]),
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 1)]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        let event: ActivityEvent = serde_json::from_value(serde_json::json!({
            "action": "deleted",
            "installation": { "id": 42, "account": { "login": "acme" } }
        }))
        .unwrap();
        h.processor.process(EVENT_INSTALLATION, event).await;

        let sent = h.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, vec!["manager@example.org".to_string()]);
        assert!(sent[0].0.contains("Unable to check"));
    }

    fn repositories_removed(ids: &[i64]) -> ActivityEvent {
        serde_json::from_value(serde_json::json!({
            "action": "removed",
            "repositories_removed": ids.iter().map(|id| serde_json::json!({ "id": id })).collect::<Vec<_>>(),
            "sender": { "login": "mallory" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_repositories_removed_disables_idempotently() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", false)]),
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 123)]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        h.processor
            .process(EVENT_INSTALLATION_REPOSITORIES, repositories_removed(&[123]))
            .await;
        // Re-delivery of the same removal: still disabled, never an error
        let outcome = h
            .processor
            .process(EVENT_INSTALLATION_REPOSITORIES, repositories_removed(&[123]))
            .await;
        assert_eq!(outcome, ActivityOutcome::handled("1 repositories disabled"));

        let repositories = h.store.repositories.lock().unwrap();
        assert!(!repositories[0].enabled);
        // Duplicate audit notes are tolerated by design
        assert_eq!(repositories[0].notes.len(), 2);

        let events = h.audit.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::RepositoryDisable);
        assert_eq!(events[0].event_user_id.as_deref(), Some("mallory"));
    }

    #[tokio::test]
    async fn test_legacy_event_alias_handled() {
        let store = FakeStore {
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 123)]),
            projects: vec![managed_project("p1", "Kernel")],
            ..Default::default()
        };
        let h = harness(store);

        let outcome = h
            .processor
            .process(
                EVENT_LEGACY_INSTALLATION_REPOSITORIES,
                repositories_removed(&[123]),
            )
            .await;
        assert_eq!(outcome, ActivityOutcome::handled("1 repositories disabled"));
    }

    fn repositories_added(repos: &[(i64, &str)]) -> ActivityEvent {
        serde_json::from_value(serde_json::json!({
            "action": "added",
            "repositories_added": repos
                .iter()
                .map(|(id, full_name)| serde_json::json!({
                    "id": id,
                    "name": full_name.split('/').nth(1).unwrap(),
                    "full_name": full_name
                }))
                .collect::<Vec<_>>(),
            "sender": { "login": "octocat" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_auto_enable_end_to_end() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", true)]),
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 1)]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        let outcome = h
            .processor
            .process(
                EVENT_INSTALLATION_REPOSITORIES,
                repositories_added(&[(999, "acme/newrepo")]),
            )
            .await;
        assert_eq!(outcome, ActivityOutcome::handled("auto-enabled 1 repositories"));

        let repositories = h.store.repositories.lock().unwrap();
        assert_eq!(repositories.len(), 2);
        let new_repo = repositories
            .iter()
            .find(|r| r.repository_external_id == Some(999))
            .unwrap();
        assert_eq!(new_repo.repository_project_id, "p1");
        assert_eq!(new_repo.repository_sfdc_id.as_deref(), Some("S1"));
        assert!(new_repo.enabled);
        drop(repositories);

        // One aggregated notification to the project managers
        let sent = h.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("Auto-enabled"));
        assert_eq!(sent[0].1, vec!["manager@example.org".to_string()]);
        assert!(sent[0].2.contains("acme/newrepo"));
    }

    #[tokio::test]
    async fn test_auto_enable_guard_multiple_cla_groups() {
        let mut other = tracked_repo("r2", "p2", "acme/beta", 2);
        other.repository_sfdc_id = Some("S2".into());
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", true)]),
            repositories: StdMutex::new(vec![
                tracked_repo("r1", "p1", "acme/alpha", 1),
                other,
            ]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        let outcome = h
            .processor
            .process(
                EVENT_INSTALLATION_REPOSITORIES,
                repositories_added(&[(999, "acme/newrepo")]),
            )
            .await;
        assert_eq!(
            outcome,
            ActivityOutcome::handled(
                "auto-enable aborted: organization repositories are not covered by a single CLA Group"
            )
        );

        // All-or-nothing: nothing was created, nobody was notified
        assert_eq!(h.store.repositories.lock().unwrap().len(), 2);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_enable_skipped_when_flag_unset() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", false)]),
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 1)]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        let outcome = h
            .processor
            .process(
                EVENT_INSTALLATION_REPOSITORIES,
                repositories_added(&[(999, "acme/newrepo")]),
            )
            .await;
        assert_eq!(
            outcome,
            ActivityOutcome::handled(
                "auto-enable not set for organization, repositories not added"
            )
        );
        assert_eq!(h.store.repositories.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_auto_enable_org_from_first_named_repository() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", true)]),
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 1)]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        // First entry lacks a full_name; the batch must still resolve the
        // organization from the second and process it
        let event: ActivityEvent = serde_json::from_value(serde_json::json!({
            "action": "added",
            "repositories_added": [
                { "id": 998 },
                { "id": 999, "name": "newrepo", "full_name": "acme/newrepo" }
            ],
            "sender": { "login": "octocat" }
        }))
        .unwrap();

        let outcome = h
            .processor
            .process(EVENT_INSTALLATION_REPOSITORIES, event)
            .await;
        assert_eq!(outcome, ActivityOutcome::handled("auto-enabled 1 repositories"));

        let repositories = h.store.repositories.lock().unwrap();
        assert_eq!(repositories.len(), 2);
        assert!(repositories
            .iter()
            .any(|r| r.repository_external_id == Some(999)));
    }

    #[tokio::test]
    async fn test_auto_enable_duplicate_delivery_skips_existing() {
        let store = FakeStore {
            organizations: StdMutex::new(vec![registered_org("acme", true)]),
            repositories: StdMutex::new(vec![tracked_repo("r1", "p1", "acme/alpha", 1)]),
            projects: vec![managed_project("p1", "Kernel")],
        };
        let h = harness(store);

        let event = repositories_added(&[(999, "acme/newrepo")]);
        h.processor
            .process(EVENT_INSTALLATION_REPOSITORIES, event.clone())
            .await;
        let outcome = h
            .processor
            .process(EVENT_INSTALLATION_REPOSITORIES, event)
            .await;
        assert_eq!(outcome, ActivityOutcome::handled("auto-enabled 0 repositories"));
        assert_eq!(h.store.repositories.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pull_request_event_acknowledged() {
        let h = harness(FakeStore::default());
        let event: ActivityEvent =
            serde_json::from_value(serde_json::json!({ "action": "opened" })).unwrap();
        let outcome = h.processor.process(EVENT_PULL_REQUEST, event).await;
        assert_eq!(outcome, ActivityOutcome::handled("pull request event acknowledged"));
    }

    #[tokio::test]
    async fn test_unknown_event_ignored() {
        let h = harness(FakeStore::default());
        let event: ActivityEvent =
            serde_json::from_value(serde_json::json!({ "action": "labeled" })).unwrap();
        let outcome = h.processor.process("issues", event).await;
        assert_eq!(outcome, ActivityOutcome::Ignored);
    }
}
