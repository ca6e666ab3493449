//! Manager notification content
//!
//! Builds the HTML bodies for lifecycle emails. Notifications are aggregated
//! per project: repositories are grouped by their owning project id and one
//! email goes out per project, listing every affected repository.

use std::collections::BTreeMap;

use crate::db::schemas::RepositoryDoc;

/// Group repository URLs by owning project id. BTreeMap keeps notification
/// order stable across runs.
pub fn group_by_project(repositories: &[RepositoryDoc]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for repository in repositories {
        grouped
            .entry(repository.repository_project_id.clone())
            .or_default()
            .push(repository.repository_url.clone());
    }
    grouped
}

fn repository_list(repositories: &[String]) -> String {
    let mut list = String::from("<ul>");
    for repository in repositories {
        list.push_str("<li>");
        list.push_str(repository);
        list.push_str("</li>");
    }
    list.push_str("</ul>");
    list
}

/// Email telling project managers CLA checks can no longer run on the listed
/// repositories (installation removed or repositories detached).
pub fn unable_to_check_email(project_name: &str, repositories: &[String]) -> (String, String) {
    let subject = format!(
        "CLA: Unable to check pull requests for CLA Group: {}",
        project_name
    );
    let pronoun = if repositories.len() > 1 {
        "these repositories"
    } else {
        "this repository"
    };
    let body = format!(
        "<p>Hello Project Manager,</p>\
         <p>This is a notification regarding the CLA Group {}.</p>\
         <p>Pull requests on {} can no longer be checked due to a permissions change:</p>\
         {}\
         <p>Please ask the repository owner to re-enable the CLA app for all repositories \
         in the organization's settings.</p>",
        project_name,
        pronoun,
        repository_list(repositories)
    );
    (subject, body)
}

/// Email telling project managers which repositories were automatically
/// enrolled under their CLA Group.
pub fn auto_enabled_email(
    project_name: &str,
    organization_name: &str,
    repositories: &[String],
) -> (String, String) {
    let subject = format!(
        "CLA: Auto-enabled repositories for CLA Group: {}",
        project_name
    );
    let was_were = if repositories.len() > 1 {
        "repositories were"
    } else {
        "repository was"
    };
    let body = format!(
        "<p>Hello Project Manager,</p>\
         <p>This is a notification regarding the CLA Group {}.</p>\
         <p>The following {} added to the GitHub organization {} and automatically \
         enrolled for CLA checks:</p>\
         {}",
        project_name,
        was_were,
        organization_name,
        repository_list(repositories)
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str, project_id: &str, full_name: &str) -> RepositoryDoc {
        RepositoryDoc::new(
            id.into(),
            project_id.into(),
            full_name.into(),
            full_name.split('/').next().unwrap().into(),
        )
    }

    #[test]
    fn test_group_by_project() {
        let repositories = vec![
            repo("r1", "p1", "acme/alpha"),
            repo("r2", "p2", "acme/beta"),
            repo("r3", "p1", "acme/gamma"),
        ];
        let grouped = group_by_project(&repositories);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["p1"].len(), 2);
        assert_eq!(grouped["p2"], vec!["https://github.com/acme/beta".to_string()]);
    }

    #[test]
    fn test_unable_to_check_email_pluralizes() {
        let (subject, body) =
            unable_to_check_email("Kernel", &["https://github.com/acme/alpha".into()]);
        assert!(subject.contains("Kernel"));
        assert!(body.contains("this repository"));

        let (_, body) = unable_to_check_email(
            "Kernel",
            &[
                "https://github.com/acme/alpha".into(),
                "https://github.com/acme/beta".into(),
            ],
        );
        assert!(body.contains("these repositories"));
    }

    #[test]
    fn test_auto_enabled_email_lists_repositories() {
        let (subject, body) =
            auto_enabled_email("Kernel", "acme", &["acme/newrepo".into()]);
        assert!(subject.contains("Auto-enabled"));
        assert!(body.contains("acme/newrepo"));
        assert!(body.contains("repository was"));
    }
}
