//! CCLA whitelist matching
//!
//! Confirms employee affiliation against the whitelist rules attached to a
//! company's CCLA signature. Four strategies, evaluated in order: exact email,
//! domain pattern, GitHub username, GitHub organization membership.
//!
//! Domain pattern forms (case-insensitive on the domain portion):
//! - `*suffix` / `*.suffix` - suffix match, bare domain and subdomains
//! - `.suffix`              - bare domain and subdomains
//! - naked `domain`         - exact domain only, subdomains do NOT match
//!
//! The naked-domain-exact-only rule is deliberate; it mirrors the behavior
//! the legacy test fixtures pin down even though it diverges from the
//! wildcard forms.

use tracing::debug;

use crate::db::schemas::SignatureDoc;
use crate::github::IdentityResolver;

/// The contributor identity being tested against a whitelist
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub emails: Vec<String>,
    pub github_username: Option<String>,
    pub github_id: Option<i64>,
}

/// Extract the domain portion of an email address, lowercased
fn email_domain(email: &str) -> Option<String> {
    email.rsplit_once('@').map(|(_, domain)| domain.to_ascii_lowercase())
}

/// Test a single domain whitelist pattern against an email address
pub fn matches_domain_pattern(pattern: &str, email: &str) -> bool {
    let Some(domain) = email_domain(email) else {
        return false;
    };
    let pattern = pattern.to_ascii_lowercase();

    if let Some(suffix) = pattern.strip_prefix("*.") {
        domain == suffix || domain.ends_with(&format!(".{}", suffix))
    } else if let Some(suffix) = pattern.strip_prefix('*') {
        // Arbitrary suffix: subdomains and the bare domain both match
        domain.ends_with(suffix)
    } else if let Some(suffix) = pattern.strip_prefix('.') {
        // Dot prefix matches the bare domain too, per legacy fixture behavior
        domain == suffix || domain.ends_with(&pattern)
    } else {
        // Naked domain: exact match only
        domain == pattern
    }
}

/// Evaluate a candidate identity against a CCLA signature's whitelist rules.
///
/// GitHub lookups are best-effort: a failed username or organization lookup
/// skips that stage rather than failing the check. Returns `true` on the
/// first satisfied rule, `false` if nothing matches.
pub async fn is_whitelisted(
    resolver: &dyn IdentityResolver,
    ccla_signature: &SignatureDoc,
    candidate: &Candidate,
) -> bool {
    // Stage 1: exact email match
    for email in &candidate.emails {
        let email_lower = email.to_ascii_lowercase();
        if ccla_signature
            .email_whitelist
            .iter()
            .any(|entry| entry.to_ascii_lowercase() == email_lower)
        {
            debug!(email, "candidate email found in email whitelist");
            return true;
        }
    }

    // Stage 2: domain patterns
    for email in &candidate.emails {
        if ccla_signature
            .domain_whitelist
            .iter()
            .any(|pattern| matches_domain_pattern(pattern, email))
        {
            debug!(email, "candidate email matched a domain whitelist pattern");
            return true;
        }
    }

    // Resolve a username from the numeric id when only the id is known.
    // An unresolvable username short-circuits the GitHub stages; it is not
    // an error.
    let github_username = match (&candidate.github_username, candidate.github_id) {
        (Some(username), _) => Some(username.trim().to_string()),
        (None, Some(github_id)) => match resolver.resolve_github_username(github_id).await {
            Ok(Some(username)) => Some(username.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                debug!(github_id, error = %e, "github username lookup failed, skipping github checks");
                None
            }
        },
        (None, None) => None,
    };

    let Some(username) = github_username else {
        debug!("no github username available, skipping github whitelist checks");
        return false;
    };

    // Stage 3: GitHub username
    let username_lower = username.to_ascii_lowercase();
    if ccla_signature
        .github_whitelist
        .iter()
        .any(|entry| entry.to_ascii_lowercase() == username_lower)
    {
        debug!(username, "candidate found in github username whitelist");
        return true;
    }

    // Stage 4: GitHub organization membership
    if !ccla_signature.github_org_whitelist.is_empty() {
        match resolver.resolve_github_orgs(&username).await {
            Ok(orgs) => {
                let orgs_lower: Vec<String> =
                    orgs.iter().map(|o| o.to_ascii_lowercase()).collect();
                for entry in &ccla_signature.github_org_whitelist {
                    if orgs_lower.contains(&entry.to_ascii_lowercase()) {
                        debug!(username, org = %entry, "candidate org found in github org whitelist");
                        return true;
                    }
                }
            }
            Err(e) => {
                // Cannot confirm membership; fall through to the default
                debug!(username, error = %e, "github org lookup failed, skipping org check");
            }
        }
    }

    debug!("candidate not found in any whitelist");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ReferenceType;
    use crate::types::{Result, TurnstileError};

    struct FakeResolver {
        username_for_id: Option<String>,
        orgs: Result<Vec<String>>,
    }

    impl FakeResolver {
        fn empty() -> Self {
            Self {
                username_for_id: None,
                orgs: Ok(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl IdentityResolver for FakeResolver {
        async fn resolve_github_username(&self, _github_id: i64) -> Result<Option<String>> {
            Ok(self.username_for_id.clone())
        }

        async fn resolve_github_orgs(&self, _username: &str) -> Result<Vec<String>> {
            match &self.orgs {
                Ok(orgs) => Ok(orgs.clone()),
                Err(_) => Err(TurnstileError::GitHub("boom".into())),
            }
        }
    }

    fn ccla(
        email_whitelist: &[&str],
        domain_whitelist: &[&str],
        github_whitelist: &[&str],
        github_org_whitelist: &[&str],
    ) -> SignatureDoc {
        let mut sig = SignatureDoc::new(
            "s1".into(),
            "p1".into(),
            "c1".into(),
            ReferenceType::Company,
        );
        sig.email_whitelist = email_whitelist.iter().map(|s| s.to_string()).collect();
        sig.domain_whitelist = domain_whitelist.iter().map(|s| s.to_string()).collect();
        sig.github_whitelist = github_whitelist.iter().map(|s| s.to_string()).collect();
        sig.github_org_whitelist =
            github_org_whitelist.iter().map(|s| s.to_string()).collect();
        sig
    }

    fn email_candidate(email: &str) -> Candidate {
        Candidate {
            emails: vec![email.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_star_prefix_matches_bare_domain() {
        assert!(matches_domain_pattern("*bar.com", "harold@bar.com"));
    }

    #[test]
    fn test_star_prefix_matches_subdomain() {
        assert!(matches_domain_pattern("*bar.com", "harold@help.bar.com"));
    }

    #[test]
    fn test_star_dot_prefix_matches_bare_domain_and_subdomain() {
        assert!(matches_domain_pattern("*.bar.com", "harold@bar.com"));
        assert!(matches_domain_pattern("*.bar.com", "harold@help.bar.com"));
    }

    #[test]
    fn test_dot_prefix_matches_bare_domain_and_subdomain() {
        assert!(matches_domain_pattern(".bar.com", "harold@bar.com"));
        assert!(matches_domain_pattern(".bar.com", "harold@help.bar.com"));
    }

    #[test]
    fn test_naked_domain_matches_exact_only() {
        assert!(matches_domain_pattern("bar.com", "harold@bar.com"));
        assert!(!matches_domain_pattern("bar.com", "harold@help.bar.com"));
    }

    #[test]
    fn test_unrelated_domain_never_matches() {
        for pattern in ["*bar.com", "*.bar.com", ".bar.com", "bar.com"] {
            assert!(
                !matches_domain_pattern(pattern, "harold@foo.com"),
                "pattern {} matched foo.com",
                pattern
            );
        }
    }

    #[test]
    fn test_domain_match_is_case_insensitive() {
        assert!(matches_domain_pattern("*.Bar.COM", "harold@help.BAR.com"));
        assert!(matches_domain_pattern("BAR.com", "harold@bar.COM"));
    }

    #[tokio::test]
    async fn test_exact_email_match_case_insensitive() {
        let sig = ccla(&["Harold@Bar.com"], &[], &[], &[]);
        let resolver = FakeResolver::empty();
        assert!(is_whitelisted(&resolver, &sig, &email_candidate("harold@bar.COM")).await);
    }

    #[tokio::test]
    async fn test_github_username_match() {
        let sig = ccla(&[], &[], &["Octocat"], &[]);
        let resolver = FakeResolver::empty();
        let candidate = Candidate {
            github_username: Some("octocat".into()),
            ..Default::default()
        };
        assert!(is_whitelisted(&resolver, &sig, &candidate).await);
    }

    #[tokio::test]
    async fn test_github_id_resolves_to_username() {
        let sig = ccla(&[], &[], &["octocat"], &[]);
        let resolver = FakeResolver {
            username_for_id: Some("octocat".into()),
            orgs: Ok(Vec::new()),
        };
        let candidate = Candidate {
            github_id: Some(583231),
            ..Default::default()
        };
        assert!(is_whitelisted(&resolver, &sig, &candidate).await);
    }

    #[tokio::test]
    async fn test_unresolvable_github_id_skips_github_checks() {
        let sig = ccla(&[], &[], &["octocat"], &["acme"]);
        let resolver = FakeResolver::empty();
        let candidate = Candidate {
            github_id: Some(583231),
            ..Default::default()
        };
        assert!(!is_whitelisted(&resolver, &sig, &candidate).await);
    }

    #[tokio::test]
    async fn test_github_org_membership_match() {
        let sig = ccla(&[], &[], &[], &["Acme"]);
        let resolver = FakeResolver {
            username_for_id: None,
            orgs: Ok(vec!["acme".into(), "other".into()]),
        };
        let candidate = Candidate {
            github_username: Some("octocat".into()),
            ..Default::default()
        };
        assert!(is_whitelisted(&resolver, &sig, &candidate).await);
    }

    #[tokio::test]
    async fn test_org_lookup_error_defaults_to_false() {
        let sig = ccla(&[], &[], &[], &["acme"]);
        let resolver = FakeResolver {
            username_for_id: None,
            orgs: Err(TurnstileError::GitHub("rate limited".into())),
        };
        let candidate = Candidate {
            github_username: Some("octocat".into()),
            ..Default::default()
        };
        assert!(!is_whitelisted(&resolver, &sig, &candidate).await);
    }

    #[tokio::test]
    async fn test_no_rules_no_match() {
        let sig = ccla(&[], &[], &[], &[]);
        let resolver = FakeResolver::empty();
        assert!(!is_whitelisted(&resolver, &sig, &email_candidate("harold@bar.com")).await);
    }
}
