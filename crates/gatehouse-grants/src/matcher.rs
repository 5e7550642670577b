//! guard evaluation against a credential context.

use gatehouse_types::CredentialContext;

use crate::guard::Guard;

/// check whether `guard` is satisfied by the request's credentials.
///
/// total: every guard that could be decoded yields a plain yes/no. payloads
/// that fail to decode never reach this point and so never match.
pub fn matches(guard: &Guard, ctx: &CredentialContext) -> bool {
    match guard {
        // an absent token never satisfies a token guard, even one with an empty id
        Guard::AccessToken { id } => ctx.token_id().is_some_and(|token| token == id.as_str()),
        Guard::X509(pattern) => ctx
            .cert_subjects()
            .iter()
            .any(|subject| pattern.matches(subject)),
        Guard::Localhost => ctx.is_loopback(),
        Guard::Any => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x509::X509Pattern;
    use gatehouse_types::CertSubject;
    use serde_json::json;

    fn token_guard(id: &str) -> Guard {
        Guard::AccessToken { id: id.to_string() }
    }

    fn x509_guard(data: serde_json::Value) -> Guard {
        Guard::X509(X509Pattern::from_json(&data).unwrap())
    }

    #[test]
    fn test_access_token_exact_match() {
        let guard = token_guard("tok123");
        assert!(matches(
            &guard,
            &CredentialContext::anonymous().with_token_id("tok123")
        ));
        assert!(!matches(
            &guard,
            &CredentialContext::anonymous().with_token_id("tok456")
        ));
        assert!(!matches(
            &guard,
            &CredentialContext::anonymous().with_token_id("TOK123")
        ));
        assert!(!matches(&guard, &CredentialContext::anonymous()));
    }

    #[test]
    fn test_empty_token_never_matches_empty_id() {
        let guard = token_guard("");
        assert!(!matches(&guard, &CredentialContext::anonymous()));
        assert!(!matches(
            &guard,
            &CredentialContext::anonymous().with_token_id("")
        ));
    }

    #[test]
    fn test_x509_any_certificate_suffices() {
        let guard = x509_guard(json!({"O": ["Acme Corp"]}));
        let other = CertSubject {
            organization: vec!["OtherCorp".to_string()],
            ..Default::default()
        };
        let acme = CertSubject {
            organization: vec!["Acme Corp".to_string(), "R&D".to_string()],
            ..Default::default()
        };

        let ctx = CredentialContext::anonymous().with_cert_subject(other.clone());
        assert!(!matches(&guard, &ctx));

        let ctx = ctx.with_cert_subject(acme);
        assert!(matches(&guard, &ctx));
    }

    #[test]
    fn test_x509_without_certificates() {
        let guard = x509_guard(json!({"CN": "core-1"}));
        assert!(!matches(&guard, &CredentialContext::anonymous()));
    }

    #[test]
    fn test_localhost() {
        assert!(matches(
            &Guard::Localhost,
            &CredentialContext::anonymous().with_loopback(true)
        ));
        let remote = CredentialContext::anonymous()
            .with_token_id("tok123")
            .with_cert_subject(CertSubject::with_common_name("core-1"));
        assert!(!matches(&Guard::Localhost, &remote));
    }

    #[test]
    fn test_any_matches_anonymous() {
        assert!(matches(&Guard::Any, &CredentialContext::anonymous()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::x509::X509Pattern;
    use gatehouse_types::CertSubject;
    use proptest::prelude::*;

    fn value_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 &]{1,12}"
    }

    fn values_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(value_strategy(), 0..4)
    }

    fn context_strategy() -> impl Strategy<Value = CredentialContext> {
        (
            proptest::option::of("[a-z0-9]{0,8}"),
            prop::collection::vec(values_strategy(), 0..3),
            any::<bool>(),
        )
            .prop_map(|(token, orgs, loopback)| {
                let mut ctx = CredentialContext::anonymous().with_loopback(loopback);
                if let Some(token) = token {
                    ctx = ctx.with_token_id(token);
                }
                ctx.with_cert_subjects(orgs.into_iter().map(|organization| CertSubject {
                    organization,
                    ..Default::default()
                }))
            })
    }

    proptest! {
        #[test]
        fn any_guard_matches_every_context(ctx in context_strategy()) {
            prop_assert!(matches(&Guard::Any, &ctx));
        }

        #[test]
        fn localhost_tracks_loopback_flag(ctx in context_strategy()) {
            prop_assert_eq!(matches(&Guard::Localhost, &ctx), ctx.is_loopback());
        }

        #[test]
        fn organization_prefix_always_matches(
            prefix in values_strategy(),
            suffix in values_strategy(),
        ) {
            let pattern = X509Pattern { organization: prefix.clone(), ..Default::default() };
            let mut organization = prefix;
            organization.extend(suffix);
            let subject = CertSubject { organization, ..Default::default() };
            prop_assert!(pattern.matches(&subject));
        }

        #[test]
        fn shorter_subject_never_matches(
            pattern_values in prop::collection::vec(value_strategy(), 1..5),
            cut in 0usize..5,
        ) {
            let cut = cut % pattern_values.len();
            let pattern = X509Pattern { organization: pattern_values.clone(), ..Default::default() };
            let subject = CertSubject {
                organization: pattern_values[..cut].to_vec(),
                ..Default::default()
            };
            prop_assert!(!pattern.matches(&subject));
        }

        #[test]
        fn token_guard_matches_only_its_id(id in "[a-z0-9]{1,8}", other in "[a-z0-9]{1,8}") {
            let guard = Guard::AccessToken { id: id.clone() };
            let ctx = CredentialContext::anonymous().with_token_id(other.clone());
            prop_assert_eq!(matches(&guard, &ctx), id == other);
        }
    }
}
