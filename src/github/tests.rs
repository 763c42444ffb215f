use super::*;
use rstest::rstest;
use serde_json::json;

fn error_of_kind(kind: &str) -> GraphQlError {
    GraphQlError {
        message: format!("upstream reported {kind}"),
        kind: Some(kind.to_string()),
    }
}

fn error_with_message(message: &str) -> GraphQlError {
    GraphQlError {
        message: message.to_string(),
        kind: None,
    }
}

fn user_node(value: serde_json::Value) -> UserNode {
    serde_json::from_value(value).expect("user node")
}

fn org_node(value: serde_json::Value) -> OrganizationNode {
    serde_json::from_value(value).expect("organization node")
}

mod base_urls {
    use super::*;

    #[rstest]
    #[case(None, "https://github.com")]
    #[case(Some("not a url"), "https://github.com")]
    #[case(Some("https://example.com/u/1"), "https://github.com")]
    #[case(Some("https://avatars.githubusercontent.com/u/1"), "https://github.com")]
    #[case(
        Some("https://avatars.ghe.example.com/u/1"),
        "https://ghe.example.com"
    )]
    #[case(
        Some("http://avatars.ghe.internal:8443/u/9"),
        "http://ghe.internal:8443"
    )]
    fn from_avatar(#[case] avatar: Option<&str>, #[case] expected: &str) {
        assert_eq!(base_url_from_avatar(avatar), expected);
    }

    #[rstest]
    #[case("https://api.github.com/graphql", "https://github.com")]
    #[case("https://ghe.example.com/api/graphql", "https://ghe.example.com")]
    #[case("http://127.0.0.1:9999/graphql", "http://127.0.0.1:9999")]
    #[case("not a url", "https://github.com")]
    fn from_endpoint(#[case] endpoint: &str, #[case] expected: &str) {
        assert_eq!(base_url_from_endpoint(endpoint), expected);
    }
}

mod classification {
    use super::*;

    #[test]
    fn all_not_found_maps_to_user_not_found() {
        let errors = vec![error_of_kind(KIND_NOT_FOUND), error_of_kind(KIND_NOT_FOUND)];
        assert_eq!(classify_errors(&errors, None), SearchError::UserNotFound);
    }

    #[test]
    fn mixed_not_found_is_not_user_not_found() {
        let errors = vec![
            error_of_kind(KIND_NOT_FOUND),
            error_with_message("something else broke"),
        ];
        assert_ne!(classify_errors(&errors, None), SearchError::UserNotFound);
    }

    #[test]
    fn rate_limited_kind_wins_with_default_hint() {
        let errors = vec![error_of_kind(KIND_RATE_LIMITED)];
        let err = classify_errors(&errors, None);
        assert_eq!(err.code(), "rate_limited");
        assert_eq!(err.retry_after_seconds(), Some(DEFAULT_RETRY_AFTER));
    }

    #[test]
    fn rate_limit_message_wins_without_kind() {
        let errors = vec![error_with_message("API rate limit exceeded for 1.2.3.4")];
        assert_eq!(classify_errors(&errors, None).code(), "rate_limited");
    }

    #[test]
    fn rate_limited_outranks_scope_errors() {
        let errors = vec![
            error_of_kind(KIND_INSUFFICIENT_SCOPES),
            error_of_kind(KIND_RATE_LIMITED),
        ];
        assert_eq!(classify_errors(&errors, None).code(), "rate_limited");
    }

    #[test]
    fn scope_errors_classify_when_nothing_outranks() {
        let errors = vec![error_of_kind(KIND_INSUFFICIENT_SCOPES)];
        assert_eq!(
            classify_errors(&errors, None),
            SearchError::InsufficientScopes
        );
    }

    #[test]
    fn bad_credentials_message_maps_to_invalid_token() {
        let errors = vec![error_with_message("Bad credentials")];
        assert_eq!(classify_errors(&errors, None), SearchError::InvalidToken);
    }

    #[rstest]
    #[case("network unreachable")]
    #[case("request timeout while talking upstream")]
    #[case("connect ECONNREFUSED 127.0.0.1:443")]
    fn transport_flavored_messages_map_to_network(#[case] message: &str) {
        assert_eq!(classify_errors(&[error_with_message(message)], None).code(), "network_error");
    }

    #[test]
    fn residual_errors_become_provider_error_with_details() {
        let errors = vec![
            error_with_message("first failure"),
            error_with_message("second failure"),
        ];
        let err = classify_errors(&errors, None);
        match &err {
            SearchError::Provider {
                message, details, ..
            } => {
                assert_eq!(message, "first failure, second failure");
                let details = details.as_ref().expect("details");
                assert_eq!(details.as_array().map(Vec::len), Some(2));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn reset_header_drives_retry_after() {
        let future = epoch_now() + 300;
        let errors = vec![error_of_kind(KIND_RATE_LIMITED)];
        let hint = classify_errors(&errors, Some(future))
            .retry_after_seconds()
            .expect("hint");
        assert!((295..=300).contains(&hint), "hint was {hint}");
    }

    #[test]
    fn stale_reset_clamps_to_zero() {
        let errors = vec![error_of_kind(KIND_RATE_LIMITED)];
        let err = classify_errors(&errors, Some(epoch_now().saturating_sub(10)));
        assert_eq!(err.retry_after_seconds(), Some(0));
    }

    #[rstest]
    #[case(401, "invalid_token")]
    #[case(403, "rate_limited")]
    #[case(404, "user_not_found")]
    #[case(500, "provider_error")]
    #[case(502, "provider_error")]
    fn http_statuses(#[case] status: u16, #[case] code: &str) {
        assert_eq!(classify_http_status(status, None, "body").code(), code);
    }
}

mod absorption {
    use super::*;

    fn envelope(data: serde_json::Value, errors: Vec<GraphQlError>) -> GraphQlEnvelope {
        GraphQlEnvelope {
            data: serde_json::from_value(data).expect("account data"),
            errors: Some(errors),
        }
    }

    #[test]
    fn errors_with_populated_user_are_absorbed() {
        let envelope = envelope(
            json!({
                "user": {
                    "id": "U_1",
                    "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
                },
                "organization": null
            }),
            vec![error_of_kind(KIND_NOT_FOUND)],
        );
        let data = classify_envelope(envelope, None).expect("absorbed");
        assert!(data.user.is_some());
    }

    #[test]
    fn scope_error_defeats_absorption() {
        let envelope = envelope(
            json!({
                "user": {
                    "id": "U_1",
                    "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
                },
                "organization": null
            }),
            vec![error_of_kind(KIND_INSUFFICIENT_SCOPES)],
        );
        assert_eq!(
            classify_envelope(envelope, None).expect_err("rejected"),
            SearchError::InsufficientScopes
        );
    }

    #[test]
    fn errors_without_data_classify() {
        let envelope = GraphQlEnvelope {
            data: None,
            errors: Some(vec![error_of_kind(KIND_NOT_FOUND)]),
        };
        assert_eq!(
            classify_envelope(envelope, None).expect_err("rejected"),
            SearchError::UserNotFound
        );
    }

    #[test]
    fn both_sides_null_is_not_usable_partial_data() {
        let envelope = envelope(
            json!({ "user": null, "organization": null }),
            vec![error_of_kind(KIND_NOT_FOUND)],
        );
        assert_eq!(
            classify_envelope(envelope, None).expect_err("rejected"),
            SearchError::UserNotFound
        );
    }

    #[test]
    fn empty_response_is_a_provider_error() {
        let envelope = GraphQlEnvelope {
            data: None,
            errors: None,
        };
        assert_eq!(
            classify_envelope(envelope, None).expect_err("rejected").code(),
            "provider_error"
        );
    }
}

mod projection {
    use super::*;

    #[test]
    fn user_with_email_is_verified() {
        let node = user_node(json!({
            "id": "123",
            "name": "  Test User  ",
            "email": "test@example.com",
            "avatarUrl": "https://avatars.githubusercontent.com/u/123",
            "createdAt": "2015-04-01T00:00:00Z",
            "followers": { "totalCount": 12 },
            "following": { "totalCount": 0 },
            "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
        }));
        let (account, _) = project_user(node);
        let Account::User(profile) = account else {
            panic!("expected user variant");
        };
        assert!(profile.is_verified);
        assert_eq!(profile.name.as_deref(), Some("Test User"));
        assert_eq!(profile.provider_base_url, "https://github.com");
        let stats = profile.statistics.expect("statistics");
        assert_eq!(stats.followers, Some(12));
        assert_eq!(stats.following, Some(0));
        assert_eq!(stats.members, None);
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(""))]
    #[case(json!("   "))]
    fn user_without_usable_email_is_unverified(#[case] email: serde_json::Value) {
        let node = user_node(json!({
            "id": "123",
            "email": email,
            "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
        }));
        let (account, _) = project_user(node);
        assert!(!account.profile().is_verified);
    }

    #[test]
    fn user_without_counts_omits_the_statistics_bag() {
        let node = user_node(json!({
            "id": "123",
            "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
        }));
        let (account, _) = project_user(node);
        assert!(account.profile().statistics.is_none());
    }

    #[test]
    fn organization_projects_members_and_blank_name_is_dropped() {
        let node = org_node(json!({
            "id": "O_9",
            "name": "   ",
            "isVerified": true,
            "membersWithRole": { "totalCount": 18 },
            "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
        }));
        let (account, _) = project_organization(node);
        let Account::Organization(profile) = account else {
            panic!("expected organization variant");
        };
        assert!(profile.is_verified);
        assert_eq!(profile.name, None);
        assert_eq!(
            profile.statistics.expect("statistics").members,
            Some(18)
        );
    }

    #[test]
    fn organization_verified_defaults_to_false() {
        let node = org_node(json!({
            "id": "O_9",
            "repositories": { "nodes": [], "pageInfo": { "hasNextPage": false, "endCursor": null } }
        }));
        let (account, _) = project_organization(node);
        assert!(!account.profile().is_verified);
    }

    #[test]
    fn repositories_project_language_and_fork_flag() {
        let node = user_node(json!({
            "id": "123",
            "repositories": {
                "nodes": [
                    { "name": "app", "isFork": false, "primaryLanguage": { "name": "Rust" } },
                    { "name": "fork", "isFork": true, "primaryLanguage": null }
                ],
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            }
        }));
        let (_, connection) = project_user(node);
        let repos: Vec<Repository> = connection
            .nodes
            .into_iter()
            .map(|repo| Repository {
                name: repo.name,
                language: repo.primary_language.map(|lang| lang.name),
                is_fork: repo.is_fork,
            })
            .collect();
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));
        assert!(!repos[0].is_fork);
        assert_eq!(repos[1].language, None);
        assert!(repos[1].is_fork);
    }
}
