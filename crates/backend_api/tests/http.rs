use backend_api::{BackendApiClient, BackendApiConfig, BackendApiError};

fn client() -> BackendApiClient {
    let config = BackendApiConfig::new("https://project.example.co/", "anon-key");
    BackendApiClient::new(config).expect("client")
}

#[test]
fn user_request_targets_auth_endpoint_with_bearer_token() {
    let request = client()
        .build_user_request("session-jwt")
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(request.method(), "GET");
    assert_eq!(
        request.url().as_str(),
        "https://project.example.co/auth/v1/user"
    );
    assert_eq!(
        request.headers().get("authorization").expect("authorization"),
        "Bearer session-jwt"
    );
}

#[test]
fn roles_request_targets_configured_table() {
    let config = BackendApiConfig::new("https://project.example.co", "anon-key")
        .with_roles_table("member_roles");
    let client = BackendApiClient::new(config).expect("client");

    let request = client
        .build_roles_request("u1", None)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(
        request.url().as_str(),
        "https://project.example.co/rest/v1/member_roles?select=role&user_id=eq.u1"
    );
    assert_eq!(request.headers().get("apikey").expect("apikey"), "anon-key");
}

#[test]
fn client_construction_rejects_invalid_configuration() {
    assert!(matches!(
        BackendApiClient::new(BackendApiConfig::new("", "anon-key")),
        Err(BackendApiError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        BackendApiClient::new(BackendApiConfig::new("https://project.example.co", "")),
        Err(BackendApiError::MissingApiKey)
    ));
}
