use super::*;

fn test_client(base_url: &str) -> AirtableClient {
    AirtableClient::with_base_url("pat-test", "appTEST", 30, base_url)
        .expect("client construction should not fail")
}

#[test]
fn endpoint_joins_under_base_path() {
    let client = test_client("https://api.airtable.com");
    let url = client.endpoint("v0/bases/appTEST/webhooks").unwrap();
    assert_eq!(url.as_str(), "https://api.airtable.com/v0/bases/appTEST/webhooks");
}

#[test]
fn endpoint_keeps_proxy_prefix() {
    let client = test_client("http://localhost:9000/airtable/");
    let url = client.endpoint("v0/appTEST/tblTEST").unwrap();
    assert_eq!(url.as_str(), "http://localhost:9000/airtable/v0/appTEST/tblTEST");
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = AirtableClient::with_base_url("pat-test", "appTEST", 30, "not a url");
    assert!(matches!(result, Err(AirtableError::InvalidBaseUrl { .. })));
}

#[test]
fn retry_defaults_to_disabled() {
    let client = test_client("https://api.airtable.com");
    assert_eq!(client.max_retries, 0);
    let client = client.with_retry(2, 500);
    assert_eq!(client.max_retries, 2);
    assert_eq!(client.backoff_base_ms, 500);
}
