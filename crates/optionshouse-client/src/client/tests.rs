//! Unit tests for client module.

use super::*;
use crate::types::OrderRef;
use serde_json::json;

fn session_with_token(token: &str) -> Session {
    Session::new(ClientConfig {
        auth_token: Some(token.to_string()),
        ..ClientConfig::new("user", "secret")
    })
    .unwrap()
}

fn cancel_message(order_id: u64) -> Message {
    Message::from_payload(Action::OrderCancel, &OrderRef::new("A1", order_id)).unwrap()
}

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.remote_host, "https://api.optionshouse.com");
    assert!(config.raise_errors);
    assert!(!config.fast_api);
    assert!(!config.accept_invalid_certs);
    assert_eq!(config.min_request_interval, Duration::from_secs(1));
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.auth_token.is_none());
}

#[test]
fn test_client_config_new() {
    let config = ClientConfig::new("trader", "hunter2");

    assert_eq!(config.username, "trader");
    assert_eq!(config.password, "hunter2");
    assert_eq!(config.remote_host, DEFAULT_REMOTE_HOST);
}

#[test]
fn test_client_config_debug_redacts_secrets() {
    let config = ClientConfig {
        auth_token: Some("tok-123".to_string()),
        ..ClientConfig::new("trader", "hunter2")
    };

    let debug = format!("{:?}", config);
    assert!(debug.contains("trader"));
    assert!(!debug.contains("hunter2"));
    assert!(!debug.contains("tok-123"));
}

// ============================================================================
// Session Creation Tests
// ============================================================================

#[test]
fn test_session_new_without_token() {
    let session = Session::with_credentials("user", "secret").unwrap();

    assert!(!session.is_authenticated());
    assert!(!session.is_connected());
    assert!(session.last_request_at().is_none());
}

#[test]
fn test_session_preseeded_token() {
    let session = session_with_token("abc");

    assert!(session.is_authenticated());
    assert_eq!(session.token(), Some("abc"));
}

#[test]
fn test_session_empty_token_is_not_authenticated() {
    let session = session_with_token("");

    assert!(!session.is_authenticated());
    assert_eq!(session.token(), None);
}

#[test]
fn test_session_invalid_host() {
    let result = Session::new(ClientConfig {
        remote_host: "not a url".to_string(),
        ..ClientConfig::default()
    });

    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

#[test]
fn test_session_endpoints() {
    let session = Session::new(ClientConfig {
        remote_host: "http://localhost:9000/".to_string(),
        ..ClientConfig::default()
    })
    .unwrap();

    assert_eq!(session.endpoint(ApiPath::General), "http://localhost:9000/m");
    assert_eq!(session.endpoint(ApiPath::Order), "http://localhost:9000/j");
}

#[test]
fn test_session_debug_hides_token() {
    let session = session_with_token("secret-token");

    let debug = format!("{:?}", session);
    assert!(debug.contains("authenticated: true"));
    assert!(!debug.contains("secret-token"));
}

// ============================================================================
// Connection Tests
// ============================================================================

#[test]
fn test_connect_and_disconnect() {
    let mut session = session_with_token("abc");

    session.connect().unwrap();
    assert!(session.is_connected());

    session.connect().unwrap();
    assert!(session.is_connected());

    session.disconnect();
    assert!(!session.is_connected());

    session.disconnect();
    assert!(!session.is_connected());
}

// ============================================================================
// Sign Tests
// ============================================================================

#[test]
fn test_sign_attaches_token() {
    let session = session_with_token("tok");
    let envelope = Envelope::single(cancel_message(192743916));

    let signed = session.sign(&envelope).unwrap();
    assert_eq!(
        serde_json::to_value(&signed).unwrap(),
        json!({"EZMessage": {"action": "order.cancel.json", "data": {
            "account": "A1",
            "order_id": 192743916,
            "authToken": "tok"
        }}})
    );
}

#[test]
fn test_sign_gives_every_message_the_same_token() {
    let session = session_with_token("shared");
    let envelope = Envelope::list(vec![
        cancel_message(1),
        cancel_message(2),
        cancel_message(3),
    ])
    .unwrap();

    let signed = session.sign(&envelope).unwrap();
    for message in signed.messages() {
        assert_eq!(message.data[AUTH_TOKEN_KEY], "shared");
    }
}

#[test]
fn test_sign_does_not_mutate_caller_envelope() {
    let session = session_with_token("tok");
    let envelope = Envelope::single(cancel_message(7));

    let _signed = session.sign(&envelope).unwrap();
    assert!(envelope.messages()[0].data.get(AUTH_TOKEN_KEY).is_none());
}

#[test]
fn test_sign_rejects_oversized_list() {
    let session = session_with_token("tok");
    let envelope = Envelope::List(vec![cancel_message(1); 4]);

    let result = session.sign(&envelope);
    assert!(matches!(result, Err(Error::InvalidEnvelope(_))));
}

#[test]
fn test_sign_without_token() {
    let session = Session::with_credentials("user", "secret").unwrap();
    let envelope = Envelope::single(cancel_message(1));

    assert!(matches!(session.sign(&envelope), Err(Error::MissingToken)));
}

#[test]
fn test_sign_fills_null_data() {
    let session = session_with_token("tok");
    let envelope = Envelope::single(Message {
        action: "account.info".to_string(),
        data: Value::Null,
        errors: None,
        extra: Map::new(),
    });

    let signed = session.sign(&envelope).unwrap();
    assert_eq!(signed.data().unwrap(), &json!({"authToken": "tok"}));
}

#[test]
fn test_sign_rejects_non_object_data() {
    let session = session_with_token("tok");
    let envelope = Envelope::single(Message {
        action: "account.info".to_string(),
        data: json!([1, 2]),
        errors: None,
        extra: Map::new(),
    });

    assert!(matches!(
        session.sign(&envelope),
        Err(Error::InvalidEnvelope(_))
    ));
}

// ============================================================================
// Analyze Tests
// ============================================================================

#[test]
fn test_analyze_success() {
    let mut session = session_with_token("tok");
    let body = json!({"EZMessage": {"action": "account.info", "data": {"accounts": []}}})
        .to_string();

    let envelope = session.analyze(&body).unwrap();
    assert!(envelope.is_ok());
    assert_eq!(session.token(), Some("tok"));
}

#[test]
fn test_analyze_access_error_clears_token() {
    let mut session = session_with_token("tok");
    let body = json!({"EZMessage": {
        "action": "account.info",
        "data": {},
        "errors": [{"access": "denied", "message": "token expired"}]
    }})
    .to_string();

    let result = session.analyze(&body);
    assert!(matches!(result, Err(ref e) if e.is_auth()));
    assert!(!session.is_authenticated());
}

#[test]
fn test_analyze_access_error_in_any_list_member() {
    let mut session = session_with_token("tok");
    let body = json!({"EZList": [
        {"action": "order.details", "data": {}},
        {"action": "order.details", "data": {}, "errors": [{"access": "denied"}]}
    ]})
    .to_string();

    let result = session.analyze(&body);
    assert!(matches!(result, Err(Error::Auth { .. })));
    assert!(!session.is_authenticated());
}

#[test]
fn test_analyze_api_error_raised() {
    let mut session = session_with_token("tok");
    let body = json!({"EZMessage": {
        "action": "order.cancel.json",
        "data": {},
        "errors": [{"message": "order not found"}]
    }})
    .to_string();

    let err = session.analyze(&body).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Api);
    assert_eq!(err.errors()[0]["message"], "order not found");
    assert!(session.is_authenticated());
}

#[test]
fn test_analyze_api_error_embedded_when_not_raising() {
    let mut session = Session::new(ClientConfig {
        auth_token: Some("tok".to_string()),
        raise_errors: false,
        ..ClientConfig::default()
    })
    .unwrap();
    let body = json!({"EZMessage": {
        "action": "order.cancel.json",
        "data": {},
        "errors": [{"message": "order not found"}]
    }})
    .to_string();

    let envelope = session.analyze(&body).unwrap();
    assert_eq!(envelope.errors().len(), 1);
}

#[test]
fn test_analyze_auth_error_raised_even_when_not_raising() {
    let mut session = Session::new(ClientConfig {
        auth_token: Some("tok".to_string()),
        raise_errors: false,
        ..ClientConfig::default()
    })
    .unwrap();
    let body = json!({"EZMessage": {"action": "x", "data": {}, "errors": [{"access": "no"}]}})
        .to_string();

    assert!(matches!(session.analyze(&body), Err(Error::Auth { .. })));
}

#[test]
fn test_analyze_ignores_null_errors() {
    let mut session = session_with_token("tok");
    let body = json!({"EZMessage": {"action": "x", "data": {}, "errors": [null]}}).to_string();

    assert!(session.analyze(&body).is_ok());
}

#[test]
fn test_analyze_rejects_malformed_body() {
    let mut session = session_with_token("tok");

    assert!(matches!(session.analyze("<html>"), Err(Error::Json(_))));
    assert!(matches!(
        session.analyze(&json!({"EZList": []}).to_string()),
        Err(Error::InvalidEnvelope(_))
    ));
}

// ============================================================================
// Protocol Guard Tests
// ============================================================================

#[test]
fn test_json_content_types() {
    assert!(is_json_content_type("application/json"));
    assert!(is_json_content_type("application/json; charset=utf-8"));
    assert!(is_json_content_type("Application/JSON"));
    assert!(!is_json_content_type("text/javascript"));
    assert!(!is_json_content_type("text/html"));
}

#[tokio::test]
async fn test_api_rejects_oversized_list_before_network() {
    // Unroutable host: any network attempt would surface as an HTTP error.
    let mut session = Session::new(ClientConfig {
        remote_host: "http://127.0.0.1:9".to_string(),
        fast_api: true,
        ..ClientConfig::new("user", "secret")
    })
    .unwrap();
    let envelope = Envelope::List(vec![cancel_message(1); 4]);

    let result = session.api(ApiPath::Order, &envelope).await;
    assert!(matches!(result, Err(Error::InvalidEnvelope(_))));
    assert!(session.last_request_at().is_none());
    assert!(!session.is_connected());
}
