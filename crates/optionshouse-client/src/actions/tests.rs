//! Unit tests for actions module.

use super::*;
use crate::types::{OrderLeg, OrderSide};

#[test]
fn test_single_account_request() {
    let envelope = single(Action::AccountCash, &AccountRequest { account: "A1" }).unwrap();

    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({"EZMessage": {"action": "account.cash", "data": {"account": "A1"}}})
    );
}

#[test]
fn test_single_order_request_nests_ticket() {
    let ticket = OrderTicket::limit("A1", 10.5, vec![OrderLeg::stock(OrderSide::Buy, 10, "IBM")]);

    let envelope = single(Action::OrderCreate, &OrderRequest { order: &ticket }).unwrap();
    let data = envelope.data().unwrap();
    assert_eq!(data["order"]["account"], "A1");
    assert_eq!(data["order"]["price"], 10.5);
    assert_eq!(data["order"]["legs"][0]["key"], "IBM");
}

#[test]
fn test_batch_builds_one_message_per_item() {
    let orders = [OrderRef::new("A1", 1), OrderRef::new("A1", 2)];

    let envelope = batch(Action::OrderCancel, &orders).unwrap();
    let messages = envelope.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.action == "order.cancel.json"));
    assert_eq!(messages[1].data["order_id"], 2);
}

#[test]
fn test_batch_rejects_empty_input() {
    let orders: [OrderRef; 0] = [];

    let result = batch(Action::OrderCancel, &orders);
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[test]
fn test_batch_rejects_more_than_three_items() {
    let orders: Vec<OrderRef> = (1..=4).map(|id| OrderRef::new("A1", id)).collect();

    let result = batch(Action::OrderDetails, &orders);
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[test]
fn test_batch_accepts_three_items() {
    let accounts: Vec<AccountRequest<'_>> = ["A1", "A2", "A3"]
        .iter()
        .map(|&account| AccountRequest { account })
        .collect();

    let envelope = batch(Action::AccountPositions, &accounts).unwrap();
    assert!(matches!(envelope, Envelope::List(ref m) if m.len() == 3));
}

#[tokio::test]
async fn test_invalid_ticket_is_rejected_before_sending() {
    let mut session = Session::with_credentials("user", "secret").unwrap();
    let ticket = OrderTicket::market("A1", vec![]);

    let result = session.create_order(&ticket).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    assert!(session.last_request_at().is_none());
}

#[tokio::test]
async fn test_modify_requires_order_id() {
    let mut session = Session::with_credentials("user", "secret").unwrap();
    let ticket = OrderTicket::market("A1", vec![OrderLeg::stock(OrderSide::Sell, 1, "IBM")]);

    let result = session.modify_order(&ticket).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    assert!(session.last_request_at().is_none());
}

#[tokio::test]
async fn test_empty_quote_list_is_rejected() {
    let mut session = Session::with_credentials("user", "secret").unwrap();

    let result = session.quote_list(&[]).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn test_empty_cancel_batch_is_rejected_before_sending() {
    let mut session = Session::with_credentials("user", "secret").unwrap();

    let result = session.cancel_orders(&[]).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    assert!(session.last_request_at().is_none());
}

#[tokio::test]
async fn test_call_rejects_login_action() {
    let mut session = Session::with_credentials("user", "secret").unwrap();
    let mut data = Map::new();
    data.insert("userName".to_string(), json!("user"));

    let result = session.call(Action::AuthLogin, data).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    assert!(session.last_request_at().is_none());
    assert!(!session.is_authenticated());
}
