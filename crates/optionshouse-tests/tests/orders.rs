//! Order lifecycle request tests.

use optionshouse_client::{
    Error, OrderLeg, OrderRef, OrderSide, OrderTicket, PositionType, Session, TimeInForce,
};
use optionshouse_tests::FakeApi;
use serde_json::json;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_cancel_order_envelope() {
    let fake = FakeApi::start().await.expect("Failed to start fake API");
    let mut session = Session::new(fake.config()).expect("Failed to create session");

    assert_ok!(session.cancel_order("A1", 192743916).await);

    let call = &fake.calls()[0];
    assert_eq!(call.path, "/j");
    assert_eq!(
        call.envelope,
        json!({"EZMessage": {"action": "order.cancel.json", "data": {
            "account": "A1",
            "order_id": 192743916,
            "authToken": "token-1"
        }}})
    );
}

#[tokio::test]
async fn test_cancel_orders_batch() {
    let fake = FakeApi::start().await.expect("Failed to start fake API");
    let mut session = Session::new(fake.config()).expect("Failed to create session");
    let orders = [
        OrderRef::new("A1", 1),
        OrderRef::new("A1", 2),
        OrderRef::new("A2", 3),
    ];

    let response = assert_ok!(session.cancel_orders(&orders).await);
    assert_eq!(response.messages().len(), 3);

    let call = &fake.calls()[0];
    assert_eq!(call.path, "/j");
    let messages = call.messages();
    assert_eq!(messages.len(), 3);
    for (message, order) in messages.iter().zip(&orders) {
        assert_eq!(message["action"], "order.cancel.json");
        assert_eq!(message["data"]["order_id"], order.order_id);
        assert_eq!(message["data"]["authToken"], "token-1");
    }
}

#[tokio::test]
async fn test_oversized_batch_never_reaches_server() {
    let fake = FakeApi::start().await.expect("Failed to start fake API");
    let mut session = Session::new(fake.config()).expect("Failed to create session");
    let orders: Vec<OrderRef> = (1..=4).map(|id| OrderRef::new("A1", id)).collect();

    let result = session.order_details_batch(&orders).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_create_order_nests_ticket() {
    let fake = FakeApi::start().await.expect("Failed to start fake API");
    let mut session = Session::new(fake.config()).expect("Failed to create session");
    let ticket = OrderTicket::limit(
        "A1",
        1.05,
        vec![
            OrderLeg::option(OrderSide::Buy, 2, "AAPL:2026:1:16:C:150", PositionType::Opening),
            OrderLeg::option(OrderSide::Sell, 2, "AAPL:2026:1:16:C:160", PositionType::Opening),
        ],
    )
    .with_time_in_force(TimeInForce::Gtc);

    assert_ok!(session.create_order(&ticket).await);

    let call = &fake.calls()[0];
    assert_eq!(call.path, "/j");
    assert_eq!(call.action(), "order.create.json");
    let data = &call.messages()[0]["data"];
    assert_eq!(data["authToken"], "token-1");
    assert_eq!(data["order"]["order_type"], "spread");
    assert_eq!(data["order"]["time_in_force"], "gtc");
    assert_eq!(data["order"]["legs"][1]["index"], 1);
    assert_eq!(data["order"]["legs"][1]["side"], "sell");
}

#[tokio::test]
async fn test_modify_order_carries_order_id() {
    let fake = FakeApi::start().await.expect("Failed to start fake API");
    let mut session = Session::new(fake.config()).expect("Failed to create session");
    let ticket = OrderTicket::limit("A1", 50.0, vec![OrderLeg::stock(OrderSide::Buy, 10, "IBM")])
        .with_order_id(77);

    assert_ok!(session.modify_order(&ticket).await);

    let call = &fake.calls()[0];
    assert_eq!(call.action(), "order.modify.json");
    assert_eq!(call.messages()[0]["data"]["order"]["order_id"], 77);
}

#[tokio::test]
async fn test_order_details_and_history_use_order_path() {
    let fake = FakeApi::start().await.expect("Failed to start fake API");
    let mut session = Session::new(fake.config()).expect("Failed to create session");

    assert_ok!(session.order_details("A1", 5).await);
    assert_ok!(session.order_history("A1", 5).await);

    let calls = fake.calls();
    assert_eq!(calls[0].action(), "order.details");
    assert_eq!(calls[1].action(), "order.history");
    assert!(calls.iter().all(|c| c.path == "/j"));
    assert!(calls.iter().all(|c| c.messages()[0]["data"]["order_id"] == 5));
}
