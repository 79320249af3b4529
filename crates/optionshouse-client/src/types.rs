//! Wire envelopes and request types for the OptionsHouse API.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


/// Maximum number of messages carried by one `EZList`.
pub const MAX_BATCH: usize = 3;

/// Key under which the session token travels in every signed message.
pub const AUTH_TOKEN_KEY: &str = "authToken";

// ============================================================================
// Paths & Actions
// ============================================================================

/// Endpoint path a request is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPath {
    /// Account, auth, and market view actions.
    General,
    /// Order lifecycle actions.
    Order,
}

impl ApiPath {
    /// Path segment appended to the remote host.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "/m",
            Self::Order => "/j",
        }
    }
}

impl std::fmt::Display for ApiPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named API action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `account.info`
    AccountInfo,
    /// `account.cash`
    AccountCash,
    /// `account.margin.json`
    AccountMargin,
    /// `account.positions`
    AccountPositions,
    /// `account.activity`
    AccountActivity,
    /// `auth.login`
    AuthLogin,
    /// `auth.logout`
    AuthLogout,
    /// `auth.keepAlive`
    AuthKeepAlive,
    /// `master.account.orders`
    MasterAccountOrders,
    /// `order.create.json`
    OrderCreate,
    /// `order.modify.json`
    OrderModify,
    /// `order.cancel.json`
    OrderCancel,
    /// `order.details`
    OrderDetails,
    /// `order.history`
    OrderHistory,
    /// `view.quote.list`
    ViewQuoteList,
    /// `view.series`
    ViewSeries,
}

impl Action {
    /// Action string as sent on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AccountInfo => "account.info",
            Self::AccountCash => "account.cash",
            Self::AccountMargin => "account.margin.json",
            Self::AccountPositions => "account.positions",
            Self::AccountActivity => "account.activity",
            Self::AuthLogin => "auth.login",
            Self::AuthLogout => "auth.logout",
            Self::AuthKeepAlive => "auth.keepAlive",
            Self::MasterAccountOrders => "master.account.orders",
            Self::OrderCreate => "order.create.json",
            Self::OrderModify => "order.modify.json",
            Self::OrderCancel => "order.cancel.json",
            Self::OrderDetails => "order.details",
            Self::OrderHistory => "order.history",
            Self::ViewQuoteList => "view.quote.list",
            Self::ViewSeries => "view.series",
        }
    }

    /// Endpoint the action is posted to.
    #[must_use]
    pub const fn path(&self) -> ApiPath {
        match self {
            Self::OrderCreate
            | Self::OrderModify
            | Self::OrderCancel
            | Self::OrderDetails
            | Self::OrderHistory => ApiPath::Order,
            _ => ApiPath::General,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// One action/data unit, in a request or a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Action name.
    #[serde(default)]
    pub action: String,
    /// Payload. Always a JSON object on outgoing messages.
    #[serde(default)]
    pub data: Value,
    /// Errors reported by the server for this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    /// Any other keys the server sent, kept as received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Creates a request message.
    #[must_use]
    pub fn new(action: Action, data: Map<String, Value>) -> Self {
        Self {
            action: action.name().to_string(),
            data: Value::Object(data),
            errors: None,
            extra: Map::new(),
        }
    }

    /// Creates a request message from any serializable payload.
    ///
    /// # Errors
    /// Returns error if the payload does not serialize to a JSON object.
    pub fn from_payload<T: Serialize>(action: Action, payload: &T) -> Result<Self, Error> {
        match serde_json::to_value(payload)? {
            Value::Object(data) => Ok(Self::new(action, data)),
            other => Err(Error::InvalidRequest(format!(
                "{} payload must be an object, got {}",
                action, other
            ))),
        }
    }

    /// Non-null error entries of this message.
    pub fn error_entries(&self) -> impl Iterator<Item = &Value> {
        self.errors.iter().flatten().filter(|e| !e.is_null())
    }
}

/// Request or response root: a single message or a bounded batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    /// `{"EZMessage": {...}}`
    #[serde(rename = "EZMessage")]
    Single(Message),
    /// `{"EZList": [...]}`
    #[serde(rename = "EZList")]
    List(Vec<Message>),
}

impl Envelope {
    /// Wraps one message.
    #[must_use]
    pub fn single(message: Message) -> Self {
        Self::Single(message)
    }

    /// Wraps a batch of messages.
    ///
    /// # Errors
    /// Returns error if the batch is empty or larger than [`MAX_BATCH`].
    pub fn list(messages: Vec<Message>) -> Result<Self, Error> {
        let envelope = Self::List(messages);
        envelope.validate()?;
        Ok(envelope)
    }

    /// Parses a response body.
    ///
    /// # Errors
    /// Returns error if the body is not JSON or not a valid envelope.
    pub fn parse(body: &str) -> Result<Self, Error> {
        let envelope: Self = serde_json::from_str(body)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Checks the batch bound.
    ///
    /// # Errors
    /// Returns error for an empty list or one above [`MAX_BATCH`].
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Single(_) => Ok(()),
            Self::List(messages) if messages.is_empty() => {
                Err(Error::InvalidEnvelope("EZList is empty".to_string()))
            }
            Self::List(messages) if messages.len() > MAX_BATCH => {
                Err(Error::InvalidEnvelope(format!(
                    "EZList holds {} messages, at most {} allowed",
                    messages.len(),
                    MAX_BATCH
                )))
            }
            Self::List(_) => Ok(()),
        }
    }

    /// Messages carried by the envelope.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Single(message) => std::slice::from_ref(message),
            Self::List(messages) => messages,
        }
    }

    /// Mutable access to the carried messages.
    pub fn messages_mut(&mut self) -> &mut [Message] {
        match self {
            Self::Single(message) => std::slice::from_mut(message),
            Self::List(messages) => messages,
        }
    }

    /// All non-null error entries, across every message.
    #[must_use]
    pub fn errors(&self) -> Vec<&Value> {
        self.messages()
            .iter()
            .flat_map(|m| m.error_entries())
            .collect()
    }

    /// True when no message carries an error entry.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors().is_empty()
    }

    /// Data of the first message.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.messages().first().map(|m| &m.data)
    }
}

// ============================================================================
// Order Parameters
// ============================================================================

/// Order side for trading operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Whether a leg opens or closes a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    /// Opens a new position.
    Opening,
    /// Closes an existing position.
    Closing,
}

impl std::fmt::Display for PositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Instrument class of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityType {
    /// Equity.
    Stock,
    /// Listed option.
    Option,
}

impl std::fmt::Display for SecurityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stock => write!(f, "stock"),
            Self::Option => write!(f, "option"),
        }
    }
}

/// Single-leg or multi-leg order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// One leg.
    Regular,
    /// Two or more legs.
    Spread,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Spread => write!(f, "spread"),
        }
    }
}

/// Pricing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    /// Execute at the market.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Market order once the stop price trades.
    Stop,
    /// Limit order once the stop price trades.
    StopLimit,
}

impl PriceType {
    /// Whether `price` must be set.
    #[must_use]
    pub const fn needs_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }

    /// Whether `stop_price` must be set.
    #[must_use]
    pub const fn needs_stop_price(&self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
            Self::Stop => write!(f, "stop"),
            Self::StopLimit => write!(f, "stop_limit"),
        }
    }
}

/// Order duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Expires at the end of the session.
    Day,
    /// Good till cancelled.
    Gtc,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Gtc => write!(f, "gtc"),
        }
    }
}

/// One leg of an order ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLeg {
    /// Position of the leg in the ticket, starting at 0.
    pub index: u32,
    /// Buy or sell.
    pub side: OrderSide,
    /// Number of shares or contracts.
    pub quantity: u32,
    /// Instrument class.
    pub security_type: SecurityType,
    /// Opening or closing.
    pub position_type: PositionType,
    /// Instrument key: a ticker for stocks, an option key for options.
    pub key: String,
}

impl OrderLeg {
    /// Stock leg that opens a position.
    #[must_use]
    pub fn stock(side: OrderSide, quantity: u32, symbol: &str) -> Self {
        Self {
            index: 0,
            side,
            quantity,
            security_type: SecurityType::Stock,
            position_type: PositionType::Opening,
            key: symbol.to_string(),
        }
    }

    /// Option leg.
    #[must_use]
    pub fn option(
        side: OrderSide,
        quantity: u32,
        key: &str,
        position_type: PositionType,
    ) -> Self {
        Self {
            index: 0,
            side,
            quantity,
            security_type: SecurityType::Option,
            position_type,
            key: key.to_string(),
        }
    }
}

/// Order payload for `order.create.json` and `order.modify.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    /// Account the order is placed in.
    pub account: String,
    /// Existing order, set when modifying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    /// Regular or spread.
    pub order_type: OrderType,
    /// Pricing instruction.
    pub price_type: PriceType,
    /// Duration.
    pub time_in_force: TimeInForce,
    /// Limit price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Stop trigger price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    /// Fill completely or not at all.
    #[serde(default)]
    pub all_or_none: bool,
    /// Order legs.
    pub legs: Vec<OrderLeg>,
}

impl OrderTicket {
    /// Day market order. Legs are re-indexed in the given order.
    #[must_use]
    pub fn market(account: &str, legs: Vec<OrderLeg>) -> Self {
        Self::build(account, PriceType::Market, None, legs)
    }

    /// Day limit order. Legs are re-indexed in the given order.
    #[must_use]
    pub fn limit(account: &str, price: f64, legs: Vec<OrderLeg>) -> Self {
        Self::build(account, PriceType::Limit, Some(price), legs)
    }

    fn build(
        account: &str,
        price_type: PriceType,
        price: Option<f64>,
        legs: Vec<OrderLeg>,
    ) -> Self {
        let order_type = if legs.len() > 1 {
            OrderType::Spread
        } else {
            OrderType::Regular
        };
        let legs = legs
            .into_iter()
            .zip(0u32..)
            .map(|(leg, index)| OrderLeg { index, ..leg })
            .collect();

        Self {
            account: account.to_string(),
            order_id: None,
            order_type,
            price_type,
            time_in_force: TimeInForce::Day,
            price,
            stop_price: None,
            all_or_none: false,
            legs,
        }
    }

    /// Sets the order being modified.
    #[must_use]
    pub fn with_order_id(mut self, order_id: u64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    /// Sets a stop trigger, turning market into stop and limit into stop-limit.
    #[must_use]
    pub fn with_stop(mut self, stop_price: f64) -> Self {
        self.stop_price = Some(stop_price);
        self.price_type = match self.price_type {
            PriceType::Market | PriceType::Stop => PriceType::Stop,
            PriceType::Limit | PriceType::StopLimit => PriceType::StopLimit,
        };
        self
    }

    /// Checks the ticket is complete enough to submit.
    ///
    /// # Errors
    /// Returns error if the account or legs are missing, a leg has zero
    /// quantity, or a required price is absent.
    pub fn validate(&self) -> Result<(), Error> {
        if self.account.is_empty() {
            return Err(Error::InvalidRequest("order account is empty".to_string()));
        }
        if self.legs.is_empty() {
            return Err(Error::InvalidRequest("order has no legs".to_string()));
        }
        if let Some(leg) = self.legs.iter().find(|leg| leg.quantity == 0) {
            return Err(Error::InvalidRequest(format!(
                "leg {} ({}) has zero quantity",
                leg.index, leg.key
            )));
        }
        if self.price_type.needs_price() && self.price.is_none() {
            return Err(Error::InvalidRequest(format!(
                "{} order requires a price",
                self.price_type
            )));
        }
        if self.price_type.needs_stop_price() && self.stop_price.is_none() {
            return Err(Error::InvalidRequest(format!(
                "{} order requires a stop price",
                self.price_type
            )));
        }
        Ok(())
    }
}

/// Reference to an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Account holding the order.
    pub account: String,
    /// Order identifier.
    pub order_id: u64,
}

impl OrderRef {
    /// Creates a new order reference.
    #[must_use]
    pub fn new(account: &str, order_id: u64) -> Self {
        Self {
            account: account.to_string(),
            order_id,
        }
    }
}

// ============================================================================
// Account Parameters
// ============================================================================

/// Account activity query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityQuery {
    /// Account to inspect.
    pub account: String,
    /// Page number, starting at 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Entries per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ActivityQuery {
    /// Query for the first page of an account's activity.
    #[must_use]
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Default::default()
        }
    }

    /// Selects a page.
    #[must_use]
    pub fn page(mut self, page: u32, size: u32) -> Self {
        self.page = Some(page);
        self.size = Some(size);
        self
    }
}
