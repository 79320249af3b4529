//! Typed wrappers for the OptionsHouse API actions.
//!
//! Each method shapes a request envelope and hands it to [`Session::api`].

use crate::client::Session;
use crate::error::Error;
use crate::types::{Action, ActivityQuery, Envelope, MAX_BATCH, Message, OrderRef, OrderTicket};
use serde::Serialize;
use serde_json::{Map, Value, json};

#[cfg(test)]
mod tests;

#[derive(Serialize)]
struct AccountRequest<'a> {
    account: &'a str,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    order: &'a OrderTicket,
}

/// Builds a single-message envelope from a serializable payload.
///
/// # Errors
/// Returns error if the payload is not a JSON object.
pub fn single<T: Serialize>(action: Action, payload: &T) -> Result<Envelope, Error> {
    Ok(Envelope::single(Message::from_payload(action, payload)?))
}

/// Builds a batch envelope, one message per payload.
///
/// # Errors
/// Returns error if `payloads` is empty or holds more than [`MAX_BATCH`] items.
pub fn batch<T: Serialize>(action: Action, payloads: &[T]) -> Result<Envelope, Error> {
    if payloads.is_empty() {
        return Err(Error::InvalidRequest(format!("{} batch is empty", action)));
    }
    if payloads.len() > MAX_BATCH {
        return Err(Error::InvalidRequest(format!(
            "{} batch holds {} items, at most {} allowed",
            action,
            payloads.len(),
            MAX_BATCH
        )));
    }

    let messages = payloads
        .iter()
        .map(|payload| Message::from_payload(action, payload))
        .collect::<Result<Vec<_>, _>>()?;
    Envelope::list(messages)
}

impl Session {
    /// Sends any action with caller-built data.
    ///
    /// Logging in goes through [`Session::authenticate`], so
    /// [`Action::AuthLogin`] is rejected here.
    ///
    /// # Errors
    /// Returns error if the action is `auth.login` or the request fails.
    pub async fn call(
        &mut self,
        action: Action,
        data: Map<String, Value>,
    ) -> Result<Envelope, Error> {
        if action == Action::AuthLogin {
            return Err(Error::InvalidRequest(format!(
                "{} is sent by authenticate, not call",
                action
            )));
        }

        let envelope = Envelope::single(Message::new(action, data));
        self.api(action.path(), &envelope).await
    }

    async fn send_single<T: Serialize>(
        &mut self,
        action: Action,
        payload: &T,
    ) -> Result<Envelope, Error> {
        let envelope = single(action, payload)?;
        self.api(action.path(), &envelope).await
    }

    async fn send_batch<T: Serialize>(
        &mut self,
        action: Action,
        payloads: &[T],
    ) -> Result<Envelope, Error> {
        let envelope = batch(action, payloads)?;
        self.api(action.path(), &envelope).await
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Lists the accounts visible to the login.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn account_info(&mut self) -> Result<Envelope, Error> {
        self.call(Action::AccountInfo, Map::new()).await
    }

    /// Gets cash balances for an account.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn account_cash(&mut self, account: &str) -> Result<Envelope, Error> {
        self.send_single(Action::AccountCash, &AccountRequest { account }).await
    }

    /// Gets margin requirements for an account.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn account_margin(&mut self, account: &str) -> Result<Envelope, Error> {
        self.send_single(Action::AccountMargin, &AccountRequest { account }).await
    }

    /// Gets open positions for an account.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn account_positions(&mut self, account: &str) -> Result<Envelope, Error> {
        self.send_single(Action::AccountPositions, &AccountRequest { account }).await
    }

    /// Gets open positions for up to three accounts in one request.
    ///
    /// # Errors
    /// Returns error if `accounts` is empty, too long, or the request fails.
    pub async fn account_positions_batch(
        &mut self,
        accounts: &[&str],
    ) -> Result<Envelope, Error> {
        let requests: Vec<AccountRequest<'_>> = accounts
            .iter()
            .map(|&account| AccountRequest { account })
            .collect();
        self.send_batch(Action::AccountPositions, &requests).await
    }

    /// Gets a page of account activity.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn account_activity(&mut self, query: &ActivityQuery) -> Result<Envelope, Error> {
        self.send_single(Action::AccountActivity, query).await
    }

    /// Lists orders across the master account.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn master_account_orders(&mut self, account: &str) -> Result<Envelope, Error> {
        self.send_single(Action::MasterAccountOrders, &AccountRequest { account }).await
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Extends the server-side lifetime of the current token.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn keep_alive(&mut self, account: &str) -> Result<Envelope, Error> {
        self.send_single(Action::AuthKeepAlive, &AccountRequest { account }).await
    }

    /// Ends the server-side session and forgets the token.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn logout(&mut self) -> Result<Envelope, Error> {
        let response = self.call(Action::AuthLogout, Map::new()).await?;
        self.forget_token();
        Ok(response)
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Submits a new order.
    ///
    /// # Errors
    /// Returns error if the ticket is incomplete or the request fails.
    pub async fn create_order(&mut self, ticket: &OrderTicket) -> Result<Envelope, Error> {
        ticket.validate()?;
        self.send_single(Action::OrderCreate, &OrderRequest { order: ticket }).await
    }

    /// Replaces an open order. The ticket must carry `order_id`.
    ///
    /// # Errors
    /// Returns error if the ticket is incomplete or the request fails.
    pub async fn modify_order(&mut self, ticket: &OrderTicket) -> Result<Envelope, Error> {
        ticket.validate()?;
        if ticket.order_id.is_none() {
            return Err(Error::InvalidRequest("modify requires an order_id".to_string()));
        }
        self.send_single(Action::OrderModify, &OrderRequest { order: ticket }).await
    }

    /// Cancels an open order.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn cancel_order(&mut self, account: &str, order_id: u64) -> Result<Envelope, Error> {
        self.send_single(Action::OrderCancel, &OrderRef::new(account, order_id)).await
    }

    /// Cancels up to three orders in one request.
    ///
    /// # Errors
    /// Returns error if `orders` is empty, too long, or the request fails.
    pub async fn cancel_orders(&mut self, orders: &[OrderRef]) -> Result<Envelope, Error> {
        self.send_batch(Action::OrderCancel, orders).await
    }

    /// Gets the details of an order.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn order_details(&mut self, account: &str, order_id: u64) -> Result<Envelope, Error> {
        self.send_single(Action::OrderDetails, &OrderRef::new(account, order_id)).await
    }

    /// Gets the details of up to three orders in one request.
    ///
    /// # Errors
    /// Returns error if `orders` is empty, too long, or the request fails.
    pub async fn order_details_batch(&mut self, orders: &[OrderRef]) -> Result<Envelope, Error> {
        self.send_batch(Action::OrderDetails, orders).await
    }

    /// Gets the fill and status history of an order.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn order_history(&mut self, account: &str, order_id: u64) -> Result<Envelope, Error> {
        self.send_single(Action::OrderHistory, &OrderRef::new(account, order_id)).await
    }

    // ========================================================================
    // Market View
    // ========================================================================

    /// Gets quotes for a list of instrument keys.
    ///
    /// # Errors
    /// Returns error if `keys` is empty or the request fails.
    pub async fn quote_list(&mut self, keys: &[&str]) -> Result<Envelope, Error> {
        if keys.is_empty() {
            return Err(Error::InvalidRequest("quote list is empty".to_string()));
        }
        self.send_single(Action::ViewQuoteList, &json!({ "key": keys })).await
    }

    /// Gets the option series (expirations and strikes) for an underlying.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn series(&mut self, symbol: &str) -> Result<Envelope, Error> {
        self.send_single(Action::ViewSeries, &json!({ "symbol": symbol })).await
    }
}
