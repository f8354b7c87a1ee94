//! Action parsing
//!
//! Turns a step's `(action, params)` into a [`TransferCandidate`]. Each action
//! kind registers a parse function in the [`ActionRegistry`]; parsing never
//! touches the ledger.

use ethers::types::{Address, Bytes, U256};
use std::collections::{BTreeMap, HashMap};

use crate::error::IntentError;

/// Name of the built-in value transfer action
pub const PAYMENT_ACTION: &str = "payment";

/// Ledger-ready transfer derived from one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCandidate {
    pub to: Address,
    /// Wei, strictly positive for payments
    pub value: U256,
    pub data: Option<Bytes>,
}

/// Parse function for one action kind
pub type ParseFn = fn(&BTreeMap<String, String>) -> Result<TransferCandidate, IntentError>;

/// Registry mapping action names to their parse functions
pub struct ActionRegistry {
    parsers: HashMap<String, ParseFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        ActionRegistry {
            parsers: HashMap::new(),
        }
    }

    /// Registry with every built-in action kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PAYMENT_ACTION, parse_payment);
        registry
    }

    /// Register a parser, replacing any previous one with the same name
    pub fn register(&mut self, action: &str, parser: ParseFn) {
        self.parsers.insert(action.to_string(), parser);
    }

    /// Names of all registered actions, sorted
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parsers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn parse(
        &self,
        action: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<TransferCandidate, IntentError> {
        let parser = self
            .parsers
            .get(action)
            .ok_or_else(|| IntentError::UnsupportedAction(action.to_string()))?;
        parser(params)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn param<'a>(params: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// `payment`: `recipient` (hex address), `amount` (decimal wei), optional `data` (hex)
pub fn parse_payment(params: &BTreeMap<String, String>) -> Result<TransferCandidate, IntentError> {
    let recipient = param(params, "recipient")
        .ok_or_else(|| IntentError::InvalidParameter("missing recipient parameter".to_string()))?;
    let to = parse_address(recipient).ok_or_else(|| {
        IntentError::InvalidParameter("invalid recipient address format".to_string())
    })?;

    let amount = param(params, "amount")
        .ok_or_else(|| IntentError::InvalidParameter("missing amount parameter".to_string()))?;
    let value = parse_amount(amount).ok_or_else(|| {
        IntentError::InvalidParameter("invalid amount format (must be decimal integer)".to_string())
    })?;
    if value.is_zero() {
        return Err(IntentError::InvalidParameter("amount must be positive".to_string()));
    }

    let data = match param(params, "data") {
        Some(raw) => Some(parse_data(raw)?),
        None => None,
    };

    Ok(TransferCandidate { to, value, data })
}

fn parse_address(s: &str) -> Option<Address> {
    let hex_part = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if hex_part.len() != 40 {
        return None;
    }
    let bytes = hex::decode(hex_part).ok()?;
    Some(Address::from_slice(&bytes))
}

fn parse_amount(s: &str) -> Option<U256> {
    // from_dec_str alone accepts some inputs we don't want (signs, empty)
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(s).ok()
}

fn parse_data(s: &str) -> Result<Bytes, IntentError> {
    let hex_part = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex_part)
        .map(Bytes::from)
        .map_err(|e| IntentError::InvalidParameter(format!("invalid data hex: {}", e)))
}
