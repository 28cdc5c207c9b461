//! Sandbox identifiers
//!
//! A sandbox id is the last ten digits of a 15-digit Luhn-valid number
//! starting with `808403`. Candidates are regenerated until one is not
//! already used by another organization.

use std::future::Future;

use tracing::debug;

use crate::errors::{PortalError, Result};

pub const SANDBOX_PREFIX: &str = "808403";
pub const FULL_LENGTH: usize = 15;
pub const SANDBOX_ID_LENGTH: usize = 10;

/// 碰撞概率极低，超过上限视为存储异常
const MAX_ATTEMPTS: usize = 100;

/// Check digit that makes `payload` + digit pass the Luhn test
pub fn luhn_check_digit(payload: &str) -> Option<u8> {
    let mut sum = 0u32;
    for (i, c) in payload.chars().rev().enumerate() {
        let mut d = c.to_digit(10)?;
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    Some(((10 - sum % 10) % 10) as u8)
}

pub fn is_luhn_valid(number: &str) -> bool {
    if number.len() < 2 {
        return false;
    }
    let (payload, check) = number.split_at(number.len() - 1);
    match (luhn_check_digit(payload), check.parse::<u8>()) {
        (Some(expected), Ok(actual)) => expected == actual,
        _ => false,
    }
}

/// Random Luhn-valid number of `length` digits starting with `prefix`
pub fn generate_luhn(prefix: &str, length: usize) -> String {
    let mut number = prefix.to_string();
    while number.len() < length.saturating_sub(1) {
        let digit = rand::random_range(0..10u8);
        number.push(char::from(b'0' + digit));
    }
    if let Some(check) = luhn_check_digit(&number) {
        number.push(char::from(b'0' + check));
    }
    number
}

pub fn generate_candidate() -> String {
    let full = generate_luhn(SANDBOX_PREFIX, FULL_LENGTH);
    full[full.len() - SANDBOX_ID_LENGTH..].to_string()
}

/// Whether `sandbox_id` could have come from [`generate_candidate`]
pub fn is_valid_sandbox_id(sandbox_id: &str) -> bool {
    let head = &SANDBOX_PREFIX[..FULL_LENGTH - SANDBOX_ID_LENGTH];
    sandbox_id.len() == SANDBOX_ID_LENGTH
        && sandbox_id.starts_with(&SANDBOX_PREFIX[FULL_LENGTH - SANDBOX_ID_LENGTH..])
        && is_luhn_valid(&format!("{}{}", head, sandbox_id))
}

/// Draw candidates from `generate` until `exists` reports one as free
pub async fn generate_unique_with<G, F, Fut>(mut generate: G, mut exists: F) -> Result<String>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = generate();
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        debug!("Sandbox id collision on attempt {}: {}", attempt, candidate);
    }
    Err(PortalError::database_operation(format!(
        "Could not find a free sandbox id after {} attempts",
        MAX_ATTEMPTS
    )))
}

pub async fn generate_unique<F, Fut>(exists: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    generate_unique_with(generate_candidate, exists).await
}
