//! # Contract Error Codes
//!
//! Static code table of the ChainBrawler contract.
//!
//! | Band        | Domain                     | Category    |
//! |-------------|----------------------------|-------------|
//! | 1000-1099   | Access control             | Validation  |
//! | 1100-1199   | Fees and payment           | Contract    |
//! | 1200-1299   | Characters                 | Character   |
//! | 1300-1399   | Combat                     | Contract    |
//! | 1400-1499   | Batch validation           | Validation  |
//! | 1500-1599   | Treasury and pools         | Pool        |
//! | 1600-1699   | Enemies                    | Contract    |
//! | 1700-1799   | Leaderboard and claims     | Leaderboard |
//! | 2000+       | Packed-data integrity      | Contract    |
//!
//! Everything here is a pure function of the code.

use std::borrow::Cow;

use chainbrawler_shared::UNKNOWN_ERROR_CODE;

use crate::error::{ErrorCategory, LedgerError};

/// Codes that describe transient ledger conditions.
pub const RETRYABLE_CODES: [u32; 3] = [
    1704, // Insufficient contract balance
    1503, // Transfer failed (treasury)
    1718, // Transfer failed (claims)
];

/// Fixed message for a known code.
#[must_use]
pub const fn known_message(code: u32) -> Option<&'static str> {
    let message = match code {
        // Access control
        1001 => "Only owner",
        1002 => "Only owner or test helper",
        // Fees and payment
        1101 => "Insufficient fee",
        1102 => "Already at full health",
        1103 => "Healing on cooldown",
        // Characters
        1201 => "Character does not exist",
        1202 => "Character is not alive",
        1203 => "Invalid address",
        1204 => "Character is in combat",
        1205 => "Character is not in combat",
        1206 => "Character already exists",
        1207 => "Invalid class",
        1208 => "Character is already alive",
        // Combat
        1301 => "Invalid enemy level",
        // Batch validation
        1401 => "Empty players array",
        1402 => "Batch size too large",
        1403 => "Invalid player address",
        // Treasury
        1501 => "Drop rate too high",
        1502 => "No funds to withdraw",
        1503 => "Transfer failed",
        1504 => "cached dropRate exceeds MAX_DROP_RATE_BP",
        // Enemies
        1601 => "Enemy does not exist",
        1602 => "No active combat state",
        // Leaderboard and claims
        1701 => "Invalid epoch",
        1702 => "No funds provided",
        1703 => "Array length mismatch",
        1704 => "Insufficient contract balance",
        1705 => "Invalid root",
        1706 => "Epoch already published",
        1707 => "Unfunded epoch",
        1708 => "No root available",
        1709 => "Dispute window not expired",
        1710 => "Claim window expired",
        1711 => "Already claimed",
        1712 => "Insufficient epoch funds",
        1713 => "Not published",
        1714 => "Claim window still active",
        1715 => "No unclaimed funds",
        1716 => "Invalid recipient address",
        1717 => "Invalid treasury address",
        1718 => "Transfer failed",
        1719 => "Invalid proof",
        1720 => "Withdraw failed",
        // Packed data
        2001 => "BitPackedCharacterLib: combat overflow",
        2002 => "BitPackedCharacterLib: endurance overflow",
        2003 => "BitPackedCharacterLib: defense overflow",
        2004 => "BitPackedCharacterLib: luck overflow",
        2101 => "BitPackedEnemyLib: baseCombat overflow",
        2102 => "BitPackedEnemyLib: baseEndurance overflow",
        2103 => "BitPackedEnemyLib: baseDefense overflow",
        2104 => "BitPackedEnemyLib: baseLuck overflow",
        2105 => "BitPackedEnemyLib: xpReward overflow",
        2106 => "BitPackedEnemyLib: dropRate overflow",
        _ => return None,
    };
    Some(message)
}

/// Message for any code; unknown codes get `"Unknown error: <code>"`.
#[must_use]
pub fn message(code: u32) -> Cow<'static, str> {
    match known_message(code) {
        Some(text) => Cow::Borrowed(text),
        None => Cow::Owned(format!("Unknown error: {code}")),
    }
}

/// Resolves the numeric code hidden in a ledger failure.
///
/// Tries, in order: the failure itself, its `code` field, the nested
/// failure's code, then an `error code: <digits>` pattern (case-insensitive)
/// in its message. A code of `0` counts as absent.
#[must_use]
pub fn extract_code(failure: &LedgerError) -> Option<u32> {
    match failure {
        LedgerError::Code(code) => nonzero(*code),
        LedgerError::Rpc {
            code,
            message,
            inner,
        } => code
            .and_then(nonzero)
            .or_else(|| inner.as_deref().and_then(direct_code))
            .or_else(|| code_in_message(message)),
        LedgerError::Message(message) => code_in_message(message),
        LedgerError::Unsupported(_) => None,
    }
}

/// Code carried directly by a failure, without looking at its message.
fn direct_code(failure: &LedgerError) -> Option<u32> {
    match failure {
        LedgerError::Code(code) => nonzero(*code),
        LedgerError::Rpc { code, .. } => code.and_then(nonzero),
        _ => None,
    }
}

#[inline]
const fn nonzero(code: u32) -> Option<u32> {
    if code == 0 {
        None
    } else {
        Some(code)
    }
}

/// First `error code: <digits>` match in `message`, ignoring ASCII case.
fn code_in_message(message: &str) -> Option<u32> {
    const NEEDLE: &str = "error code: ";

    let lowered = message.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(offset) = lowered[search_from..].find(NEEDLE) {
        let digits_start = search_from + offset + NEEDLE.len();
        let digits: &str = {
            let rest = &lowered[digits_start..];
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            &rest[..end]
        };
        if let Ok(code) = digits.parse() {
            return nonzero(code);
        }
        search_from = digits_start;
    }
    None
}

/// Taxonomy bucket for a code.
#[must_use]
pub const fn categorize(code: u32) -> ErrorCategory {
    if code == UNKNOWN_ERROR_CODE {
        return ErrorCategory::Unknown;
    }
    match code {
        1000..=1099 | 1400..=1499 => ErrorCategory::Validation,
        1100..=1199 | 1300..=1399 | 1600..=1699 => ErrorCategory::Contract,
        1200..=1299 => ErrorCategory::Character,
        1500..=1599 => ErrorCategory::Pool,
        1700..=1799 => ErrorCategory::Leaderboard,
        2000..=u32::MAX => ErrorCategory::Contract,
        _ => ErrorCategory::Unknown,
    }
}

/// Whether a code describes a transient ledger condition.
#[must_use]
pub fn is_retryable(code: u32) -> bool {
    RETRYABLE_CODES.contains(&code)
}
