//! Cross-format identity keys.
//!
//! An SMS and an MMS participant address describe the same message when the
//! canonical phone number, the direction and the readable date all agree.

use phonenumber::country::Id;
use phonenumber::Mode;
use tracing::trace;

use crate::models::{AddrRecord, MmsRecord, SmsRecord};

/// Region assumed for numbers written without a country code
pub const DEFAULT_REGION: Id = Id::US;

/// MMS PDU code for a recipient ("to") address
pub const MMS_TO: &str = "151";
/// MMS PDU code for a sender ("from") address
pub const MMS_FROM: &str = "137";
/// SMS type for a received message
pub const SMS_RECEIVED: &str = "1";
/// SMS type for a sent message
pub const SMS_SENT: &str = "2";

/// (canonical address, direction, readable date)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    /// Canonical phone number, or the raw address when it does not parse
    pub address: String,
    /// Direction in the SMS type vocabulary
    pub direction: String,
    /// Readable date, verbatim
    pub readable_date: String,
}

impl IdentityKey {
    /// Build a key from its raw components
    #[must_use]
    pub fn new(address: &str, direction: &str, readable_date: &str) -> Self {
        Self {
            address: canonicalize_address(address),
            direction: direction.to_string(),
            readable_date: readable_date.to_string(),
        }
    }

    /// Key for a staged SMS
    #[must_use]
    pub fn for_sms(sms: &SmsRecord) -> Self {
        Self::new(
            sms.address().unwrap_or_default(),
            sms.message_type().unwrap_or_default(),
            sms.readable_date().unwrap_or_default(),
        )
    }

    /// Key for one MMS participant, dated by its parent message.
    ///
    /// `None` when the participant's direction has no SMS equivalent; such
    /// an address can never match an SMS.
    #[must_use]
    pub fn for_mms_addr(mms: &MmsRecord, addr: &AddrRecord) -> Option<Self> {
        let direction = map_mms_direction(addr.direction_code()?)?;
        Some(Self::new(
            addr.address().unwrap_or_default(),
            direction,
            mms.readable_date().unwrap_or_default(),
        ))
    }
}

/// Canonical international form of a phone number.
///
/// Falls back to the address unchanged when it cannot be parsed (short
/// codes, e-mail gateways, tokens).
#[must_use]
pub fn canonicalize_address(address: &str) -> String {
    match phonenumber::parse(Some(DEFAULT_REGION), address) {
        Ok(number) => number.format().mode(Mode::E164).to_string(),
        Err(err) => {
            trace!(address, error = %err, "Returning address unformatted");
            address.to_string()
        }
    }
}

/// Map an MMS participant code onto the SMS type vocabulary
#[must_use]
pub fn map_mms_direction(code: &str) -> Option<&'static str> {
    match code {
        MMS_TO => Some(SMS_SENT),
        MMS_FROM => Some(SMS_RECEIVED),
        _ => None,
    }
}
