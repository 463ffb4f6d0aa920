//! Message classification - maps opaque message envelopes to typed events.
//!
//! A message payload stays raw JSON until its type tag has been matched;
//! only then is it decoded into the typed variant for that tag. Unknown
//! tags are a terminal no-op, not an error.

use crate::error::{DomainError, DomainResult};
use crate::models::{BankMsgSend, MsgAddPackage, TransactionMessage};

/// Type tag of bank send messages.
pub const MSG_TYPE_SEND: &str = "send";
/// Type tag of package deployment messages.
pub const MSG_TYPE_ADD_PACKAGE: &str = "add_package";

/// A classified message, carrying only the fields the sink needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEvent {
    /// Bank transfer; contributes to sender activity.
    Send {
        /// Sender address.
        from: String,
    },
    /// Package deployment; contributes to sender and package activity.
    AddPackage {
        /// Address that deployed the package.
        creator: String,
        /// Path of the deployed package.
        package_path: String,
    },
    /// Unrecognized type tag. Logged by the caller, otherwise a no-op.
    Unknown,
}

/// Classify a message envelope into a typed event.
///
/// A malformed payload for a recognized tag is a [`DomainError`]; the
/// caller logs it and moves on. It never aborts the surrounding
/// transaction or block.
pub fn classify(message: &TransactionMessage) -> DomainResult<MessageEvent> {
    match message.type_url.as_str() {
        MSG_TYPE_SEND => {
            let payload: BankMsgSend = decode_payload(message)?;
            Ok(MessageEvent::Send {
                from: payload.from_address,
            })
        }
        MSG_TYPE_ADD_PACKAGE => {
            let payload: MsgAddPackage = decode_payload(message)?;
            Ok(MessageEvent::AddPackage {
                creator: payload.creator,
                package_path: payload.package.path,
            })
        }
        _ => Ok(MessageEvent::Unknown),
    }
}

/// Decode the raw payload of a recognized message type.
fn decode_payload<T: serde::de::DeserializeOwned>(
    message: &TransactionMessage,
) -> DomainResult<T> {
    serde_json::from_value(message.value.clone()).map_err(|e| DomainError::Decoding {
        type_url: message.type_url.clone(),
        message: e.to_string(),
    })
}
