//! Routes one incoming message to its handler and shapes the reply.

use tracing::{debug, error};

use dotchat_common::error::{ChatError, Result};
use dotchat_common::proto::requests::commands;
use dotchat_common::proto::responses::ErrorResponse;
use dotchat_common::Message;

use crate::handlers;
use crate::store::Store;

/// Dispatch `msg` and produce the reply to send back.
///
/// Protocol errors (unknown command, bad envelope, failed domain
/// precondition) become `err` responses and the connection stays open.
/// Store failures are logged in full and answered with a stable reason.
/// Anything else is fatal for the connection and propagates to the worker.
pub fn dispatch(store: &Store, msg: &Message) -> Result<Message> {
    debug!(command = msg.command(), "dispatching request");

    let outcome = match msg.command() {
        commands::LOGIN => handlers::login(store, msg),
        commands::LOGOUT => handlers::logout(store, msg),
        commands::CHANNEL_LIST => handlers::channel_list(store, msg),
        commands::CHANNEL_MESSAGES => handlers::channel_messages(store, msg),
        commands::MESSAGE_SEND => handlers::message_send(store, msg),
        commands::CHANNEL_DETAILS => handlers::channel_details(store, msg),
        commands::NEW_CHANNEL => handlers::new_channel(store, msg),
        commands::NEW_USER => handlers::new_user(store, msg),
        commands::CHANGE_PASS => handlers::change_pass(store, msg),
        commands::USER_DETAILS => handlers::user_details(store, msg),
        commands::INVITE => handlers::invite(store, msg),
        other => Err(ChatError::protocol(format!(
            "Command '{other}' is invalid."
        ))),
    };

    match outcome {
        Ok(reply) => Ok(reply),
        Err(ChatError::Protocol(reason)) => {
            debug!(command = msg.command(), %reason, "request refused");
            Ok(ErrorResponse { reason }.to_message())
        }
        Err(ChatError::Store(detail)) => {
            error!(command = msg.command(), %detail, "store failure");
            Ok(ErrorResponse {
                reason: "Internal storage error.".into(),
            }
            .to_message())
        }
        Err(fatal) => Err(fatal),
    }
}
