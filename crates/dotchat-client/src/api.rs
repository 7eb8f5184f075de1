//! Typed wrappers around the wire commands.
//!
//! Every call sends one request envelope, waits for the reply, and parses
//! it: `ok` into the typed response, `err` into a protocol error carrying
//! the server's reason.

use std::path::Path;

use dotchat_common::error::{ChatError, Result};
use dotchat_common::proto::requests::*;
use dotchat_common::proto::responses::{self, *};
use dotchat_common::Message;

use crate::connection::Connection;

pub struct ChatClient {
    conn: Connection,
}

impl ChatClient {
    pub fn connect(cert_path: &Path, host: &str, port: u16) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(cert_path, host, port)?,
        })
    }

    fn ask<T>(&mut self, req: &Message, parse: impl FnOnce(&Message) -> Result<T>) -> Result<T> {
        let reply = self.conn.round_trip(req)?;
        match reply.command() {
            responses::OK => parse(&reply),
            responses::ERR => {
                let err = ErrorResponse::from_message(&reply)?;
                Err(ChatError::Protocol(err.reason))
            }
            other => Err(ChatError::protocol(format!(
                "Message with invalid command `{other}`. Expected `ok` or `err`."
            ))),
        }
    }

    pub fn login(&mut self, user: &str, pass: &str) -> Result<i32> {
        let req = LoginRequest {
            user: user.into(),
            pass: pass.into(),
        };
        self.ask(&req.to_message(), |m| {
            Ok(TokenResponse::from_message(m)?.token)
        })
    }

    pub fn logout(&mut self, token: i32) -> Result<()> {
        self.ask(&LogoutRequest { token }.to_message(), |m| {
            OkayResponse::from_message(m).map(drop)
        })
    }

    pub fn sign_up(&mut self, name: &str, pass: &str) -> Result<()> {
        let req = NewUserRequest {
            name: name.into(),
            pass: pass.into(),
        };
        self.ask(&req.to_message(), |m| {
            OkayResponse::from_message(m).map(drop)
        })
    }

    pub fn channel_list(&mut self, token: i32) -> Result<Vec<ChannelSummary>> {
        self.ask(&ChannelListRequest { token }.to_message(), |m| {
            Ok(ChannelListResponse::from_message(m)?.data)
        })
    }

    pub fn channel_messages(&mut self, token: i32, chan_id: i32) -> Result<Vec<MessageEntry>> {
        self.ask(
            &ChannelMessagesRequest { token, chan_id }.to_message(),
            |m| Ok(ChannelMessagesResponse::from_message(m)?.msgs),
        )
    }

    pub fn channel_details(&mut self, token: i32, chan_id: i32) -> Result<ChannelDetailsResponse> {
        self.ask(
            &ChannelDetailsRequest { token, chan_id }.to_message(),
            ChannelDetailsResponse::from_message,
        )
    }

    pub fn send_message(&mut self, token: i32, chan_id: i32, text: &str) -> Result<()> {
        let req = MessageSendRequest {
            token,
            chan_id,
            msg_cnt: text.into(),
        };
        self.ask(&req.to_message(), |m| {
            OkayResponse::from_message(m).map(drop)
        })
    }

    pub fn new_channel(&mut self, token: i32, name: &str, desc: Option<&str>) -> Result<i32> {
        let req = NewChannelRequest {
            token,
            name: name.into(),
            desc: desc.map(String::from),
        };
        self.ask(&req.to_message(), |m| {
            Ok(NewChannelResponse::from_message(m)?.id)
        })
    }

    pub fn change_pass(&mut self, token: i32, new_pass: &str) -> Result<()> {
        let req = ChangePassRequest {
            token,
            new_pass: new_pass.into(),
        };
        self.ask(&req.to_message(), |m| {
            OkayResponse::from_message(m).map(drop)
        })
    }

    pub fn user_details(&mut self, token: i32, uid: i32) -> Result<UserDetailsResponse> {
        self.ask(
            &UserDetailsRequest { token, uid }.to_message(),
            UserDetailsResponse::from_message,
        )
    }

    pub fn invite(&mut self, token: i32, uid: i32, chan_id: i32) -> Result<()> {
        self.ask(&InviteRequest { token, uid, chan_id }.to_message(), |m| {
            OkayResponse::from_message(m).map(drop)
        })
    }

    pub fn close(&mut self) {
        self.conn.close();
    }
}
