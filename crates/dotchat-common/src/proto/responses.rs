//! Response envelopes.
//!
//! Every reply is either `ok` (with a command-specific payload) or `err`
//! (with a human-readable reason). The `err` reason is exactly the message
//! of the protocol error that produced it.

use super::message::Message;
use super::value::{Tag, ValueList, ValueMap};
use crate::error::{ChatError, Result};

pub const OK: &str = "ok";
pub const ERR: &str = "err";

fn expect_ok(m: &Message) -> Result<()> {
    if m.command() != OK {
        return Err(ChatError::protocol(format!(
            "Expected command `{OK}`, got `{}`.",
            m.command()
        )));
    }
    Ok(())
}

/// Bare `ok` with no payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OkayResponse;

impl OkayResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        Ok(Self)
    }

    pub fn to_message(&self) -> Message {
        Message::new(OK)
    }
}

/// `err` with a reason string.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub reason: String,
}

impl ErrorResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        if m.command() != ERR {
            return Err(ChatError::protocol(format!(
                "Expected command `{ERR}`, got `{}`.",
                m.command()
            )));
        }
        Ok(Self {
            reason: m.args().require_str("reason")?.to_string(),
        })
    }

    /// The `err` envelope for a protocol error; other error kinds are not
    /// client-visible and must not be converted.
    pub fn from_error(err: &ChatError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }

    pub fn to_message(&self) -> Message {
        Message::new(ERR).arg("reason", self.reason.as_str())
    }
}

/// `ok` carrying a fresh session token (`login`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenResponse {
    pub token: i32,
}

impl TokenResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(OK).arg("token", self.token)
    }
}

/// `ok` carrying the id of a newly created row (`new_chan`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewChannelResponse {
    pub id: i32,
}

impl NewChannelResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        Ok(Self {
            id: m.args().require_i32("id")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(OK).arg("id", self.id)
    }
}

/// One `(id, name)` row of a channel listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub id: i32,
    pub name: String,
}

/// `ok` with the channels visible to the caller (`channel_lst`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelListResponse {
    pub data: Vec<ChannelSummary>,
}

impl ChannelListResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        let list = m.args().require_list("data")?;
        let mut data = Vec::with_capacity(list.len());
        for item in list.iter() {
            let obj = match item {
                super::value::Value::Object(obj) => obj,
                _ => {
                    return Err(ChatError::protocol(
                        "Invalid contained type in channel list data.",
                    ))
                }
            };
            data.push(ChannelSummary {
                id: obj.require_i32("id")?,
                name: obj.require_str("name")?.to_string(),
            });
        }
        Ok(Self { data })
    }

    pub fn to_message(&self) -> Message {
        let list = ValueList::from_objects(self.data.iter().map(|chan| {
            ValueMap::new()
                .with("id", chan.id)
                .with("name", chan.name.as_str())
        }));
        Message::new(OK).arg("data", list)
    }
}

/// One message row of a channel history.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntry {
    pub sender: i32,
    pub when: u32,
    pub cnt: String,
}

/// `ok` with a channel's messages, oldest first (`channel_msg`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMessagesResponse {
    pub msgs: Vec<MessageEntry>,
}

impl ChannelMessagesResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        let list = m.args().require_list("msgs")?;
        let mut msgs = Vec::with_capacity(list.len());
        for item in list.iter() {
            let obj = match item {
                super::value::Value::Object(obj) => obj,
                _ => {
                    return Err(ChatError::protocol(
                        "Invalid contained type in channel message data.",
                    ))
                }
            };
            msgs.push(MessageEntry {
                sender: obj.require_i32("sender")?,
                when: obj.require_u32("when")?,
                cnt: obj.require_str("cnt")?.to_string(),
            });
        }
        Ok(Self { msgs })
    }

    pub fn to_message(&self) -> Message {
        let list = ValueList::from_objects(self.msgs.iter().map(|msg| {
            ValueMap::new()
                .with("sender", msg.sender)
                .with("when", msg.when)
                .with("cnt", msg.cnt.as_str())
        }));
        Message::new(OK).arg("msgs", list)
    }
}

/// `ok` with channel metadata and members (`chan_detail`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDetailsResponse {
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
    /// Absent travels as the empty string on the wire.
    pub desc: Option<String>,
    pub members: Vec<i32>,
}

impl ChannelDetailsResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        let desc = m.args().require_str("desc")?;
        Ok(Self {
            id: m.args().require_i32("id")?,
            name: m.args().require_str("name")?.to_string(),
            owner_id: m.args().require_i32("owner_id")?,
            desc: (!desc.is_empty()).then(|| desc.to_string()),
            members: require_i32_list(m.args(), "members")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(OK)
            .arg("id", self.id)
            .arg("name", self.name.as_str())
            .arg("owner_id", self.owner_id)
            .arg("desc", self.desc.as_deref().unwrap_or(""))
            .arg("members", ValueList::from_i32s(self.members.iter().copied()))
    }
}

/// `ok` with a user's identity and shared channels (`usr_detail`).
#[derive(Debug, Clone, PartialEq)]
pub struct UserDetailsResponse {
    pub id: i32,
    pub name: String,
    pub mutual_channels: Vec<i32>,
}

impl UserDetailsResponse {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_ok(m)?;
        Ok(Self {
            id: m.args().require_i32("id")?,
            name: m.args().require_str("name")?.to_string(),
            mutual_channels: require_i32_list(m.args(), "mutual_channels")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(OK)
            .arg("id", self.id)
            .arg("name", self.name.as_str())
            .arg(
                "mutual_channels",
                ValueList::from_i32s(self.mutual_channels.iter().copied()),
            )
    }
}

fn require_i32_list(args: &ValueMap, key: &str) -> Result<Vec<i32>> {
    let list = args.require_list(key)?;
    if !list.is_empty() && list.elem_tag() != Tag::Int32 {
        return Err(ChatError::protocol(format!(
            "Key `{key}` doesn't have the correct type."
        )));
    }
    let mut out = Vec::with_capacity(list.len());
    for item in list.iter() {
        if let super::value::Value::Int32(v) = item {
            out.push(*v);
        }
    }
    Ok(out)
}
