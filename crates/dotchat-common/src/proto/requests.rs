//! Request envelopes.
//!
//! Each request is a record with a fixed command and named fields.
//! `from_message` validates command, key presence and key type, failing
//! with a protocol error; `to_message` cannot fail because envelope
//! invariants hold by construction.

use super::message::Message;
use crate::error::{ChatError, Result};

/// The closed set of request commands. A message whose root command is not
/// in this set must be rejected by the dispatcher.
pub mod commands {
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const CHANNEL_LIST: &str = "channel_lst";
    pub const CHANNEL_MESSAGES: &str = "channel_msg";
    pub const MESSAGE_SEND: &str = "msg_send";
    pub const CHANNEL_DETAILS: &str = "chan_detail";
    pub const NEW_CHANNEL: &str = "new_chan";
    pub const NEW_USER: &str = "new_usr";
    pub const CHANGE_PASS: &str = "ch_pass";
    pub const USER_DETAILS: &str = "usr_detail";
    pub const INVITE: &str = "invite";

    pub const ALL: &[&str] = &[
        LOGIN,
        LOGOUT,
        CHANNEL_LIST,
        CHANNEL_MESSAGES,
        MESSAGE_SEND,
        CHANNEL_DETAILS,
        NEW_CHANNEL,
        NEW_USER,
        CHANGE_PASS,
        USER_DETAILS,
        INVITE,
    ];
}

fn expect_command(m: &Message, want: &str) -> Result<()> {
    if m.command() != want {
        return Err(ChatError::protocol(format!(
            "Expected command `{want}`, got `{}`.",
            m.command()
        )));
    }
    Ok(())
}

/// `login` — authenticate by name and password.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginRequest {
    pub user: String,
    pub pass: String,
}

impl LoginRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::LOGIN)?;
        Ok(Self {
            user: m.args().require_str("user")?.to_string(),
            pass: m.args().require_str("pass")?.to_string(),
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::LOGIN)
            .arg("user", self.user.as_str())
            .arg("pass", self.pass.as_str())
    }
}

/// `logout` — revoke every session key of the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoutRequest {
    pub token: i32,
}

impl LogoutRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::LOGOUT)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::LOGOUT).arg("token", self.token)
    }
}

/// `channel_lst` — channels the authenticated user is a member of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelListRequest {
    pub token: i32,
}

impl ChannelListRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::CHANNEL_LIST)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::CHANNEL_LIST).arg("token", self.token)
    }
}

/// `channel_msg` — messages of one channel, oldest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMessagesRequest {
    pub token: i32,
    pub chan_id: i32,
}

impl ChannelMessagesRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::CHANNEL_MESSAGES)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            chan_id: m.args().require_i32("chan_id")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::CHANNEL_MESSAGES)
            .arg("token", self.token)
            .arg("chan_id", self.chan_id)
    }
}

/// `msg_send` — append a message to a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSendRequest {
    pub token: i32,
    pub chan_id: i32,
    pub msg_cnt: String,
}

impl MessageSendRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::MESSAGE_SEND)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            chan_id: m.args().require_i32("chan_id")?,
            msg_cnt: m.args().require_str("msg_cnt")?.to_string(),
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::MESSAGE_SEND)
            .arg("token", self.token)
            .arg("chan_id", self.chan_id)
            .arg("msg_cnt", self.msg_cnt.as_str())
    }
}

/// `chan_detail` — metadata and member list of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelDetailsRequest {
    pub token: i32,
    pub chan_id: i32,
}

impl ChannelDetailsRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::CHANNEL_DETAILS)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            chan_id: m.args().require_i32("chan_id")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::CHANNEL_DETAILS)
            .arg("token", self.token)
            .arg("chan_id", self.chan_id)
    }
}

/// `new_chan` — create a channel owned by the caller.
///
/// An absent description travels as the empty string; this is the one spot
/// where the wire is lossy with respect to the in-memory model.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChannelRequest {
    pub token: i32,
    pub name: String,
    pub desc: Option<String>,
}

impl NewChannelRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::NEW_CHANNEL)?;
        let desc = m.args().require_str("desc")?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            name: m.args().require_str("name")?.to_string(),
            desc: (!desc.is_empty()).then(|| desc.to_string()),
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::NEW_CHANNEL)
            .arg("token", self.token)
            .arg("name", self.name.as_str())
            .arg("desc", self.desc.as_deref().unwrap_or(""))
    }
}

/// `new_usr` — sign up; the only request besides `login` without a token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRequest {
    pub name: String,
    pub pass: String,
}

impl NewUserRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::NEW_USER)?;
        Ok(Self {
            name: m.args().require_str("name")?.to_string(),
            pass: m.args().require_str("pass")?.to_string(),
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::NEW_USER)
            .arg("name", self.name.as_str())
            .arg("pass", self.pass.as_str())
    }
}

/// `ch_pass` — change the authenticated user's password.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePassRequest {
    pub token: i32,
    pub new_pass: String,
}

impl ChangePassRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::CHANGE_PASS)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            new_pass: m.args().require_str("new_pass")?.to_string(),
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::CHANGE_PASS)
            .arg("token", self.token)
            .arg("new_pass", self.new_pass.as_str())
    }
}

/// `usr_detail` — a user's name and the channels shared with the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserDetailsRequest {
    pub token: i32,
    pub uid: i32,
}

impl UserDetailsRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::USER_DETAILS)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            uid: m.args().require_i32("uid")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::USER_DETAILS)
            .arg("token", self.token)
            .arg("uid", self.uid)
    }
}

/// `invite` — channel owner adds another user to the member set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InviteRequest {
    pub token: i32,
    pub uid: i32,
    pub chan_id: i32,
}

impl InviteRequest {
    pub fn from_message(m: &Message) -> Result<Self> {
        expect_command(m, commands::INVITE)?;
        Ok(Self {
            token: m.args().require_i32("token")?,
            uid: m.args().require_i32("uid")?,
            chan_id: m.args().require_i32("chan_id")?,
        })
    }

    pub fn to_message(&self) -> Message {
        Message::new(commands::INVITE)
            .arg("token", self.token)
            .arg("uid", self.uid)
            .arg("chan_id", self.chan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::value::Value;

    #[test]
    fn test_login_roundtrip() {
        let req = LoginRequest {
            user: "master".into(),
            pass: "pass".into(),
        };
        assert_eq!(LoginRequest::from_message(&req.to_message()).unwrap(), req);
    }

    #[test]
    fn test_command_mismatch() {
        let m = Message::new("logout").arg("user", "a").arg("pass", "b");
        let err = LoginRequest::from_message(&m).unwrap_err();
        assert_eq!(err.to_string(), "Expected command `login`, got `logout`.");
    }

    #[test]
    fn test_missing_key_mentions_it() {
        let m = Message::new("login").arg("user", "a");
        let err = LoginRequest::from_message(&m).unwrap_err();
        assert_eq!(err.to_string(), "Key `pass` not present.");
    }

    #[test]
    fn test_wrong_type_mentions_it() {
        let m = Message::new("invite")
            .arg("token", 1i32)
            .arg("uid", "two")
            .arg("chan_id", 3i32);
        let err = InviteRequest::from_message(&m).unwrap_err();
        assert_eq!(err.to_string(), "Key `uid` doesn't have the correct type.");
    }

    #[test]
    fn test_every_required_key_is_checked() {
        // For each request shape: dropping any single key must fail with a
        // protocol error naming that key.
        let shapes: Vec<(Message, Vec<&str>)> = vec![
            (
                LoginRequest {
                    user: "u".into(),
                    pass: "p".into(),
                }
                .to_message(),
                vec!["user", "pass"],
            ),
            (LogoutRequest { token: 1 }.to_message(), vec!["token"]),
            (ChannelListRequest { token: 1 }.to_message(), vec!["token"]),
            (
                ChannelMessagesRequest { token: 1, chan_id: 2 }.to_message(),
                vec!["token", "chan_id"],
            ),
            (
                MessageSendRequest {
                    token: 1,
                    chan_id: 2,
                    msg_cnt: "hi".into(),
                }
                .to_message(),
                vec!["token", "chan_id", "msg_cnt"],
            ),
            (
                ChannelDetailsRequest { token: 1, chan_id: 2 }.to_message(),
                vec!["token", "chan_id"],
            ),
            (
                NewChannelRequest {
                    token: 1,
                    name: "n".into(),
                    desc: None,
                }
                .to_message(),
                vec!["token", "name", "desc"],
            ),
            (
                NewUserRequest {
                    name: "n".into(),
                    pass: "p".into(),
                }
                .to_message(),
                vec!["name", "pass"],
            ),
            (
                ChangePassRequest {
                    token: 1,
                    new_pass: "p".into(),
                }
                .to_message(),
                vec!["token", "new_pass"],
            ),
            (
                UserDetailsRequest { token: 1, uid: 2 }.to_message(),
                vec!["token", "uid"],
            ),
            (
                InviteRequest {
                    token: 1,
                    uid: 2,
                    chan_id: 3,
                }
                .to_message(),
                vec!["token", "uid", "chan_id"],
            ),
        ];

        for (full, keys) in shapes {
            for key in keys {
                let mut args = crate::proto::ValueMap::new();
                for (k, v) in full.args().iter() {
                    if k != key {
                        args.set(k, v.clone());
                    }
                }
                let stripped = Message::with_args(full.command(), args);
                let err = parse_any(&stripped).unwrap_err();
                assert_eq!(
                    err.to_string(),
                    format!("Key `{key}` not present."),
                    "command {}",
                    full.command()
                );
            }
        }
    }

    fn parse_any(m: &Message) -> Result<()> {
        match m.command() {
            commands::LOGIN => LoginRequest::from_message(m).map(drop),
            commands::LOGOUT => LogoutRequest::from_message(m).map(drop),
            commands::CHANNEL_LIST => ChannelListRequest::from_message(m).map(drop),
            commands::CHANNEL_MESSAGES => ChannelMessagesRequest::from_message(m).map(drop),
            commands::MESSAGE_SEND => MessageSendRequest::from_message(m).map(drop),
            commands::CHANNEL_DETAILS => ChannelDetailsRequest::from_message(m).map(drop),
            commands::NEW_CHANNEL => NewChannelRequest::from_message(m).map(drop),
            commands::NEW_USER => NewUserRequest::from_message(m).map(drop),
            commands::CHANGE_PASS => ChangePassRequest::from_message(m).map(drop),
            commands::USER_DETAILS => UserDetailsRequest::from_message(m).map(drop),
            commands::INVITE => InviteRequest::from_message(m).map(drop),
            other => panic!("unknown command {other}"),
        }
    }

    #[test]
    fn test_new_channel_desc_roundtrips_absence_as_empty() {
        let without = NewChannelRequest {
            token: 1,
            name: "general".into(),
            desc: None,
        };
        let wire = without.to_message();
        assert_eq!(wire.args().get("desc"), Some(&Value::Str(String::new())));
        assert_eq!(NewChannelRequest::from_message(&wire).unwrap().desc, None);

        let with = NewChannelRequest {
            desc: Some("main room".into()),
            ..without
        };
        assert_eq!(
            NewChannelRequest::from_message(&with.to_message()).unwrap(),
            with
        );
    }
}
