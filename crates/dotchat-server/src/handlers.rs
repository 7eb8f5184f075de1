//! One handler per command.
//!
//! A handler parses its request envelope, performs the domain operation
//! against the store, and builds the response envelope. Protocol errors
//! raised anywhere inside are caught by the dispatcher and answered as
//! `err` responses; everything else tears the connection down.

use dotchat_common::clock;
use dotchat_common::error::{ChatError, Result};
use dotchat_common::proto::requests::{
    ChangePassRequest, ChannelDetailsRequest, ChannelListRequest, ChannelMessagesRequest,
    InviteRequest, LoginRequest, LogoutRequest, MessageSendRequest, NewChannelRequest,
    NewUserRequest, UserDetailsRequest,
};
use dotchat_common::proto::responses::{
    ChannelDetailsResponse, ChannelListResponse, ChannelMessagesResponse, ChannelSummary,
    MessageEntry, NewChannelResponse, OkayResponse, TokenResponse, UserDetailsResponse,
};
use dotchat_common::Message;

use crate::session;
use crate::store::Store;

pub fn login(store: &Store, m: &Message) -> Result<Message> {
    let req = LoginRequest::from_message(m)?;
    let user = store.user_by_name(&req.user)?.ok_or_else(|| {
        ChatError::protocol(format!("User '{}' doesn't exist.", req.user))
    })?;
    if user.pass != req.pass {
        return Err(ChatError::protocol(format!(
            "Password for '{}' incorrect.",
            req.user
        )));
    }

    let token = session::issue_token(store, user.id, &mut rand::thread_rng())?;
    Ok(TokenResponse { token }.to_message())
}

pub fn logout(store: &Store, m: &Message) -> Result<Message> {
    let req = LogoutRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;
    store.delete_session_keys_for(user.id)?;
    Ok(OkayResponse.to_message())
}

pub fn channel_list(store: &Store, m: &Message) -> Result<Message> {
    let req = ChannelListRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;

    let data = store
        .channels_for_user(user.id)?
        .into_iter()
        .map(|(id, name)| ChannelSummary { id, name })
        .collect();
    Ok(ChannelListResponse { data }.to_message())
}

pub fn channel_messages(store: &Store, m: &Message) -> Result<Message> {
    let req = ChannelMessagesRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;
    if !store.is_member(user.id, req.chan_id)? {
        return Err(ChatError::protocol(
            "You can't access that channel, or that channel doesn't exist.",
        ));
    }

    let msgs = store
        .messages_in(req.chan_id)?
        .into_iter()
        .map(|msg| MessageEntry {
            sender: msg.sender,
            when: msg.at as u32,
            cnt: msg.content,
        })
        .collect();
    Ok(ChannelMessagesResponse { msgs }.to_message())
}

pub fn message_send(store: &Store, m: &Message) -> Result<Message> {
    let req = MessageSendRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;
    if !store.is_member(user.id, req.chan_id)? {
        return Err(ChatError::protocol(
            "You are not permitted to send messages in that channel.",
        ));
    }

    store.insert_message(user.id, req.chan_id, &req.msg_cnt, clock::wall_now_ms())?;
    Ok(OkayResponse.to_message())
}

pub fn channel_details(store: &Store, m: &Message) -> Result<Message> {
    let req = ChannelDetailsRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;

    let members = store.members_of(req.chan_id)?;
    if !members.contains(&user.id) {
        return Err(ChatError::protocol("You can't access that channel."));
    }
    let channel = store
        .channel_by_id(req.chan_id)?
        .ok_or_else(|| ChatError::protocol("That channel doesn't exist."))?;

    Ok(ChannelDetailsResponse {
        id: channel.id,
        name: channel.name,
        owner_id: channel.owner_id,
        desc: channel.desc,
        members,
    }
    .to_message())
}

pub fn new_channel(store: &Store, m: &Message) -> Result<Message> {
    let req = NewChannelRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;
    if store.channel_by_name(&req.name)?.is_some() {
        return Err(ChatError::protocol(format!(
            "Channel '{}' already exists.",
            req.name
        )));
    }

    let id = store.insert_channel(&req.name, user.id, req.desc.as_deref())?;
    Ok(NewChannelResponse { id }.to_message())
}

pub fn new_user(store: &Store, m: &Message) -> Result<Message> {
    let req = NewUserRequest::from_message(m)?;
    if store.user_by_name(&req.name)?.is_some() {
        return Err(ChatError::protocol(format!(
            "User '{}' already exists.",
            req.name
        )));
    }

    store.insert_user(&req.name, &req.pass)?;
    Ok(OkayResponse.to_message())
}

pub fn change_pass(store: &Store, m: &Message) -> Result<Message> {
    let req = ChangePassRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;
    store.update_password(user.id, &req.new_pass)?;
    // a changed password signs the user out everywhere
    store.delete_session_keys_for(user.id)?;
    Ok(OkayResponse.to_message())
}

pub fn user_details(store: &Store, m: &Message) -> Result<Message> {
    let req = UserDetailsRequest::from_message(m)?;
    let caller = session::authenticate(store, req.token)?;

    let target = store.user_by_id(req.uid)?.ok_or_else(|| {
        ChatError::protocol(format!("User with ID '{}' doesn't exist.", req.uid))
    })?;
    let mutual_channels = store.mutual_channels(caller.id, target.id)?;

    Ok(UserDetailsResponse {
        id: target.id,
        name: target.name,
        mutual_channels,
    }
    .to_message())
}

pub fn invite(store: &Store, m: &Message) -> Result<Message> {
    let req = InviteRequest::from_message(m)?;
    let user = session::authenticate(store, req.token)?;

    let channel = store.channel_by_id(req.chan_id)?.ok_or_else(|| {
        ChatError::protocol(format!("There is no channel with ID {}.", req.chan_id))
    })?;
    if channel.owner_id != user.id {
        return Err(ChatError::protocol(
            "Only the creator of a channel can add users to that channel.",
        ));
    }

    let other = store.user_by_id(req.uid)?.ok_or_else(|| {
        ChatError::protocol(format!("There is no user with ID {}.", req.uid))
    })?;
    if store.is_member(other.id, channel.id)? {
        return Err(ChatError::protocol(
            "That user has already joined that channel.",
        ));
    }

    store.insert_member(other.id, channel.id)?;
    Ok(OkayResponse.to_message())
}
