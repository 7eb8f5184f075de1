//! Handler behavior, driven through the dispatcher against a fresh
//! seeded store.

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use dotchat_common::proto::requests::*;
use dotchat_common::proto::responses::*;
use dotchat_common::Message;
use dotchat_server::dispatch::dispatch;
use dotchat_server::store::Store;

/// Encode → decode → dispatch → encode → decode, like a real exchange.
fn exchange(store: &Store, req: &Message) -> Message {
    let at_server = support::decode(&support::encode(req));
    let reply = dispatch(store, &at_server).expect("dispatch must not be fatal");
    support::decode(&support::encode(&reply))
}

fn login(store: &Store, user: &str, pass: &str) -> i32 {
    let reply = exchange(
        store,
        &LoginRequest {
            user: user.into(),
            pass: pass.into(),
        }
        .to_message(),
    );
    TokenResponse::from_message(&reply)
        .expect("login must succeed")
        .token
}

fn reason(reply: &Message) -> String {
    ErrorResponse::from_message(reply)
        .expect("expected an err response")
        .reason
}

#[test]
fn test_login_issues_nonzero_token() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");
    assert_ne!(token, 0);
}

#[test]
fn test_login_unknown_user() {
    let store = Store::open_in_memory().unwrap();
    let reply = exchange(
        &store,
        &LoginRequest {
            user: "nobody".into(),
            pass: "pass".into(),
        }
        .to_message(),
    );
    assert_eq!(reason(&reply), "User 'nobody' doesn't exist.");
}

#[test]
fn test_login_wrong_password() {
    let store = Store::open_in_memory().unwrap();
    let reply = exchange(
        &store,
        &LoginRequest {
            user: "master".into(),
            pass: "wrong".into(),
        }
        .to_message(),
    );
    assert_eq!(reason(&reply), "Password for 'master' incorrect.");
}

#[test]
fn test_parallel_logins_yield_distinct_tokens() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || login(&store, "master", "pass"))
        })
        .collect();

    let tokens: HashSet<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(tokens.len(), 8);
}

#[test]
fn test_logout_revokes_every_session_of_the_user() {
    let store = Store::open_in_memory().unwrap();
    let first = login(&store, "master", "pass");
    let second = login(&store, "master", "pass");

    let reply = exchange(&store, &LogoutRequest { token: first }.to_message());
    OkayResponse::from_message(&reply).unwrap();

    // both tokens are gone: sign out of all devices
    for token in [first, second] {
        let reply = exchange(&store, &LogoutRequest { token }.to_message());
        assert_eq!(
            reason(&reply),
            format!("Token '{token}' is invalid or has expired. Please log-in again.")
        );
    }
}

#[test]
fn test_channel_list_contains_seeded_channel() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");
    let reply = exchange(&store, &ChannelListRequest { token }.to_message());
    let list = ChannelListResponse::from_message(&reply).unwrap();
    assert_eq!(list.data.len(), 1);
    assert_eq!(list.data[0].id, 1);
    assert_eq!(list.data[0].name, "general");
}

#[test]
fn test_channel_messages_requires_membership() {
    let store = Store::open_in_memory().unwrap();
    exchange(
        &store,
        &NewUserRequest {
            name: "newbie".into(),
            pass: "pw".into(),
        }
        .to_message(),
    );
    let token = login(&store, "newbie", "pw");

    let reply = exchange(
        &store,
        &ChannelMessagesRequest { token, chan_id: 1 }.to_message(),
    );
    assert_eq!(
        reason(&reply),
        "You can't access that channel, or that channel doesn't exist."
    );
}

#[test]
fn test_send_then_retrieve() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");

    let reply = exchange(
        &store,
        &MessageSendRequest {
            token,
            chan_id: 1,
            msg_cnt: "hi".into(),
        }
        .to_message(),
    );
    OkayResponse::from_message(&reply).unwrap();

    let reply = exchange(
        &store,
        &ChannelMessagesRequest { token, chan_id: 1 }.to_message(),
    );
    let msgs = ChannelMessagesResponse::from_message(&reply).unwrap().msgs;
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].sender, 1);
    assert_eq!(msgs[0].cnt, "hi");
}

#[test]
fn test_send_requires_membership() {
    let store = Store::open_in_memory().unwrap();
    exchange(
        &store,
        &NewUserRequest {
            name: "outsider".into(),
            pass: "pw".into(),
        }
        .to_message(),
    );
    let token = login(&store, "outsider", "pw");

    let reply = exchange(
        &store,
        &MessageSendRequest {
            token,
            chan_id: 1,
            msg_cnt: "hi".into(),
        }
        .to_message(),
    );
    assert_eq!(
        reason(&reply),
        "You are not permitted to send messages in that channel."
    );
}

#[test]
fn test_channel_details_for_member() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");

    let reply = exchange(
        &store,
        &ChannelDetailsRequest { token, chan_id: 1 }.to_message(),
    );
    let details = ChannelDetailsResponse::from_message(&reply).unwrap();
    assert_eq!(details.id, 1);
    assert_eq!(details.name, "general");
    assert_eq!(details.owner_id, 1);
    assert_eq!(details.desc.as_deref(), Some("general main room"));
    assert_eq!(details.members, vec![1]);
}

#[test]
fn test_channel_details_denied_to_non_member() {
    let store = Store::open_in_memory().unwrap();
    exchange(
        &store,
        &NewUserRequest {
            name: "peeker".into(),
            pass: "pw".into(),
        }
        .to_message(),
    );
    let token = login(&store, "peeker", "pw");

    let reply = exchange(
        &store,
        &ChannelDetailsRequest { token, chan_id: 1 }.to_message(),
    );
    assert_eq!(reason(&reply), "You can't access that channel.");
}

#[test]
fn test_new_channel_enrolls_creator() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");

    let reply = exchange(
        &store,
        &NewChannelRequest {
            token,
            name: "hideout".into(),
            desc: None,
        }
        .to_message(),
    );
    let id = NewChannelResponse::from_message(&reply).unwrap().id;

    // the creator can use the channel straight away
    let reply = exchange(
        &store,
        &ChannelDetailsRequest { token, chan_id: id }.to_message(),
    );
    let details = ChannelDetailsResponse::from_message(&reply).unwrap();
    assert_eq!(details.members, vec![1]);
    assert_eq!(details.desc, None);
}

#[test]
fn test_new_user_then_login() {
    let store = Store::open_in_memory().unwrap();
    let reply = exchange(
        &store,
        &NewUserRequest {
            name: "alice".into(),
            pass: "wonder".into(),
        }
        .to_message(),
    );
    OkayResponse::from_message(&reply).unwrap();

    assert_ne!(login(&store, "alice", "wonder"), 0);
}

#[test]
fn test_new_user_duplicate_name() {
    let store = Store::open_in_memory().unwrap();
    let reply = exchange(
        &store,
        &NewUserRequest {
            name: "master".into(),
            pass: "whatever".into(),
        }
        .to_message(),
    );
    assert_eq!(reason(&reply), "User 'master' already exists.");
}

#[test]
fn test_change_pass_revokes_sessions() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");

    let reply = exchange(
        &store,
        &ChangePassRequest {
            token,
            new_pass: "better".into(),
        }
        .to_message(),
    );
    OkayResponse::from_message(&reply).unwrap();

    // the old token is dead, the old password refused, the new one works
    let reply = exchange(&store, &ChannelListRequest { token }.to_message());
    assert!(reason(&reply).contains("invalid or has expired"));
    let reply = exchange(
        &store,
        &LoginRequest {
            user: "master".into(),
            pass: "pass".into(),
        }
        .to_message(),
    );
    assert_eq!(reason(&reply), "Password for 'master' incorrect.");
    assert_ne!(login(&store, "master", "better"), 0);
}

#[test]
fn test_user_details_shares_channels_with_caller() {
    let store = Store::open_in_memory().unwrap();
    exchange(
        &store,
        &NewUserRequest {
            name: "bob".into(),
            pass: "pw".into(),
        }
        .to_message(),
    );
    let master = login(&store, "master", "pass");
    let bob_token = login(&store, "bob", "pw");

    let bob_id = UserDetailsResponse::from_message(&exchange(
        &store,
        &UserDetailsRequest {
            token: master,
            uid: 2,
        }
        .to_message(),
    ))
    .unwrap()
    .id;

    // no shared channels yet
    let details = UserDetailsResponse::from_message(&exchange(
        &store,
        &UserDetailsRequest {
            token: master,
            uid: bob_id,
        }
        .to_message(),
    ))
    .unwrap();
    assert_eq!(details.name, "bob");
    assert!(details.mutual_channels.is_empty());

    // invite bob into general; now it is mutual, from both sides
    OkayResponse::from_message(&exchange(
        &store,
        &InviteRequest {
            token: master,
            uid: bob_id,
            chan_id: 1,
        }
        .to_message(),
    ))
    .unwrap();

    for (token, uid) in [(master, bob_id), (bob_token, 1)] {
        let details = UserDetailsResponse::from_message(&exchange(
            &store,
            &UserDetailsRequest { token, uid }.to_message(),
        ))
        .unwrap();
        assert_eq!(details.mutual_channels, vec![1]);
    }
}

#[test]
fn test_user_details_unknown_user() {
    let store = Store::open_in_memory().unwrap();
    let token = login(&store, "master", "pass");
    let reply = exchange(
        &store,
        &UserDetailsRequest { token, uid: 99 }.to_message(),
    );
    assert_eq!(reason(&reply), "User with ID '99' doesn't exist.");
}

#[test]
fn test_invite_flow_and_duplicate() {
    let store = Store::open_in_memory().unwrap();
    exchange(
        &store,
        &NewUserRequest {
            name: "carol".into(),
            pass: "pw".into(),
        }
        .to_message(),
    );
    let master = login(&store, "master", "pass");

    let invite = InviteRequest {
        token: master,
        uid: 2,
        chan_id: 1,
    };
    OkayResponse::from_message(&exchange(&store, &invite.to_message())).unwrap();

    let reply = exchange(&store, &invite.to_message());
    assert_eq!(reason(&reply), "That user has already joined that channel.");
}

#[test]
fn test_invite_requires_ownership() {
    let store = Store::open_in_memory().unwrap();
    exchange(
        &store,
        &NewUserRequest {
            name: "dave".into(),
            pass: "pw".into(),
        }
        .to_message(),
    );
    let dave = login(&store, "dave", "pw");

    let reply = exchange(
        &store,
        &InviteRequest {
            token: dave,
            uid: 1,
            chan_id: 1,
        }
        .to_message(),
    );
    assert_eq!(
        reason(&reply),
        "Only the creator of a channel can add users to that channel."
    );
}

#[test]
fn test_invite_missing_channel_and_user() {
    let store = Store::open_in_memory().unwrap();
    let master = login(&store, "master", "pass");

    let reply = exchange(
        &store,
        &InviteRequest {
            token: master,
            uid: 1,
            chan_id: 9,
        }
        .to_message(),
    );
    assert_eq!(reason(&reply), "There is no channel with ID 9.");

    let reply = exchange(
        &store,
        &InviteRequest {
            token: master,
            uid: 9,
            chan_id: 1,
        }
        .to_message(),
    );
    assert_eq!(reason(&reply), "There is no user with ID 9.");
}
