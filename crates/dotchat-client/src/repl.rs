//! The interactive dot-command loop.
//!
//! Server refusals (`err` responses) print a failure notice and drop the
//! user back at the nearest prompt; transport failures abort the session.

use std::io::{self, BufRead, Write};

use dotchat_common::error::{ChatError, Result};

use crate::api::ChatClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Back,
    Quit,
}

pub fn run(client: &mut ChatClient) -> Result<()> {
    println!("Welcome to the dotchat client.");
    println!(" -> Prepend all commands with a dot (.).");
    println!("    Exception: yes/no questions (answer with y or n).");
    println!(" -> Whenever a command is requested, you can also");
    println!("    enter .q to exit.");
    println!();

    loop {
        let token = match login_menu(client)? {
            Some(token) => token,
            None => return Ok(()),
        };
        if main_menu(client, token)? == Flow::Quit {
            return Ok(());
        }
        // Flow::Back means the user logged out; offer another login
    }
}

/// Print the server's refusal and carry on; anything else is fatal.
fn report(err: ChatError) -> Result<()> {
    match err {
        ChatError::Protocol(reason) => {
            println!("Action failed!");
            println!("  Reason: {reason}");
            Ok(())
        }
        fatal => Err(fatal),
    }
}

fn prompt(text: &str) -> Result<String> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    // EOF on stdin reads as a quit request
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(".q".into());
    }
    Ok(line.trim().to_string())
}

fn yes_no(question: &str) -> Result<bool> {
    loop {
        match prompt(question)?.as_str() {
            "y" => return Ok(true),
            "n" | ".q" => return Ok(false),
            _ => println!("Please answer with y (yes) or n (no)."),
        }
    }
}

fn prompt_i32(text: &str) -> Result<Option<i32>> {
    loop {
        let line = prompt(text)?;
        if line == ".q" || line == ".b" {
            return Ok(None);
        }
        match line.parse() {
            Ok(n) => return Ok(Some(n)),
            Err(_) => println!("Please enter a number."),
        }
    }
}

fn login_menu(client: &mut ChatClient) -> Result<Option<i32>> {
    println!("You are currently not logged in.");
    println!("  -> Use .l to log into an existing account, or");
    println!("  -> Use .s to create a new account.");

    loop {
        match prompt("Your choice? ")?.as_str() {
            ".l" => {
                if let Some(token) = try_login(client)? {
                    return Ok(Some(token));
                }
            }
            ".s" => {
                if sign_up(client)? && yes_no("You're signed up now. Do you want to log in (y/n)? ")? {
                    if let Some(token) = try_login(client)? {
                        return Ok(Some(token));
                    }
                }
            }
            ".q" => return Ok(None),
            _ => println!("Unrecognized command."),
        }
    }
}

fn try_login(client: &mut ChatClient) -> Result<Option<i32>> {
    let user = prompt("Username: ")?;
    let pass = prompt("Password: ")?;
    match client.login(&user, &pass) {
        Ok(token) => {
            println!("Logged in.");
            Ok(Some(token))
        }
        Err(err) => {
            report(err)?;
            Ok(None)
        }
    }
}

fn sign_up(client: &mut ChatClient) -> Result<bool> {
    let name = prompt("Username: ")?;
    let pass = prompt("Password: ")?;
    match client.sign_up(&name, &pass) {
        Ok(()) => Ok(true),
        Err(err) => {
            report(err)?;
            Ok(false)
        }
    }
}

fn main_menu(client: &mut ChatClient, token: i32) -> Result<Flow> {
    loop {
        println!("This is the main menu.");
        println!("  -> Use .cs to browse your channels,");
        println!("  -> Use .cc to create a new channel,");
        println!("  -> Use .cp to change your password, or");
        println!("  -> Use .l to log out.");

        match prompt("What do you want to do? ")?.as_str() {
            ".cs" => {
                if channel_menu(client, token)? == Flow::Quit {
                    return Ok(Flow::Quit);
                }
            }
            ".cc" => create_channel(client, token)?,
            ".cp" => change_pass(client, token)?,
            ".l" => {
                if let Err(err) = client.logout(token) {
                    report(err)?;
                }
                return Ok(Flow::Back);
            }
            ".q" => return Ok(Flow::Quit),
            _ => println!("Unrecognized command. Please try again."),
        }
    }
}

fn channel_menu(client: &mut ChatClient, token: i32) -> Result<Flow> {
    loop {
        let channels = match client.channel_list(token) {
            Ok(channels) => channels,
            Err(err) => {
                report(err)?;
                return Ok(Flow::Back);
            }
        };
        println!("Channels available to you:");
        for chan in &channels {
            println!("  -> {}: {}", chan.id, chan.name);
        }
        println!("Options:");
        println!("  -> Use .c to choose and act upon a channel,");
        println!("  -> Use .r to refresh this list, or");
        println!("  -> Use .b to go back.");

        match prompt("Your choice? ")?.as_str() {
            ".c" => {
                if let Some(id) = prompt_i32("Channel ID? ")? {
                    if in_channel_menu(client, token, id)? == Flow::Quit {
                        return Ok(Flow::Quit);
                    }
                }
            }
            ".r" => {}
            ".b" => return Ok(Flow::Back),
            ".q" => return Ok(Flow::Quit),
            _ => println!("Unrecognized command. Please try again."),
        }
    }
}

fn in_channel_menu(client: &mut ChatClient, token: i32, chan_id: i32) -> Result<Flow> {
    let chan = match client.channel_details(token, chan_id) {
        Ok(chan) => chan,
        Err(err) => {
            report(err)?;
            return Ok(Flow::Back);
        }
    };

    loop {
        println!("You're now in {} (ID: {}).", chan.name, chan.id);
        if let Some(desc) = &chan.desc {
            println!("  {desc}");
        }
        println!("Actions for this channel:");
        println!("  -> Use .m to read the messages in this channel,");
        println!("  -> Use .s to send a message,");
        println!("  -> Use .u to view the members of this channel,");
        println!("  -> Use .i to invite another user here, or");
        println!("  -> Use .b to go back.");

        match prompt("What do you want to do? ")?.as_str() {
            ".m" => match client.channel_messages(token, chan_id) {
                Ok(msgs) => {
                    println!("Messages in {}:", chan.name);
                    for msg in msgs {
                        println!("  <User #{}> at {}: {}", msg.sender, msg.when, msg.cnt);
                    }
                }
                Err(err) => report(err)?,
            },
            ".s" => {
                let text = prompt("Message to send: ")?;
                if let Err(err) = client.send_message(token, chan_id, &text) {
                    report(err)?;
                }
            }
            ".u" => match client.channel_details(token, chan_id) {
                Ok(details) => {
                    println!(
                        "Users in {} (the owner has a * next to their name):",
                        details.name
                    );
                    for uid in &details.members {
                        let marker = if *uid == details.owner_id { '*' } else { ' ' };
                        match client.user_details(token, *uid) {
                            Ok(user) => {
                                println!("  -> {marker}User #{}: {}", user.id, user.name)
                            }
                            Err(err) => report(err)?,
                        }
                    }
                }
                Err(err) => report(err)?,
            },
            ".i" => invite_user(client, token, chan_id)?,
            ".b" => return Ok(Flow::Back),
            ".q" => return Ok(Flow::Quit),
            _ => println!("Unrecognized command. Please try again."),
        }
    }
}

fn invite_user(client: &mut ChatClient, token: i32, chan_id: i32) -> Result<()> {
    let Some(uid) = prompt_i32("Enter user ID: ")? else {
        return Ok(());
    };
    let user = match client.user_details(token, uid) {
        Ok(user) => user,
        Err(err) => return report(err),
    };
    if !yes_no(&format!(
        "Confirm adding user #{} ({}) (y/n)? ",
        user.id, user.name
    ))? {
        return Ok(());
    }
    if let Err(err) = client.invite(token, uid, chan_id) {
        report(err)?;
    } else {
        println!("Invited {}.", user.name);
    }
    Ok(())
}

fn create_channel(client: &mut ChatClient, token: i32) -> Result<()> {
    let name = normalize_channel_name(&prompt("Name for the new channel? ")?);
    let desc = prompt("Description for the channel (optional)? ")?;
    let desc = (!desc.is_empty()).then_some(desc);

    match client.new_channel(token, &name, desc.as_deref()) {
        Ok(id) => println!("Created {name} with ID {id}."),
        Err(err) => report(err)?,
    }
    Ok(())
}

fn change_pass(client: &mut ChatClient, token: i32) -> Result<()> {
    let new_pass = prompt("New password? ")?;
    match client.change_pass(token, &new_pass) {
        Ok(()) => println!("Password changed; you have been signed out everywhere."),
        Err(err) => report(err)?,
    }
    Ok(())
}

/// Channel names always start with a `#`.
fn normalize_channel_name(name: &str) -> String {
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}
