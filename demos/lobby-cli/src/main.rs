//! A minimal lobby client: connect, log in, join a channel, and print
//! everything the server says.

use std::env;

use tracing_subscriber::EnvFilter;

use lobbylink::commands::outbound::{JoinChannel, Say};
use lobbylink::{LobbyClient, LobbyEvent, LoginOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let (Some(addr), Some(username), Some(password)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: lobby-cli <host:port> <username> <password> [channel]");
        std::process::exit(2);
    };
    let channel = args.next().unwrap_or_else(|| "main".to_owned());

    let (client, mut events) = LobbyClient::builder().connect(&addr)?;

    // Nothing is meaningful before the greeting.
    loop {
        match events.recv().await {
            Some(LobbyEvent::GreetingParsed {
                protocol_version,
                engine_version,
                ..
            }) => {
                println!("* server speaks {protocol_version} (engine {engine_version})");
                break;
            }
            Some(LobbyEvent::Disconnected { reason }) => {
                eprintln!("* connection ended before the greeting: {reason:?}");
                return Ok(());
            }
            Some(_) => {}
            None => return Ok(()),
        }
    }

    match client.login(&username, &password).await? {
        LoginOutcome::Accepted { username } => println!("* logged in as {username}"),
        LoginOutcome::Denied { reason } => {
            eprintln!("* login denied: {reason}");
            client.disconnect()?;
            return Ok(());
        }
    }

    client.send(JoinChannel::new(&channel))?;
    client.send(Say::new(&channel, "hello from lobby-cli"))?;

    while let Some(event) = events.recv().await {
        match event {
            LobbyEvent::Said {
                channel,
                author,
                text,
                emote,
            } => {
                if emote {
                    println!("[{channel}] * {author} {text}");
                } else {
                    println!("[{channel}] <{author}> {text}");
                }
            }
            LobbyEvent::Motd { line } => println!("motd: {line}"),
            LobbyEvent::UserJoined { name, country } => println!("* {name} ({country}) joined"),
            LobbyEvent::UserLeft { name } => println!("* {name} left"),
            LobbyEvent::Disconnected { reason } => {
                println!("* disconnected: {reason:?}");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
