//! Integration tests for the connection manager state machine.
//!
//! Time is paused, so retry, cooldown and ping intervals elapse instantly
//! while still being measurable with `tokio::time::Instant`.

mod common;

use std::time::Duration;

use common::{MockConnector, privmsg, said, test_context, welcome};
use smirc::bridge::{BridgeHandle, Control};
use smirc::delivery::DeliveryMessage;
use smirc::session::{ConnectionManager, SharedState, Shutdown};
use smirc_proto::{Command, Message};
use tokio::sync::mpsc;
use tokio::time::Instant;

const ADMIN: &str = "alice!admin@host.example";

fn manager(
    connector: MockConnector,
) -> (
    ConnectionManager<MockConnector>,
    mpsc::UnboundedSender<DeliveryMessage>,
    mpsc::UnboundedReceiver<Control>,
) {
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (handle, control) = BridgeHandle::channel();
    let manager = ConnectionManager::new(
        test_context(),
        connector,
        SharedState::new(),
        queue_rx,
        handle,
    );
    (manager, queue_tx, control)
}

fn count_pings(sent: &[Message]) -> usize {
    sent.iter()
        .filter(|m| matches!(&m.command, Command::PING(target, _) if target == "#box1"))
        .count()
}

fn quit_reason(sent: &[Message]) -> Option<String> {
    sent.iter().find_map(|m| match &m.command {
        Command::QUIT(reason) => reason.clone(),
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn four_failures_cool_down_then_stop_bridge() {
    let connector = MockConnector::new();
    let (manager, _queue, mut control) = manager(connector.clone());

    let start = Instant::now();
    let shutdown = manager.run().await;

    assert_eq!(shutdown, Shutdown::RetriesExhausted);
    assert_eq!(shutdown.exit_code(), 0);
    assert_eq!(connector.attempts(), 4);
    assert!(start.elapsed() >= Duration::from_secs(3 * 10 + 900));
    assert_eq!(control.try_recv().ok(), Some(Control::Stop));
}

#[tokio::test(start_paused = true)]
async fn welcome_joins_and_reports_online_once() {
    let connector = MockConnector::new();
    let first = connector.accept();
    let second = connector.accept();
    first.push(welcome());
    first.push(privmsg(ADMIN, "#box1", "!restart"));
    second.push(welcome());
    second.push(privmsg(ADMIN, "#box1", "!killkillkill"));

    let (manager, _queue, mut control) = manager(connector.clone());
    let shutdown = manager.run().await;

    assert_eq!(shutdown, Shutdown::Killed);
    assert_eq!(shutdown.exit_code(), 1);
    assert_eq!(connector.attempts(), 2);
    assert_eq!(control.try_recv().ok(), Some(Control::Stop));

    for session in [&first, &second] {
        let joins: Vec<String> = session
            .sent()
            .iter()
            .filter_map(|m| match &m.command {
                Command::JOIN(channel, _) => Some(channel.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(joins, vec!["#box1", "#ops", "#fragmented"]);
    }

    let online = |sent: &[Message]| {
        said(sent)
            .iter()
            .filter(|(t, x)| t == "#box1" && x == "online")
            .count()
    };
    assert_eq!(online(&first.sent()), 1);
    assert_eq!(online(&second.sent()), 0);
    assert_eq!(quit_reason(&first.sent()).as_deref(), Some("reconnecting..."));
    assert_eq!(quit_reason(&second.sent()).as_deref(), Some("killed"));
}

#[tokio::test(start_paused = true)]
async fn missing_pongs_force_reconnect() {
    let connector = MockConnector::new();
    let session = connector.accept();
    session.push(welcome());

    let (manager, _queue, _control) = manager(connector.clone());
    let shutdown = manager.run().await;

    // One ping timeout plus three refused reconnects.
    assert_eq!(shutdown, Shutdown::RetriesExhausted);
    assert_eq!(connector.attempts(), 4);
    let sent = session.sent();
    assert_eq!(count_pings(&sent), 11);
    assert_eq!(quit_reason(&sent).as_deref(), Some("reconnecting..."));
}

#[tokio::test(start_paused = true)]
async fn pongs_keep_the_session_alive() {
    let connector = MockConnector::new();
    let session = connector.accept();
    session.push(welcome());

    let (manager, _queue, _control) = manager(connector.clone());
    let run = tokio::spawn(manager.run());

    // Answer every ping until well past the point where silence would
    // have forced a reconnect.
    let mut answered = 0;
    for _ in 0..400 {
        if answered >= 15 {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        let pings = count_pings(&session.sent());
        while answered < pings {
            session.push(common::line(":irc.test PONG irc.test :#box1"));
            answered += 1;
        }
    }
    assert_eq!(answered, 15);
    assert_eq!(connector.attempts(), 1);

    session.push(privmsg(ADMIN, "#box1", "!killkillkill"));
    assert_eq!(run.await.unwrap(), Shutdown::Killed);
}

#[tokio::test(start_paused = true)]
async fn server_ping_is_answered() {
    let connector = MockConnector::new();
    let session = connector.accept();
    session.push(common::line("PING :irc.test"));
    session.push(welcome());
    session.push(privmsg(ADMIN, "#box1", "!killkillkill"));

    let (manager, _queue, _control) = manager(connector);
    manager.run().await;

    assert!(session.sent().iter().any(
        |m| matches!(&m.command, Command::PONG(server, None) if server == "irc.test")
    ));
}

#[tokio::test(start_paused = true)]
async fn bridged_delivery_fans_out_to_rooms() {
    let connector = MockConnector::new();
    let session = connector.accept();
    session.push(welcome());

    let (manager, queue, _control) = manager(connector);
    queue
        .send(DeliveryMessage::new(vec!["nowhere".into()], "lost"))
        .unwrap();
    queue
        .send(DeliveryMessage::new(vec!["pub".into()], "X\n\nY"))
        .unwrap();
    let run = tokio::spawn(manager.run());

    let expected = vec![
        ("#ops".to_string(), "X".to_string()),
        ("#fragmented".to_string(), "X".to_string()),
        ("#ops".to_string(), "Y".to_string()),
        ("#fragmented".to_string(), "Y".to_string()),
    ];
    let mut delivered = Vec::new();
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        delivered = said(&session.sent())
            .into_iter()
            .filter(|(_, text)| text != "online")
            .collect();
        if delivered.len() >= expected.len() {
            break;
        }
    }
    assert_eq!(delivered, expected);

    session.push(privmsg(ADMIN, "#box1", "!killkillkill"));
    assert_eq!(run.await.unwrap(), Shutdown::Killed);
}

#[tokio::test(start_paused = true)]
async fn unpermitted_kill_is_ignored() {
    let connector = MockConnector::new();
    let session = connector.accept();
    session.push(welcome());
    session.push(privmsg("mallory!m@evil", "#box1", "!killkillkill"));
    session.push(privmsg("mallory!m@evil", "#box1", "!status"));

    let (manager, _queue, _control) = manager(connector.clone());
    let run = tokio::spawn(manager.run());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!run.is_finished());
    let replies = said(&session.sent());
    assert!(replies.iter().any(|(t, x)| t == "#box1" && x.starts_with("alive: ")));

    session.push(privmsg(ADMIN, "#box1", "!killkillkill"));
    assert_eq!(run.await.unwrap(), Shutdown::Killed);
    assert_eq!(connector.attempts(), 1);
}
