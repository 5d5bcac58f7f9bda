//! Chat command routing.
//!
//! Every qualifying line (a channel message to the home channel or a room)
//! first goes to the observing modules, then to [`Router::dispatch`]. Only
//! lines starting with the sentinel are commands. `!status` answers anyone;
//! everything else needs a permitted sender.

use tracing::{Instrument, debug, info, warn};

use crate::commands::{CommandEntry, SENTINEL};
use crate::config::Context;
use crate::delivery::{DeliveryMessage, Targeting};
use crate::event::{ChatEvent, Invocation};
use crate::session::{Outbox, SharedState};
use crate::telemetry::{CommandTimer, spans};

pub const STATUS: &str = "!status";
pub const DEBUG: &str = "!debug";
pub const HELP: &str = "!help";
pub const RESTART: &str = "!restart";
pub const KILL: &str = "!killkillkill";

/// Static part of the `!help` reply.
pub const HELP_TEXT: &str = "!status => check status
!debug => change debug output/toggle
!restart => restart the bot
!killkillkill => kill the bot (full service reboot)";

/// Version reported by `!status`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Routes chat lines and bridged deliveries to outbound messages.
#[derive(Clone)]
pub struct Router {
    ctx: Context,
    state: SharedState,
}

impl Router {
    pub fn new(ctx: Context, state: SharedState) -> Self {
        Self { ctx, state }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Handle one chat event: observers first, then command dispatch.
    pub async fn handle(&self, event: &ChatEvent, outbox: &mut Outbox) {
        if !self.ctx.is_channel(&event.target) {
            debug!(target = %event.target, "ignoring message outside configured channels");
            return;
        }
        let permitted = self.ctx.is_permitted(&event.source);

        for module in self.ctx.registry.observers() {
            match module.on_event(event).await {
                Ok(lines) => {
                    for line in lines {
                        outbox.say(&event.target, &line);
                    }
                }
                Err(e) => {
                    warn!(module = %module.name(), error = %e, "module event handler failed");
                }
            }
        }

        self.dispatch(event, permitted, outbox).await;
    }

    /// Act on a sentinel command. Non-command lines are ignored.
    pub async fn dispatch(&self, event: &ChatEvent, permitted: bool, outbox: &mut Outbox) {
        if !event.text.starts_with(SENTINEL) {
            return;
        }
        let line = event.text.trim_end();
        let mut parts = line.split_whitespace();
        let Some(token) = parts.next() else {
            return;
        };
        let args: Vec<String> = parts.map(str::to_owned).collect();

        if token == STATUS {
            outbox.say(&event.target, &format!("alive: {VERSION}"));
            return;
        }
        if !permitted {
            warn!(source = %event.source, command = %line, "not permitted user requested");
            return;
        }

        match token {
            DEBUG => self.toggle_debug(&event.target, outbox),
            HELP => self.help(&event.target, outbox),
            RESTART => self.restart(&event.target, &args),
            KILL => self.kill(&event.target),
            _ => {
                let call = Invocation {
                    token: token.to_string(),
                    args,
                    target: event.target.clone(),
                    source: event.source.clone(),
                };
                let span = spans::command(token, &event.target);
                self.execute(&call, outbox).instrument(span).await;
            }
        }
    }

    fn toggle_debug(&self, target: &str, outbox: &mut Outbox) {
        let reply = if target == self.ctx.home {
            self.state.set_targeting(Targeting {
                rooms: false,
                private: true,
            });
            "private"
        } else {
            if self.ctx.is_room(target) {
                self.state.set_targeting(Targeting {
                    rooms: true,
                    private: true,
                });
            }
            "public"
        };
        info!(target = %target, mode = reply, "delivery targeting changed");
        outbox.say(target, reply);
    }

    fn help(&self, target: &str, outbox: &mut Outbox) {
        outbox.say(target, HELP_TEXT);
        let tokens = self.ctx.registry.tokens().collect::<Vec<_>>().join("\n");
        outbox.say(target, &tokens);
    }

    fn restart(&self, target: &str, args: &[String]) {
        info!("restart requested...");
        if target == self.ctx.home || args.iter().any(|a| *a == self.ctx.name) {
            info!("restart accepted...");
            self.state.request_reset();
        }
    }

    fn kill(&self, target: &str) {
        if target == self.ctx.home {
            info!("kill accepted");
            self.state.request_kill();
        } else {
            warn!(target = %target, "kill is only accepted in the home channel");
        }
    }

    async fn execute(&self, call: &Invocation, outbox: &mut Outbox) {
        let Some(entry) = self.ctx.registry.get(&call.token) else {
            debug!(token = %call.token, "unknown command");
            return;
        };
        let _timer = CommandTimer::new(&call.token);

        match entry {
            CommandEntry::Shell(cmd) => match cmd.execute(&call.args).await {
                Ok(output) => outbox.say(&call.target, &output),
                Err(e) => {
                    warn!(token = %call.token, error = %e, "command failed");
                    outbox.say(&call.target, &format!("unable to execute command: {e}"));
                }
            },
            CommandEntry::Module(module) => {
                if !module.capabilities().execute {
                    debug!(token = %call.token, "module does not execute");
                    return;
                }
                match module.on_execute(call).await {
                    Ok(lines) => {
                        for line in lines {
                            outbox.say(&call.target, &line);
                        }
                    }
                    Err(e) => {
                        warn!(module = %module.name(), error = %e, "module execute failed");
                        outbox.say(&call.target, &format!("unable to execute command: {e}"));
                    }
                }
            }
        }
    }

    /// Emit a bridged delivery to its resolved targets.
    ///
    /// Returns the number of targets; zero means the message was dropped.
    pub fn deliver(&self, msg: &DeliveryMessage, outbox: &mut Outbox) -> usize {
        let targets = msg.targets(&self.ctx, self.state.targeting());
        if targets.is_empty() {
            warn!(kind = ?msg.kind, "no targets for message, dropping");
            return 0;
        }
        for line in msg.lines() {
            for target in &targets {
                outbox.say(target, line);
            }
        }
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandRegistry, ShellCommand};
    use crate::config::ConfigLayer;
    use smirc_proto::{Command, Message};
    use std::time::Duration;

    fn router() -> Router {
        let layer = ConfigLayer {
            name: Some("bob".into()),
            hostname: Some("#home".into()),
            rooms: Some(vec!["#ops".into()]),
            permitted: Some(vec!["admin@".into()]),
            ..Default::default()
        };
        let mut registry = CommandRegistry::default();
        registry.register(
            "!echo",
            CommandEntry::Shell(ShellCommand::new("/bin/echo", Duration::from_secs(5))),
        );
        let ctx = Context::resolve(&layer, "box1").with_registry(registry);
        Router::new(ctx, SharedState::new())
    }

    fn event(target: &str, source: &str, text: &str) -> ChatEvent {
        ChatEvent {
            source: source.into(),
            nick: None,
            target: target.into(),
            text: text.into(),
        }
    }

    fn texts(outbox: &mut Outbox) -> Vec<(String, String)> {
        outbox
            .drain()
            .into_iter()
            .filter_map(|m: Message| match m.command {
                Command::PRIVMSG(t, x) => Some((t, x)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn status_ignores_permission() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .handle(&event("#ops", "eve!e@evil", "!status"), &mut outbox)
            .await;
        assert_eq!(
            texts(&mut outbox),
            vec![("#ops".to_string(), format!("alive: {VERSION}"))]
        );
    }

    #[tokio::test]
    async fn leading_whitespace_is_not_a_command() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .dispatch(&event("#ops", "eve!e@evil", "  !status"), true, &mut outbox)
            .await;
        router
            .dispatch(&event("#home", "x!admin@h", " !restart"), true, &mut outbox)
            .await;
        assert!(outbox.is_empty());
        assert!(!router.state.take_reset());
    }

    #[tokio::test]
    async fn unpermitted_commands_are_dropped() {
        let router = router();
        let mut outbox = Outbox::new();
        for line in ["!debug", "!help", "!restart", "!killkillkill", "!echo hi"] {
            router
                .handle(&event("#home", "eve!e@evil", line), &mut outbox)
                .await;
        }
        assert!(outbox.is_empty());
        let state = router.state.snapshot();
        assert!(!state.reset);
        assert!(!state.kill);
        assert_eq!(state.targeting, Targeting::default());
    }

    #[tokio::test]
    async fn restart_by_name_from_room() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .dispatch(&event("#ops", "x!admin@h", "!restart alice"), true, &mut outbox)
            .await;
        assert!(!router.state.take_reset());
        router
            .dispatch(&event("#ops", "x!admin@h", "!restart alice bob"), true, &mut outbox)
            .await;
        assert!(router.state.take_reset());
        router
            .dispatch(&event("#home", "x!admin@h", "!restart"), true, &mut outbox)
            .await;
        assert!(router.state.take_reset());
    }

    #[tokio::test]
    async fn kill_only_from_home() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .dispatch(&event("#ops", "x!admin@h", "!killkillkill"), true, &mut outbox)
            .await;
        assert!(!router.state.kill_requested());
        router
            .dispatch(&event("#home", "x!admin@h", "!killkillkill"), true, &mut outbox)
            .await;
        assert!(router.state.kill_requested());
    }

    #[tokio::test]
    async fn debug_toggles_by_channel() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .dispatch(&event("#home", "x!admin@h", "!debug"), true, &mut outbox)
            .await;
        assert_eq!(
            router.state.targeting(),
            Targeting {
                rooms: false,
                private: true
            }
        );
        router
            .dispatch(&event("#ops", "x!admin@h", "!debug"), true, &mut outbox)
            .await;
        assert_eq!(router.state.targeting(), Targeting::default());
        let replies: Vec<String> = texts(&mut outbox).into_iter().map(|(_, t)| t).collect();
        assert_eq!(replies, vec!["private", "public"]);
    }

    #[tokio::test]
    async fn help_lists_commands() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .dispatch(&event("#ops", "x!admin@h", "!help"), true, &mut outbox)
            .await;
        let replies: Vec<String> = texts(&mut outbox).into_iter().map(|(_, t)| t).collect();
        assert_eq!(replies.len(), 5);
        assert_eq!(replies[0], "!status => check status");
        assert_eq!(replies[4], "!echo");
    }

    #[tokio::test]
    async fn shell_output_is_relayed() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .handle(&event("#ops", "x!admin@h", "!echo hello world"), &mut outbox)
            .await;
        assert_eq!(
            texts(&mut outbox),
            vec![("#ops".to_string(), "hello world".to_string())]
        );
    }

    #[tokio::test]
    async fn plain_lines_do_nothing() {
        let router = router();
        let mut outbox = Outbox::new();
        router
            .handle(&event("#ops", "x!admin@h", "status please"), &mut outbox)
            .await;
        router
            .handle(&event("#elsewhere", "x!admin@h", "!status"), &mut outbox)
            .await;
        assert!(outbox.is_empty());
    }

    #[test]
    fn pub_delivery_fans_out_without_blank_lines() {
        let router = router();
        let mut outbox = Outbox::new();
        let msg = DeliveryMessage::new(vec!["pub".into()], "X\n\nY");
        assert_eq!(router.deliver(&msg, &mut outbox), 2);
        assert_eq!(
            texts(&mut outbox),
            vec![
                ("#ops".to_string(), "X".to_string()),
                ("#fragmented".to_string(), "X".to_string()),
                ("#ops".to_string(), "Y".to_string()),
                ("#fragmented".to_string(), "Y".to_string()),
            ]
        );
    }

    #[test]
    fn undeliverable_message_is_dropped() {
        let router = router();
        router.state.set_targeting(Targeting {
            rooms: true,
            private: false,
        });
        let mut outbox = Outbox::new();
        let msg = DeliveryMessage::new(vec!["priv".into(), "#nowhere".into()], "X");
        assert_eq!(router.deliver(&msg, &mut outbox), 0);
        assert!(outbox.is_empty());
    }
}
