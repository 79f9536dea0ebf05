//! Gateway: the entry point for one user message.
//!
//! Parses `/name[:argument]` slash commands, applies session and mode
//! updates, and either answers locally (no graph invocation), returns a pure
//! state mutation, or dispatches into the graph with a fresh turn state
//! merged from the prior session. The exact command set is a registry; the
//! commands themselves are not part of the core contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::state::{AgentControl, AgentState, InterfaceKind};

/// Byte budget applied to carried-over context values between turns.
const CARRYOVER_CONTEXT_BUDGET: usize = 4096;

/// A parsed `/name[:argument]` command.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashCommand {
    pub name: String,
    pub argument: Option<String>,
}

impl SlashCommand {
    /// Parses a leading slash command, if the input is one.
    pub fn parse(input: &str) -> Option<SlashCommand> {
        let rest = input.trim().strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        let token = rest.split_whitespace().next().unwrap_or(rest);
        match token.split_once(':') {
            Some((name, argument)) if !name.is_empty() => Some(SlashCommand {
                name: name.to_string(),
                argument: if argument.is_empty() {
                    None
                } else {
                    Some(argument.to_string())
                },
            }),
            _ => Some(SlashCommand {
                name: token.to_string(),
                argument: None,
            }),
        }
    }
}

/// What the gateway did with a message.
pub enum GatewayOutcome {
    /// Handled locally; reply text, no graph invocation.
    Local(String),
    /// A pure state mutation (e.g. a mode toggle); no graph invocation.
    StateMutation(AgentState),
    /// Run the graph over this turn state.
    Dispatch(AgentState),
}

type LocalHandler = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;
type MutateHandler = Arc<dyn Fn(&mut AgentState, Option<&str>) + Send + Sync>;

enum CommandHandler {
    Local(LocalHandler),
    Mutate(MutateHandler),
}

/// The gateway: command registry plus turn-state construction.
pub struct Gateway {
    commands: BTreeMap<String, CommandHandler>,
    /// Capability names; unrecognized commands with a capability-name prefix
    /// are forwarded to that capability as per-turn input.
    capability_names: Vec<String>,
    default_control: AgentControl,
    interface: InterfaceKind,
}

impl Gateway {
    pub fn new(
        capability_names: Vec<String>,
        default_control: AgentControl,
        interface: InterfaceKind,
    ) -> Self {
        let mut gateway = Self {
            commands: BTreeMap::new(),
            capability_names,
            default_control,
            interface,
        };
        gateway.register_default_commands();
        gateway
    }

    fn register_default_commands(&mut self) {
        self.register_local("help", |_| {
            "Commands: /help, /mode:direct|agent, /bypass:task_extraction|classification, \
             /planning:on|off, /pref:key=value"
                .to_string()
        });
        self.register_mutate("mode", |state, arg| {
            state.session.direct_chat = arg == Some("direct");
        });
        self.register_mutate("bypass", |state, arg| match arg {
            Some("task_extraction") => state.control.task_extraction_bypass = true,
            Some("classification") => state.control.classification_bypass = true,
            _ => {}
        });
        self.register_mutate("planning", |state, arg| {
            state.control.planning_mode = arg == Some("on");
        });
        self.register_mutate("pref", |state, arg| {
            if let Some((key, value)) = arg.and_then(|a| a.split_once('=')) {
                state
                    .session
                    .preferences
                    .insert(key.to_string(), value.to_string());
            }
        });
    }

    /// Registers a locally-handled command (no graph invocation).
    pub fn register_local(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(Option<&str>) -> String + Send + Sync + 'static,
    ) {
        self.commands
            .insert(name.into(), CommandHandler::Local(Arc::new(handler)));
    }

    /// Registers a gateway-handled command (state mutation only).
    pub fn register_mutate(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut AgentState, Option<&str>) + Send + Sync + 'static,
    ) {
        self.commands
            .insert(name.into(), CommandHandler::Mutate(Arc::new(handler)));
    }

    /// Builds the turn state: fresh query, prior session/history/contexts
    /// carried over (contexts truncated to a byte budget).
    fn turn_state(&self, query: &str, prior: Option<&AgentState>) -> AgentState {
        let mut state = AgentState::for_query(query);
        state.control = self.default_control.clone();
        state.interface = self.interface;
        if let Some(prior) = prior {
            let mut messages = prior.input_output.messages.clone();
            messages.extend(state.input_output.messages.drain(..));
            state.input_output.messages = messages;
            state.session = prior.session.clone();
            // Control flags (bypass modes, planning mode) persist once set.
            state.control = prior.control.clone();
            // Clarification signals were consumed by the clarify node; they
            // must not re-trigger it next turn.
            state.context = prior
                .context
                .without_type(crate::capabilities::CLARIFICATION_NEEDED)
                .truncated_for_prompt(CARRYOVER_CONTEXT_BUDGET);
        }
        state
    }

    /// Handles one user message against the optional prior turn state.
    pub fn handle(&self, input: &str, prior: Option<&AgentState>) -> GatewayOutcome {
        let Some(command) = SlashCommand::parse(input) else {
            return GatewayOutcome::Dispatch(self.turn_state(input, prior));
        };

        match self.commands.get(&command.name) {
            Some(CommandHandler::Local(handler)) => {
                GatewayOutcome::Local(handler(command.argument.as_deref()))
            }
            Some(CommandHandler::Mutate(handler)) => {
                let mut state = self.turn_state(input, prior);
                handler(&mut state, command.argument.as_deref());
                GatewayOutcome::StateMutation(state)
            }
            None => {
                // Forward `/capability:arg` to that capability as per-turn input.
                if self.capability_names.iter().any(|n| n == &command.name) {
                    let mut state = self.turn_state(input, prior);
                    state.session.capability_modes.insert(
                        command.name.clone(),
                        command.argument.unwrap_or_default(),
                    );
                    GatewayOutcome::Dispatch(state)
                } else {
                    GatewayOutcome::Local(format!("unknown command: /{}", command.name))
                }
            }
        }
    }
}
