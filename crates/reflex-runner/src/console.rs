use std::collections::BTreeMap;

use reflex_actions::ActionExt;
use reflex_binding::{enumerate_candidates, ComponentMemberPath, ObjectModel, TypeName};
use tracing::debug;

use crate::runtime::Runtime;

/// Console command: receives the runtime and the words after the command name
pub type CommandFn = fn(&mut Runtime, &[&str]) -> String;

/// Name to command table used by [`Runtime::execute`]
pub struct Console {
    commands: BTreeMap<String, CommandFn>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Console with every built-in command
    pub fn with_builtin() -> Self {
        let mut console = Self::new();
        console.register("mock", mock);
        console.register("help", help);
        console.register("events", events);
        console.register("post", post);
        console.register("handlers", handlers);
        console.register("snapshot", snapshot);
        console.register("get", get);
        console.register("candidates", candidates);
        console.register("actions", actions);
        console
    }

    /// Register a command. Names are matched case-insensitively.
    pub fn register(&mut self, name: &str, command: CommandFn) {
        debug!(target: "console", "Registering command: {}", name);
        self.commands.insert(name.to_lowercase(), command);
    }

    pub fn lookup(&self, name: &str) -> Option<CommandFn> {
        self.commands.get(&name.to_lowercase()).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::with_builtin()
    }
}

// ===== Built-in commands =====

/// Echoes its arguments
fn mock(_runtime: &mut Runtime, args: &[&str]) -> String {
    args.join(" ")
}

fn help(runtime: &mut Runtime, _args: &[&str]) -> String {
    runtime.console().names().collect::<Vec<_>>().join(" ")
}

fn events(runtime: &mut Runtime, _args: &[&str]) -> String {
    runtime
        .events()
        .registry()
        .ids()
        .iter()
        .map(|event| format!("{} {}", event.id(), event.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn post(runtime: &mut Runtime, args: &[&str]) -> String {
    let Some(name) = args.first() else {
        return "Usage: post <event>".to_string();
    };
    let event = runtime.events().name_to_id(name);
    if !event.is_valid() {
        return format!("Unknown event: {}", name);
    }
    let delivered = runtime.events().post(&event);
    format!("Posted {} to {} listener(s)", event, delivered)
}

fn handlers(runtime: &mut Runtime, _args: &[&str]) -> String {
    let mut lines = Vec::new();
    for handler in runtime.handlers() {
        handler.borrow().describe(&mut lines);
    }
    lines.join("\n")
}

fn snapshot(runtime: &mut Runtime, args: &[&str]) -> String {
    let Some(name) = args.first() else {
        return "Usage: snapshot <handler>".to_string();
    };
    let Some(handler) = runtime.handler(name) else {
        return format!("Unknown handler: {}", name);
    };
    let snapshot = handler.borrow().snapshot();
    toml::to_string_pretty(&snapshot).unwrap_or_else(|e| format!("Failed to encode snapshot: {}", e))
}

/// `get <object> <behavior type> <member.path>`
fn get(runtime: &mut Runtime, args: &[&str]) -> String {
    let [object, behavior, path] = args else {
        return "Usage: get <object> <behavior> <member.path>".to_string();
    };
    let model = runtime.model();
    let Some(object) = model.find(object) else {
        return format!("Unknown object: {}", object);
    };
    let Some(component) = model
        .attached_behaviors(object)
        .into_iter()
        .find(|b| model.object_type(*b).is_some_and(|ty| ty.as_str() == *behavior))
    else {
        return format!("No {} attached to {}", behavior, object);
    };

    match ComponentMemberPath::parse(model, component, path) {
        Ok(binding) => binding
            .get_value()
            .map_or_else(|| "null".to_string(), |value| value.to_string()),
        Err(e) => e.to_string(),
    }
}

/// `candidates <object> [value type]`
fn candidates(runtime: &mut Runtime, args: &[&str]) -> String {
    let Some(name) = args.first() else {
        return "Usage: candidates <object> [type]".to_string();
    };
    let model = runtime.model();
    let Some(object) = model.find(name) else {
        return format!("Unknown object: {}", name);
    };
    let filter = args.get(1).map(|ty| TypeName::new(*ty));

    enumerate_candidates(model, object, filter.as_ref(), runtime.config().candidate_depth)
        .iter()
        .map(|path| format!("{} : {}", path.path(), path.value_type().map_or("?", |t| t.as_str())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn actions(runtime: &mut Runtime, _args: &[&str]) -> String {
    let mut lines = runtime.registry().kinds();
    for handler in runtime.handlers() {
        if let Some(action) = handler.borrow().action() {
            lines.push(format!("{} runs {} ({})", handler.borrow().name(), action.label(), action.state()));
        }
    }
    lines.join("\n")
}
