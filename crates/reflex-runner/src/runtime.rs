use std::rc::Rc;

use reflex_actions::{ActionRegistry, EventHandler, SharedHandler, TriggerPolicy};
use reflex_binding::{ComponentMemberPath, DynamicModel, ObjectModel, Value};
use reflex_events::EventManager;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::console::Console;
use crate::scene::{self, Scene, SceneError, TimelineEntry};

/// Owns the bus, the object model and every handler of a scene, and pumps them
/// one step at a time.
pub struct Runtime {
    events: EventManager,
    model: DynamicModel,
    handlers: Vec<SharedHandler>,
    registry: ActionRegistry,
    console: Console,
    timeline: Vec<TimelineEntry>,
    next_entry: usize,
    watches: Vec<(String, ComponentMemberPath)>,
    step: u32,
    config: RuntimeConfig,
}

impl Runtime {
    /// Empty runtime with built-in action kinds and console commands
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            events: EventManager::new(),
            model: DynamicModel::new(),
            handlers: Vec::new(),
            registry: ActionRegistry::with_builtin(),
            console: Console::with_builtin(),
            timeline: Vec::new(),
            next_entry: 0,
            watches: Vec::new(),
            step: 0,
            config,
        }
    }

    /// Build the model, register events and initialise every handler of a scene
    pub fn from_scene(scene: &Scene, config: RuntimeConfig) -> Result<Self, SceneError> {
        let mut runtime = Self::new(config);
        scene.populate_model(&runtime.model)?;
        scene.register_events(&runtime.events)?;

        for def in &scene.handlers {
            let event = runtime.events.name_to_id(&def.event);
            if !event.is_valid() {
                return Err(SceneError::UnknownEvent(def.event.clone()));
            }

            let model: Rc<dyn ObjectModel> = Rc::new(runtime.model.clone());
            let mut handler = EventHandler::new(def.name.as_str(), event, model);
            if let Some(action) = &def.action {
                handler = handler.with_action(scene::build_action(
                    action,
                    &runtime.model,
                    &runtime.events,
                    &runtime.registry,
                )?);
            }
            if let Some(owner) = &def.owner {
                handler = handler.with_owner(scene::find_object(&runtime.model, owner)?);
            }

            let mut policy = TriggerPolicy::empty();
            if let Some(max) = def.max_trigger_count {
                policy |= TriggerPolicy::FIXED_COUNT;
                handler = handler.with_max_trigger_count(max);
            }
            if def.lock {
                policy |= TriggerPolicy::LOCK_UNTIL_COMPLETION;
            }

            runtime.add_handler(handler.with_policy(policy))?;
        }

        for watch in &scene.watch {
            let label = format!("{}.{}", watch.object, watch.path);
            runtime.watches.push((label, scene::bind(&runtime.model, watch)?));
        }

        runtime.timeline = scene.timeline.clone();
        runtime.timeline.sort_by_key(|entry| entry.step);

        info!(
            target: "runtime",
            "Loaded scene with {} object(s), {} event(s), {} handler(s)",
            runtime.model.objects().len(),
            runtime.events.registry().len(),
            runtime.handlers.len()
        );
        Ok(runtime)
    }

    /// Register a handler on the bus and keep it ticking
    pub fn add_handler(&mut self, handler: EventHandler) -> Result<SharedHandler, SceneError> {
        let handler = handler.into_shared();
        EventHandler::init(&handler, &self.events)?;
        self.handlers.push(Rc::clone(&handler));
        Ok(handler)
    }

    // ===== Accessors =====

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn model(&self) -> &DynamicModel {
        &self.model
    }

    pub fn handlers(&self) -> &[SharedHandler] {
        &self.handlers
    }

    pub fn handler(&self, name: &str) -> Option<&SharedHandler> {
        self.handlers.iter().find(|h| h.borrow().name() == name)
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of steps run so far
    pub fn current_step(&self) -> u32 {
        self.step
    }

    // ===== Stepping =====

    /// Run a console command line and return its output
    pub fn execute(&mut self, line: &str) -> String {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return String::new();
        };
        let args: Vec<&str> = words.collect();

        match self.console.lookup(name) {
            Some(command) => {
                debug!(target: "console", "Executing {} {:?}", name, args);
                command(self, &args)
            }
            None => {
                warn!(target: "console", "Unknown command: {}", name);
                format!("Unknown command: {}", name)
            }
        }
    }

    /// Run due timeline commands, then tick every handler once
    pub fn step(&mut self) {
        while let Some(entry) = self.timeline.get(self.next_entry) {
            if entry.step > self.step {
                break;
            }
            let command = entry.command.clone();
            self.next_entry += 1;

            let output = self.execute(&command);
            info!(target: "runtime", "[{}] {} -> {}", self.step, command, output);
        }

        for handler in &self.handlers {
            handler.borrow_mut().tick(&self.events);
        }
        self.step += 1;
    }

    /// Nothing left on the timeline and no handler running
    pub fn is_idle(&self) -> bool {
        self.next_entry >= self.timeline.len()
            && self.handlers.iter().all(|h| !h.borrow().is_running())
    }

    /// Step until idle or `max_steps` is reached. Returns the number of steps run.
    pub fn run(&mut self, max_steps: u32) -> u32 {
        let mut ran = 0;
        while ran < max_steps && !self.is_idle() {
            self.step();
            ran += 1;
        }
        if !self.is_idle() {
            warn!(target: "runtime", "Stopped after {} steps with work left", ran);
        }
        ran
    }

    /// Current value of every watched binding
    pub fn watches(&self) -> Vec<(String, Option<Value>)> {
        self.watches
            .iter()
            .map(|(label, binding)| (label.clone(), binding.get_value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_actions::HandlerState;

    const SCENE: &str = r#"
[[types]]
name = "GameObject"

[[types]]
name = "Health"
fields = [{ name = "current", type = "int" }, { name = "hits", type = "int" }]

[[objects]]
name = "player"
type = "GameObject"
behaviors = ["player_health"]

[[objects]]
name = "player_health"
type = "Health"
values = { current = 30 }

[[events]]
name = "Damage"
id = 7

[[handlers]]
name = "on_damage"
event = "Damage"
owner = "player"
max_trigger_count = 2
lock = true

[handlers.action]
kind = "sequence"

[[handlers.action.actions]]
kind = "set_member"
target = { object = "player_health", path = "current" }
value = 10

[[handlers.action.actions]]
kind = "wait"
steps = 2

[[timeline]]
step = 0
command = "post Damage"

[[timeline]]
step = 1
command = "post Damage"

[[watch]]
object = "player_health"
path = "current"
"#;

    fn runtime() -> Runtime {
        let scene: Scene = SCENE.parse().unwrap();
        Runtime::from_scene(&scene, RuntimeConfig::default()).unwrap()
    }

    #[test]
    fn test_run_scene_to_idle() {
        let mut runtime = runtime();
        let steps = runtime.run(50);

        assert!(runtime.is_idle());
        assert!(steps < 50);
        let handler = runtime.handler("on_damage").unwrap().borrow();
        // second post arrived while the sequence was running
        assert_eq!(handler.trigger_count(), 1);
        assert_eq!(handler.state(), HandlerState::Sleeping);
        assert_eq!(
            runtime.watches(),
            vec![("player_health.current".to_string(), Some(Value::Int(10)))]
        );
    }

    #[test]
    fn test_console_commands() {
        let mut runtime = runtime();

        assert_eq!(runtime.execute("MOCK a b"), "a b");
        assert_eq!(runtime.execute("events"), "7 Damage");
        assert_eq!(runtime.execute("get player Health current"), "30");
        assert_eq!(runtime.execute("get player Mover speed"), "No Mover attached to #0");
        assert_eq!(runtime.execute("candidates player int"), "Health.current : int\nHealth.hits : int");
        assert!(runtime.execute("actions").starts_with("animate_float\nconditional"));
        assert_eq!(runtime.execute("frobnicate"), "Unknown command: frobnicate");
        assert_eq!(runtime.execute("   "), "");

        assert_eq!(
            runtime.execute("post Damage"),
            "Posted Damage (7) to 1 listener(s)"
        );
        assert_eq!(runtime.execute("post Nope"), "Unknown event: Nope");
        assert!(runtime.execute("handlers").starts_with("on_damage on Damage (7) [Running] triggered 1/2 locked"));
    }

    #[test]
    fn test_snapshot_command_emits_toml() {
        let mut runtime = runtime();
        runtime.execute("post Damage");
        let output = runtime.execute("snapshot on_damage");

        let snapshot: reflex_actions::HandlerSnapshot = toml::from_str(&output).unwrap();
        assert_eq!(snapshot.trigger_count, 1);
        assert_eq!(snapshot.action.map(|a| a.children.len()), Some(2));
    }

    #[test]
    fn test_unknown_handler_event_fails_load() {
        let text = SCENE.replace("event = \"Damage\"", "event = \"Explode\"");
        let scene: Scene = text.parse().unwrap();
        assert!(matches!(
            Runtime::from_scene(&scene, RuntimeConfig::default()),
            Err(SceneError::UnknownEvent(_))
        ));
    }
}
