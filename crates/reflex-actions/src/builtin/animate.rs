use reflex_binding::{ComponentMemberPath, Value};
use tracing::warn;

use crate::action::{Action, ActionCore, ActionExt};
use crate::context::ActionContext;

/// Linearly moves a float member from `from` to `to` over a number of updates.
///
/// The start value is written on trigger and the exact end value on the final
/// update. A failed write ends the animation early.
#[derive(Default)]
pub struct AnimateFloatAction {
    core: ActionCore,
    target: ComponentMemberPath,
    from: f64,
    to: f64,
    steps: u32,
    elapsed: u32,
}

impl AnimateFloatAction {
    pub fn new(target: ComponentMemberPath, from: f64, to: f64, steps: u32) -> Self {
        Self {
            core: ActionCore::new(),
            target,
            from,
            to,
            steps,
            elapsed: 0,
        }
    }

    /// Value written after `elapsed` updates
    pub fn sample(&self, elapsed: u32) -> f64 {
        if self.steps == 0 || elapsed >= self.steps {
            return self.to;
        }
        let t = f64::from(elapsed) / f64::from(self.steps);
        self.from + (self.to - self.from) * t
    }

    fn write(&self, value: f64) -> bool {
        match self.target.set_value(Value::Float(value)) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "actions", "{} stopped animating {}: {}", self.label(), self.target, e);
                false
            }
        }
    }
}

impl Action for AnimateFloatAction {
    fn kind(&self) -> &'static str {
        "animate_float"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, ctx: &ActionContext<'_>) {
        self.elapsed = 0;
        if !self.write(self.from) {
            self.end(ctx);
        }
    }

    fn on_update(&mut self, ctx: &ActionContext<'_>) {
        self.elapsed += 1;
        let value = self.sample(self.elapsed);
        if !self.write(value) || self.elapsed >= self.steps {
            self.end(ctx);
        }
    }

    fn progress(&self) -> u32 {
        self.elapsed
    }

    fn set_progress(&mut self, progress: u32) {
        self.elapsed = progress;
    }

    fn detail(&self) -> Option<String> {
        Some(format!(
            "{} {} -> {} over {} steps",
            self.target, self.from, self.to, self.steps
        ))
    }
}

#[cfg(test)]
mod tests {
    use reflex_binding::{DynamicModel, TypeDef, TypeName};
    use reflex_events::EventManager;

    use super::*;

    #[test]
    fn test_interpolates_and_lands_on_target() {
        let model = DynamicModel::new();
        model.define_type(TypeDef::new("Light").field("intensity", TypeName::FLOAT));
        let light = model.spawn("Light", None).unwrap();
        let events = EventManager::new();
        let ctx = ActionContext::new(&model, &events);

        let target = ComponentMemberPath::parse(&model, light, "intensity").unwrap();
        let mut action = AnimateFloatAction::new(target, 0.0, 1.0, 4);

        action.trigger(&ctx);
        assert_eq!(model.field(light, "intensity"), Some(Value::Float(0.0)));

        action.update(&ctx);
        assert_eq!(model.field(light, "intensity"), Some(Value::Float(0.25)));

        while !action.has_ended() {
            action.update(&ctx);
        }
        assert_eq!(action.progress(), 4);
        assert_eq!(model.field(light, "intensity"), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_unbound_target_ends_immediately() {
        let model = DynamicModel::new();
        let events = EventManager::new();
        let ctx = ActionContext::new(&model, &events);

        let mut action = AnimateFloatAction::default();
        action.trigger(&ctx);
        assert!(action.has_ended());
    }
}
