use crate::action::{Action, ActionCore, ActionExt};
use crate::context::ActionContext;

/// Ends after a number of updates. Zero behaves like one.
#[derive(Default)]
pub struct WaitAction {
    core: ActionCore,
    steps: u32,
    elapsed: u32,
}

impl WaitAction {
    pub fn new(steps: u32) -> Self {
        Self {
            core: ActionCore::new(),
            steps,
            elapsed: 0,
        }
    }
}

impl Action for WaitAction {
    fn kind(&self) -> &'static str {
        "wait"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, _ctx: &ActionContext<'_>) {
        self.elapsed = 0;
    }

    fn on_update(&mut self, ctx: &ActionContext<'_>) {
        self.elapsed += 1;
        if self.elapsed >= self.steps {
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
        Some(format!("{}/{} steps", self.elapsed, self.steps))
    }
}

#[cfg(test)]
mod tests {
    use reflex_binding::DynamicModel;
    use reflex_events::EventManager;

    use super::*;

    fn updates_until_end(steps: u32) -> u32 {
        let model = DynamicModel::new();
        let events = EventManager::new();
        let ctx = ActionContext::new(&model, &events);
        let mut action = WaitAction::new(steps);
        action.trigger(&ctx);

        let mut updates = 0;
        while !action.has_ended() {
            action.update(&ctx);
            updates += 1;
        }
        updates
    }

    #[test]
    fn test_waits_for_steps() {
        assert_eq!(updates_until_end(0), 1);
        assert_eq!(updates_until_end(1), 1);
        assert_eq!(updates_until_end(4), 4);
    }
}
