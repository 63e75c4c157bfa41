//! Integration tests for handlers driving action trees over the event bus
//!
//! These tests wire real handlers, built-in actions and a dynamic object model
//! together and check trigger limits, locking, sequence timing and nested posts.

#[cfg(test)]
mod handler_tests {
    use std::rc::Rc;

    use reflex_actions::builtin::{ConditionalAction, PostEventAction, SetMemberAction, WaitAction};
    use reflex_actions::{
        Action, ActionExt, AndCondition, CompareCondition, Comparer, Condition, ConstantCondition,
        EventHandler, HandlerState, NotCondition, Operand, OrCondition, SequenceAction,
        SharedHandler, TriggerPolicy,
    };
    use reflex_binding::{ComponentMemberPath, DynamicModel, ObjectRef, TypeDef, TypeName, Value};
    use reflex_events::{EventId, EventManager};

    struct World {
        model: DynamicModel,
        events: EventManager,
        health: ObjectRef,
        player: ObjectRef,
    }

    fn world() -> World {
        let model = DynamicModel::new();
        model.define_type(TypeDef::new("GameObject"));
        model.define_type(
            TypeDef::new("Health")
                .field("current", TypeName::INT)
                .field("hits", TypeName::INT),
        );
        let player = model.spawn("GameObject", Some("player")).unwrap();
        let health = model.spawn("Health", None).unwrap();
        model.attach(player, health).unwrap();
        model.set_field(health, "current", Value::Int(30)).unwrap();

        let events = EventManager::new();
        events.registry_mut().insert(EventId::new(7, "Damage")).unwrap();
        events.registry_mut().insert(EventId::new(8, "Heal")).unwrap();

        World {
            model,
            events,
            health,
            player,
        }
    }

    fn damage() -> EventId {
        EventId::new(7, "Damage")
    }

    fn heal() -> EventId {
        EventId::new(8, "Heal")
    }

    fn shared_model(world: &World) -> Rc<dyn reflex_binding::ObjectModel> {
        Rc::new(world.model.clone())
    }

    fn bind(world: &World, member: &str) -> ComponentMemberPath {
        ComponentMemberPath::parse(&world.model, world.health, member).unwrap()
    }

    fn tick_until_idle(handler: &SharedHandler, events: &EventManager) -> usize {
        let mut ticks = 0;
        while handler.borrow().is_running() {
            handler.borrow_mut().tick(events);
            ticks += 1;
            assert!(ticks < 100, "handler never finished");
        }
        ticks
    }

    // ============ Trigger policies ============

    #[test]
    fn test_bounded_handler_triggers_at_most_k_times() {
        let world = world();
        let handler = EventHandler::new("limited", damage(), shared_model(&world))
            .with_action(Box::new(WaitAction::new(1)))
            .with_policy(TriggerPolicy::FIXED_COUNT)
            .with_max_trigger_count(3)
            .into_shared();
        EventHandler::init(&handler, &world.events).unwrap();

        for _ in 0..5 {
            world.events.post(&damage());
            tick_until_idle(&handler, &world.events);
        }

        let handler = handler.borrow();
        assert_eq!(handler.trigger_count(), 3);
        assert_eq!(handler.state(), HandlerState::Terminated);
    }

    #[test]
    fn test_locked_handler_refuses_while_running() {
        let world = world();
        let handler = EventHandler::new("locked", damage(), shared_model(&world))
            .with_action(Box::new(WaitAction::new(4)))
            .with_policy(TriggerPolicy::LOCK_UNTIL_COMPLETION)
            .into_shared();
        EventHandler::init(&handler, &world.events).unwrap();

        world.events.post(&damage());
        handler.borrow_mut().tick(&world.events);
        world.events.post(&damage());
        world.events.post(&damage());
        assert_eq!(handler.borrow().trigger_count(), 1);

        tick_until_idle(&handler, &world.events);
        assert_eq!(handler.borrow().state(), HandlerState::Sleeping);

        world.events.post(&damage());
        assert_eq!(handler.borrow().trigger_count(), 2);
    }

    // ============ Sequences ============

    #[test]
    fn test_sequence_finishes_one_step_after_last_child() {
        let world = world();
        let children: Vec<Box<dyn Action>> = vec![
            Box::new(SetMemberAction::new(bind(&world, "current"), Value::Int(10))),
            Box::new(WaitAction::new(2)),
            Box::new(SetMemberAction::new(bind(&world, "hits"), Value::Int(1))),
        ];
        let sequence = SequenceAction::with_actions(children);
        let handler = EventHandler::new("hurt", damage(), shared_model(&world))
            .with_action(Box::new(sequence))
            .into_shared();
        EventHandler::init(&handler, &world.events).unwrap();

        world.events.post(&damage());
        assert_eq!(world.model.field(world.health, "current"), Some(Value::Int(10)));
        assert_eq!(world.model.field(world.health, "hits"), Some(Value::Int(0)));

        // advance to wait, wait x2, advance to last set, finish
        let ticks = tick_until_idle(&handler, &world.events);
        assert_eq!(ticks, 5);
        assert_eq!(world.model.field(world.health, "hits"), Some(Value::Int(1)));
        assert_eq!(handler.borrow().state(), HandlerState::Sleeping);
    }

    // ============ Nested posts ============

    #[test]
    fn test_action_posting_event_triggers_other_handler_first() {
        let world = world();
        let chain = EventHandler::new("chain", damage(), shared_model(&world))
            .with_action(Box::new(PostEventAction::new(heal())))
            .with_owner(world.player)
            .into_shared();
        let healer = EventHandler::new("healer", heal(), shared_model(&world))
            .with_action(Box::new(SetMemberAction::new(bind(&world, "current"), Value::Int(99))))
            .into_shared();
        EventHandler::init(&chain, &world.events).unwrap();
        EventHandler::init(&healer, &world.events).unwrap();

        world.events.post(&damage());

        // the nested post ran to completion inside the outer one
        assert_eq!(world.model.field(world.health, "current"), Some(Value::Int(99)));
        assert_eq!(healer.borrow().trigger_count(), 1);
        assert_eq!(
            healer.borrow().current_event().and_then(|r| r.related()),
            Some(world.player)
        );
    }

    #[test]
    fn test_self_posting_handler_is_not_reentered() {
        let world = world();
        let echo = EventHandler::new("echo", damage(), shared_model(&world))
            .with_action(Box::new(PostEventAction::new(damage())))
            .into_shared();
        EventHandler::init(&echo, &world.events).unwrap();

        world.events.post(&damage());
        assert_eq!(echo.borrow().trigger_count(), 1);
        assert_eq!(world.events.dispatch_depth(), 0);
    }

    // ============ Conditions ============

    #[test]
    fn test_condition_tree_scenarios() {
        let world = world();
        let ctx = reflex_actions::ActionContext::new(&world.model, &world.events);
        let leaf = |v: bool| -> Box<dyn Condition> { Box::new(ConstantCondition(v)) };

        assert!(!AndCondition::new(leaf(true), leaf(false)).evaluate(&ctx));
        assert!(NotCondition::new(Box::new(AndCondition::new(leaf(true), leaf(false)))).evaluate(&ctx));
        let partial = OrCondition {
            left: Some(leaf(true)),
            right: None,
        };
        assert!(partial.evaluate(&ctx));
    }

    #[test]
    fn test_conditional_gates_on_bound_member() {
        let world = world();
        let alive = CompareCondition::new(
            Operand::Member(bind(&world, "current")),
            Comparer::Greater,
            Operand::Constant(Value::Int(0)),
        );
        let action = ConditionalAction::new(
            Box::new(alive),
            Box::new(SetMemberAction::new(bind(&world, "hits"), Value::Int(5))),
        );
        let handler = EventHandler::new("gated", damage(), shared_model(&world))
            .with_action(Box::new(action))
            .into_shared();
        EventHandler::init(&handler, &world.events).unwrap();

        world.model.set_field(world.health, "current", Value::Int(0)).unwrap();
        world.events.post(&damage());
        tick_until_idle(&handler, &world.events);
        assert_eq!(world.model.field(world.health, "hits"), Some(Value::Int(0)));

        world.model.set_field(world.health, "current", Value::Int(3)).unwrap();
        world.events.post(&damage());
        tick_until_idle(&handler, &world.events);
        assert_eq!(world.model.field(world.health, "hits"), Some(Value::Int(5)));
        assert!(handler.borrow().action().map_or(false, |a| a.has_ended()));
    }
}
