//! Integration tests running whole scene files through the runtime
//!
//! Scenes and configs are read from disk the same way the `reflex` binary reads
//! them, then stepped to idle.

#[cfg(test)]
mod scene_file_tests {
    use std::fs;

    use reflex_actions::HandlerState;
    use reflex_binding::Value;
    use reflex_runner::{ReflexConfig, Runtime, Scene, SceneError};

    const ARENA: &str = include_str!("../../../demos/arena.toml");

    // ============ Demo scene ============

    #[test]
    fn test_arena_demo_runs_to_idle() {
        let scene: Scene = ARENA.parse().unwrap();
        let config = ReflexConfig::default();
        let mut runtime = Runtime::from_scene(&scene, config.runtime.clone()).unwrap();

        let steps = runtime.run(config.runtime.max_steps);
        assert!(runtime.is_idle());
        assert!(steps < config.runtime.max_steps);

        {
            let damage = runtime.handler("on_damage").unwrap().borrow();
            // the post at step 2 lands while the first hit is still animating
            assert_eq!(damage.trigger_count(), 3);
            assert_eq!(damage.state(), HandlerState::Sleeping);

            let heal = runtime.handler("on_heal").unwrap().borrow();
            assert_eq!(heal.trigger_count(), 2);
            assert_eq!(heal.state(), HandlerState::Terminated);
        }

        // the third hit is never healed
        assert_eq!(
            runtime.watches(),
            vec![
                ("player_health.current".to_string(), Some(Value::Int(10))),
                ("player_light.intensity".to_string(), Some(Value::Float(0.0))),
            ]
        );
    }

    #[test]
    fn test_arena_demo_console() {
        let scene: Scene = ARENA.parse().unwrap();
        let mut runtime = Runtime::from_scene(&scene, Default::default()).unwrap();

        assert_eq!(runtime.execute("events"), "7 Damage\n8 Heal\n9 Died");
        assert_eq!(runtime.execute("get player Light intensity"), "0");
        assert_eq!(
            runtime.execute("candidates player float"),
            "Light.intensity : float"
        );
    }

    // ============ Files on disk ============

    #[test]
    fn test_scene_and_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = dir.path().join("scene.toml");
        let config_path = dir.path().join("config.toml");

        fs::write(
            &scene_path,
            r#"
[[types]]
name = "Counter"
fields = [{ name = "value", type = "int" }]

[[objects]]
name = "counter"
type = "Counter"
values = { value = 0 }

[[events]]
name = "Tick"

[[handlers]]
name = "forever"
event = "Tick"

[handlers.action]
kind = "wait"
steps = 1000

[[timeline]]
step = 0
command = "post Tick"

[[watch]]
object = "counter"
path = "value"
"#,
        )
        .unwrap();
        fs::write(&config_path, "[runtime]\nmax_steps = 5\n").unwrap();

        let config = ReflexConfig::load_from(&config_path).unwrap();
        assert_eq!(config.runtime.max_steps, 5);
        assert_eq!(config.runtime.tick_interval_ms, 50);

        let scene = Scene::load(&scene_path).unwrap();
        let mut runtime = Runtime::from_scene(&scene, config.runtime.clone()).unwrap();

        // the wait outlives the step budget
        assert_eq!(runtime.run(config.runtime.max_steps), 5);
        assert!(!runtime.is_idle());
        assert!(runtime.handler("forever").unwrap().borrow().is_running());
        assert_eq!(
            runtime.watches(),
            vec![("counter.value".to_string(), Some(Value::Int(0)))]
        );
    }

    #[test]
    fn test_missing_scene_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Scene::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(SceneError::Io(_))));
    }
}
