use crate::config::GameConfig;
use crate::scripted_input::ScriptedInputPlayer;
use anyhow::{Context, Result};
use deepdig_core::InputSnapshot;
use deepdig_testkit::{EventRecord, JsonlSink};
use deepdig_world::{Simulation, WorldSnapshot};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub struct HeadlessConfig {
    pub game: GameConfig,
    pub ticks: u64,
    pub script: Option<PathBuf>,
    pub events: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub load: Option<PathBuf>,
    pub exit_when_script_finished: bool,
}

/// What a headless run did, for the final log line and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSummary {
    pub ticks: u64,
    pub events: usize,
    pub overrides: usize,
    pub explored: usize,
}

pub fn run(cfg: HeadlessConfig) -> Result<HeadlessSummary> {
    let mut sim = Simulation::new(&cfg.game.world, &cfg.game.sim, &cfg.game.rover);

    if let Some(path) = &cfg.load {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read save {}", path.display()))?;
        let snapshot = WorldSnapshot::from_json(&json)
            .with_context(|| format!("Failed to parse save {}", path.display()))?;
        sim.restore(&snapshot)
            .with_context(|| format!("Failed to restore {}", path.display()))?;
        info!(path = %path.display(), tick = snapshot.tick.0, "Loaded save");
    }

    let mut script = cfg
        .script
        .as_deref()
        .map(ScriptedInputPlayer::from_path)
        .transpose()?;
    let mut sink = cfg.events.as_ref().map(JsonlSink::create).transpose()?;

    let dt = cfg.game.sim.dt;
    let mut events_written = 0;
    let mut ticks = 0;
    while ticks < cfg.ticks {
        if cfg.exit_when_script_finished && script.as_ref().is_some_and(|s| s.is_finished()) {
            info!(ticks, "Input script finished");
            break;
        }
        let input = script
            .as_mut()
            .map(|s| s.advance(dt))
            .unwrap_or_else(InputSnapshot::default);
        sim.step(input);
        ticks += 1;

        for event in sim.drain_events() {
            events_written += 1;
            if let Some(sink) = sink.as_mut() {
                sink.write(&EventRecord {
                    tick: sim.tick(),
                    kind: event.kind(),
                    payload: serde_json::to_value(&event)?,
                })?;
            }
        }
    }
    if let Some(sink) = sink.as_mut() {
        sink.flush()?;
    }

    let snapshot = sim.snapshot();
    if let Some(path) = &cfg.save {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, snapshot.to_json()?)
            .with_context(|| format!("Failed to write save {}", path.display()))?;
        info!(path = %path.display(), "Saved world");
    }

    let summary = HeadlessSummary {
        ticks,
        events: events_written,
        overrides: snapshot.overrides.len(),
        explored: snapshot.explored.len(),
    };
    info!(
        ticks = summary.ticks,
        events = summary.events,
        overrides = summary.overrides,
        explored = summary.explored,
        rover = %sim.rover().tile(),
        "Headless run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("deepdig-headless-{name}-{}", std::process::id()))
    }

    #[test]
    fn scripted_run_writes_events_and_save() {
        let dir = temp_dir("scripted");
        fs::create_dir_all(&dir).unwrap();
        let script = dir.join("dig.json");
        fs::write(
            &script,
            r#"{ "steps": [
                { "duration": 1.0 },
                { "duration": 3.0, "vertical": 1, "drill": true }
            ] }"#,
        )
        .unwrap();

        let mut game = GameConfig::default();
        game.world.seed = 42;
        let summary = run(HeadlessConfig {
            game: game.clone(),
            ticks: 1000,
            script: Some(script),
            events: Some(dir.join("events.jsonl")),
            save: Some(dir.join("save.json")),
            load: None,
            exit_when_script_finished: true,
        })
        .unwrap();

        assert_eq!(summary.ticks, 240);
        assert!(summary.overrides > 0);
        let log = fs::read_to_string(dir.join("events.jsonl")).unwrap();
        assert_eq!(log.lines().count(), summary.events);
        assert!(log.contains("tile_drilled"));

        let resumed = run(HeadlessConfig {
            game,
            ticks: 10,
            script: None,
            events: None,
            save: None,
            load: Some(dir.join("save.json")),
            exit_when_script_finished: false,
        })
        .unwrap();
        assert_eq!(resumed.overrides, summary.overrides);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_from_another_seed_is_rejected() {
        let dir = temp_dir("seed");
        fs::create_dir_all(&dir).unwrap();
        let save = dir.join("save.json");
        let mut game = GameConfig::default();
        game.world.seed = 1;
        run(HeadlessConfig {
            game: game.clone(),
            ticks: 5,
            script: None,
            events: None,
            save: Some(save.clone()),
            load: None,
            exit_when_script_finished: false,
        })
        .unwrap();

        game.world.seed = 2;
        let err = run(HeadlessConfig {
            game,
            ticks: 5,
            script: None,
            events: None,
            save: None,
            load: Some(save),
            exit_when_script_finished: false,
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("seed"));
        let _ = fs::remove_dir_all(dir);
    }
}
