use infection_core::config::SimConfig;
use infection_core::world::World;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// PyO3 module exposing infection-core to Python.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize default config: {e}")))
}

/// Build a world from the config to surface both field and drug errors.
#[pyfunction]
fn validate_config_json(config_json: &str) -> PyResult<bool> {
    build_world(config_json)
        .map(|_| true)
        .map_err(PyValueError::new_err)
}

/// Run `steps` ticks and return the run summary as JSON.
#[pyfunction]
#[pyo3(signature = (config_json, steps, sample_every=1))]
fn run_experiment_json(config_json: &str, steps: usize, sample_every: usize) -> PyResult<String> {
    run_experiment(config_json, steps, sample_every).map_err(PyValueError::new_err)
}

/// Run `steps` ticks and return the final state snapshot as JSON.
#[pyfunction]
fn snapshot_json(config_json: &str, steps: usize) -> PyResult<String> {
    snapshot_after(config_json, steps).map_err(PyValueError::new_err)
}

fn build_world(config_json: &str) -> Result<World, String> {
    let config: SimConfig =
        serde_json::from_str(config_json).map_err(|e| format!("invalid config json: {e}"))?;
    World::try_new(config).map_err(|e| format!("invalid world configuration: {e}"))
}

fn run_experiment(config_json: &str, steps: usize, sample_every: usize) -> Result<String, String> {
    let mut world = build_world(config_json)?;
    let summary = world
        .try_run_experiment(steps, sample_every)
        .map_err(|e| format!("experiment failed: {e}"))?;
    serde_json::to_string(&summary).map_err(|e| format!("failed to serialize summary: {e}"))
}

fn snapshot_after(config_json: &str, steps: usize) -> Result<String, String> {
    if steps > World::MAX_EXPERIMENT_STEPS {
        return Err(format!(
            "steps ({steps}) exceed supported maximum ({})",
            World::MAX_EXPERIMENT_STEPS
        ));
    }
    let mut world = build_world(config_json)?;
    for _ in 0..steps {
        world
            .step()
            .map_err(|e| format!("simulation step failed: {e}"))?;
    }
    serde_json::to_string(&world.snapshot())
        .map_err(|e| format!("failed to serialize snapshot: {e}"))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(run_experiment_json, m)?)?;
    m.add_function(wrap_pyfunction!(snapshot_json, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_world_accepts_default_config() {
        let json = serde_json::to_string(&SimConfig::default()).unwrap();
        assert!(build_world(&json).is_ok());
    }

    #[test]
    fn build_world_reports_unknown_drug() {
        let json = r#"{"treatments": [{"drug": "ghost", "concentration": 1.0}]}"#;
        let err = build_world(json).err().unwrap();
        assert!(err.contains("ghost"), "{err}");
    }

    #[test]
    fn build_world_rejects_malformed_json() {
        assert!(build_world("{").err().unwrap().starts_with("invalid config json"));
    }

    #[test]
    fn run_experiment_accepts_partial_config() {
        let json = r#"{"grid_width": 6, "grid_height": 6, "initial": {"infected_cells": 2}}"#;
        let summary = run_experiment(json, 4, 2).unwrap();
        let value: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(value["steps"], 4);
        assert_eq!(value["samples"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn snapshot_after_rejects_too_many_steps() {
        assert!(snapshot_after("{}", World::MAX_EXPERIMENT_STEPS + 1).is_err());
    }
}
