//! Simulation configuration workspace.
//!
//! Holds (a) the default/template configuration describing all configurable
//! unit types and parameters, (b) the persisted configuration entities for
//! the signed-in user, and (c) exactly one active configuration being
//! edited. Settings form a nested unit-type -> unit-id -> parameter-object
//! graph.
//!
//! Edits apply locally and synchronously mark the workspace touched (the
//! valid flag drops); validity returns only after a successful remote
//! validation round-trip. Persistence and validation run as a strictly
//! sequential chain - create-or-update, refetch, re-select, validate - so
//! validation never runs against stale unpersisted state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::types::SimulationId;

/// The entity id the default/template configuration is stored under.
pub const DEFAULT_CONFIG_ID: SimulationId = 0;

/// How many recent entities the workspace keeps in sync with the backend.
const RECENT_FETCH_LIMIT: usize = 10;

/// One persisted simulation configuration, settings parsed into the nested
/// unit graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntity {
    pub id: SimulationId,
    pub user_id: i64,
    pub name: String,
    pub settings: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("No configuration with id {0}")]
    UnknownConfig(SimulationId),

    #[error("No unit '{unit_id}' of type '{unit_type}' in the active configuration")]
    UnknownUnit { unit_type: String, unit_id: String },

    #[error("No active configuration selected")]
    NoActiveConfig,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Remote side of the workspace: persistence plus the external
/// validation/processing service. The REST client implements this in the
/// frontend; tests use an in-memory fake.
#[async_trait::async_trait]
pub trait SimulationBackend {
    /// Persist a new configuration under the given name.
    async fn create(&mut self, name: &str, settings: &Value) -> anyhow::Result<()>;

    /// Overwrite an existing configuration.
    async fn update(&mut self, id: SimulationId, name: &str, settings: &Value) -> anyhow::Result<()>;

    /// The most recent configurations, newest first.
    async fn fetch_recent(&mut self, limit: usize) -> anyhow::Result<Vec<ConfigEntity>>;

    /// Run remote validation against a persisted configuration.
    async fn validate(&mut self, id: SimulationId) -> anyhow::Result<()>;
}

/// The editing state: persisted entities keyed by id, one active
/// copy-on-select configuration, and the touched/valid flag.
#[derive(Debug)]
pub struct ConfigWorkspace {
    entities: BTreeMap<SimulationId, ConfigEntity>,
    selected_id: SimulationId,
    active: Option<ConfigEntity>,
    valid: bool,
}

impl Default for ConfigWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigWorkspace {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            selected_id: DEFAULT_CONFIG_ID,
            active: None,
            valid: true,
        }
    }

    /// Install the default/template configuration under [`DEFAULT_CONFIG_ID`].
    pub fn load_default(&mut self, settings: Value) {
        self.entities.insert(
            DEFAULT_CONFIG_ID,
            ConfigEntity {
                id: DEFAULT_CONFIG_ID,
                user_id: 0,
                name: "Default".to_string(),
                settings,
                created_at: None,
            },
        );
    }

    /// Ingest the fetched entity list and select the newest one; with no
    /// persisted entities the default becomes active.
    pub fn load_all(&mut self, configs: Vec<ConfigEntity>) -> Result<()> {
        let newest = configs.first().map(|c| c.id);
        for config in configs {
            self.entities.insert(config.id, config);
        }
        self.set_active(newest.unwrap_or(DEFAULT_CONFIG_ID))
    }

    /// Switch the active configuration. The entity is copied so edits stay
    /// local until committed.
    pub fn set_active(&mut self, id: SimulationId) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(WorkspaceError::UnknownConfig(id))?;
        debug!(id, "activating configuration");
        self.selected_id = id;
        self.active = Some(entity.clone());
        Ok(())
    }

    pub fn selected_id(&self) -> SimulationId {
        self.selected_id
    }

    pub fn active(&self) -> Option<&ConfigEntity> {
        self.active.as_ref()
    }

    /// False from the first local edit until the next successful remote
    /// validation round-trip.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_touched(&self) -> bool {
        !self.valid
    }

    /// Replace one unit's parameter object in the active settings graph.
    /// Applies locally and synchronously marks the workspace touched.
    pub fn apply_edit(&mut self, unit_type: &str, unit_id: &str, params: Value) -> Result<()> {
        let unit = self.unit_mut(unit_type, unit_id)?;
        *unit = params;
        self.valid = false;
        Ok(())
    }

    /// Flip the `integrate` flag on a unit's first parameter entry
    /// (enabling or disabling the configurable shape in the diagram).
    pub fn set_unit_integrated(&mut self, unit_type: &str, unit_id: &str, integrate: bool) -> Result<()> {
        let unit = self.unit_mut(unit_type, unit_id)?;

        let missing = || WorkspaceError::UnknownUnit {
            unit_type: unit_type.to_string(),
            unit_id: unit_id.to_string(),
        };
        let first_param = unit
            .get_mut("param")
            .and_then(Value::as_array_mut)
            .ok_or_else(missing)?
            .first_mut()
            .ok_or_else(missing)?;
        let params = first_param.as_object_mut().ok_or_else(missing)?;
        params.insert("integrate".to_string(), Value::Bool(integrate));

        self.valid = false;
        Ok(())
    }

    /// Persist the active configuration and re-validate: create-or-update,
    /// refetch the list, re-select the newest entity, then validate. The
    /// chain is strictly sequential so validation never sees stale state;
    /// validity returns only when the whole chain succeeds.
    pub async fn commit<B: SimulationBackend>(&mut self, name: Option<&str>, backend: &mut B) -> Result<()> {
        let active = self.active.as_ref().ok_or(WorkspaceError::NoActiveConfig)?;
        let name = name.unwrap_or(active.name.as_str());

        if active.id == DEFAULT_CONFIG_ID {
            backend.create(name, &active.settings).await?;
        } else {
            backend.update(active.id, name, &active.settings).await?;
        }

        let configs = backend.fetch_recent(RECENT_FETCH_LIMIT).await?;
        let newest = configs.first().map(|c| c.id).ok_or(WorkspaceError::NoActiveConfig)?;
        for config in configs {
            self.entities.insert(config.id, config);
        }
        self.set_active(newest)?;

        backend.validate(newest).await?;
        self.valid = true;
        Ok(())
    }

    fn unit_mut(&mut self, unit_type: &str, unit_id: &str) -> Result<&mut Value> {
        let missing = || WorkspaceError::UnknownUnit {
            unit_type: unit_type.to_string(),
            unit_id: unit_id.to_string(),
        };

        self.active
            .as_mut()
            .ok_or(WorkspaceError::NoActiveConfig)?
            .settings
            .get_mut(unit_type)
            .ok_or_else(missing)?
            .get_mut(unit_id)
            .ok_or_else(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn default_settings() -> Value {
        json!({
            "energy_sources": {
                "es_1": {"param": [{"integrate": false, "power": 40.0}]},
                "es_2": {"param": [{"integrate": true, "power": 10.0}]}
            },
            "energy_storages": {
                "st_1": {"param": [{"integrate": false, "capacity": 120.0}]}
            }
        })
    }

    fn entity(id: SimulationId, name: &str) -> ConfigEntity {
        ConfigEntity {
            id,
            user_id: 1,
            name: name.to_string(),
            settings: default_settings(),
            created_at: None,
        }
    }

    /// In-memory stand-in for the REST client + validation service. Records
    /// the call order so tests can assert the sequential chain.
    #[derive(Default)]
    struct FakeBackend {
        stored: Vec<ConfigEntity>,
        calls: Vec<String>,
        next_id: AtomicI64,
        fail_validation: bool,
    }

    impl FakeBackend {
        fn with_entities(stored: Vec<ConfigEntity>) -> Self {
            let next_id = AtomicI64::new(stored.iter().map(|e| e.id).max().unwrap_or(0) + 1);
            Self {
                stored,
                next_id,
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl SimulationBackend for FakeBackend {
        async fn create(&mut self, name: &str, settings: &Value) -> anyhow::Result<()> {
            self.calls.push("create".to_string());
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.stored.insert(
                0,
                ConfigEntity {
                    id,
                    user_id: 1,
                    name: name.to_string(),
                    settings: settings.clone(),
                    created_at: None,
                },
            );
            Ok(())
        }

        async fn update(&mut self, id: SimulationId, name: &str, settings: &Value) -> anyhow::Result<()> {
            self.calls.push("update".to_string());
            let entity = self
                .stored
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| anyhow::anyhow!("no entity {id}"))?;
            entity.name = name.to_string();
            entity.settings = settings.clone();
            Ok(())
        }

        async fn fetch_recent(&mut self, limit: usize) -> anyhow::Result<Vec<ConfigEntity>> {
            self.calls.push("fetch".to_string());
            Ok(self.stored.iter().take(limit).cloned().collect())
        }

        async fn validate(&mut self, _id: SimulationId) -> anyhow::Result<()> {
            self.calls.push("validate".to_string());
            if self.fail_validation {
                anyhow::bail!("validation rejected the configuration");
            }
            Ok(())
        }
    }

    #[test]
    fn test_empty_list_selects_the_default() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());

        ws.load_all(vec![]).unwrap();
        assert_eq!(ws.selected_id(), DEFAULT_CONFIG_ID);
        assert_eq!(ws.active().unwrap().name, "Default");
    }

    #[test]
    fn test_load_all_selects_the_newest() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());

        ws.load_all(vec![entity(5, "newest"), entity(3, "older")]).unwrap();
        assert_eq!(ws.selected_id(), 5);
        assert_eq!(ws.active().unwrap().name, "newest");
    }

    #[test]
    fn test_set_active_unknown_id_fails() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        assert!(matches!(ws.set_active(42), Err(WorkspaceError::UnknownConfig(42))));
    }

    #[test]
    fn test_apply_edit_touches_only_the_active_copy() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        ws.load_all(vec![entity(1, "mine")]).unwrap();
        assert!(ws.is_valid());

        ws.apply_edit("energy_sources", "es_1", json!({"param": [{"integrate": true, "power": 55.0}]}))
            .unwrap();

        assert!(ws.is_touched());
        let edited = &ws.active().unwrap().settings["energy_sources"]["es_1"]["param"][0];
        assert_eq!(edited["power"], json!(55.0));

        // The stored entity is untouched until a commit round-trips.
        assert_eq!(
            ws.entities[&1].settings["energy_sources"]["es_1"]["param"][0]["power"],
            json!(40.0)
        );
    }

    #[test]
    fn test_edit_of_unknown_unit_fails() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        ws.load_all(vec![]).unwrap();

        let result = ws.apply_edit("energy_sources", "es_99", json!({}));
        assert!(matches!(result, Err(WorkspaceError::UnknownUnit { .. })));
    }

    #[test]
    fn test_integrate_toggle() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        ws.load_all(vec![]).unwrap();

        ws.set_unit_integrated("energy_storages", "st_1", true).unwrap();
        let param = &ws.active().unwrap().settings["energy_storages"]["st_1"]["param"][0];
        assert_eq!(param["integrate"], json!(true));
        // Sibling parameters survive the toggle.
        assert_eq!(param["capacity"], json!(120.0));
        assert!(ws.is_touched());
    }

    #[tokio::test]
    async fn test_commit_of_default_creates_then_validates() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        ws.load_all(vec![]).unwrap();

        ws.apply_edit("energy_sources", "es_1", json!({"param": [{"integrate": true}]}))
            .unwrap();
        assert!(ws.is_touched());

        let mut backend = FakeBackend::with_entities(vec![]);
        ws.commit(Some("first run"), &mut backend).await.unwrap();

        assert_eq!(backend.calls, vec!["create", "fetch", "validate"]);
        assert!(ws.is_valid());
        // The workspace now tracks the persisted entity, not the default.
        assert_ne!(ws.selected_id(), DEFAULT_CONFIG_ID);
        assert_eq!(ws.active().unwrap().name, "first run");
    }

    #[tokio::test]
    async fn test_commit_of_persisted_entity_updates_in_place() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        ws.load_all(vec![entity(4, "existing")]).unwrap();

        ws.apply_edit("energy_sources", "es_2", json!({"param": [{"integrate": false}]}))
            .unwrap();

        let mut backend = FakeBackend::with_entities(vec![entity(4, "existing")]);
        ws.commit(None, &mut backend).await.unwrap();

        assert_eq!(backend.calls, vec!["update", "fetch", "validate"]);
        assert_eq!(ws.selected_id(), 4);
        assert_eq!(
            backend.stored[0].settings["energy_sources"]["es_2"]["param"][0]["integrate"],
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_failed_validation_leaves_workspace_touched() {
        let mut ws = ConfigWorkspace::new();
        ws.load_default(default_settings());
        ws.load_all(vec![entity(2, "broken")]).unwrap();

        ws.apply_edit("energy_sources", "es_1", json!({"param": [{"integrate": true}]}))
            .unwrap();

        let mut backend = FakeBackend::with_entities(vec![entity(2, "broken")]);
        backend.fail_validation = true;

        let result = ws.commit(None, &mut backend).await;
        assert!(matches!(result, Err(WorkspaceError::Backend(_))));
        // Persisted but not validated: the flag must stay down.
        assert!(ws.is_touched());
    }
}
