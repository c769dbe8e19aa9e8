use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use collector_application::{InstrumentRegistry, RegistryError};
use collector_domain::Instrument;
use serde::{Deserialize, Serialize};
use shaku::Component;
use tokio::sync::Mutex;
use tracing::info;

const REGISTRY_FILE: &str = "instruments.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    code: String,
    name: String,
    #[serde(default = "default_active")]
    active: bool,
    registered_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Instrument metadata kept in a JSON file under the data directory,
/// loaded once and rewritten on change.
#[derive(Component)]
#[shaku(interface = InstrumentRegistry)]
pub struct FileInstrumentRegistry {
    data_dir: PathBuf,
    entries: Arc<Mutex<Option<BTreeMap<String, RegistryEntry>>>>,
}

impl FileInstrumentRegistry {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            entries: Arc::new(Mutex::new(None)),
        }
    }

    fn registry_path(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILE)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, RegistryEntry>, RegistryError> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = std::fs::read_to_string(&path)?;
        let entries: Vec<RegistryEntry> =
            serde_json::from_str(&raw).map_err(|e| RegistryError::DataError(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| (entry.code.clone(), entry))
            .collect())
    }

    fn write_entries(&self, entries: &BTreeMap<String, RegistryEntry>) -> Result<(), RegistryError> {
        std::fs::create_dir_all(&self.data_dir)?;

        let listed: Vec<&RegistryEntry> = entries.values().collect();
        let raw = serde_json::to_string_pretty(&listed)
            .map_err(|e| RegistryError::DataError(e.to_string()))?;
        std::fs::write(self.registry_path(), raw)?;
        Ok(())
    }

    async fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, RegistryEntry>) -> T,
    ) -> Result<T, RegistryError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_entries()?);
        }
        Ok(f(guard.as_mut().expect("entries just loaded")))
    }
}

#[async_trait]
impl InstrumentRegistry for FileInstrumentRegistry {
    async fn ensure_registered(
        &self,
        code: &str,
        name: Option<&str>,
    ) -> Result<bool, RegistryError> {
        let (newly, snapshot) = self
            .with_entries(|entries| {
                if let Some(entry) = entries.get_mut(code) {
                    // Backfill a display name learned later.
                    if entry.name.is_empty() {
                        if let Some(name) = name {
                            entry.name = name.to_string();
                            return (false, Some(entries.clone()));
                        }
                    }
                    return (false, None);
                }

                entries.insert(
                    code.to_string(),
                    RegistryEntry {
                        code: code.to_string(),
                        name: name.unwrap_or_default().to_string(),
                        active: true,
                        registered_at: Utc::now(),
                    },
                );
                (true, Some(entries.clone()))
            })
            .await?;

        if let Some(entries) = snapshot {
            self.write_entries(&entries)?;
            if newly {
                info!(code, "Registered new instrument");
            }
        }

        Ok(newly)
    }

    async fn active_instruments(&self) -> Result<Vec<Instrument>, RegistryError> {
        self.with_entries(|entries| {
            entries
                .values()
                .filter(|entry| entry.active)
                .map(|entry| Instrument::new(entry.code.clone(), entry.name.clone()))
                .collect()
        })
        .await
    }
}
