use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

pub const CONFIG_FILE: &str = "config.json";
pub const TASKS_FILE: &str = "tasks.json";
pub const DEFAULT_PORT: u16 = 5001;

/// Prototype and port settings shared with the tracking page.
///
/// Older files store missing values as the string `"null"` and the port as a
/// string; both forms are accepted on load and written back as JSON values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default, deserialize_with = "optional_text")]
    pub url_path: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub img_path: Option<String>,
    #[serde(default, deserialize_with = "optional_port")]
    pub port: Option<u16>,
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| {
        let trimmed = v.trim();
        !trimmed.is_empty() && trimmed != "null"
    }))
}

fn optional_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("port {number} is out of range"))),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() || text == "null" {
                Ok(None)
            } else {
                text.parse::<u16>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("port '{text}' is not a number")))
            }
        }
        Some(other) => Err(D::Error::custom(format!("unexpected port value {other}"))),
    }
}

impl AppConfig {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Rules enforced before a config is written: exactly one prototype
    /// source, and URLs must be absolute http(s).
    pub fn validate(&self) -> Result<()> {
        match (&self.url_path, &self.img_path) {
            (Some(_), Some(_)) => bail!("Only URL or Image can have a value, not both."),
            (None, None) => bail!("You must specify at least URL or Image."),
            (Some(url), None) => validate_url(url),
            (None, Some(_)) => Ok(()),
        }
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL '{url}'"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid URL. Must start with http:// or https://");
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        bail!("Invalid URL. Missing host in '{url}'");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Bool,
    Numeric,
    Text,
}

impl TaskType {
    pub fn description(&self) -> &'static str {
        match self {
            TaskType::Bool => "True/False task",
            TaskType::Numeric => "Number input task",
            TaskType::Text => "Text input task",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    pub task: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

/// Contents of `tasks.json`: the questions shown to a subject during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TasksFile {
    #[serde(default)]
    pub task_types: BTreeMap<String, String>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

impl Default for TasksFile {
    fn default() -> Self {
        let task_types = [TaskType::Bool, TaskType::Numeric, TaskType::Text]
            .into_iter()
            .map(|kind| {
                let key = serde_json::to_value(kind)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default();
                (key, kind.description().to_string())
            })
            .collect();

        Self {
            task_types,
            tasks: Vec::new(),
        }
    }
}

impl TasksFile {
    pub fn add_task(&mut self, task: String, task_type: TaskType) -> Result<()> {
        let task = task.trim().to_string();
        if task.is_empty() {
            bail!("Task text must not be empty");
        }
        self.tasks.push(TaskDefinition { task, task_type });
        Ok(())
    }
}

/// File-backed store for `config.json` and `tasks.json` in one directory.
pub struct SettingsStore {
    dir: PathBuf,
    config: RwLock<Option<AppConfig>>,
    tasks: RwLock<Option<TasksFile>>,
}

impl SettingsStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        let config = load_json::<AppConfig>(&dir.join(CONFIG_FILE))?;
        let tasks = load_json::<TasksFile>(&dir.join(TASKS_FILE))?;

        Ok(Self {
            dir,
            config: RwLock::new(config),
            tasks: RwLock::new(tasks),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Effective config, falling back to defaults when nothing is stored.
    pub fn config(&self) -> AppConfig {
        self.stored_config().unwrap_or_default()
    }

    /// `None` when no `config.json` exists yet.
    pub fn stored_config(&self) -> Option<AppConfig> {
        read_guard(&self.config).clone()
    }

    /// `None` when no `tasks.json` exists yet.
    pub fn tasks(&self) -> Option<TasksFile> {
        read_guard(&self.tasks).clone()
    }

    pub fn update_config(&self, config: AppConfig) -> Result<()> {
        config.validate()?;
        let mut guard = write_guard(&self.config);
        self.persist(CONFIG_FILE, &config)?;
        *guard = Some(config);
        Ok(())
    }

    pub fn update_tasks(&self, tasks: TasksFile) -> Result<()> {
        let mut guard = write_guard(&self.tasks);
        self.persist(TASKS_FILE, &tasks)?;
        *guard = Some(tasks);
        Ok(())
    }

    fn persist<T: Serialize>(&self, file_name: &str, data: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create config directory {}", self.dir.display()))?;
        let path = self.dir.join(file_name);
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    match serde_json::from_str(&contents) {
        Ok(data) => Ok(Some(data)),
        Err(err) => {
            warn!("Ignoring unreadable {}: {err}", path.display());
            Ok(None)
        }
    }
}

fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
