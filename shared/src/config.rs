use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::IdField;
use crate::{DEFAULT_PAGE_SIZE, DEFAULT_REGISTRY_CAPACITY, MAX_PAGE_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pagination config: {0}")]
    Invalid(String),

    #[error("could not parse pagination config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How `current_page` is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    #[default]
    Cursor,
    Offset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub mode: PaginationMode,
    pub id_field: IdField,
    pub registry_capacity: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            mode: PaginationMode::Cursor,
            id_field: IdField::default(),
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
        }
    }
}

impl PaginationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be > 0".into()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be in 1..={}",
                self.max_page_size
            )));
        }
        if self.id_field.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("id_field cannot be empty".into()));
        }
        if self.registry_capacity == 0 {
            return Err(ConfigError::Invalid("registry_capacity must be > 0".into()));
        }
        Ok(())
    }

    /// Parses and validates a JSON config; missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: PaginationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = IdField::new(id_field);
        self
    }

    /// Clamps a requested size into `1..=max_page_size`.
    #[must_use]
    pub fn clamp_page_size(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_page_size.max(1))
    }
}
