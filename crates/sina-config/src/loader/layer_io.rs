//! Reading single layers from disk.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer,
    SYSTEM_CONFIG_PATH, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Read a JSON5 file into a raw value.
pub(super) fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::read(path, err))?;
    json5::from_str(&contents).map_err(|err| ConfigError::parse(path, err))
}

/// Discovered layers are skipped when their file does not exist.
pub(super) fn read_discovered_layer(
    source: ConfigLayerSource,
    path: Option<&Path>,
) -> Result<Option<LoadedLayer>, ConfigError> {
    let Some(path) = path else {
        return Ok(None);
    };
    match read_layer(source, path) {
        Err(ConfigError::ReadFailed { source: err, .. }) if err.kind() == ErrorKind::NotFound => {
            debug!("no {} layer at {}", source.label(), path.display());
            Ok(None)
        }
        other => other.map(Some),
    }
}

/// Read and schema-check one layer.
pub(super) fn read_layer(
    source: ConfigLayerSource,
    path: &Path,
) -> Result<LoadedLayer, ConfigError> {
    debug!("reading {} layer (path={})", source.label(), path.display());
    let value = read_document(path)?;
    let label = format!("{}({})", source.label(), path.display());
    schema::validate_layer_schema(&value, &label)?;
    Ok(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: path.to_path_buf(),
        },
        value,
    })
}

pub(super) fn default_system_config_path() -> Option<PathBuf> {
    Some(PathBuf::from(SYSTEM_CONFIG_PATH))
}

/// `~/.sina/sina.json5`, if a home directory can be resolved.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    let dirs = UserDirs::new()?;
    Some(
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE),
    )
}
