//! Typed views of a store's document.
//!
//! The document is deserialized into the config type's `Layer` (every field
//! optional), then confique fills `#[config(default)]` values and checks
//! required fields. Keys the type does not know are collected with
//! `serde_ignored`.

use confique::Config;
use serde::Deserialize;
use toml::{Table, Value};
use tracing::debug;

use crate::error::StoreError;
use crate::keypath;
use crate::store::Store;

impl Store {
    /// Deserialize the whole document into `C`.
    ///
    /// Keys `C` does not declare are skipped: a shared file normally carries
    /// sections owned by other consumers.
    pub fn extract<C: Config>(&self) -> Result<C, StoreError>
    where
        C::Layer: for<'de> Deserialize<'de>,
    {
        let (config, ignored) = load_layer::<C>(self.document().clone(), "<document>")?;
        if !ignored.is_empty() {
            debug!(keys = %ignored.join(", "), "keys not used by the config type");
        }
        Ok(config)
    }

    /// Deserialize the section at `key` into `C`, rejecting keys `C` does not
    /// declare.
    pub fn extract_section<C: Config>(&self, key: &str) -> Result<C, StoreError>
    where
        C::Layer: for<'de> Deserialize<'de>,
    {
        let segments = keypath::parse(key)?;
        let section = match keypath::get(self.document(), &segments) {
            Some(Value::Table(t)) => t.clone(),
            Some(other) => {
                return Err(StoreError::InvalidValue {
                    key: key.into(),
                    reason: format!("expected a section, found {}", other.type_str()),
                });
            }
            None => return Err(StoreError::KeyNotFound(key.into())),
        };

        let (config, ignored) = load_layer::<C>(section, key)?;
        if !ignored.is_empty() {
            let prefix = keypath::join(&segments);
            return Err(StoreError::UnknownKeys(
                ignored
                    .into_iter()
                    .map(|k| format!("{prefix}.{k}"))
                    .collect(),
            ));
        }
        Ok(config)
    }
}

fn load_layer<C: Config>(table: Table, key: &str) -> Result<(C, Vec<String>), StoreError>
where
    C::Layer: for<'de> Deserialize<'de>,
{
    let mut ignored = Vec::new();
    let layer: C::Layer = serde_ignored::deserialize(Value::Table(table), |path| {
        ignored.push(path.to_string());
    })
    .map_err(|e: toml::de::Error| StoreError::InvalidValue {
        key: key.into(),
        reason: e.to_string(),
    })?;

    let config = C::builder().preloaded(layer).load()?;
    Ok((config, ignored))
}
