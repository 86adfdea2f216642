// Typed view over one adapter

use crate::filter::{Filter, matches_all};
use crate::record::{Record, record_id};
use crate::storage::{Adapter, StorageAdapter, StorageFactory};
use eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use tracing::warn;

/// Records of type `T` stored under `T::collection_name()`
///
/// Adapter failure values become errors here so callers can offer a retry.
pub struct Collection<T: Record> {
    adapter: Adapter,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> Collection<T> {
    pub fn new(factory: &StorageFactory) -> Self {
        Self::from_adapter(factory.create(T::collection_name()))
    }

    pub fn from_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            _marker: PhantomData,
        }
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Untyped contents, exactly as stored
    pub async fn raw(&self) -> Vec<Value> {
        self.adapter.get_all().await
    }

    /// All records that decode as `T`; others are skipped with a warning
    pub async fn all(&self) -> Vec<T> {
        self.decode_all(self.raw().await)
    }

    pub async fn filter(&self, filters: &[Filter]) -> Vec<T> {
        let matching = self
            .raw()
            .await
            .into_iter()
            .map(|mut record| {
                T::normalize(&mut record);
                record
            })
            .filter(|record| matches_all(filters, record))
            .collect();
        self.decode_all(matching)
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        self.all().await.into_iter().find(|record| record.id() == id)
    }

    pub async fn add(&self, record: T) -> Result<T> {
        let value = serde_json::to_value(&record).context("Failed to serialize record")?;
        match self.adapter.add(value).await {
            Some(_) => Ok(record),
            None => Err(eyre!(
                "Failed to add {} to {}, retry",
                record.id(),
                T::collection_name()
            )),
        }
    }

    /// Merge `fields` into the record with `id`; `Ok(None)` if there is no such record
    pub async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Option<T>> {
        match self.adapter.update(id, fields).await {
            Some(merged) => {
                let record = Self::decode(merged)
                    .with_context(|| format!("Updated record {} no longer decodes", id))?;
                Ok(Some(record))
            }
            None => {
                // Adapters report "not found" and "not persisted" the same way
                let exists = self.raw().await.iter().any(|r| record_id(r) == Some(id));
                if exists {
                    Err(eyre!("Failed to update {} in {}, retry", id, T::collection_name()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.adapter.delete(id).await {
            Ok(())
        } else {
            Err(eyre!("Failed to delete {} from {}, retry", id, T::collection_name()))
        }
    }

    /// Replace the whole collection
    pub async fn replace(&self, records: &[T]) -> Result<()> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to serialize records")?;
        self.replace_raw(values).await
    }

    /// Replace the whole collection with records written through uninspected
    pub async fn replace_raw(&self, records: Vec<Value>) -> Result<()> {
        if self.adapter.save(records).await {
            Ok(())
        } else {
            Err(eyre!("Failed to save {}, retry", T::collection_name()))
        }
    }

    pub async fn clear(&self) -> Result<()> {
        if self.adapter.clear().await {
            Ok(())
        } else {
            Err(eyre!("Failed to clear {}, retry", T::collection_name()))
        }
    }

    fn decode(mut value: Value) -> serde_json::Result<T> {
        T::normalize(&mut value);
        serde_json::from_value(value)
    }

    /// Decode raw records, skipping with a warning those that don't fit `T`
    pub(crate) fn decode_all(&self, values: Vec<Value>) -> Vec<T> {
        values
            .into_iter()
            .filter_map(|value| match Self::decode(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(collection = T::collection_name(), error = ?e, "Skipping record that doesn't decode");
                    None
                }
            })
            .collect()
    }
}
