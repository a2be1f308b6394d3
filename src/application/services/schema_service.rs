use crate::application::ports::RecordGateway;
use crate::domain::entities::{FormSchema, LookupFieldConfig};
use crate::domain::value_objects::FieldCode;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Caches the remote form schema for a fixed TTL and degrades gracefully:
/// live endpoint, then the statically configured document, then an empty but
/// valid schema.
pub struct SchemaService {
    gateway: Arc<dyn RecordGateway>,
    ttl: Duration,
    static_schema: Option<String>,
    cached: RwLock<Option<(Arc<FormSchema>, Instant)>>,
}

impl SchemaService {
    pub fn new(gateway: Arc<dyn RecordGateway>, config: &AppConfig) -> Self {
        Self {
            gateway,
            ttl: Duration::from_secs(config.sync.schema_ttl_secs),
            static_schema: config.remote.static_schema.clone(),
            cached: RwLock::new(None),
        }
    }

    pub async fn form_schema(&self, force_refresh: bool) -> Result<Arc<FormSchema>, AppError> {
        if !force_refresh {
            let cached = self.cached.read().await;
            if let Some((schema, fetched_at)) = cached.as_ref() {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(schema));
                }
            }
        }

        let schema = match self.gateway.fetch_schema().await {
            Ok(schema) => Arc::new(schema),
            Err(err) => {
                warn!("Live form schema unavailable: {err}");
                Arc::new(self.fallback_schema())
            }
        };

        *self.cached.write().await = Some((Arc::clone(&schema), Instant::now()));
        Ok(schema)
    }

    pub async fn lookup_config(
        &self,
        field: &FieldCode,
    ) -> Result<Option<LookupFieldConfig>, AppError> {
        let schema = self.form_schema(false).await?;
        Ok(schema.lookup_config_for(field))
    }

    pub async fn dropdown_options(&self, field: &FieldCode) -> Result<Vec<String>, AppError> {
        let schema = self.form_schema(false).await?;
        Ok(schema.dropdown_options(field))
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    fn fallback_schema(&self) -> FormSchema {
        if let Some(raw) = self.static_schema.as_deref() {
            match serde_json::from_str::<FormSchema>(raw) {
                Ok(mut schema) => {
                    if schema.warning.is_none() {
                        schema.warning = Some(crate::domain::entities::SchemaWarning {
                            message: "returned static form schema".to_string(),
                        });
                    }
                    return schema;
                }
                Err(err) => warn!("Static form schema unparseable: {err}"),
            }
        }
        FormSchema::empty_with_warning("form schema unavailable")
    }
}
