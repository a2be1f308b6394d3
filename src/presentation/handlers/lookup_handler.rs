use crate::application::services::lookup_service::LookupService;
use crate::application::services::schema_service::SchemaService;
use crate::domain::value_objects::FieldCode;
use crate::presentation::dto::lookup::{LookupOptionResponse, LookupSelectionResponse};
use crate::shared::error::AppError;
use std::sync::Arc;

/// UI-facing surface for lookup suggestion and resolution.
pub struct LookupHandler {
    lookup_service: Arc<LookupService>,
    schema_service: Arc<SchemaService>,
}

impl LookupHandler {
    pub fn new(lookup_service: Arc<LookupService>, schema_service: Arc<SchemaService>) -> Self {
        Self {
            lookup_service,
            schema_service,
        }
    }

    fn field(code: &str) -> Result<FieldCode, AppError> {
        FieldCode::new(code.trim().to_string()).map_err(AppError::Validation)
    }

    pub async fn options(
        &self,
        field_code: &str,
        term: &str,
    ) -> Result<Vec<LookupOptionResponse>, AppError> {
        let field = Self::field(field_code)?;
        let options = self.lookup_service.fetch_options(&field, term).await?;
        Ok(options.into_iter().map(Into::into).collect())
    }

    pub async fn select(
        &self,
        field_code: &str,
        value: &str,
        fetch_if_missing: bool,
    ) -> Result<Option<LookupSelectionResponse>, AppError> {
        let field = Self::field(field_code)?;
        let selection = self
            .lookup_service
            .apply_selection(&field, value, fetch_if_missing)
            .await?;
        Ok(selection.map(Into::into))
    }

    pub async fn resolve(&self, field_code: &str, value: &str) -> Result<String, AppError> {
        let field = Self::field(field_code)?;
        self.lookup_service.resolve(&field, value).await
    }

    /// Static choices of a DROP_DOWN field, for datalist rendering.
    pub async fn dropdown_options(&self, field_code: &str) -> Result<Vec<String>, AppError> {
        let field = Self::field(field_code)?;
        self.schema_service.dropdown_options(&field).await
    }
}
