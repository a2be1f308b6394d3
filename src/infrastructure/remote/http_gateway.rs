use crate::application::ports::record_gateway::{NativeRecord, RecordGateway, RecordIds};
use crate::domain::entities::{
    CompletionEntry, FormSchema, LookupEntry, LookupFieldConfig, OpenWorkItem, StartEntry,
};
use crate::domain::value_objects::{FieldCode, RecordId};
use crate::infrastructure::remote::payload;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Error code the remote service answers with when the supplied token lacks
/// update permission.
const PERMISSION_DENIED_CODE: &str = "GAIA_NO01";
/// Error code for tokens that cannot read the form definition at all.
const FORM_API_UNAVAILABLE_CODE: &str = "CB_IL02";

const UPDATE_PERMISSION_HINT: &str =
    "configure an update-capable API token for the log collection";

const OPEN_WORK_FIELDS: [&str; 6] = ["plan_id", "start_at", "operator", "equipment", "end_at", "$id"];

pub struct HttpRecordGateway {
    client: reqwest::Client,
    base_url: String,
    log_app: String,
    token: String,
    update_token: Option<String>,
    lookup_token: Option<String>,
    open_work_page_size: u32,
    suggest_page_size: u32,
}

impl HttpRecordGateway {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.remote.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.remote.base_url.trim_end_matches('/').to_string(),
            log_app: config.remote.log_app.clone(),
            token: config.remote.token.clone(),
            update_token: config.remote.update_token.clone(),
            lookup_token: config.remote.lookup_token.clone(),
            open_work_page_size: config.sync.open_work_page_size,
            suggest_page_size: config.lookup.suggest_page_size,
        })
    }

    fn records_url(&self) -> String {
        format!("{}/k/v1/records.json", self.base_url)
    }

    fn record_url(&self) -> String {
        format!("{}/k/v1/record.json", self.base_url)
    }

    fn form_url(&self) -> String {
        format!("{}/k/v1/app/form/fields.json", self.base_url)
    }

    /// Tokens are comma-joined; the lookup token rides along so related apps
    /// stay readable in the same call.
    fn api_tokens(&self, primary: Option<&str>) -> String {
        let mut tokens = vec![primary.unwrap_or(&self.token)];
        if let Some(lookup) = self.lookup_token.as_deref() {
            tokens.push(lookup);
        }
        tokens.retain(|t| !t.is_empty());
        tokens.join(",")
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, AppError> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(classify_error(status, &text));
        }
        serde_json::from_str(&text)
            .map_err(|err| AppError::Deserialization(format!("invalid response body: {err}")))
    }

    async fn fetch_records(
        &self,
        app: &str,
        query: &str,
        fields: &[&str],
        extra: &[(&str, String)],
    ) -> Result<Vec<Value>, AppError> {
        let mut params: Vec<(String, String)> = vec![
            ("app".to_string(), app.to_string()),
            ("query".to_string(), query.to_string()),
        ];
        for (idx, field) in fields.iter().enumerate() {
            params.push((format!("fields[{idx}]"), field.to_string()));
        }
        for (key, value) in extra {
            params.push((key.to_string(), value.clone()));
        }

        let response = self
            .client
            .get(self.records_url())
            .header("X-Cybozu-API-Token", self.api_tokens(None))
            .query(&params)
            .send()
            .await?;
        let body = self.read_json(response).await?;

        Ok(body
            .get("records")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RecordGateway for HttpRecordGateway {
    async fn create_records(&self, entries: &[StartEntry]) -> Result<RecordIds, AppError> {
        let records: Vec<NativeRecord> = entries.iter().map(payload::native_from_start).collect();
        self.create_native(None, &records).await
    }

    async fn create_native(
        &self,
        app: Option<&str>,
        records: &[NativeRecord],
    ) -> Result<RecordIds, AppError> {
        if records.is_empty() {
            return Ok(RecordIds::default());
        }
        let app = app.unwrap_or(&self.log_app);

        let (url, body) = if records.len() == 1 {
            (self.record_url(), json!({"app": app, "record": records[0]}))
        } else {
            (self.records_url(), json!({"app": app, "records": records}))
        };

        debug!("Creating {} record(s) in app {}", records.len(), app);
        let response = self
            .client
            .post(url)
            .header("X-Cybozu-API-Token", self.api_tokens(None))
            .json(&body)
            .send()
            .await?;
        let value = self.read_json(response).await?;
        payload::to_record_ids(&value)
    }

    async fn update_records(&self, entries: &[CompletionEntry]) -> Result<RecordIds, AppError> {
        if entries.is_empty() {
            return Ok(RecordIds::default());
        }

        let updates: Vec<Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.start_record_id.as_str(),
                    "record": payload::update_patch_from_completion(entry),
                })
            })
            .collect();
        let body = json!({"app": self.log_app, "records": updates});

        debug!("Updating {} record(s) in app {}", entries.len(), self.log_app);
        let response = self
            .client
            .put(self.records_url())
            .header(
                "X-Cybozu-API-Token",
                self.api_tokens(self.update_token.as_deref()),
            )
            .json(&body)
            .send()
            .await?;
        let value = self.read_json(response).await?;

        let mut result = RecordIds::default();
        for record in value
            .get("records")
            .and_then(Value::as_array)
            .unwrap_or(&Vec::new())
        {
            if let (Some(id), Some(revision)) = (
                record.get("id").and_then(Value::as_str),
                record.get("revision").and_then(Value::as_str),
            ) {
                result.ids.push(id.to_string());
                result.revisions.push(revision.to_string());
            }
        }
        Ok(result)
    }

    async fn list_open_work(&self) -> Result<Vec<OpenWorkItem>, AppError> {
        let records = self
            .fetch_records(
                &self.log_app,
                r#"end_at = "" order by start_at asc"#,
                &OPEN_WORK_FIELDS,
                &[("size", self.open_work_page_size.to_string())],
            )
            .await?;

        let mut items = Vec::with_capacity(records.len());
        for record in &records {
            match open_work_from_record(record) {
                Some(item) => items.push(item),
                None => warn!("Skipping open work row without a record id"),
            }
        }
        Ok(items)
    }

    async fn lookup_record(
        &self,
        config: &LookupFieldConfig,
        value: &str,
    ) -> Result<Option<LookupEntry>, AppError> {
        let query = format!(
            r#"{} = "{}" limit 1"#,
            config.related_key_field.as_str(),
            escape_query_value(value)
        );
        let fields: Vec<&str> = config.field_set.iter().map(FieldCode::as_str).collect();
        let records = self
            .fetch_records(&config.related_app, &query, &fields, &[])
            .await?;

        Ok(records
            .first()
            .and_then(|record| payload::lookup_entry_from_record(config, record)))
    }

    async fn search_lookup(
        &self,
        config: &LookupFieldConfig,
        term: &str,
    ) -> Result<Vec<LookupEntry>, AppError> {
        let query = search_query(config, term, self.suggest_page_size);
        let fields: Vec<&str> = config.field_set.iter().map(FieldCode::as_str).collect();
        let records = self
            .fetch_records(&config.related_app, &query, &fields, &[])
            .await?;

        Ok(records
            .iter()
            .filter_map(|record| payload::lookup_entry_from_record(config, record))
            .collect())
    }

    async fn fetch_schema(&self) -> Result<FormSchema, AppError> {
        let response = self
            .client
            .get(self.form_url())
            .header("X-Cybozu-API-Token", self.api_tokens(None))
            .query(&[("app", self.log_app.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            let err = classify_error(status, &text);
            if let AppError::Remote { code: Some(code), .. } = &err {
                if status == 400 && code == FORM_API_UNAVAILABLE_CODE {
                    return Ok(FormSchema::empty_with_warning(
                        "form API unavailable for provided token",
                    ));
                }
            }
            return Err(err);
        }

        serde_json::from_str(&text)
            .map_err(|err| AppError::Deserialization(format!("unexpected form definition: {err}")))
    }
}

fn open_work_from_record(record: &Value) -> Option<OpenWorkItem> {
    let field = |code: &str| -> String {
        record
            .get(code)
            .and_then(|f| f.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let record_id = RecordId::new(field("$id")).ok()?;
    let start_at = DateTime::parse_from_rfc3339(&field("start_at"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc));

    Some(OpenWorkItem::new(
        record_id,
        field("plan_id"),
        start_at,
        field("operator"),
        field("equipment"),
    ))
}

/// Escape a value for embedding in a remote query literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn search_query(config: &LookupFieldConfig, term: &str, limit: u32) -> String {
    let key = config.related_key_field.as_str();
    if term.is_empty() {
        return format!("order by {key} asc limit {limit}");
    }

    let escaped = escape_query_value(term);
    let mut fields: Vec<&str> = vec![key];
    for picker in &config.picker_fields {
        if !fields.contains(&picker.as_str()) {
            fields.push(picker.as_str());
        }
    }
    let clauses: Vec<String> = fields
        .iter()
        .map(|field| format!(r#"{field} like "{escaped}""#))
        .collect();
    format!("{} order by {key} asc limit {limit}", clauses.join(" or "))
}

fn classify_error(status: u16, body: &str) -> AppError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let detail = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    let hint = match (status, code.as_deref()) {
        (403, Some(PERMISSION_DENIED_CODE)) => Some(UPDATE_PERMISSION_HINT.to_string()),
        _ => None,
    };

    AppError::Remote {
        status,
        code,
        detail,
        hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LookupFieldConfig {
        LookupFieldConfig {
            field_code: FieldCode::new("plan_id".into()).unwrap(),
            related_app: "12".into(),
            related_key_field: FieldCode::new("plan_no".into()).unwrap(),
            picker_fields: vec![
                FieldCode::new("plan_no".into()).unwrap(),
                FieldCode::new("name".into()).unwrap(),
            ],
            field_mappings: vec![],
            field_set: vec![
                FieldCode::new("plan_no".into()).unwrap(),
                FieldCode::new("name".into()).unwrap(),
                FieldCode::new("$id".into()).unwrap(),
            ],
        }
    }

    #[test]
    fn search_query_deduplicates_clause_fields() {
        let query = search_query(&config(), "wid", 30);
        assert_eq!(
            query,
            r#"plan_no like "wid" or name like "wid" order by plan_no asc limit 30"#
        );
    }

    #[test]
    fn empty_term_lists_an_unfiltered_page() {
        let query = search_query(&config(), "", 30);
        assert_eq!(query, "order by plan_no asc limit 30");
    }

    #[test]
    fn query_values_are_escaped() {
        assert_eq!(escape_query_value(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn permission_error_carries_a_hint() {
        let err = classify_error(403, r#"{"code":"GAIA_NO01","message":"denied"}"#);
        match err {
            AppError::Remote { status, code, hint, .. } => {
                assert_eq!(status, 403);
                assert_eq!(code.as_deref(), Some("GAIA_NO01"));
                assert!(hint.is_some());
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_bodies_become_the_detail() {
        let err = classify_error(502, "bad gateway");
        match err {
            AppError::Remote { detail, code, .. } => {
                assert_eq!(detail, "bad gateway");
                assert!(code.is_none());
            }
            other => panic!("expected remote error, got {other:?}"),
        }
        assert!(classify_error(502, "bad gateway").is_retriable());
    }

    #[test]
    fn open_work_rows_require_an_id() {
        let record = serde_json::json!({
            "$id": {"value": "101"},
            "plan_id": {"value": "P1"},
            "start_at": {"value": "2024-01-01T00:00:00Z"},
            "operator": {"value": "A"},
            "equipment": {"value": "E1"}
        });
        let item = open_work_from_record(&record).unwrap();
        assert_eq!(item.record_id.as_str(), "101");
        assert!(item.start_at.is_some());
        assert!(!item.pending_completion);

        let missing = serde_json::json!({"plan_id": {"value": "P1"}});
        assert!(open_work_from_record(&missing).is_none());
    }
}
