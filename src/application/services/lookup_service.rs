use crate::application::ports::{LookupStore, RecordGateway};
use crate::application::services::schema_service::SchemaService;
use crate::domain::entities::{LookupEntry, LookupFieldConfig};
use crate::domain::value_objects::FieldCode;
use crate::shared::config::{LookupConfig, LookupPolicy};
use crate::shared::error::AppError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// One suggestion row for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOption {
    pub key: String,
    pub label: String,
}

/// Result of applying a user-entered value to a lookup field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSelection {
    pub key: String,
    pub label: String,
    /// Sibling fields filled from the related record on selection.
    pub defaults: Vec<(FieldCode, String)>,
}

struct FieldState {
    config: Option<LookupFieldConfig>,
    /// Oldest-inserted entry at the front; eviction pops from here
    /// irrespective of access recency.
    entries: VecDeque<LookupEntry>,
    /// Lazily built lowercase label -> key index, dropped on every cache
    /// mutation.
    label_index: Option<HashMap<String, String>>,
    selection_token: u64,
    suggest_token: u64,
}

impl FieldState {
    fn find(&self, key: &str) -> Option<&LookupEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }
}

/// Translates user-entered values into canonical keys and back into display
/// labels, backed by a bounded, persistent per-field cache.
pub struct LookupService {
    gateway: Arc<dyn RecordGateway>,
    store: Arc<dyn LookupStore>,
    schema: Arc<SchemaService>,
    config: LookupConfig,
    states: Mutex<HashMap<FieldCode, FieldState>>,
}

impl LookupService {
    pub fn new(
        gateway: Arc<dyn RecordGateway>,
        store: Arc<dyn LookupStore>,
        schema: Arc<SchemaService>,
        config: LookupConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            schema,
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    async fn ensure_field(&self, field: &FieldCode) -> Result<(), AppError> {
        let known = {
            let states = self.states.lock().await;
            states.get(field).map(|state| state.config.is_some())
        };
        if known == Some(true) {
            return Ok(());
        }

        // The schema may have become available since the field was first
        // seen; keep re-deriving until a config shows up.
        let config = self.schema.lookup_config(field).await?;
        let loaded = if known.is_none() {
            Some(self.store.load(field).await?)
        } else {
            None
        };

        let mut states = self.states.lock().await;
        let state = states.entry(field.clone()).or_insert_with(|| FieldState {
            config: None,
            entries: loaded.unwrap_or_default().into(),
            label_index: None,
            selection_token: 0,
            suggest_token: 0,
        });
        if state.config.is_none() && config.is_some() {
            state.config = config;
            state.label_index = None;
        }
        Ok(())
    }

    fn state_error() -> AppError {
        AppError::Internal("lookup field state missing".to_string())
    }

    /// Resolve a raw value to its canonical key: exact match, then the label
    /// index, then the first segment of a composite "key / label" string.
    /// An unresolved value comes back unchanged.
    pub async fn resolve(&self, field: &FieldCode, raw: &str) -> Result<String, AppError> {
        self.ensure_field(field).await?;
        let mut states = self.states.lock().await;
        let state = states.get_mut(field).ok_or_else(Self::state_error)?;
        Ok(resolve_in_state(state, raw).0)
    }

    /// Resolution applied at submission time, honoring the configured policy
    /// for values that stay unresolved.
    pub async fn resolve_for_submission(
        &self,
        field: &FieldCode,
        raw: &str,
    ) -> Result<String, AppError> {
        self.ensure_field(field).await?;
        let mut states = self.states.lock().await;
        let state = states.get_mut(field).ok_or_else(Self::state_error)?;
        let (key, matched) = resolve_in_state(state, raw);
        if matched.is_none()
            && state.config.is_some()
            && self.config.policy == LookupPolicy::Reject
        {
            return Err(AppError::Validation(format!(
                "Value \"{raw}\" does not resolve for field {field}"
            )));
        }
        Ok(key)
    }

    /// Apply a user selection, fetching missing entries when allowed. Each
    /// call invalidates earlier ones for the same field: a slow lookup that
    /// finishes after a newer edit returns `None` instead of stale data.
    pub async fn apply_selection(
        &self,
        field: &FieldCode,
        raw: &str,
        fetch_if_missing: bool,
    ) -> Result<Option<LookupSelection>, AppError> {
        self.ensure_field(field).await?;
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (token, config, mut key, mut matched) = {
            let mut states = self.states.lock().await;
            let state = states.get_mut(field).ok_or_else(Self::state_error)?;
            state.selection_token += 1;
            let (key, matched) = resolve_in_state(state, &trimmed);
            (state.selection_token, state.config.clone(), key, matched)
        };

        let Some(config) = config else {
            return Ok(Some(LookupSelection {
                key: trimmed.clone(),
                label: trimmed,
                defaults: Vec::new(),
            }));
        };

        if matched.is_none() && fetch_if_missing {
            match self.gateway.search_lookup(&config, &trimmed).await {
                Ok(found) => self.merge_entries(field, found).await?,
                Err(err) => debug!("Lookup search failed for {field}: {err}"),
            }
            let mut states = self.states.lock().await;
            let state = states.get_mut(field).ok_or_else(Self::state_error)?;
            if state.selection_token != token {
                return Ok(None);
            }
            (key, matched) = resolve_in_state(state, &trimmed);
        }

        if matched.is_none() && fetch_if_missing {
            // Last resort: exact fetch on the canonical-key guess.
            match self.gateway.lookup_record(&config, &key).await {
                Ok(Some(entry)) => {
                    self.merge_entries(field, vec![entry.clone()]).await?;
                    let mut states = self.states.lock().await;
                    let state = states.get_mut(field).ok_or_else(Self::state_error)?;
                    if state.selection_token != token {
                        return Ok(None);
                    }
                    key = entry.key.clone();
                    matched = Some(entry);
                }
                Ok(None) => {}
                Err(err) => debug!("Lookup fetch failed for {field}: {err}"),
            }
        }

        let label = matched
            .as_ref()
            .map(|entry| config.display_label(entry))
            .unwrap_or_else(|| key.clone());
        let defaults = matched
            .as_ref()
            .map(|entry| selection_defaults(&config, entry))
            .unwrap_or_default();

        Ok(Some(LookupSelection { key, label, defaults }))
    }

    /// Debounced candidate search. Calls arriving within the debounce window
    /// supersede earlier ones, which then return no options.
    pub async fn fetch_options(
        &self,
        field: &FieldCode,
        term: &str,
    ) -> Result<Vec<LookupOption>, AppError> {
        self.ensure_field(field).await?;

        let (token, config) = {
            let mut states = self.states.lock().await;
            let state = states.get_mut(field).ok_or_else(Self::state_error)?;
            state.suggest_token += 1;
            (state.suggest_token, state.config.clone())
        };
        let Some(config) = config else {
            return Ok(Vec::new());
        };

        tokio::time::sleep(Duration::from_millis(self.config.debounce_ms)).await;
        {
            let states = self.states.lock().await;
            let state = states.get(field).ok_or_else(Self::state_error)?;
            if state.suggest_token != token {
                return Ok(Vec::new());
            }
        }

        let term = term.trim();
        let found = self.gateway.search_lookup(&config, term).await?;
        self.merge_entries(field, found.clone()).await?;

        let sample: Vec<LookupEntry> = if found.is_empty() && term.is_empty() {
            let states = self.states.lock().await;
            let state = states.get(field).ok_or_else(Self::state_error)?;
            state
                .entries
                .iter()
                .take(self.config.suggest_page_size as usize)
                .cloned()
                .collect()
        } else {
            found
        };

        Ok(sample
            .iter()
            .map(|entry| LookupOption {
                key: entry.key.clone(),
                label: config.display_label(entry),
            })
            .collect())
    }

    /// Merge fetched entries into the field cache, evict past the size bound
    /// and flush the new snapshot to durable storage.
    async fn merge_entries(
        &self,
        field: &FieldCode,
        new_entries: Vec<LookupEntry>,
    ) -> Result<(), AppError> {
        if new_entries.is_empty() {
            return Ok(());
        }

        let snapshot: Vec<LookupEntry> = {
            let mut states = self.states.lock().await;
            let state = states.get_mut(field).ok_or_else(Self::state_error)?;
            for entry in new_entries {
                if let Some(existing) = state
                    .entries
                    .iter_mut()
                    .find(|candidate| candidate.key == entry.key)
                {
                    *existing = entry;
                } else {
                    state.entries.push_back(entry);
                }
            }
            while state.entries.len() > self.config.cache_limit {
                state.entries.pop_front();
            }
            state.label_index = None;
            state.entries.iter().cloned().collect()
        };

        self.store.save(field, &snapshot).await
    }
}

fn resolve_in_state(state: &mut FieldState, raw: &str) -> (String, Option<LookupEntry>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (String::new(), None);
    }

    if let Some(entry) = state.find(trimmed) {
        return (trimmed.to_string(), Some(entry.clone()));
    }

    if state.label_index.is_none() {
        state.label_index = Some(build_label_index(state));
    }
    if let Some(index) = state.label_index.as_ref() {
        if let Some(key) = index.get(&trimmed.to_lowercase()) {
            let matched = state.find(key).cloned();
            return (key.clone(), matched);
        }
    }

    if trimmed.contains('/') {
        let first = trimmed.split('/').next().unwrap_or("").trim();
        if !first.is_empty() {
            if let Some(entry) = state.find(first) {
                return (first.to_string(), Some(entry.clone()));
            }
        }
    }

    (trimmed.to_string(), None)
}

fn build_label_index(state: &FieldState) -> HashMap<String, String> {
    let mut index = HashMap::new();
    let Some(config) = state.config.as_ref() else {
        return index;
    };
    for entry in &state.entries {
        index.insert(entry.key.to_lowercase(), entry.key.clone());
        let label = config.display_label(entry);
        if label != entry.key {
            index.insert(label.to_lowercase(), entry.key.clone());
            index.insert(
                format!("{} / {}", entry.key, label).to_lowercase(),
                entry.key.clone(),
            );
        }
    }
    index
}

fn selection_defaults(
    config: &LookupFieldConfig,
    entry: &LookupEntry,
) -> Vec<(FieldCode, String)> {
    config
        .field_mappings
        .iter()
        .filter(|mapping| mapping.field != config.field_code)
        .filter_map(|mapping| {
            entry
                .values
                .get(mapping.related_field.as_str())
                .filter(|value| !value.is_empty())
                .map(|value| (mapping.field.clone(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::record_gateway::{NativeRecord, RecordIds};
    use crate::domain::entities::{
        CompletionEntry, FormSchema, OpenWorkItem, StartEntry,
    };
    use crate::infrastructure::database::SqliteLookupStore;
    use crate::shared::config::AppConfig;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    struct LookupMock {
        schema: FormSchema,
        search_results: StdMutex<Vec<LookupEntry>>,
        record_result: StdMutex<Option<LookupEntry>>,
        search_delay: Duration,
        search_calls: AtomicU32,
    }

    impl LookupMock {
        fn new() -> Self {
            let schema: FormSchema = serde_json::from_str(
                r#"{"properties": {"plan_lookup": {"type": "LOOKUP", "lookup": {
                    "relatedApp": {"app": "12"},
                    "relatedKeyField": "plan_no",
                    "lookupPickerFields": ["name"],
                    "fieldMappings": [
                        {"field": "plan_id", "relatedField": "plan_no"},
                        {"field": "product_name", "relatedField": "name"}
                    ]
                }}}}"#,
            )
            .unwrap();
            Self {
                schema,
                search_results: StdMutex::new(Vec::new()),
                record_result: StdMutex::new(None),
                search_delay: Duration::ZERO,
                search_calls: AtomicU32::new(0),
            }
        }

        fn with_search_results(self, entries: Vec<LookupEntry>) -> Self {
            *self.search_results.lock().unwrap() = entries;
            self
        }

        fn with_search_delay(mut self, delay: Duration) -> Self {
            self.search_delay = delay;
            self
        }

        fn search_call_count(&self) -> u32 {
            self.search_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordGateway for LookupMock {
        async fn create_records(&self, _: &[StartEntry]) -> Result<RecordIds, AppError> {
            unimplemented!()
        }
        async fn create_native(
            &self,
            _: Option<&str>,
            _: &[NativeRecord],
        ) -> Result<RecordIds, AppError> {
            unimplemented!()
        }
        async fn update_records(&self, _: &[CompletionEntry]) -> Result<RecordIds, AppError> {
            unimplemented!()
        }
        async fn list_open_work(&self) -> Result<Vec<OpenWorkItem>, AppError> {
            unimplemented!()
        }
        async fn lookup_record(
            &self,
            _: &LookupFieldConfig,
            _: &str,
        ) -> Result<Option<LookupEntry>, AppError> {
            Ok(self.record_result.lock().unwrap().clone())
        }
        async fn search_lookup(
            &self,
            _: &LookupFieldConfig,
            _: &str,
        ) -> Result<Vec<LookupEntry>, AppError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if self.search_delay > Duration::ZERO {
                tokio::time::sleep(self.search_delay).await;
            }
            Ok(self.search_results.lock().unwrap().clone())
        }
        async fn fetch_schema(&self) -> Result<FormSchema, AppError> {
            Ok(self.schema.clone())
        }
    }

    fn entry(key: &str, name: &str) -> LookupEntry {
        LookupEntry::new(
            key.into(),
            BTreeMap::from([
                ("plan_no".to_string(), key.to_string()),
                ("name".to_string(), name.to_string()),
            ]),
        )
    }

    fn plan_field() -> FieldCode {
        FieldCode::new("plan_id".into()).unwrap()
    }

    async fn setup(
        mock: LookupMock,
        seed: &[LookupEntry],
        policy: LookupPolicy,
    ) -> (Arc<LookupService>, Arc<SqliteLookupStore>, Arc<LookupMock>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();

        let store = Arc::new(SqliteLookupStore::new(pool));
        if !seed.is_empty() {
            use crate::application::ports::LookupStore;
            store.save(&plan_field(), seed).await.unwrap();
        }

        let gateway = Arc::new(mock);
        let schema = Arc::new(SchemaService::new(gateway.clone(), &AppConfig::default()));
        let mut config = AppConfig::default().lookup;
        config.debounce_ms = 10;
        config.policy = policy;

        let service = Arc::new(LookupService::new(
            gateway.clone(),
            store.clone(),
            schema,
            config,
        ));
        (service, store, gateway)
    }

    #[tokio::test]
    async fn test_composite_label_resolves_to_canonical_key() {
        let (service, _, _) = setup(
            LookupMock::new(),
            &[entry("P1", "Widget")],
            LookupPolicy::Passthrough,
        )
        .await;

        let resolved = service.resolve(&plan_field(), "P1 / Widget").await.unwrap();
        assert_eq!(resolved, "P1");

        let exact = service.resolve(&plan_field(), "P1").await.unwrap();
        assert_eq!(exact, "P1");

        let case_insensitive = service.resolve(&plan_field(), "p1 / widget").await.unwrap();
        assert_eq!(case_insensitive, "P1");
    }

    #[tokio::test]
    async fn test_unresolved_value_passes_through() {
        let (service, _, _) = setup(
            LookupMock::new(),
            &[entry("P1", "Widget")],
            LookupPolicy::Passthrough,
        )
        .await;

        let resolved = service.resolve(&plan_field(), "ZZZ").await.unwrap();
        assert_eq!(resolved, "ZZZ");

        let submitted = service
            .resolve_for_submission(&plan_field(), "ZZZ")
            .await
            .unwrap();
        assert_eq!(submitted, "ZZZ");
    }

    #[tokio::test]
    async fn test_reject_policy_blocks_unresolved_submission() {
        let (service, _, _) = setup(
            LookupMock::new(),
            &[entry("P1", "Widget")],
            LookupPolicy::Reject,
        )
        .await;

        let err = service
            .resolve_for_submission(&plan_field(), "ZZZ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let ok = service
            .resolve_for_submission(&plan_field(), "P1")
            .await
            .unwrap();
        assert_eq!(ok, "P1");
    }

    #[tokio::test]
    async fn test_eviction_drops_the_oldest_inserted_entry() {
        let over_limit: Vec<LookupEntry> = (0..201)
            .map(|i| entry(&format!("K{i:03}"), &format!("Item {i}")))
            .collect();
        let (service, store, _) = setup(
            LookupMock::new().with_search_results(over_limit),
            &[],
            LookupPolicy::Passthrough,
        )
        .await;

        service.fetch_options(&plan_field(), "").await.unwrap();

        use crate::application::ports::LookupStore;
        let persisted = store.load(&plan_field()).await.unwrap();
        assert_eq!(persisted.len(), 200);
        assert_eq!(persisted[0].key, "K001");
        assert!(!persisted.iter().any(|e| e.key == "K000"));
    }

    #[tokio::test]
    async fn test_selection_fills_mapped_defaults() {
        let (service, _, _) = setup(
            LookupMock::new(),
            &[entry("P1", "Widget")],
            LookupPolicy::Passthrough,
        )
        .await;

        let selection = service
            .apply_selection(&plan_field(), "P1", false)
            .await
            .unwrap()
            .expect("selection");

        assert_eq!(selection.key, "P1");
        assert_eq!(selection.label, "P1 / Widget");
        let product = FieldCode::new("product_name".into()).unwrap();
        assert!(selection
            .defaults
            .iter()
            .any(|(field, value)| *field == product && value == "Widget"));
    }

    #[tokio::test]
    async fn test_stale_selection_is_discarded() {
        let mock = LookupMock::new()
            .with_search_results(vec![entry("P9", "Slow result")])
            .with_search_delay(Duration::from_millis(60));
        let (service, _, _) = setup(mock, &[entry("P1", "Widget")], LookupPolicy::Passthrough).await;

        let slow = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .apply_selection(&plan_field(), "something-slow", true)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let fresh = service
            .apply_selection(&plan_field(), "P1", false)
            .await
            .unwrap();
        assert!(fresh.is_some());

        let stale = slow.await.unwrap().unwrap();
        assert!(stale.is_none(), "superseded selection must not apply");
    }

    #[tokio::test]
    async fn test_suggestions_collapse_to_the_last_call() {
        let mock = LookupMock::new().with_search_results(vec![entry("P1", "Widget")]);
        let (service, _, gateway) = setup(mock, &[], LookupPolicy::Passthrough).await;

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.fetch_options(&plan_field(), "wi").await })
        };
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = service.fetch_options(&plan_field(), "wid").await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].label, "P1 / Widget");
        assert!(first.await.unwrap().unwrap().is_empty());
        assert_eq!(gateway.search_call_count(), 1);
    }
}
