//! Hand-written fakes of the APS service traits.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use aps_core::models::{
    Alias, Bucket, BucketPolicy, DefinitionKind, DefinitionSpec, DefinitionVersion,
    ManifestSummary, ObjectSummary, StoredObject, Token, TranslationJob, TranslationRequest,
    UploadParameters, WorkitemInfo, WorkitemRequest, WorkitemStatus,
};
use aps_core::urn::{object_id, urnify};
use aps_core::{
    AccessTokenSource, ApsError, ApsResult, DerivativeService, DesignAutomationApi,
    ObjectStorage, ProgressEvent, ProgressSink, WorkitemService,
};
use aps_worker::Backends;

pub const BUCKET: &str = "dynamoapp-runs";

#[derive(Default)]
pub struct FakeTokens {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AccessTokenSource for FakeTokens {
    async fn access_token(&self) -> ApsResult<Token> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Token::new("fake-token", 3600, Utc::now()))
    }

    async fn invalidate(&self) {}
}

#[derive(Default)]
pub struct FakeStorage {
    pub calls: AtomicUsize,
    pub buckets: Mutex<HashMap<String, BucketPolicy>>,
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub head_fails: Mutex<bool>,
    pub bucket_delete_forbidden: Mutex<bool>,
    /// Objects whose deletion fails.
    pub undeletable: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn with_bucket(bucket: &str) -> Self {
        let storage = Self::default();
        storage
            .buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string(), BucketPolicy::Transient);
        storage
    }

    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn bucket_details(&self, bucket_key: &str) -> ApsResult<Option<Bucket>> {
        self.hit();
        Ok(self.buckets.lock().unwrap().get(bucket_key).map(|policy| Bucket {
            bucket_key: bucket_key.to_string(),
            bucket_owner: Some("fake".to_string()),
            created_date: None,
            policy_key: *policy,
        }))
    }

    async fn create_bucket(&self, bucket_key: &str, policy: BucketPolicy) -> ApsResult<Bucket> {
        self.hit();
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket_key) {
            return Err(ApsError::Conflict {
                resource: format!("bucket {bucket_key}"),
                details: json!({"reason": "Bucket already exists"}),
            });
        }
        buckets.insert(bucket_key.to_string(), policy);
        Ok(Bucket {
            bucket_key: bucket_key.to_string(),
            bucket_owner: None,
            created_date: None,
            policy_key: policy,
        })
    }

    async fn delete_bucket(&self, bucket_key: &str) -> ApsResult<bool> {
        self.hit();
        if *self.bucket_delete_forbidden.lock().unwrap() {
            return Err(ApsError::Provisioning {
                resource: format!("bucket {bucket_key}"),
                status: Some(403),
                details: json!({"reason": "not the owner"}),
            });
        }
        Ok(self.buckets.lock().unwrap().remove(bucket_key).is_some())
    }

    async fn list_objects(&self, bucket_key: &str) -> ApsResult<Vec<ObjectSummary>> {
        self.hit();
        if !self.buckets.lock().unwrap().contains_key(bucket_key) {
            return Err(ApsError::NotFound(format!("bucket {bucket_key}")));
        }
        let mut objects: Vec<ObjectSummary> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, _), _)| b == bucket_key)
            .map(|((b, k), bytes)| ObjectSummary {
                bucket_key: b.clone(),
                object_key: k.clone(),
                object_id: object_id(b, k),
                size: Some(bytes.len() as u64),
                sha1: None,
            })
            .collect();
        objects.sort_by(|a, b| a.object_key.cmp(&b.object_key));
        Ok(objects)
    }

    async fn delete_object(&self, bucket_key: &str, object_key: &str) -> ApsResult<bool> {
        self.hit();
        if self
            .undeletable
            .lock()
            .unwrap()
            .iter()
            .any(|k| k == object_key)
        {
            return Err(ApsError::Remote {
                operation: "oss.delete_object".to_string(),
                status: 500,
                details: Value::Null,
            });
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .remove(&(bucket_key.to_string(), object_key.to_string()))
            .is_some())
    }

    async fn object_exists(&self, bucket_key: &str, object_key: &str) -> ApsResult<bool> {
        self.hit();
        if *self.head_fails.lock().unwrap() {
            return Err(ApsError::Network("connection reset".to_string()));
        }
        Ok(self.get(bucket_key, object_key).is_some())
    }

    async fn object_size(&self, bucket_key: &str, object_key: &str) -> ApsResult<Option<u64>> {
        self.hit();
        self.get(bucket_key, object_key)
            .map(|bytes| Some(bytes.len() as u64))
            .ok_or_else(|| ApsError::NotFound(format!("{bucket_key}/{object_key}")))
    }

    async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> ApsResult<StoredObject> {
        self.hit();
        let size = bytes.len() as u64;
        self.put(bucket_key, object_key, &bytes);
        let id = object_id(bucket_key, object_key);
        Ok(StoredObject {
            bucket_key: bucket_key.to_string(),
            object_key: object_key.to_string(),
            urn: urnify(&id),
            object_id: id,
            size: Some(size),
        })
    }

    async fn signed_download_url(
        &self,
        bucket_key: &str,
        object_key: &str,
        minutes_expiration: u32,
    ) -> ApsResult<String> {
        self.hit();
        if self.get(bucket_key, object_key).is_none() {
            return Err(ApsError::NotFound(format!("{bucket_key}/{object_key}")));
        }
        Ok(format!(
            "https://s3.example.test/{bucket_key}/{object_key}?expires={minutes_expiration}"
        ))
    }
}

#[derive(Default)]
pub struct FakeDesignAutomation {
    pub nickname: Mutex<Option<String>>,
    pub versions: Mutex<HashMap<(DefinitionKind, String), u32>>,
    pub aliases: Mutex<HashMap<(DefinitionKind, String, String), u32>>,
    pub alias_updates: AtomicUsize,
    pub packages: Mutex<Vec<Vec<u8>>>,
    pub created_bodies: Mutex<Vec<Value>>,
    pub listed: Mutex<Vec<String>>,
}

impl FakeDesignAutomation {
    pub fn alias_version(&self, kind: DefinitionKind, id: &str, alias: &str) -> Option<u32> {
        self.aliases
            .lock()
            .unwrap()
            .get(&(kind, id.to_string(), alias.to_string()))
            .copied()
    }

    fn version(kind: DefinitionKind, id: &str, version: u32) -> DefinitionVersion {
        DefinitionVersion {
            id: format!("dynamoapp.{id}"),
            version,
            upload_parameters: (kind == DefinitionKind::AppBundle).then(|| UploadParameters {
                endpoint_url: "https://s3.example.test/bundles".to_string(),
                form_data: Default::default(),
            }),
        }
    }
}

#[async_trait]
impl DesignAutomationApi for FakeDesignAutomation {
    async fn nickname(&self) -> ApsResult<Option<String>> {
        Ok(self.nickname.lock().unwrap().clone())
    }

    async fn set_nickname(&self, nickname: &str) -> ApsResult<()> {
        *self.nickname.lock().unwrap() = Some(nickname.to_string());
        Ok(())
    }

    async fn delete_app(&self) -> ApsResult<bool> {
        let had = self.nickname.lock().unwrap().take().is_some();
        let mut versions = self.versions.lock().unwrap();
        let had = had || !versions.is_empty();
        versions.clear();
        Ok(had)
    }

    async fn list_definitions(&self, _kind: DefinitionKind) -> ApsResult<Vec<String>> {
        Ok(self.listed.lock().unwrap().clone())
    }

    async fn create_definition(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<DefinitionVersion> {
        let mut versions = self.versions.lock().unwrap();
        let key = (kind, spec.id.clone());
        if versions.contains_key(&key) {
            return Err(ApsError::Conflict {
                resource: format!("{kind} {}", spec.id),
                details: Value::Null,
            });
        }
        versions.insert(key, 1);
        self.created_bodies.lock().unwrap().push(spec.create_body());
        Ok(Self::version(kind, &spec.id, 1))
    }

    async fn create_definition_version(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<DefinitionVersion> {
        let mut versions = self.versions.lock().unwrap();
        let version = versions
            .get_mut(&(kind, spec.id.clone()))
            .ok_or_else(|| ApsError::NotFound(spec.id.clone()))?;
        *version += 1;
        Ok(Self::version(kind, &spec.id, *version))
    }

    async fn create_alias(&self, kind: DefinitionKind, id: &str, alias: &Alias) -> ApsResult<Alias> {
        let mut aliases = self.aliases.lock().unwrap();
        let key = (kind, id.to_string(), alias.id.clone());
        if aliases.contains_key(&key) {
            return Err(ApsError::Conflict {
                resource: format!("{kind} {id} alias {}", alias.id),
                details: Value::Null,
            });
        }
        aliases.insert(key, alias.version);
        Ok(alias.clone())
    }

    async fn update_alias(&self, kind: DefinitionKind, id: &str, alias: &Alias) -> ApsResult<Alias> {
        self.alias_updates.fetch_add(1, Ordering::SeqCst);
        let mut aliases = self.aliases.lock().unwrap();
        let version = aliases
            .get_mut(&(kind, id.to_string(), alias.id.clone()))
            .ok_or_else(|| ApsError::NotFound(alias.id.clone()))?;
        *version = alias.version;
        Ok(alias.clone())
    }

    async fn upload_package(&self, _params: &UploadParameters, package: Vec<u8>) -> ApsResult<()> {
        self.packages.lock().unwrap().push(package);
        Ok(())
    }
}

/// Answers status polls from a script; the last entry repeats.
pub struct FakeWorkitems {
    pub script: Vec<WorkitemStatus>,
    pub polls: AtomicUsize,
    pub submitted: Mutex<Vec<WorkitemRequest>>,
}

impl FakeWorkitems {
    pub fn scripted(script: &[&str]) -> Self {
        Self {
            script: script.iter().map(|s| WorkitemStatus::from(*s)).collect(),
            polls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> WorkitemRequest {
        self.submitted.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl WorkitemService for FakeWorkitems {
    async fn submit_workitem(&self, request: &WorkitemRequest) -> ApsResult<WorkitemInfo> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok(WorkitemInfo {
            id: "wi-1".to_string(),
            status: WorkitemStatus::Pending,
            report_url: None,
            progress: None,
            stats: None,
        })
    }

    async fn workitem_status(&self, id: &str) -> ApsResult<WorkitemInfo> {
        if id != "wi-1" {
            return Err(ApsError::NotFound(format!("workitem {id}")));
        }
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .script
            .get(poll)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or(WorkitemStatus::Pending);
        Ok(WorkitemInfo {
            id: id.to_string(),
            status,
            report_url: Some("https://reports.example.test/wi-1.txt".to_string()),
            progress: None,
            stats: None,
        })
    }
}

#[derive(Default)]
pub struct FakeDerivative {
    pub fails: Mutex<bool>,
    pub translated: Mutex<Vec<String>>,
}

#[async_trait]
impl DerivativeService for FakeDerivative {
    async fn translate(&self, request: &TranslationRequest) -> ApsResult<TranslationJob> {
        if *self.fails.lock().unwrap() {
            return Err(ApsError::Remote {
                operation: "md.translate".to_string(),
                status: 500,
                details: Value::Null,
            });
        }
        self.translated.lock().unwrap().push(request.input.urn.clone());
        Ok(TranslationJob {
            result: Some("created".to_string()),
            urn: Some(request.input.urn.clone()),
        })
    }

    async fn manifest(&self, urn: &str) -> ApsResult<Option<ManifestSummary>> {
        if !self.translated.lock().unwrap().iter().any(|u| u == urn) {
            return Ok(None);
        }
        Ok(Some(ManifestSummary {
            status: "success".to_string(),
            progress: "complete".to_string(),
            messages: Vec::new(),
        }))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Fakes {
    pub tokens: Arc<FakeTokens>,
    pub storage: Arc<FakeStorage>,
    pub design_automation: Arc<FakeDesignAutomation>,
    pub workitems: Arc<FakeWorkitems>,
    pub derivative: Arc<FakeDerivative>,
}

impl Fakes {
    pub fn new(script: &[&str]) -> Self {
        Self {
            tokens: Arc::new(FakeTokens::default()),
            storage: Arc::new(FakeStorage::with_bucket(BUCKET)),
            design_automation: Arc::new(FakeDesignAutomation::default()),
            workitems: Arc::new(FakeWorkitems::scripted(script)),
            derivative: Arc::new(FakeDerivative::default()),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            tokens: self.tokens.clone(),
            storage: self.storage.clone(),
            design_automation: self.design_automation.clone(),
            workitems: self.workitems.clone(),
            derivative: self.derivative.clone(),
        }
    }
}
