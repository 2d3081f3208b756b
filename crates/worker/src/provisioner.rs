use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use aps_core::dynamo::{activity_definition, appbundle_definition};
use aps_core::models::{
    Alias, Bucket, BucketPolicy, DefinitionKind, DefinitionSpec, DefinitionVersion, EnsuredBucket,
    PublishedDefinition, PurgeReport,
};
use aps_core::progress::steps;
use aps_core::{
    ApsError, ApsResult, DesignAutomationApi, DesignAutomationConfig, ObjectStorage, ProgressSink,
};

/// 资源配置器
///
/// 所有操作都是幂等的: 已存在的存储桶视为成功, 已存在的定义追加新版本,
/// 已存在的别名被移动到最新版本。
pub struct ResourceProvisioner {
    storage: Arc<dyn ObjectStorage>,
    design_automation: Arc<dyn DesignAutomationApi>,
    config: DesignAutomationConfig,
    client_id: String,
    policy: BucketPolicy,
}

impl ResourceProvisioner {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        design_automation: Arc<dyn DesignAutomationApi>,
        config: DesignAutomationConfig,
        client_id: String,
        policy: BucketPolicy,
    ) -> Self {
        Self {
            storage,
            design_automation,
            config,
            client_id,
            policy,
        }
    }

    pub fn design_automation_config(&self) -> &DesignAutomationConfig {
        &self.config
    }

    /// Creates the bucket unless it already exists.
    pub async fn ensure_bucket(&self, bucket_key: &str) -> ApsResult<EnsuredBucket> {
        if let Some(bucket) = self.storage.bucket_details(bucket_key).await? {
            debug!("存储桶 {} 已存在", bucket_key);
            return Ok(EnsuredBucket {
                bucket_key: bucket.bucket_key,
                policy: bucket.policy_key,
                created: false,
            });
        }

        match self.storage.create_bucket(bucket_key, self.policy).await {
            Ok(bucket) => Ok(EnsuredBucket {
                bucket_key: bucket.bucket_key,
                policy: bucket.policy_key,
                created: true,
            }),
            // 另一个调用者在检查与创建之间抢先创建了
            Err(ApsError::Conflict { .. }) => {
                info!("存储桶 {} 已存在 (409)", bucket_key);
                Ok(EnsuredBucket {
                    bucket_key: bucket_key.to_string(),
                    policy: self.policy,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Creates the definition, or adds a version when the id is taken.
    ///
    /// Returns the new version and whether the definition itself was created.
    pub async fn ensure_definition(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<(DefinitionVersion, bool)> {
        match self.design_automation.create_definition(kind, spec).await {
            Ok(version) => {
                info!("{} {} 已创建, 版本 {}", kind, spec.id, version.version);
                Ok((version, true))
            }
            Err(ApsError::Conflict { .. }) => {
                let version = self
                    .design_automation
                    .create_definition_version(kind, spec)
                    .await?;
                info!("{} {} 已存在, 新版本 {}", kind, spec.id, version.version);
                Ok((version, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Points `alias` at `version`, creating the alias on first use.
    pub async fn ensure_alias(
        &self,
        kind: DefinitionKind,
        id: &str,
        alias: &str,
        version: u32,
    ) -> ApsResult<Alias> {
        let wanted = Alias {
            id: alias.to_string(),
            version,
        };

        let current = match self.design_automation.create_alias(kind, id, &wanted).await {
            Ok(created) => created,
            Err(ApsError::Conflict { .. }) => {
                debug!("{} {} 的别名 {} 已存在, 更新到版本 {}", kind, id, alias, version);
                self.design_automation.update_alias(kind, id, &wanted).await?
            }
            Err(e) => return Err(e),
        };

        if current.version != version {
            return Err(ApsError::Provisioning {
                resource: format!("{kind} {id} alias {alias}"),
                status: None,
                details: serde_json::json!({
                    "expectedVersion": version,
                    "actualVersion": current.version,
                }),
            });
        }

        Ok(current)
    }

    async fn publish(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
        package: Option<Vec<u8>>,
    ) -> ApsResult<PublishedDefinition> {
        let (version, created) = self.ensure_definition(kind, spec).await?;

        if let Some(package) = package {
            let params = version.upload_parameters.as_ref().ok_or_else(|| {
                ApsError::Provisioning {
                    resource: format!("{kind} {}", spec.id),
                    status: None,
                    details: serde_json::json!("响应中缺少 uploadParameters"),
                }
            })?;
            self.design_automation.upload_package(params, package).await?;
            info!("{} 包已上传 (版本 {})", spec.id, version.version);
        }

        let alias = self
            .ensure_alias(kind, &spec.id, &self.config.alias, version.version)
            .await?;

        Ok(PublishedDefinition {
            kind,
            qualified_id: format!("{}.{}+{}", self.config.nickname, spec.id, alias.id),
            version: version.version,
            alias: alias.id,
            created,
        })
    }

    /// Creates or versions the AppBundle, uploads its package and moves the alias.
    pub async fn publish_appbundle(
        &self,
        package: Vec<u8>,
        sink: &dyn ProgressSink,
    ) -> ApsResult<PublishedDefinition> {
        sink.step(steps::APPBUNDLE);
        let spec = appbundle_definition(&self.config);
        let published = self
            .publish(DefinitionKind::AppBundle, &spec, Some(package))
            .await?;
        sink.message(
            steps::APPBUNDLE,
            &format!(
                "AppBundle {} version {} published",
                published.qualified_id, published.version
            ),
        );
        Ok(published)
    }

    pub async fn publish_activity(&self, sink: &dyn ProgressSink) -> ApsResult<PublishedDefinition> {
        sink.step(steps::ACTIVITY);
        let spec = activity_definition(&self.config, Utc::now());
        let published = self.publish(DefinitionKind::Activity, &spec, None).await?;
        sink.message(
            steps::ACTIVITY,
            &format!(
                "Activity {} version {} published",
                published.qualified_id, published.version
            ),
        );
        Ok(published)
    }

    /// Current nickname; `None` when the account has never set one.
    pub async fn nickname(&self) -> ApsResult<Option<String>> {
        self.design_automation.nickname().await
    }

    pub async fn set_nickname(&self, nickname: &str, sink: &dyn ProgressSink) -> ApsResult<()> {
        sink.step(steps::NICKNAME);
        self.design_automation.set_nickname(nickname).await?;
        sink.message(steps::NICKNAME, &format!("Nickname set to {nickname}"));
        Ok(())
    }

    /// Deletes every Design Automation resource of the account.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn clear_design_automation(&self) -> ApsResult<bool> {
        let deleted = self.design_automation.delete_app().await?;
        if deleted {
            info!("Design Automation 资源已清除");
        } else {
            info!("没有需要清除的 Design Automation 资源");
        }
        Ok(deleted)
    }

    /// Ids owned by the configured nickname, without the nickname prefix or alias.
    pub async fn list_definitions(&self, kind: DefinitionKind) -> ApsResult<Vec<String>> {
        let prefix = format!("{}.", self.config.nickname);
        let owned: BTreeSet<String> = self
            .design_automation
            .list_definitions(kind)
            .await?
            .into_iter()
            .filter_map(|id| {
                let name = id.strip_prefix(&prefix)?;
                let name = name.split('+').next().unwrap_or(name);
                Some(name.to_string())
            })
            .collect();
        Ok(owned.into_iter().collect())
    }

    pub async fn bucket(&self, bucket_key: &str) -> ApsResult<Option<Bucket>> {
        self.storage.bucket_details(bucket_key).await
    }

    pub async fn delete_bucket(&self, bucket_key: &str, sink: &dyn ProgressSink) -> ApsResult<bool> {
        sink.step(steps::DELETE_BUCKET);
        let deleted = self.storage.delete_bucket(bucket_key).await?;
        let message = if deleted {
            format!("Bucket {bucket_key} deleted")
        } else {
            format!("Bucket {bucket_key} does not exist")
        };
        sink.message(steps::DELETE_BUCKET, &message);
        Ok(deleted)
    }

    /// Deletes every object and then the bucket.
    ///
    /// When the bucket itself cannot be deleted (typically because another
    /// application owns it) a fresh bucket name is suggested instead of failing.
    pub async fn purge_bucket(
        &self,
        bucket_key: &str,
        sink: &dyn ProgressSink,
    ) -> ApsResult<PurgeReport> {
        sink.step(steps::DELETE_BUCKET);

        let objects = match self.storage.list_objects(bucket_key).await {
            Ok(objects) => objects,
            Err(e) if e.is_not_found() => {
                sink.message(steps::DELETE_BUCKET, &format!("Bucket {bucket_key} does not exist"));
                return Ok(PurgeReport {
                    bucket_key: bucket_key.to_string(),
                    objects_deleted: 0,
                    objects_failed: 0,
                    bucket_deleted: false,
                    suggested_bucket_name: None,
                });
            }
            Err(e) => {
                warn!("无法列出存储桶 {} 中的对象: {}", bucket_key, e);
                Vec::new()
            }
        };

        let results = join_all(
            objects
                .iter()
                .map(|object| self.storage.delete_object(bucket_key, &object.object_key)),
        )
        .await;

        let mut objects_deleted = 0;
        let mut objects_failed = 0;
        for (object, result) in objects.iter().zip(results) {
            match result {
                Ok(_) => objects_deleted += 1,
                Err(e) => {
                    warn!("无法删除对象 {}: {}", object.object_key, e);
                    objects_failed += 1;
                }
            }
        }
        sink.message(
            steps::DELETE_BUCKET,
            &format!("Deleted {objects_deleted} objects from {bucket_key}"),
        );

        let (bucket_deleted, suggested_bucket_name) =
            match self.storage.delete_bucket(bucket_key).await {
                Ok(deleted) => (deleted, None),
                Err(e) => {
                    warn!("无法删除存储桶 {}: {}", bucket_key, e);
                    let suggestion = self.suggest_bucket_name(bucket_key);
                    sink.message(
                        steps::DELETE_BUCKET,
                        &format!("Bucket cannot be deleted, consider using {suggestion}"),
                    );
                    (false, Some(suggestion))
                }
            };

        Ok(PurgeReport {
            bucket_key: bucket_key.to_string(),
            objects_deleted,
            objects_failed,
            bucket_deleted,
            suggested_bucket_name,
        })
    }

    pub fn suggest_bucket_name(&self, bucket_key: &str) -> String {
        suggest_bucket_name(bucket_key, &self.client_id)
    }
}

/// `<base>_<client id prefix>_<millis>_<random>`, lowercase.
pub fn suggest_bucket_name(bucket_key: &str, client_id: &str) -> String {
    let base = bucket_key.split('_').next().unwrap_or(bucket_key);
    let client: String = client_id.chars().take(8).collect();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!("{base}_{client}_{}_{suffix}", Utc::now().timestamp_millis()).to_lowercase()
}
