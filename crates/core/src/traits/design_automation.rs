//! Design Automation 接口
//!
//! ```rust,ignore
//! let version = match api.create_definition(kind, &spec).await {
//!     Ok(version) => version,
//!     Err(e) if e.is_conflict() => api.create_definition_version(kind, &spec).await?,
//!     Err(e) => return Err(e),
//! };
//! ```

use async_trait::async_trait;

use crate::models::{
    Alias, DefinitionKind, DefinitionSpec, DefinitionVersion, UploadParameters, WorkitemInfo,
    WorkitemRequest,
};
use crate::ApsResult;

#[async_trait]
pub trait DesignAutomationApi: Send + Sync {
    /// `None` when no nickname has been assigned yet.
    async fn nickname(&self) -> ApsResult<Option<String>>;

    async fn set_nickname(&self, nickname: &str) -> ApsResult<()>;

    /// Removes the nickname and every AppBundle / Activity. `false` when there was nothing.
    async fn delete_app(&self) -> ApsResult<bool>;

    /// Fully qualified ids visible to the caller.
    async fn list_definitions(&self, kind: DefinitionKind) -> ApsResult<Vec<String>>;

    /// 409 (id already exists) is reported as [`crate::ApsError::Conflict`].
    async fn create_definition(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<DefinitionVersion>;

    async fn create_definition_version(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<DefinitionVersion>;

    /// 409 (alias already exists) is reported as [`crate::ApsError::Conflict`].
    async fn create_alias(&self, kind: DefinitionKind, id: &str, alias: &Alias)
        -> ApsResult<Alias>;

    async fn update_alias(&self, kind: DefinitionKind, id: &str, alias: &Alias)
        -> ApsResult<Alias>;

    /// Multipart POST of an AppBundle package to its pre-signed form.
    async fn upload_package(&self, params: &UploadParameters, package: Vec<u8>) -> ApsResult<()>;
}

#[async_trait]
pub trait WorkitemService: Send + Sync {
    async fn submit_workitem(&self, request: &WorkitemRequest) -> ApsResult<WorkitemInfo>;

    async fn workitem_status(&self, id: &str) -> ApsResult<WorkitemInfo>;
}
