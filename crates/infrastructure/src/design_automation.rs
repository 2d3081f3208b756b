use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use aps_core::models::{
    Alias, AliasUpdate, DefinitionKind, DefinitionSpec, DefinitionVersion, IdPage,
    NicknameRequest, UploadParameters, WorkitemInfo, WorkitemRequest,
};
use aps_core::{ApsError, ApsResult, DesignAutomationApi, UploadStep, WorkitemService};

use crate::http::{failure_details, provisioning, read_json, remote, upstream_error, ApsHttp};

/// Design Automation v3 客户端
#[derive(Clone)]
pub struct DesignAutomationClient {
    http: ApsHttp,
}

impl DesignAutomationClient {
    pub fn new(http: ApsHttp) -> Self {
        Self { http }
    }

    async fn conflict(resource: String, response: reqwest::Response) -> ApsError {
        let (_, details) = failure_details(response).await;
        ApsError::Conflict { resource, details }
    }
}

#[async_trait]
impl DesignAutomationApi for DesignAutomationClient {
    async fn nickname(&self) -> ApsResult<Option<String>> {
        let url = self.http.endpoints().design_automation(&["forgeapps", "me"]);
        let response = self
            .http
            .send("da.get_nickname", self.http.request(Method::GET, url))
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: Value = read_json(response, "da.get_nickname").await?;
                Ok(match body {
                    Value::String(nickname) => Some(nickname),
                    Value::Object(map) => map
                        .get("nickname")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(upstream_error(response, remote("da.get_nickname")).await),
        }
    }

    async fn set_nickname(&self, nickname: &str) -> ApsResult<()> {
        let url = self.http.endpoints().design_automation(&["forgeapps", "me"]);
        let builder = self
            .http
            .request(Method::PATCH, url)
            .json(&NicknameRequest { nickname });

        let response = self.http.send("da.set_nickname", builder).await?;

        match response.status() {
            status if status.is_success() => {
                info!("Design Automation 昵称已设置为 {}", nickname);
                Ok(())
            }
            StatusCode::CONFLICT => {
                Err(Self::conflict(format!("nickname {nickname}"), response).await)
            }
            _ => Err(upstream_error(response, provisioning(format!("nickname {nickname}"))).await),
        }
    }

    async fn delete_app(&self) -> ApsResult<bool> {
        let url = self.http.endpoints().design_automation(&["forgeapps", "me"]);
        let response = self
            .http
            .send("da.delete_app", self.http.request(Method::DELETE, url))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(upstream_error(response, provisioning("forgeapps/me".to_string())).await),
        }
    }

    async fn list_definitions(&self, kind: DefinitionKind) -> ApsResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.http.endpoints().design_automation(&[kind.collection()]);
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("page", token);
            }

            let response = self
                .http
                .send("da.list_definitions", self.http.request(Method::GET, url))
                .await?;

            if !response.status().is_success() {
                return Err(upstream_error(response, remote("da.list_definitions")).await);
            }

            let page: IdPage = read_json(response, "da.list_definitions").await?;
            ids.extend(page.data);

            match page.pagination_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("共 {} 个 {}", ids.len(), kind);
        Ok(ids)
    }

    async fn create_definition(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<DefinitionVersion> {
        let url = self.http.endpoints().design_automation(&[kind.collection()]);
        let builder = self
            .http
            .request(Method::POST, url)
            .json(&spec.create_body());

        let response = self.http.send("da.create_definition", builder).await?;
        let resource = format!("{kind} {}", spec.id);

        match response.status() {
            status if status.is_success() => read_json(response, "da.create_definition").await,
            StatusCode::CONFLICT => Err(Self::conflict(resource, response).await),
            _ => Err(upstream_error(response, provisioning(resource)).await),
        }
    }

    async fn create_definition_version(
        &self,
        kind: DefinitionKind,
        spec: &DefinitionSpec,
    ) -> ApsResult<DefinitionVersion> {
        let url = self
            .http
            .endpoints()
            .design_automation(&[kind.collection(), spec.id.as_str(), "versions"]);
        let builder = self
            .http
            .request(Method::POST, url)
            .json(&spec.version_body());

        let response = self.http.send("da.create_version", builder).await?;

        if !response.status().is_success() {
            let resource = format!("{kind} {} version", spec.id);
            return Err(upstream_error(response, provisioning(resource)).await);
        }

        read_json(response, "da.create_version").await
    }

    async fn create_alias(
        &self,
        kind: DefinitionKind,
        id: &str,
        alias: &Alias,
    ) -> ApsResult<Alias> {
        let url = self
            .http
            .endpoints()
            .design_automation(&[kind.collection(), id, "aliases"]);
        let builder = self.http.request(Method::POST, url).json(alias);

        let response = self.http.send("da.create_alias", builder).await?;
        let resource = format!("{kind} {id} alias {}", alias.id);

        match response.status() {
            status if status.is_success() => read_json(response, "da.create_alias").await,
            StatusCode::CONFLICT => Err(Self::conflict(resource, response).await),
            _ => Err(upstream_error(response, provisioning(resource)).await),
        }
    }

    async fn update_alias(
        &self,
        kind: DefinitionKind,
        id: &str,
        alias: &Alias,
    ) -> ApsResult<Alias> {
        let url = self
            .http
            .endpoints()
            .design_automation(&[kind.collection(), id, "aliases", alias.id.as_str()]);
        let builder = self.http.request(Method::PATCH, url).json(&AliasUpdate {
            version: alias.version,
        });

        let response = self.http.send("da.update_alias", builder).await?;

        if !response.status().is_success() {
            let resource = format!("{kind} {id} alias {}", alias.id);
            return Err(upstream_error(response, provisioning(resource)).await);
        }

        read_json(response, "da.update_alias").await
    }

    async fn upload_package(&self, params: &UploadParameters, package: Vec<u8>) -> ApsResult<()> {
        let mut form = Form::new();
        for (name, value) in &params.form_data {
            form = form.text(name.clone(), value.clone());
        }

        // S3 要求 file 字段位于所有表单字段之后
        let part = Part::bytes(package)
            .file_name("bundle.zip")
            .mime_str("application/octet-stream")
            .map_err(|e| ApsError::Internal(format!("无效的MIME类型: {e}")))?;
        form = form.part("file", part);

        let builder = self
            .http
            .client()
            .post(&params.endpoint_url)
            .multipart(form);

        let response = self
            .http
            .send_unauthenticated("da.upload_package", builder)
            .await?;

        if !response.status().is_success() {
            let (_, details) = failure_details(response).await;
            return Err(ApsError::Upload {
                object: "appbundle package".to_string(),
                step: UploadStep::PutBytes,
                details,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl WorkitemService for DesignAutomationClient {
    async fn submit_workitem(&self, request: &WorkitemRequest) -> ApsResult<WorkitemInfo> {
        let url = self.http.endpoints().design_automation(&["workitems"]);
        let builder = self.http.request(Method::POST, url).json(request);

        let response = self.http.send("da.submit_workitem", builder).await?;

        if !response.status().is_success() {
            return Err(upstream_error(response, remote("da.submit_workitem")).await);
        }

        let info: WorkitemInfo = read_json(response, "da.submit_workitem").await?;
        info!("Workitem {} 已提交 ({})", info.id, request.activity_id);
        Ok(info)
    }

    async fn workitem_status(&self, id: &str) -> ApsResult<WorkitemInfo> {
        let url = self.http.endpoints().design_automation(&["workitems", id]);
        let response = self
            .http
            .send("da.workitem_status", self.http.request(Method::GET, url))
            .await?;

        match response.status() {
            status if status.is_success() => read_json(response, "da.workitem_status").await,
            StatusCode::NOT_FOUND => Err(ApsError::NotFound(format!("workitem {id}"))),
            _ => Err(upstream_error(response, remote("da.workitem_status")).await),
        }
    }
}
