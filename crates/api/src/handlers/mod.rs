pub mod account;
pub mod bucket;
pub mod definitions;
pub mod download;
pub mod events;
pub mod health;
pub mod metrics;
pub mod models;
pub mod token;
pub mod upload;
pub mod workitem;

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// 上传的文件部分
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields plus the first file part of a multipart form.
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart, operation: &'static str) -> ApiResult<Self> {
        let mut form = MultipartForm {
            fields: HashMap::new(),
            file: None,
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(operation, format!("无效的multipart请求: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) if form.file.is_none() => {
                    let bytes = field.bytes().await.map_err(|e| {
                        ApiError::bad_request(operation, format!("读取上传文件失败: {e}"))
                    })?;
                    form.file = Some(UploadedFile {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                Some(_) => {}
                None => {
                    let text = field.text().await.map_err(|e| {
                        ApiError::bad_request(operation, format!("读取字段 {name} 失败: {e}"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn take_file(&mut self, operation: &'static str, hint: &str) -> ApiResult<UploadedFile> {
        self.file
            .take()
            .filter(|file| !file.bytes.is_empty())
            .ok_or_else(|| ApiError::bad_request(operation, format!("No file uploaded. {hint}")))
    }
}

/// Parses an optional JSON body; an empty body yields the default.
pub fn optional_json<T>(body: &Bytes, operation: &'static str) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(operation, format!("请求体不是有效的JSON: {e}")))
}
