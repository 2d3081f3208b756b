//! Dynamo-for-Revit workflow rules
//!
//! Well-known object names, the upload kind mapping, graph to run request
//! conversion and the AppBundle / Activity definitions the workitem runs against.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DesignAutomationConfig;
use crate::errors::{ApsError, ApsResult};
use crate::models::DefinitionSpec;

pub const INPUT_MODEL_FILE: &str = "run.rvt";
pub const GRAPH_FILE: &str = "run.dyn";
pub const RUN_REQUEST_FILE: &str = "run.json";
pub const PYTHON_LIBS_FILE: &str = "pythonDependencies.zip";
pub const PACKAGES_FILE: &str = "packages.zip";
pub const RESULT_JSON_FILE: &str = "result.json";
pub const RESULT_RVT_FILE: &str = "result.rvt";

const CONTENT_TYPE_ZIP: &str = "application/zip";
const CONTENT_TYPE_BINARY: &str = "application/octet-stream";
const CONTENT_TYPE_JSON: &str = "application/json";

/// 上传文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Python,
    Rvt,
    Dynamo,
    Json,
    Packages,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Python => "python",
            UploadKind::Rvt => "rvt",
            UploadKind::Dynamo => "dynamo",
            UploadKind::Json => "json",
            UploadKind::Packages => "packages",
        }
    }

    /// Object key and content type for an uploaded file of this kind.
    ///
    /// Graph uploads must already be named `run.dyn`.
    pub fn target(&self, original_name: &str) -> ApsResult<UploadTarget> {
        let (object_key, content_type) = match self {
            UploadKind::Python => (PYTHON_LIBS_FILE.to_string(), CONTENT_TYPE_ZIP),
            UploadKind::Rvt => {
                let name = original_name.trim();
                if name.is_empty() {
                    return Err(ApsError::BadRequest("缺少模型文件名".to_string()));
                }
                (name.to_string(), CONTENT_TYPE_BINARY)
            }
            UploadKind::Dynamo => {
                if original_name != GRAPH_FILE {
                    return Err(ApsError::BadRequest(format!(
                        "Dynamo file must be named \"{GRAPH_FILE}\". Please rename your file and upload again."
                    )));
                }
                (GRAPH_FILE.to_string(), CONTENT_TYPE_BINARY)
            }
            UploadKind::Json => (RUN_REQUEST_FILE.to_string(), CONTENT_TYPE_JSON),
            UploadKind::Packages => (PACKAGES_FILE.to_string(), CONTENT_TYPE_ZIP),
        };

        Ok(UploadTarget {
            object_key,
            content_type,
        })
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadKind {
    type Err = ApsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(UploadKind::Python),
            "rvt" => Ok(UploadKind::Rvt),
            "dynamo" => Ok(UploadKind::Dynamo),
            "json" => Ok(UploadKind::Json),
            "packages" => Ok(UploadKind::Packages),
            other => Err(ApsError::BadRequest(format!("Unknown file type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub object_key: String,
    pub content_type: &'static str,
}

/// Rejects any input model other than `run.rvt`.
pub fn validate_input_model(name: &str) -> ApsResult<()> {
    if name != INPUT_MODEL_FILE {
        return Err(ApsError::BadRequest(format!(
            "输入模型必须命名为 \"{INPUT_MODEL_FILE}\"，收到: {name}"
        )));
    }
    Ok(())
}

/// Dynamo Player 运行请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub target: GraphTarget,
    pub inputs: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTarget {
    #[serde(rename = "type")]
    pub kind: String,
    /// 原始图文件文本
    pub contents: String,
}

impl RunRequest {
    pub fn for_graph(contents: impl Into<String>) -> Self {
        Self {
            target: GraphTarget {
                kind: "JsonGraphTarget".to_string(),
                contents: contents.into(),
            },
            inputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphProperties {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub is_custom_node: bool,
    pub nodes_count: usize,
    pub connectors_count: usize,
    pub view_zoom: Option<f64>,
}

/// A validated graph and its run request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedGraph {
    pub run_request: RunRequest,
    pub properties: GraphProperties,
}

impl ConvertedGraph {
    pub fn run_request_json(&self) -> ApsResult<String> {
        Ok(serde_json::to_string_pretty(&self.run_request)?)
    }
}

/// 将 `.dyn` 图转换为 `run.json`
pub fn convert_graph(bytes: &[u8]) -> ApsResult<ConvertedGraph> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        ApsError::invalid_format("Invalid Dynamo file format", format!("文件不是有效的UTF-8文本: {e}"))
    })?;

    let graph: Value = serde_json::from_str(text).map_err(|e| {
        ApsError::invalid_format(
            "Invalid Dynamo file format",
            format!("The uploaded file is not a valid JSON file: {e}"),
        )
    })?;

    let (Some(uuid), Some(nodes)) = (graph.get("Uuid"), graph.get("Nodes")) else {
        return Err(ApsError::invalid_format(
            "Invalid Dynamo file structure",
            "The file does not contain the required Dynamo properties (Uuid, Nodes)",
        ));
    };

    let text_field = |key: &str| graph.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    let properties = GraphProperties {
        uuid: uuid
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| uuid.to_string()),
        name: text_field("Name").unwrap_or("Unnamed Graph").to_string(),
        description: text_field("Description").unwrap_or("No description").to_string(),
        is_custom_node: graph
            .get("IsCustomNode")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        nodes_count: nodes.as_array().map_or(0, Vec::len),
        connectors_count: graph
            .get("Connectors")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        view_zoom: graph
            .get("View")
            .and_then(|view| view.get("Zoom"))
            .and_then(Value::as_f64),
    };

    Ok(ConvertedGraph {
        run_request: RunRequest::for_graph(text),
        properties,
    })
}

/// AppBundle 定义
pub fn appbundle_definition(da: &DesignAutomationConfig) -> DefinitionSpec {
    let body = json!({
        "engine": da.engine,
        "description": format!("{} AppBundle for Dynamo Revit", da.bundle_app_name),
    });

    DefinitionSpec {
        id: da.bundle_app_name.clone(),
        body: into_map(body),
    }
}

/// Dynamo-for-Revit Activity 定义
pub fn activity_definition(da: &DesignAutomationConfig, now: DateTime<Utc>) -> DefinitionSpec {
    let command_line = format!(
        r#"$(engine.path)\\revitcoreconsole.exe /i "$(args[rvtFile].path)" /al "$(appbundles[{}].path)""#,
        da.bundle_app_name
    );

    let body = json!({
        "commandLine": [command_line],
        "parameters": {
            "rvtFile": parameter("get", false, true, "Input Revit model", "$(rvtFile)"),
            "runRequest": parameter("get", false, false, "Input Revit model", RUN_REQUEST_FILE),
            "pythonLibs": parameter("get", true, false, "Python libs", "pythonDependencies"),
            "dynResult": parameter("put", false, false, "Results", RESULT_JSON_FILE),
            "packages": parameter("get", true, false, "Dynamo packages", "packages"),
            "rvtResult": parameter("put", false, false, "Results", RESULT_RVT_FILE),
        },
        "engine": da.engine,
        "appbundles": [da.bundle_id()],
        "description": format!("Activity for Dynamo Revit, version {}", now.to_rfc3339()),
    });

    DefinitionSpec {
        id: da.activity_name.clone(),
        body: into_map(body),
    }
}

fn parameter(verb: &str, zip: bool, required: bool, description: &str, local_name: &str) -> Value {
    json!({
        "zip": zip,
        "ondemand": false,
        "verb": verb,
        "description": description,
        "required": required,
        "localName": local_name,
    })
}

fn into_map(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
