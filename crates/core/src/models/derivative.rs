use serde::{Deserialize, Serialize};

/// Model Derivative 转换任务请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationRequest {
    pub input: TranslationInput,
    pub output: TranslationOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInput {
    pub urn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_urn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOutput {
    pub formats: Vec<OutputFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub views: Vec<String>,
}

impl TranslationRequest {
    /// SVF2 with 2D and 3D views, the format the viewer loads.
    pub fn svf2(urn: impl Into<String>, root_filename: Option<String>) -> Self {
        let compressed_urn = root_filename.as_ref().map(|_| true);
        Self {
            input: TranslationInput {
                urn: urn.into(),
                compressed_urn,
                root_filename,
            },
            output: TranslationOutput {
                formats: vec![OutputFormat {
                    kind: "svf2".to_string(),
                    views: vec!["2d".to_string(), "3d".to_string()],
                }],
            },
        }
    }
}

/// `POST /designdata/job` 响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationJob {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub urn: Option<String>,
}

/// `GET /designdata/{urn}/manifest` 原始结构
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub derivatives: Vec<ManifestNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestNode {
    #[serde(default)]
    pub messages: Vec<ManifestMessage>,
    #[serde(default)]
    pub children: Vec<ManifestNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: serde_json::Value,
}

/// 转换状态摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestSummary {
    pub status: String,
    pub progress: String,
    pub messages: Vec<ManifestMessage>,
}

impl From<Manifest> for ManifestSummary {
    fn from(manifest: Manifest) -> Self {
        fn collect(node: &ManifestNode, into: &mut Vec<ManifestMessage>) {
            into.extend(node.messages.iter().cloned());
            for child in &node.children {
                collect(child, into);
            }
        }

        let mut messages = Vec::new();
        for derivative in &manifest.derivatives {
            collect(derivative, &mut messages);
        }

        Self {
            status: manifest.status,
            progress: manifest.progress,
            messages,
        }
    }
}
