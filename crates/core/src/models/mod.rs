//! # 数据模型
//!
//! APS 各服务的请求与响应结构。字段名遵循 APS 的 camelCase 约定,
//! 在 Rust 侧统一映射为 snake_case。
//!
//! ## 核心模型
//!
//! - [`Token`] - 两腿 OAuth 访问令牌, 进程内缓存
//! - [`Bucket`] / [`StoredObject`] - OSS 存储桶与对象
//! - [`DefinitionVersion`] / [`Alias`] - AppBundle 与 Activity 的版本和别名
//! - [`WorkitemInfo`] - 一次 Design Automation 执行
//! - [`ManifestSummary`] - Model Derivative 转换状态
//!
//! ## Workitem 状态流转
//!
//! ```text
//! pending → inprogress → success
//!                      ↘ failed* / cancelled
//! ```
//!
//! 任何不是 `pending` / `inprogress` 的状态都是终态。

pub mod derivative;
pub mod design_automation;
pub mod oss;
pub mod token;

pub use derivative::*;
pub use design_automation::*;
pub use oss::*;
pub use token::*;
