use serde::{Deserialize, Serialize};

pub const DEFAULT_ALIAS: &str = "default";
pub const DEFAULT_ENGINE: &str = "Autodesk.Revit+2026";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignAutomationConfig {
    pub nickname: String,
    pub activity_name: String,
    pub bundle_app_name: String,
    pub alias: String,
    pub engine: String,
}

impl Default for DesignAutomationConfig {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            activity_name: String::new(),
            bundle_app_name: String::new(),
            alias: DEFAULT_ALIAS.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
        }
    }
}

impl DesignAutomationConfig {
    /// `<nickname>.<activity>+<alias>`, the id a workitem runs against.
    pub fn activity_id(&self) -> String {
        format!("{}.{}+{}", self.nickname, self.activity_name, self.alias)
    }

    /// `<nickname>.<bundle>+<alias>`, referenced from the activity definition.
    pub fn bundle_id(&self) -> String {
        format!("{}.{}+{}", self.nickname, self.bundle_app_name, self.alias)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nickname.trim().is_empty() {
            return Err(anyhow::anyhow!("Design Automation 昵称不能为空"));
        }

        if self.activity_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Activity 名称不能为空"));
        }

        if self.bundle_app_name.trim().is_empty() {
            return Err(anyhow::anyhow!("AppBundle 名称不能为空"));
        }

        for (label, value) in [
            ("Activity", &self.activity_name),
            ("AppBundle", &self.bundle_app_name),
        ] {
            if value.contains(&['.', '+'][..]) {
                return Err(anyhow::anyhow!("{label} 名称不能包含 '.' 或 '+': {value}"));
            }
        }

        if self.alias.trim().is_empty() {
            return Err(anyhow::anyhow!("别名不能为空"));
        }

        if !self.engine.contains('+') {
            return Err(anyhow::anyhow!(
                "引擎标识格式无效，应为 <engine>+<version>: {}",
                self.engine
            ));
        }

        Ok(())
    }
}

/// Workitem 轮询策略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkitemConfig {
    pub poll_interval_seconds: u64,
    pub max_poll_attempts: u32,
}

impl Default for WorkitemConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5,
            max_poll_attempts: 60,
        }
    }
}

impl WorkitemConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("轮询间隔必须大于0"));
        }

        if self.max_poll_attempts == 0 {
            return Err(anyhow::anyhow!("最大轮询次数必须大于0"));
        }

        Ok(())
    }
}
