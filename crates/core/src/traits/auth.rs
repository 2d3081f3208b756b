use async_trait::async_trait;

use crate::models::Token;
use crate::ApsResult;

/// 访问令牌来源
///
/// 实现方负责缓存: 在令牌过期前重复调用不应触发新的令牌交换。
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> ApsResult<Token>;

    /// 丢弃缓存的令牌, 下次调用重新获取
    async fn invalidate(&self);

    async fn bearer(&self) -> ApsResult<String> {
        Ok(self.access_token().await?.bearer())
    }
}
