use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("认证失败: {0}")]
    Auth(String),

    #[error("未注册的工具: {0}")]
    UnknownTool(String),

    #[error("工具执行失败: {0}")]
    ToolExecution(String),

    #[error("工具参数无效: {0}")]
    InvalidParameters(String),

    #[error("消息格式错误: {0}")]
    MalformedMessage(String),

    #[error("上游服务错误: {0}")]
    Upstream(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML 错误: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
