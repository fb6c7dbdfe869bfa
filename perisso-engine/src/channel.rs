//! 远端命令通道：同步的请求/应答调用，由 Add-On 命令层或进程内命令总线实现。

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid parameters for {command}: {message}")]
    InvalidParameters { command: String, message: String },
}

/// 阻塞式命令调用。传输失败与远端错误原样返回，不做重试。
pub trait CommandChannel: Send + Sync {
    fn invoke(&self, command: &str, params: Option<Value>) -> Result<Value, ChannelError>;
}
