use perisso_engine::QueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("查询执行失败: {0}")]
    Query(#[from] QueryError),
}
