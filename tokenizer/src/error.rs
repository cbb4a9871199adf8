use std::{io, path::PathBuf};

/// 转换与校验过程中可能出现的错误。
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("file {path:?} is not valid utf-8")]
    NotUtf8 { path: PathBuf },

    /// 合并规则行在替换词边界标记后不能恰好拆成两段。
    #[error("malformed merge at line {line}: {text:?}")]
    MalformedMergeLine { line: usize, text: String },

    #[error("invalid model: {0}")]
    Decode(String),

    #[error("unexpected model layout: {0}")]
    Layout(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
