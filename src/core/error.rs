//! 错误类型与状态码
//!
//! 所有管理器操作返回 `PflowResult`；失败时状态保持调用前的样子（先校验、后修改），
//! 算法层的重试 / 跳过 / 终止事件等策略由上层决定。

use thiserror::Error;

/// 管理器操作可能出现的错误（封闭集合）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PflowError {
    /// 未知的列表名、标识符、算法或候选
    #[error("Not found: {0}")]
    NotFound(String),

    /// 违反不变量：清空必须非空的容器、重入碎片化、重复关联、非法选择等
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// 数值越界或字段非有限值
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 读取尚未设置的可选值
    #[error("Not initialized: {0}")]
    NotInitialized(String),
}

/// 仅关心结果类别时使用的状态码（供门面层映射）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    NotFound,
    NotAllowed,
    InvalidParameter,
    NotInitialized,
}

impl PflowError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn not_allowed(msg: impl Into<String>) -> Self {
        Self::NotAllowed(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn not_initialized(msg: impl Into<String>) -> Self {
        Self::NotInitialized(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NotFound,
            Self::NotAllowed(_) => StatusCode::NotAllowed,
            Self::InvalidParameter(_) => StatusCode::InvalidParameter,
            Self::NotInitialized(_) => StatusCode::NotInitialized,
        }
    }
}

/// 管理器操作的结果类型
pub type PflowResult<T> = Result<T, PflowError>;

/// 校验浮点字段为有限值，否则返回 InvalidParameter
pub fn ensure_finite(field: &str, value: f32) -> PflowResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PflowError::invalid(format!("{field} is not finite: {value}")))
    }
}

/// 校验能量类字段为非负有限值
pub fn ensure_non_negative(field: &str, value: f32) -> PflowResult<()> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(PflowError::invalid(format!("{field} is negative: {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PflowError::not_found("x").status(), StatusCode::NotFound);
        assert_eq!(PflowError::not_allowed("x").status(), StatusCode::NotAllowed);
        assert_eq!(PflowError::invalid("x").status(), StatusCode::InvalidParameter);
        assert_eq!(PflowError::not_initialized("x").status(), StatusCode::NotInitialized);
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("energy", 1.5).is_ok());
        assert!(ensure_non_negative("energy", 0.0).is_ok());
        assert!(matches!(
            ensure_non_negative("energy", -0.1),
            Err(PflowError::InvalidParameter(_))
        ));
        assert!(matches!(
            ensure_non_negative("energy", f32::NAN),
            Err(PflowError::InvalidParameter(_))
        ));
        assert!(ensure_finite("x", f32::INFINITY).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = PflowError::not_found("list 'Foo'");
        assert_eq!(err.to_string(), "Not found: list 'Foo'");
    }
}
