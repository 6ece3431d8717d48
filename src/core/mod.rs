// 错误和结果类型
pub mod error;
// 参数值类型
pub mod value;

pub use error::{BuilderError, BuilderResult, ErrorCode, FilterError, GrammarError, PublicError, ToPublicError};
pub use value::*;
