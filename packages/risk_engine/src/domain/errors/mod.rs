pub mod engine_error;
pub mod validation_error;

pub use engine_error::{EngineError, EngineResult};
pub use validation_error::{ErrorCode, FieldError, ValidationErrors};
