//! Fleet Check-in Common Library
//!
//! CLIと各フロントエンドで共有されるフォーム・描き込みのコア

pub mod error;
pub mod stroke;
pub mod geometry;
pub mod fuel;
pub mod image_data;
pub mod form;
pub mod validation;
pub mod payload;

pub use error::{Error, Result};
pub use stroke::{Brush, PointerPos, RecorderState, Stroke, StrokeColor, StrokeHistory, StrokePoint, StrokeRecorder, BRUSH_SIZES, PALETTE};
pub use geometry::{bound_dimensions, denormalize, normalize, CanvasGeometry};
pub use fuel::{gauge_line, segment_value, DEFAULT_FUEL};
pub use image_data::EncodedImage;
pub use form::{draft_key, format_brl_amount, sanitize_km, FormDraft, OperationType, Step};
pub use validation::{ensure_all, ensure_step, field_validation, validate_all, validate_step, Field, FieldError, FieldState, FieldValidation};
pub use payload::{FormField, FormValue, Payload, PayloadProfile, SessionIds};
