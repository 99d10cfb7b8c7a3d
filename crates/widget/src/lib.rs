//! Style-upload widget for composite resource edit forms.
//!
//! One field with two jobs at submit time: copy the current upload value
//! into the outgoing payload under `mapnik_vector_style.file_upload`, and —
//! for create operations — block submission until the upload has resolved.

#![forbid(unsafe_code)]

mod field;
mod i18n;
mod template;

use mapstyle_core::Operation;

pub use field::{StyleUploadField, FILE_UPLOAD_PATH, IDENTITY};
pub use i18n::Catalog;
pub use template::{JinjaEngine, RenderError, TemplateEngine, STYLE_UPLOAD_TEMPLATE};

/// Host registration record: which resource the widget serves and on which
/// operations it participates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetBinding {
    pub resource: &'static str,
    pub operations: [Operation; 2],
}

pub fn binding() -> WidgetBinding {
    WidgetBinding {
        resource: IDENTITY,
        operations: [Operation::Create, Operation::Update],
    }
}
