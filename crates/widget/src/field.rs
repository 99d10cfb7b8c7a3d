//! The style-upload field: bridges a user-driven file upload into the
//! host-managed resource payload, gating submission on upload completion
//! when creating a new resource.

use std::sync::Arc;

use mapstyle_core::{Composite, FieldError, FieldResult, FormField, Operation};
use mapstyle_upload::{UploadControl, UploadPhase};
use serde_json::json;
use tracing::debug;

use crate::i18n::Catalog;
use crate::template::{TemplateEngine, STYLE_UPLOAD_TEMPLATE};

/// Resource identity this widget serves; also the payload prefix.
pub const IDENTITY: &str = "mapnik_vector_style";

/// Dotted payload path the field owns within the composite.
pub const FILE_UPLOAD_PATH: &str = "mapnik_vector_style.file_upload";

pub struct StyleUploadField {
    title: String,
    catalog: Arc<Catalog>,
    engine: Arc<dyn TemplateEngine>,
    upload: UploadControl,
}

impl StyleUploadField {
    pub fn new(catalog: Arc<Catalog>, engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            title: catalog.gettext("Mapnik style"),
            catalog,
            engine,
            upload: UploadControl::new(),
        }
    }

    /// The upload sub-widget; hosts wire file selections through it.
    pub fn upload(&self) -> &UploadControl {
        &self.upload
    }
}

impl FormField for StyleUploadField {
    fn title(&self) -> &str {
        &self.title
    }

    fn render(&self) -> FieldResult<String> {
        let status = match self.upload.phase() {
            UploadPhase::Pending => Some(self.catalog.gettext("Uploading...")),
            UploadPhase::Rejected => Some(self.catalog.gettext("Upload failed")),
            UploadPhase::Absent | UploadPhase::Resolved => None,
        };
        let ctx = json!({
            "title": self.title,
            "prompt": self.catalog.gettext("Style file"),
            "status": status,
        });
        self.engine
            .render(STYLE_UPLOAD_TEMPLATE, &ctx)
            .map_err(|e| FieldError::Template(e.to_string()))
    }

    fn validate(&self, composite: &Composite) -> bool {
        match composite.operation {
            // An existing resource may be edited without re-uploading.
            Operation::Update => true,
            Operation::Create => {
                let phase = self.upload.phase();
                let ok = phase == UploadPhase::Resolved;
                if !ok {
                    debug!(?phase, "style upload not ready; blocking create");
                }
                ok
            }
        }
    }

    fn serialize_into(&self, composite: &mut Composite) {
        composite.set_path(FILE_UPLOAD_PATH, self.upload.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::JinjaEngine;
    use mapstyle_upload::{UploadError, UploadedFile};
    use serde_json::Value;
    use std::collections::HashMap;

    fn field() -> StyleUploadField {
        StyleUploadField::new(Catalog::empty(), Arc::new(JinjaEngine::new().unwrap()))
    }

    fn meta(id: &str) -> UploadedFile {
        UploadedFile {
            id: id.to_string(),
            name: "style.xml".to_string(),
            size: 512,
            mime_type: "text/xml".to_string(),
        }
    }

    #[test]
    fn create_with_no_selection_rejects() {
        let f = field();
        let c = Composite::new(Operation::Create);
        assert!(!f.validate(&c));
    }

    #[test]
    fn create_with_transfer_in_flight_rejects() {
        let f = field();
        let c = Composite::new(Operation::Create);
        let _ticket = f.upload().begin();
        assert!(!f.validate(&c));
    }

    #[test]
    fn create_with_resolved_transfer_accepts_and_serializes_handle() {
        let f = field();
        let mut c = Composite::new(Operation::Create);
        f.upload().begin().resolve(meta("upload:abc123"));

        assert!(f.validate(&c));
        f.serialize_into(&mut c);
        let value = c.get_path(FILE_UPLOAD_PATH).unwrap();
        assert_eq!(value["id"], "upload:abc123");
        assert_eq!(value["size"], 512);
    }

    #[test]
    fn update_accepts_without_any_upload() {
        let f = field();
        let mut c = Composite::new(Operation::Update);
        assert!(f.validate(&c));
        f.serialize_into(&mut c);
        assert_eq!(c.get_path(FILE_UPLOAD_PATH), Some(&Value::Null));
    }

    #[test]
    fn update_accepts_even_after_rejection() {
        let f = field();
        let c = Composite::new(Operation::Update);
        f.upload()
            .begin()
            .reject(UploadError::Transport("boom".into()));
        assert!(f.validate(&c));
    }

    #[test]
    fn create_after_rejection_recovers_with_a_fresh_upload() {
        let f = field();
        let c = Composite::new(Operation::Create);
        f.upload()
            .begin()
            .reject(UploadError::Transport("timeout".into()));
        assert!(!f.validate(&c));

        f.upload().begin().resolve(meta("upload:retry"));
        assert!(f.validate(&c));
    }

    #[test]
    fn stale_pending_outcome_never_surfaces() {
        let f = field();
        let c = Composite::new(Operation::Create);
        let stale = f.upload().begin();
        let fresh = f.upload().begin();

        stale.resolve(meta("upload:stale"));
        assert!(!f.validate(&c));

        fresh.resolve(meta("upload:fresh"));
        assert!(f.validate(&c));
        let mut out = Composite::new(Operation::Create);
        f.serialize_into(&mut out);
        assert_eq!(out.get_path(FILE_UPLOAD_PATH).unwrap()["id"], "upload:fresh");
    }

    #[test]
    fn serialize_is_idempotent() {
        let f = field();
        let mut c = Composite::new(Operation::Create);
        f.upload().begin().resolve(meta("upload:abc123"));

        f.serialize_into(&mut c);
        let first = c.payload().clone();
        f.serialize_into(&mut c);
        assert_eq!(c.payload(), &first);
    }

    #[test]
    fn render_uses_localized_title() {
        let mut m = HashMap::new();
        m.insert("Mapnik style".to_string(), "Style Mapnik".to_string());
        let f = StyleUploadField::new(
            Arc::new(Catalog::new(m)),
            Arc::new(JinjaEngine::new().unwrap()),
        );
        assert_eq!(f.title(), "Style Mapnik");
        let markup = f.render().unwrap();
        assert!(markup.contains("Style Mapnik"));
        assert!(markup.contains("file_upload"));
    }

    #[test]
    fn render_reports_failed_upload() {
        let f = field();
        f.upload()
            .begin()
            .reject(UploadError::Transport("boom".into()));
        let markup = f.render().unwrap();
        assert!(markup.contains("Upload failed"));
    }
}
