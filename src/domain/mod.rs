//! Domain types and models

mod source;
mod options;
pub mod template;

pub use source::{
    parse_data_uri, to_data_uri, ImageDataError, ImageIdentity, SourceImage,
};
pub use options::{
    AspectRatio, GenerationMode, GenerationOptions, Resolution,
};
pub use template::{Template, TemplateCatalog, TemplateDraft, TemplateError};

/// File name offered when downloading the selected variant
pub fn download_file_name(active_template_id: Option<&str>) -> String {
    format!("stylized-{}.png", active_template_id.unwrap_or("custom"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name(Some("porcelain_doll")), "stylized-porcelain_doll.png");
        assert_eq!(download_file_name(None), "stylized-custom.png");
    }
}
