//! Request manifests
//!
//! The markup manifest is an appfilter fragment the icon pack author can
//! paste straight into their own filter. The JSON manifest carries the same
//! entries for tooling and for the remote backend.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use tracing::debug;

use iconrequest_core::{App, RequestConfig};

use crate::drawable::drawable_name;
use crate::PackageError;

/// File name of the written markup manifest
pub const MARKUP_FILE: &str = "appfilter.xml";
/// File name of the written JSON manifest
pub const JSON_FILE: &str = "appfilter.json";

/// Which manifests to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManifestFormats {
    pub markup: bool,
    pub json: bool,
}

impl From<&RequestConfig> for ManifestFormats {
    fn from(config: &RequestConfig) -> Self {
        Self {
            markup: config.wants_markup(),
            json: config.wants_json(),
        }
    }
}

/// One manifest entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComponentRecord {
    pub name: String,
    pub pkg: String,
    #[serde(rename = "componentInfo")]
    pub component_info: String,
    pub drawable: String,
}

impl ComponentRecord {
    fn from_app(app: &App) -> Self {
        Self {
            name: app.name().to_string(),
            pkg: app.package().to_string(),
            component_info: app.component().to_string(),
            drawable: drawable_name(app.name()),
        }
    }
}

#[derive(Serialize)]
struct ComponentList<'a> {
    components: &'a [ComponentRecord],
}

/// Rendered manifests for one request
#[derive(Debug, Clone, Default)]
pub struct RequestManifest {
    /// Entries in selection order
    pub records: Vec<ComponentRecord>,
    pub markup: Option<String>,
    pub json: Option<String>,
}

impl RequestManifest {
    /// Render the requested formats for `apps`, keeping their order
    pub fn build(apps: &[App], formats: ManifestFormats) -> Result<Self, PackageError> {
        let records: Vec<ComponentRecord> = apps.iter().map(ComponentRecord::from_app).collect();

        let markup = if formats.markup {
            Some(render_markup(&records)?)
        } else {
            None
        };
        let json = if formats.json {
            Some(render_json(&records)?)
        } else {
            None
        };

        Ok(Self { records, markup, json })
    }

    /// Write the manifests into `dir`.
    ///
    /// The JSON manifest is only put on disk when `include_json` is set; a
    /// remote request sends it as a form field instead.
    pub fn write_files(&self, dir: &Path, include_json: bool) -> Result<Vec<PathBuf>, PackageError> {
        let mut written = Vec::new();

        if let Some(markup) = &self.markup {
            written.push(write_manifest(dir, MARKUP_FILE, markup)?);
        }
        if include_json {
            if let Some(json) = &self.json {
                written.push(write_manifest(dir, JSON_FILE, json)?);
            }
        }

        Ok(written)
    }
}

fn write_manifest(dir: &Path, file: &str, content: &str) -> Result<PathBuf, PackageError> {
    let path = dir.join(file);
    fs::write(&path, content).map_err(|source| PackageError::ManifestWrite {
        file: file.to_string(),
        source,
    })?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

fn render_markup(records: &[ComponentRecord]) -> Result<String, PackageError> {
    render_markup_inner(records).map_err(|e| PackageError::Render {
        format: "markup",
        message: e.to_string(),
    })
}

fn render_markup_inner(records: &[ComponentRecord]) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);

    writer.write_event(Event::Start(BytesStart::new("resources")))?;
    for layer in ["iconback", "iconmask", "iconupon"] {
        let mut elem = BytesStart::new(layer);
        elem.push_attribute(("img1", layer));
        writer.write_event(Event::Empty(elem))?;
    }
    let mut scale = BytesStart::new("scale");
    scale.push_attribute(("factor", "1.0"));
    writer.write_event(Event::Empty(scale))?;

    for record in records {
        let label = format!(" {} ", comment_label(&record.name));
        writer.write_event(Event::Comment(BytesText::from_escaped(label)))?;

        let component = format!("ComponentInfo{{{}}}", record.component_info);
        let mut item = BytesStart::new("item");
        item.push_attribute(("component", component.as_str()));
        item.push_attribute(("drawable", record.drawable.as_str()));
        writer.write_event(Event::Empty(item))?;
    }

    writer.write_event(Event::End(BytesEnd::new("resources")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// App name as it may appear inside a comment.
///
/// Comment content is never entity-decoded, so the name goes in raw. It has
/// to stay on one line for the filter reader, and `--` may not appear.
fn comment_label(name: &str) -> String {
    let mut label = name.replace(['\r', '\n'], " ");
    while label.contains("--") {
        label = label.replace("--", "- -");
    }
    label.trim_end_matches('-').to_string()
}

fn render_json(records: &[ComponentRecord]) -> Result<String, PackageError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    ComponentList { components: records }
        .serialize(&mut serializer)
        .map_err(|e| PackageError::Render {
            format: "JSON",
            message: e.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconrequest_appfilter::FilterParser;

    fn sample_apps() -> Vec<App> {
        vec![
            App::new("Maps", "com.maps", "com.maps/com.maps.Main"),
            App::new("Camera & Photos", "com.cam", "com.cam/com.cam.Main"),
            App::new("Clock", "com.clock", "com.clock/com.clock.Main"),
        ]
    }

    const BOTH: ManifestFormats = ManifestFormats { markup: true, json: true };

    #[test]
    fn test_markup_layout() {
        let manifest = RequestManifest::build(&sample_apps()[..1], BOTH).unwrap();
        let markup = manifest.markup.unwrap();

        assert!(markup.starts_with("<resources>"));
        assert!(markup.contains(r#"<iconback img1="iconback"/>"#));
        assert!(markup.contains(r#"<scale factor="1.0"/>"#));
        assert!(markup.contains("<!-- Maps -->"));
        assert!(markup.contains(r#"<item component="ComponentInfo{com.maps/com.maps.Main}" drawable="maps"/>"#));
        assert!(markup.trim_end().ends_with("</resources>"));
    }

    #[test]
    fn test_markup_comment_keeps_raw_name() {
        let apps = vec![
            App::new("Camera & Photos <Pro>", "com.cam", "com.cam/com.cam.Main"),
            App::new("Beta -- Build-", "com.beta", "com.beta/com.beta.Main"),
        ];
        let markup = RequestManifest::build(&apps, BOTH).unwrap().markup.unwrap();

        assert!(markup.contains("<!-- Camera & Photos <Pro> -->"));
        assert!(!markup.contains("&amp;"));
        assert!(markup.contains("<!-- Beta - - Build -->"));

        let parsed = FilterParser::new(false).parse_str(&markup);
        assert_eq!(parsed.themed.len(), 2);
    }

    #[test]
    fn test_markup_is_readable_by_filter_parser() {
        let apps = sample_apps();
        let manifest = RequestManifest::build(&apps, BOTH).unwrap();
        let parsed = FilterParser::new(true).parse_str(manifest.markup.as_deref().unwrap());

        let components: Vec<_> = parsed.entries.iter().filter_map(|e| e.component.clone()).collect();
        let expected: Vec<_> = apps.iter().map(|a| a.component().to_string()).collect();
        assert_eq!(components, expected);
        assert!(parsed.report.is_empty());
        assert_eq!(parsed.entries[1].drawable.as_deref(), Some("camera_photos"));
    }

    #[test]
    fn test_json_matches_markup_order() {
        let apps = sample_apps();
        let manifest = RequestManifest::build(&apps, BOTH).unwrap();
        let json: serde_json::Value = serde_json::from_str(manifest.json.as_deref().unwrap()).unwrap();

        let components = json["components"].as_array().unwrap();
        assert_eq!(components.len(), 3);
        for (entry, app) in components.iter().zip(&apps) {
            assert_eq!(entry["name"], app.name());
            assert_eq!(entry["pkg"], app.package());
            assert_eq!(entry["componentInfo"], app.component());
        }
        assert_eq!(components[2]["drawable"], "clock");
        assert!(manifest.json.unwrap().contains("\n        {"));
    }

    #[test]
    fn test_formats_from_config() {
        let email = RequestConfig::default();
        assert_eq!(ManifestFormats::from(&email), ManifestFormats { markup: true, json: false });

        let remote = RequestConfig {
            remote: Some(iconrequest_core::RemoteConfig::new("https://example.org", "key", "me")),
            ..RequestConfig::default()
        };
        assert_eq!(ManifestFormats::from(&remote), ManifestFormats { markup: false, json: true });
    }

    #[test]
    fn test_write_files() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = RequestManifest::build(&sample_apps(), BOTH).unwrap();

        let remote = manifest.write_files(tmp.path(), false).unwrap();
        assert_eq!(remote, vec![tmp.path().join(MARKUP_FILE)]);

        let email = manifest.write_files(tmp.path(), true).unwrap();
        assert_eq!(email.len(), 2);
        assert!(tmp.path().join(JSON_FILE).exists());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = RequestManifest::build(&sample_apps(), BOTH).unwrap();
        let err = manifest.write_files(&tmp.path().join("gone"), true).unwrap_err();
        assert!(matches!(err, PackageError::ManifestWrite { ref file, .. } if file == MARKUP_FILE));
    }
}
