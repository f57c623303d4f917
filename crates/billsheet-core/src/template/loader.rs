//! Template repository loading.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use super::schema::TemplateDef;
use super::Template;
use crate::error::TemplateError;

/// Read every template defined in one YAML file.
///
/// A file holds a single template, several `---` separated documents, or a
/// top-level list of templates.
pub fn read_templates(path: &Path) -> Result<Vec<Template>, TemplateError> {
    let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_templates(&content, path)
}

/// Parse the templates defined in `content`, as read from `path`.
pub fn parse_templates(content: &str, path: &Path) -> Result<Vec<Template>, TemplateError> {
    let parse_error = |e: serde_yaml::Error| TemplateError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut defs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        match serde_yaml::Value::deserialize(document).map_err(parse_error)? {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Sequence(items) => {
                for item in items {
                    defs.push(serde_yaml::from_value::<TemplateDef>(item).map_err(parse_error)?);
                }
            }
            value => defs.push(serde_yaml::from_value::<TemplateDef>(value).map_err(parse_error)?),
        }
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string());
    let single = defs.len() == 1;

    defs.into_iter()
        .enumerate()
        .map(|(i, def)| {
            let name = if single {
                stem.clone()
            } else {
                format!("{}#{}", stem, i + 1)
            };
            Template::compile(def, name, path)
        })
        .collect()
}

/// Recursively load every template file under `root`.
///
/// Files are visited in directory-walk order, which depends on the
/// platform, and templates keep that order. A missing `root` yields an
/// empty collection. Symlinks are followed. Unreadable directory entries
/// and broken links are skipped; a malformed
/// template file is an error.
pub fn read_templates_from_dir(
    root: &Path,
    extensions: &[String],
) -> Result<Vec<Template>, TemplateError> {
    let mut templates = Vec::new();

    if !root.exists() {
        warn!("Templates directory {} does not exist", root.display());
        return Ok(templates);
    }

    let suffixes: Vec<String> = extensions
        .iter()
        .map(|e| format!(".{}", e.trim_start_matches('.')))
        .collect();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !suffixes.iter().any(|s| file_name.ends_with(s.as_str())) {
            trace!("Ignoring non-template file {}", entry.path().display());
            continue;
        }

        let loaded = read_templates(entry.path())?;
        info!("Template loaded from {}", entry.path().display());
        templates.extend(loaded);
    }

    debug!("Loaded {} templates from {}", templates.len(), root.display());
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const VENDOR: &str = "issuer: {issuer}\nkeywords: {issuer}\nfields:\n  amount: Total\\s+(\\S+)\n";

    fn vendor(issuer: &str) -> String {
        VENDOR.replace("{issuer}", issuer)
    }

    #[test]
    fn test_two_files_two_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vendorA.yml"), vendor("VendorA")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("vendorB.yaml"), vendor("VendorB")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let templates = read_templates_from_dir(dir.path(), &["yml".into(), "yaml".into()]).unwrap();
        assert_eq!(templates.len(), 2);

        let mut issuers: Vec<&str> = templates.iter().map(|t| t.issuer()).collect();
        issuers.sort();
        assert_eq!(issuers, vec!["VendorA", "VendorB"]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let templates =
            read_templates_from_dir(&dir.path().join("absent"), &["yml".into()]).unwrap();
        assert!(templates.is_empty());
    }

    #[test]
    fn test_multi_document_file_keeps_order() {
        let content = format!("{}---\n{}", vendor("First"), vendor("Second"));
        let templates = parse_templates(&content, Path::new("multi.yml")).unwrap();

        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].issuer(), "First");
        assert_eq!(templates[0].name(), "multi#1");
        assert_eq!(templates[1].issuer(), "Second");
        assert_eq!(templates[1].name(), "multi#2");
    }

    #[test]
    fn test_sequence_file() {
        let content = "- issuer: A\n  keywords: a\n  fields: {amount: x}\n\
                       - issuer: B\n  name: bee\n  keywords: b\n  fields: {amount: x}\n";
        let templates = parse_templates(content, Path::new("list.yml")).unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[1].name(), "bee");
    }

    #[test]
    fn test_single_template_named_after_file() {
        let templates = parse_templates(&vendor("Acme"), Path::new("dir/acme.yml")).unwrap();
        assert_eq!(templates[0].name(), "acme");
        assert_eq!(templates[0].source(), Path::new("dir/acme.yml"));
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.yml"), vendor("Good")).unwrap();
        fs::write(dir.path().join("broken.yml"), "issuer: [unclosed\n").unwrap();

        let err = read_templates_from_dir(dir.path(), &["yml".into()]).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_template_is_loaded() {
        let shared = tempfile::tempdir().unwrap();
        let target = shared.path().join("vendorA.yml");
        fs::write(&target, vendor("VendorA")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("linked.yml")).unwrap();

        let templates = read_templates_from_dir(dir.path(), &["yml".to_string()]).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].issuer(), "VendorA");
    }
}
