//! Local Fallback Catalog
//!
//! The minimal built-in agent set plus the on-disk fallback file that
//! mirrors the last good remote body.

use std::fs;
use std::path::Path;

use super::error::CatalogError;
use super::types::{AgentSignature, CatalogOrigin, CatalogPayload, PatternCatalog};

/// Version tag of the compiled-in set
pub const BUILTIN_VERSION: &str = "1.0.0";

const ANTHROPIC_CRAWLER_DOCS: &str = "https://support.anthropic.com/en/articles/8896518-does-anthropic-crawl-data-from-the-web-and-how-can-site-owners-block-the-crawler";

fn signature(
    pattern: &str,
    url: &str,
    agent_type: &str,
    category: &str,
    subcategory: &str,
    company: &str,
    intent: &str,
) -> AgentSignature {
    AgentSignature {
        pattern: pattern.to_string(),
        agent_type: agent_type.to_string(),
        category: category.to_string(),
        subcategory: subcategory.to_string(),
        company: Some(company.to_string()),
        is_compliant: true,
        intent: intent.to_string(),
        is_ai_model_trainer: false,
        is_ai_visitor: category == "AI Agent",
        is_crawler: category == "AI Crawler",
        reference_url: Some(url.to_string()),
    }
}

/// Compiled-in agents so the shield is never catalog-less
pub fn builtin_payload() -> CatalogPayload {
    CatalogPayload {
        version: BUILTIN_VERSION.to_string(),
        patterns: Some(vec![
            signature(
                r"Perplexity-User\/[0-9]",
                "https://docs.perplexity.ai/guides/bots",
                "perplexity-user",
                "AI Agent",
                "AI Assistants",
                "Perplexity AI",
                "UserQuery",
            ),
            signature(
                r"Claude-User\/[0-9]",
                ANTHROPIC_CRAWLER_DOCS,
                "claude-user",
                "AI Agent",
                "AI Assistants",
                "Anthropic",
                "UserQuery",
            ),
            signature(
                r"Claude-SearchBot\/[0-9]",
                ANTHROPIC_CRAWLER_DOCS,
                "claude-searchbot",
                "AI Crawler",
                "Search Enhancement Crawlers",
                "Anthropic",
                "Search",
            ),
        ]),
        ai_referrers: Vec::new(),
        property_settings: None,
    }
}

/// Built-in catalog; the payload is static and always valid
pub fn builtin_catalog() -> PatternCatalog {
    match PatternCatalog::from_payload(builtin_payload(), CatalogOrigin::BuiltIn) {
        Ok(catalog) => catalog,
        Err(e) => unreachable!("built-in catalog rejected: {}", e),
    }
}

/// Load the fallback JSON file
pub fn read_fallback_file(path: &Path) -> Result<PatternCatalog, CatalogError> {
    let body = fs::read_to_string(path)?;
    PatternCatalog::from_json(&body, CatalogOrigin::LocalFile)
}

/// Replace the fallback file with a fresh remote body
pub fn write_fallback_file(path: &Path, body: &str) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_never_empty() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.origin(), CatalogOrigin::BuiltIn);
        assert_eq!(catalog.agents().len(), 3);
        assert_eq!(catalog.faulty_patterns(), 0);
        assert!(catalog.policy().is_none());
    }

    #[test]
    fn test_fallback_file_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents").join("agents.json");
        assert!(matches!(read_fallback_file(&path), Err(CatalogError::Io(_))));

        let body = builtin_payload().to_json().unwrap();
        write_fallback_file(&path, &body).unwrap();

        let catalog = read_fallback_file(&path).unwrap();
        assert_eq!(catalog.origin(), CatalogOrigin::LocalFile);
        assert_eq!(catalog.version(), BUILTIN_VERSION);
    }

    #[test]
    fn test_empty_fallback_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        fs::write(&path, r#"{"version":"9","patterns":[]}"#).unwrap();
        assert!(matches!(read_fallback_file(&path), Err(CatalogError::EmptyPatterns)));
    }
}
