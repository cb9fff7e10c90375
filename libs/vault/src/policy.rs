//! Access-policy templating with injection-safe identity validation.
//!
//! Policy documents are HCL, and both the team name and the application id
//! are interpolated into them. String interpolation into a structured policy
//! language is injection-prone, so both values are validated against a
//! restricted grammar strictly before any template substitution happens.
//! The grammar is the sole defense: quotes, braces, newlines, and backslashes
//! never reach the renderer.

use crate::error::{VaultError, VaultResult};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// Characters an identity may consist of, matched against the whole string.
static SAFE_IDENTITY: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9a-zA-Z\-._ /]+$").expect("identity grammar is a valid regex")
});

/// True iff `input` matches the safe identity grammar in its entirety.
#[must_use]
pub fn is_safe_identity(input: &str) -> bool {
    SAFE_IDENTITY.is_match(input)
}

/// Values substituted into the policy template.
#[derive(Debug, Serialize)]
struct PolicyScope<'a> {
    team_id: &'a str,
    app_id: &'a str,
}

const TEMPLATE_NAME: &str = "app-policy";

/// A parsed policy template, rendered once per issuance cycle.
pub struct PolicyTemplate {
    registry: Handlebars<'static>,
}

impl PolicyTemplate {
    /// Load and parse the template file.
    pub fn load(path: &Path) -> VaultResult<Self> {
        let mut registry = Handlebars::new();
        // Unknown placeholders are template bugs, not empty strings.
        registry.set_strict_mode(true);
        registry
            .register_template_file(TEMPLATE_NAME, path)
            .map_err(|e| VaultError::template(format!("{}: {e}", path.display())))?;
        Ok(Self { registry })
    }

    /// Parse a template from a string. Mainly for tests.
    pub fn from_source(source: &str) -> VaultResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| VaultError::template(e.to_string()))?;
        Ok(Self { registry })
    }

    /// Render the policy document for one application.
    ///
    /// Fails with [`VaultError::InvalidIdentity`] before any substitution if
    /// either value falls outside the safe grammar.
    pub fn render(&self, team_id: &str, app_id: &str) -> VaultResult<String> {
        if !is_safe_identity(team_id) || !is_safe_identity(app_id) {
            return Err(VaultError::InvalidIdentity);
        }

        let scope = PolicyScope { team_id, app_id };
        self.registry
            .render(TEMPLATE_NAME, &scope)
            .map_err(|e| VaultError::template(e.to_string()))
    }
}

impl std::fmt::Debug for PolicyTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyTemplate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"path "cubbyhole/{{app_id}}" {
  capabilities = ["read"]
}
path "secret/{{team_id}}/*" {
  capabilities = ["read", "list"]
}
"#;

    #[test]
    fn test_safe_identities() {
        assert!(is_safe_identity("myteam/myapp"));
        assert!(is_safe_identity("app-1.prod_eu west"));
        assert!(is_safe_identity("A"));
    }

    #[test]
    fn test_unsafe_identities() {
        assert!(!is_safe_identity(""));
        assert!(!is_safe_identity("team\""));
        assert!(!is_safe_identity("a{b}"));
        assert!(!is_safe_identity("line\nbreak"));
        assert!(!is_safe_identity("back\\slash"));
        assert!(!is_safe_identity("tab\there"));
    }

    #[test]
    fn test_render_substitutes_both_values() {
        let template = PolicyTemplate::from_source(TEMPLATE).unwrap();
        let rendered = template.render("myteam", "myteam/myapp").unwrap();
        assert!(rendered.contains(r#"path "cubbyhole/myteam/myapp""#));
        assert!(rendered.contains(r#"path "secret/myteam/*""#));
    }

    #[test]
    fn test_render_rejects_policy_injection() {
        let template = PolicyTemplate::from_source(TEMPLATE).unwrap();
        let hostile = "}\npath \"secret/*\" {\n\tpolicy = \"sudo\"\n}";
        let err = template.render(hostile, "myteam/myapp").unwrap_err();
        assert!(matches!(err, VaultError::InvalidIdentity));

        let err = template.render("myteam", hostile).unwrap_err();
        assert!(matches!(err, VaultError::InvalidIdentity));
    }

    #[test]
    fn test_strict_mode_fails_on_unknown_placeholder() {
        let template = PolicyTemplate::from_source("{{nonexistent}}").unwrap();
        let err = template.render("myteam", "myapp").unwrap_err();
        assert!(matches!(err, VaultError::TemplateRender(_)));
    }
}
