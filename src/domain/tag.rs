use crate::error::{HydroError, Result};

/// Default tag naming for projects that declare none
pub const DEFAULT_TAG_TEMPLATE: &str = "${name}/${version}";

/// Values available to a tag template
#[derive(Debug, Clone)]
pub struct TagContext<'a> {
    pub name: &'a str,
    pub version: &'a str,
}

/// Tag naming template (e.g., "${name}/${version}", "release-${version}")
///
/// Only the `name` and `version` placeholders exist. Anything else inside
/// `${...}` is a configuration error rather than an empty substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTemplate {
    pub template: String,
}

impl TagTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        TagTemplate {
            template: template.into(),
        }
    }

    /// Render the template
    /// Example: template="${name}@${version}", name="api", version="1.2.3" -> "api@1.2.3"
    pub fn render(&self, context: &TagContext<'_>) -> Result<String> {
        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("${") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| {
                HydroError::config(format!(
                    "Unterminated placeholder in tag template '{}'",
                    self.template
                ))
            })?;

            match after[..end].trim() {
                "name" => rendered.push_str(context.name),
                "version" => rendered.push_str(context.version),
                other => {
                    return Err(HydroError::config(format!(
                        "Unknown placeholder '${{{}}}' in tag template '{}'",
                        other, self.template
                    )))
                }
            }
            rest = &after[end + 1..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

impl Default for TagTemplate {
    fn default() -> Self {
        TagTemplate::new(DEFAULT_TAG_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TagContext<'static> {
        TagContext {
            name: "api",
            version: "1.2.3",
        }
    }

    #[test]
    fn test_default_template() {
        assert_eq!(TagTemplate::default().render(&ctx()).unwrap(), "api/1.2.3");
    }

    #[test]
    fn test_template_with_prefix() {
        let template = TagTemplate::new("release-${version}");
        assert_eq!(template.render(&ctx()).unwrap(), "release-1.2.3");
    }

    #[test]
    fn test_template_without_placeholders() {
        let template = TagTemplate::new("latest");
        assert_eq!(template.render(&ctx()).unwrap(), "latest");
    }

    #[test]
    fn test_template_keeps_lone_dollar() {
        let template = TagTemplate::new("$${name}-v${version}");
        assert_eq!(template.render(&ctx()).unwrap(), "$api-v1.2.3");
    }

    #[test]
    fn test_unknown_placeholder_fails_closed() {
        let template = TagTemplate::new("${name}/${path}");
        let err = template.render(&ctx()).unwrap_err();
        assert!(matches!(err, HydroError::Config(_)));
        assert!(err.to_string().contains("${path}"));
    }

    #[test]
    fn test_expression_is_not_evaluated() {
        let template = TagTemplate::new("${version.split('.')[0]}");
        assert!(template.render(&ctx()).is_err());
    }

    #[test]
    fn test_unterminated_placeholder() {
        let template = TagTemplate::new("${name/${version");
        assert!(matches!(
            template.render(&ctx()),
            Err(HydroError::Config(_))
        ));
    }
}
