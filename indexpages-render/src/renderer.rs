//! [`TemplateRenderer`] over the bundled askama templates.

use crate::templates::{GroupListTemplate, IndexPageTemplate};
use crate::view::{PageView, ViewFields};
use askama::Template;
use indexpages_core::{Error, IndexNode, Result, TemplateRenderer, DEFAULT_TEMPLATE};
use indexpages_types::Pad;
use tracing::debug;

/// Template name of [`GroupListTemplate`]
pub const GROUPS_TEMPLATE: &str = "index-pages-groups.html";

/// Renders index nodes to HTML
///
/// Template names from the index configuration select one of the bundled
/// templates. Names the renderer does not know fall back to the default
/// page template.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    site_title: String,
    fields: ViewFields,
}

impl HtmlRenderer {
    pub fn new(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
            fields: ViewFields::default(),
        }
    }

    /// Read item titles and dates from other record fields
    pub fn with_fields(mut self, fields: ViewFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn fields(&self) -> &ViewFields {
        &self.fields
    }

    pub fn view(&self, node: &IndexNode, pad: &dyn Pad) -> Result<PageView> {
        PageView::build(node, pad, &self.fields)
    }
}

impl TemplateRenderer for HtmlRenderer {
    fn render(&self, template: &str, this: &IndexNode, pad: &dyn Pad) -> Result<String> {
        let page = self.view(this, pad)?;
        let site_title = self.site_title.as_str();

        let rendered = match template {
            GROUPS_TEMPLATE => GroupListTemplate {
                site_title,
                page: &page,
            }
            .render(),
            _ => {
                if template != DEFAULT_TEMPLATE {
                    debug!(template, "no bundled template, using {}", DEFAULT_TEMPLATE);
                }
                IndexPageTemplate {
                    site_title,
                    page: &page,
                }
                .render()
            }
        };
        rendered.map_err(|err| Error::Render {
            template: template.to_string(),
            message: err.to_string(),
        })
    }
}
