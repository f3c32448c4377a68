//! HTML block templates
//!
//! Template names end in `.html` so MiniJinja auto-escapes every value;
//! nested block markup is passed through the `safe` filter. Sources are
//! compiled per render.

use minijinja::{Environment, Value};

pub(crate) const WRAPPER: &str = "wrapper.html";
pub(crate) const H1: &str = "h1.html";
pub(crate) const H2: &str = "h2.html";
pub(crate) const HEADING: &str = "heading.html";
pub(crate) const PARAGRAPH: &str = "paragraph.html";
pub(crate) const IMAGE: &str = "image.html";
pub(crate) const TABLE: &str = "table.html";
pub(crate) const TABLE_ERROR: &str = "table_error.html";
pub(crate) const CONTAINER: &str = "container.html";

fn source(name: &str) -> Option<&'static str> {
    let source = match name {
        WRAPPER => r#"<div class="w-full"{% if id %} id="{{ id }}"{% endif %}>{{ inner|safe }}</div>"#,
        H1 => r#"<h1 class="text-4xl font-bold mb-4">{{ text }}</h1>"#,
        H2 => r#"<h2 class="text-3xl font-semibold mb-3">{{ text }}</h2>"#,
        HEADING => r#"<h1{% if class %} class="{{ class }}"{% endif %}>{{ text }}</h1>"#,
        PARAGRAPH => r#"<p class="text-base mb-4">{{ text }}</p>"#,
        IMAGE => concat!(
            r#"<div class="relative w-full" style="height: {{ height }}px">"#,
            r#"<img src="{{ src }}" alt="{{ alt }}" class="object-cover rounded-lg">"#,
            "</div>"
        ),
        TABLE => concat!(
            r#"<div class="tabula-table" data-table="{{ table_id }}">"#,
            r#"{% if title %}<h3 class="text-xl font-semibold mb-2">{{ title }}</h3>{% endif %}"#,
            r#"<table class="w-full text-sm"><thead><tr>"#,
            "{% for header in headers %}<th>{{ header }}</th>{% endfor %}",
            "</tr></thead><tbody>",
            "{% for row in rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>",
            r#"{% else %}<tr><td colspan="{{ headers|length }}">No results.</td></tr>{% endfor %}"#,
            "</tbody></table>",
            r#"<p class="text-muted-foreground text-sm">Page {{ current_page }} of {{ total_pages }} ({{ total_items }} items)</p>"#,
            "</div>"
        ),
        TABLE_ERROR => {
            r#"<div class="tabula-table-error text-red-500" data-table="{{ table_id }}">{{ message }}</div>"#
        }
        CONTAINER => concat!(
            r#"<div class="w-full px-4 mb-8"><div class="{{ grid_class }}">"#,
            r#"{% for column in columns %}<div class="{{ column.class }} px-4">"#,
            "{% for block in column.blocks %}{{ block|safe }}{% endfor %}",
            "</div>{% endfor %}</div></div>"
        ),
        _ => return None,
    };
    Some(source)
}

/// Environment holding every block template
pub(crate) struct BlockTemplates {
    env: Environment<'static>,
}

impl BlockTemplates {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    pub fn render(&self, name: &'static str, context: Value) -> Result<String, minijinja::Error> {
        let source = source(name).ok_or_else(|| {
            minijinja::Error::new(minijinja::ErrorKind::TemplateNotFound, name)
        })?;
        self.env.template_from_named_str(name, source)?.render(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_values_are_escaped() {
        let templates = BlockTemplates::new();
        let html = templates
            .render(PARAGRAPH, context! { text => "<script> & co" })
            .unwrap();
        assert_eq!(html, "<p class=\"text-base mb-4\">&lt;script&gt; &amp; co</p>");
    }

    #[test]
    fn test_wrapper_keeps_inner_markup() {
        let templates = BlockTemplates::new();
        let html = templates
            .render(WRAPPER, context! { id => "intro", inner => "<p>x</p>" })
            .unwrap();
        assert_eq!(html, "<div class=\"w-full\" id=\"intro\"><p>x</p></div>");
    }

    #[test]
    fn test_unknown_template() {
        assert!(BlockTemplates::new().render("missing.html", context! {}).is_err());
    }
}
