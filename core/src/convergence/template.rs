//! Minimal template language for configuration files.
//!
//! Two constructs are understood: `{{ key }}` substitutes a context value and
//! `{% if key %} ... {% endif %}` keeps its body only when `key` is truthy.
//! A block tag swallows the newline directly after it, so tags can sit on
//! their own lines without leaving blank lines behind. Every key must exist
//! in the context; a missing key is an error, never an empty string.

use std::collections::BTreeMap;

use crate::error::TemplateError;

/// A value a template can reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Text(String),
    Flag(bool),
}

impl ContextValue {
    fn is_truthy(&self) -> bool {
        match self {
            ContextValue::Text(s) => !s.is_empty(),
            ContextValue::Flag(b) => *b,
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            ContextValue::Text(s) => out.push_str(s),
            ContextValue::Flag(true) => out.push_str("True"),
            ContextValue::Flag(false) => out.push_str("False"),
        }
    }
}

/// Ordered key → value map templates are rendered against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    values: BTreeMap<String, ContextValue>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), ContextValue::Text(value.into()));
    }

    pub fn flag(&mut self, key: impl Into<String>, value: bool) {
        self.values.insert(key.into(), ContextValue::Flag(value));
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var { key: String, line: usize },
    If { key: String, line: usize, body: Vec<Node> },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut stack: Vec<(String, usize, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();
        let mut rest = source;
        let mut line = 1;

        loop {
            let next = match (rest.find("{{"), rest.find("{%")) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            let Some(pos) = next else {
                push_text(&mut current, rest);
                break;
            };

            let (text, tag) = rest.split_at(pos);
            push_text(&mut current, text);
            line += text.matches('\n').count();

            let is_var = tag.starts_with("{{");
            let (open, close) = if is_var { ("{{", "}}") } else { ("{%", "%}") };
            let body = &tag[2..];
            let end = body
                .find(close)
                .ok_or(TemplateError::Unterminated { open, line })?;
            let inner = body[..end].trim();
            let tag_line = line;
            line += body[..end].matches('\n').count();
            rest = &body[end + 2..];

            if is_var {
                if inner.is_empty() || inner.contains(char::is_whitespace) {
                    return Err(TemplateError::UnsupportedTag { tag: inner.to_string(), line: tag_line });
                }
                current.push(Node::Var { key: inner.to_string(), line: tag_line });
                continue;
            }

            if let Some(stripped) = rest.strip_prefix('\n') {
                rest = stripped;
                line += 1;
            }
            let words: Vec<&str> = inner.split_whitespace().collect();
            match words.as_slice() {
                ["if", key] => {
                    stack.push((key.to_string(), tag_line, std::mem::take(&mut current)));
                }
                ["endif"] => {
                    let (key, if_line, parent) = stack
                        .pop()
                        .ok_or(TemplateError::UnbalancedEndif { line: tag_line })?;
                    let body = std::mem::replace(&mut current, parent);
                    current.push(Node::If { key, line: if_line, body });
                }
                _ => {
                    return Err(TemplateError::UnsupportedTag { tag: inner.to_string(), line: tag_line });
                }
            }
        }

        if let Some((key, line, _)) = stack.pop() {
            return Err(TemplateError::UnclosedIf { key, line });
        }
        Ok(Template { nodes: current })
    }

    pub fn render(&self, context: &RenderContext) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, context, &mut out)?;
        Ok(out)
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn lookup<'c>(context: &'c RenderContext, key: &str, line: usize) -> Result<&'c ContextValue, TemplateError> {
    context.get(key).ok_or_else(|| TemplateError::UnknownKey { key: key.to_string(), line })
}

fn render_nodes(nodes: &[Node], context: &RenderContext, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { key, line } => lookup(context, key, *line)?.render_into(out),
            Node::If { key, line, body } => {
                if lookup(context, key, *line)?.is_truthy() {
                    render_nodes(body, context, out)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RenderContext {
        let mut ctx = RenderContext::new();
        ctx.text("database.connection", "mysql+pymysql://u:p@db:3306/cinder");
        ctx.flag("options.debug", true);
        ctx.flag("ingress_public", false);
        ctx.text("ingress_public_url", "");
        ctx
    }

    #[test]
    fn substitutes_values() {
        let t = Template::parse("[database]\nconnection = {{ database.connection }}\n").unwrap();
        assert_eq!(
            t.render(&context()).unwrap(),
            "[database]\nconnection = mysql+pymysql://u:p@db:3306/cinder\n"
        );
    }

    #[test]
    fn flags_render_capitalised() {
        let t = Template::parse("debug = {{options.debug}}").unwrap();
        assert_eq!(t.render(&context()).unwrap(), "debug = True");
    }

    #[test]
    fn false_section_is_omitted_without_blank_lines() {
        let t = Template::parse("[DEFAULT]\n{% if ingress_public %}\npublic_endpoint = {{ missing.key }}\n{% endif %}\ndebug = {{ options.debug }}\n").unwrap();
        assert_eq!(t.render(&context()).unwrap(), "[DEFAULT]\ndebug = True\n");
    }

    #[test]
    fn true_section_is_kept() {
        let t = Template::parse("{% if options.debug %}\nverbose\n{% endif %}\nend\n").unwrap();
        assert_eq!(t.render(&context()).unwrap(), "verbose\nend\n");
    }

    #[test]
    fn nested_sections() {
        let t = Template::parse("{% if options.debug %}\na\n{% if ingress_public %}\nb\n{% endif %}\nc\n{% endif %}\n").unwrap();
        assert_eq!(t.render(&context()).unwrap(), "a\nc\n");
    }

    #[test]
    fn unknown_key_reports_line() {
        let t = Template::parse("a\nb = {{ nope }}\n").unwrap();
        assert_eq!(
            t.render(&context()).unwrap_err(),
            TemplateError::UnknownKey { key: "nope".into(), line: 2 }
        );
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(Template::parse("{{ open"), Err(TemplateError::Unterminated { open: "{{", .. })));
        assert!(matches!(Template::parse("{% endif %}"), Err(TemplateError::UnbalancedEndif { line: 1 })));
        assert!(matches!(Template::parse("\n{% if x %}\n"), Err(TemplateError::UnclosedIf { line: 2, .. })));
        assert!(matches!(Template::parse("{% for x in y %}"), Err(TemplateError::UnsupportedTag { .. })));
    }

    #[test]
    fn apache_percent_braces_are_plain_text() {
        let t = Template::parse("display-name=%{GROUP}\nErrorLogFormat \"%{cu}t %M\"\n").unwrap();
        assert_eq!(t.render(&RenderContext::new()).unwrap(), "display-name=%{GROUP}\nErrorLogFormat \"%{cu}t %M\"\n");
    }
}
