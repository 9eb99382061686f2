//! Minimal ERB-style template language used by the scaffold templates.
//!
//! ```text
//! <%= props.name %>                    interpolation, never escaped
//! <% if props.url %>…<% else %>…<% end %>
//! <% each props.permissions as permission %>…<% end %>
//! <%# comment %>
//! ```
//!
//! A block tag closed with `-%>` also consumes the newline right after it.

use std::path::PathBuf;

use serde_json::Value;

use super::source::TemplateSource;

/// Name the property bag is bound to inside templates.
pub const PROPS_VAR: &str = "props";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("{name}: {message} (at byte {offset})")]
    Syntax {
        name: String,
        offset: usize,
        message: String,
    },

    #[error("failed to read template {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Expr(Vec<String>),
    If {
        cond: Vec<String>,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        list: Vec<String>,
        binding: String,
        body: Vec<Node>,
    },
}

enum Frame {
    If {
        cond: Vec<String>,
        then: Vec<Node>,
        otherwise: Vec<Node>,
        in_else: bool,
        offset: usize,
    },
    Each {
        list: Vec<String>,
        binding: String,
        body: Vec<Node>,
        offset: usize,
    },
}

impl Frame {
    fn into_node(self) -> Node {
        match self {
            Frame::If {
                cond,
                then,
                otherwise,
                ..
            } => Node::If {
                cond,
                then,
                otherwise,
            },
            Frame::Each {
                list,
                binding,
                body,
                ..
            } => Node::Each {
                list,
                binding,
                body,
            },
        }
    }

    fn offset(&self) -> usize {
        match self {
            Frame::If { offset, .. } | Frame::Each { offset, .. } => *offset,
        }
    }
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let syntax = |offset: usize, message: &str| TemplateError::Syntax {
            name: name.to_string(),
            offset,
            message: message.to_string(),
        };

        let mut root = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        loop {
            let Some(start) = rest.find("<%") else {
                push_text(current(&mut root, &mut stack), rest);
                break;
            };
            push_text(current(&mut root, &mut stack), &rest[..start]);

            let tag_offset = offset + start;
            let body = &rest[start + 2..];
            let end = body
                .find("%>")
                .ok_or_else(|| syntax(tag_offset, "unterminated tag"))?;

            let mut inner = &body[..end];
            let mut consumed = start + 2 + end + 2;
            if let Some(stripped) = inner.strip_suffix('-') {
                inner = stripped;
                let tail = &rest[consumed..];
                if tail.starts_with("\r\n") {
                    consumed += 2;
                } else if tail.starts_with('\n') {
                    consumed += 1;
                }
            }

            if let Some(expr) = inner.strip_prefix('=') {
                let path = parse_path(expr).ok_or_else(|| syntax(tag_offset, "invalid expression"))?;
                current(&mut root, &mut stack).push(Node::Expr(path));
            } else if inner.starts_with('#') {
                // comment
            } else {
                let statement = inner.trim();
                if statement == "else" {
                    match stack.last_mut() {
                        Some(Frame::If { in_else, .. }) if !*in_else => *in_else = true,
                        _ => return Err(syntax(tag_offset, "`else` without matching `if`")),
                    }
                } else if statement == "end" {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| syntax(tag_offset, "`end` without open block"))?;
                    current(&mut root, &mut stack).push(frame.into_node());
                } else if let Some(cond) = statement.strip_prefix("if ") {
                    let cond = parse_path(cond).ok_or_else(|| syntax(tag_offset, "invalid `if` condition"))?;
                    stack.push(Frame::If {
                        cond,
                        then: Vec::new(),
                        otherwise: Vec::new(),
                        in_else: false,
                        offset: tag_offset,
                    });
                } else if let Some(clause) = statement.strip_prefix("each ") {
                    let (list, binding) = clause
                        .split_once(" as ")
                        .and_then(|(list, binding)| Some((parse_path(list)?, parse_ident(binding)?)))
                        .ok_or_else(|| syntax(tag_offset, "expected `each <path> as <name>`"))?;
                    stack.push(Frame::Each {
                        list,
                        binding,
                        body: Vec::new(),
                        offset: tag_offset,
                    });
                } else {
                    return Err(syntax(tag_offset, "unknown statement"));
                }
            }

            offset += consumed;
            rest = &rest[consumed..];
        }

        if let Some(frame) = stack.last() {
            return Err(syntax(frame.offset(), "block is never closed with `end`"));
        }

        Ok(Self {
            name: name.to_string(),
            nodes: root,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, props: &Value) -> String {
        let mut out = String::new();
        let mut scope = vec![(PROPS_VAR, props)];
        render_nodes(&self.nodes, &mut scope, &mut out);
        out
    }
}

fn current<'a>(root: &'a mut Vec<Node>, stack: &'a mut [Frame]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(Frame::If {
            then,
            otherwise,
            in_else,
            ..
        }) => {
            if *in_else {
                otherwise
            } else {
                then
            }
        }
        Some(Frame::Each { body, .. }) => body,
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn parse_ident(raw: &str) -> Option<String> {
    let ident = raw.trim();
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| ident.to_string())
}

fn parse_path(raw: &str) -> Option<Vec<String>> {
    raw.trim().split('.').map(parse_ident).collect()
}

fn render_nodes<'a>(nodes: &'a [Node], scope: &mut Vec<(&'a str, &'a Value)>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Expr(path) => match resolve(scope, path) {
                Some(value) => write_value(value, out),
                None => tracing::trace!(path = %path.join("."), "template value missing"),
            },
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if resolve(scope, cond).is_some_and(truthy) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, scope, out);
            }
            Node::Each {
                list,
                binding,
                body,
            } => {
                let Some(Value::Array(items)) = resolve(scope, list) else {
                    continue;
                };
                for item in items {
                    scope.push((binding.as_str(), item));
                    render_nodes(body, scope, out);
                    scope.pop();
                }
            }
        }
    }
}

fn resolve<'a>(scope: &[(&'a str, &'a Value)], path: &[String]) -> Option<&'a Value> {
    let (head, rest) = path.split_first()?;
    let mut value = scope
        .iter()
        .rev()
        .find(|(name, _)| *name == head.as_str())?
        .1;

    for segment in rest {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
        }
        Value::Object(_) => out.push_str(&value.to_string()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Loads templates by lookup path from a [`TemplateSource`].
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    source: TemplateSource,
}

impl TemplateEngine {
    pub fn new(source: impl Into<TemplateSource>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Read, parse and render the template at lookup path `name`.
    pub async fn render(&self, name: &str, props: &Value) -> Result<String, TemplateError> {
        let bytes = self
            .source
            .read(name)
            .await
            .map_err(|source| TemplateError::Io {
                path: self.source.location(name),
                source,
            })?;
        let text = std::str::from_utf8(&bytes).map_err(|e| TemplateError::Syntax {
            name: name.to_string(),
            offset: e.valid_up_to(),
            message: "template is not valid UTF-8".to_string(),
        })?;
        Ok(Template::parse(name, text)?.render(props))
    }
}
