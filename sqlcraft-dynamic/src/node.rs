//! The Dynamic SQL Tree (§4.5): nodes that render SQL text and bindings
//! against a [`DynamicContext`].

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::expr::Expression;
use sqlcraft_core::value::{self, Value};
use sqlcraft_lexer::placeholder::PlaceholderSpec;
use sqlcraft_lexer::token_parser::{PARAMETER_TOKEN_PARSER, VARIABLE_TOKEN_PARSER};

use crate::context::DynamicContext;

/// One node of a compiled dynamic SQL body.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Static text, possibly containing `${...}` substitutions.
    Text(String),
    /// `if(test)`: applies `children` when `test` evaluates truthy.
    If {
        /// The boolean test expression.
        test: String,
        /// Child nodes applied when `test` is truthy.
        children: Vec<SqlNode>,
    },
    /// `choose/when/otherwise`: applies the first truthy `when`, else
    /// `otherwise` if present.
    Choose {
        /// `(test, children)` pairs, tried in order.
        whens: Vec<(String, Vec<SqlNode>)>,
        /// Applied when no `when` test is truthy.
        otherwise: Option<Vec<SqlNode>>,
    },
    /// `trim`/`where`/`set`: renders `children`, then strips
    /// prefix/suffix overrides and wraps the (non-empty) result in
    /// `prefix`/`suffix`.
    Trim {
        /// Child nodes rendered to produce the trimmed content.
        children: Vec<SqlNode>,
        /// Inserted before the trimmed content, if non-empty.
        prefix: Option<String>,
        /// Inserted after the trimmed content, if non-empty.
        suffix: Option<String>,
        /// Candidates stripped from the start, case-insensitively.
        prefix_overrides: Vec<String>,
        /// Candidates stripped from the end, case-insensitively.
        suffix_overrides: Vec<String>,
    },
    /// `foreach`: iterates `collection`, applying `children` per item with
    /// `open`/`close`/`separator` framing.
    Foreach {
        /// The collection/array property path to iterate.
        collection: String,
        /// The per-iteration item binding name (default `"item"`).
        item: Option<String>,
        /// The per-iteration index binding name (default `"index"`).
        index: Option<String>,
        /// Rendered once before the first iteration.
        open: Option<String>,
        /// Rendered once after the last iteration.
        close: Option<String>,
        /// Rendered between iterations.
        separator: Option<String>,
        /// Child nodes rendered once per item.
        children: Vec<SqlNode>,
    },
    /// `bind`: evaluates `expression` once and stores it under `name`.
    Bind {
        /// The binding name.
        name: String,
        /// The expression to evaluate.
        expression: String,
    },
}

impl SqlNode {
    /// `where` = `trim(prefix="WHERE", prefixOverrides={"AND","OR","AND\n","OR\n"})`.
    pub fn where_node(children: Vec<SqlNode>) -> Self {
        SqlNode::Trim {
            children,
            prefix: Some("WHERE".to_string()),
            suffix: None,
            prefix_overrides: vec!["AND".to_string(), "OR".to_string(), "AND\n".to_string(), "OR\n".to_string()],
            suffix_overrides: vec![],
        }
    }

    /// `set` = `trim(prefix="SET", suffixOverrides=",")`.
    pub fn set_node(children: Vec<SqlNode>) -> Self {
        SqlNode::Trim {
            children,
            prefix: Some("SET".to_string()),
            suffix: None,
            prefix_overrides: vec![],
            suffix_overrides: vec![",".to_string()],
        }
    }

    /// Renders this node, appending SQL text and/or bindings into `ctx`.
    pub fn apply(&self, ctx: &mut DynamicContext) -> Result<()> {
        match self {
            SqlNode::Text(text) => {
                let root = ctx.eval_root();
                let rendered = render_variables(text, &root)?;
                ctx.append_sql(&rendered);
                Ok(())
            }
            SqlNode::If { test, children } => {
                if Expression::parse(test)?.test(&ctx.eval_root())? {
                    apply_all(children, ctx)?;
                }
                Ok(())
            }
            SqlNode::Choose { whens, otherwise } => {
                for (test, children) in whens {
                    if Expression::parse(test)?.test(&ctx.eval_root())? {
                        return apply_all(children, ctx);
                    }
                }
                if let Some(children) = otherwise {
                    apply_all(children, ctx)?;
                }
                Ok(())
            }
            SqlNode::Trim {
                children,
                prefix,
                suffix,
                prefix_overrides,
                suffix_overrides,
            } => {
                let mut sub = ctx.child();
                apply_all(children, &mut sub)?;
                let content = sub.sql().to_string();
                ctx.absorb_bindings(sub);
                let trimmed = apply_trim(
                    &content,
                    prefix.as_deref(),
                    suffix.as_deref(),
                    prefix_overrides,
                    suffix_overrides,
                );
                ctx.append_sql(&trimmed);
                Ok(())
            }
            SqlNode::Foreach {
                collection,
                item,
                index,
                open,
                close,
                separator,
                children,
            } => apply_foreach(collection, item.as_deref(), index.as_deref(), open.as_deref(), close.as_deref(), separator.as_deref(), children, ctx),
            SqlNode::Bind { name, expression } => {
                let value = Expression::parse(expression)?.eval(&ctx.eval_root())?;
                ctx.bindings.set(name, value);
                Ok(())
            }
        }
    }
}

fn apply_all(nodes: &[SqlNode], ctx: &mut DynamicContext) -> Result<()> {
    for node in nodes {
        node.apply(ctx)?;
    }
    Ok(())
}

fn render_variables(text: &str, root: &Value) -> Result<String> {
    let mut error = None;
    let rendered = VARIABLE_TOKEN_PARSER.parse(text, |expr| {
        if error.is_some() {
            return String::new();
        }
        match Expression::parse(expr).and_then(|e| e.eval(root)) {
            Ok(v) => stringify_variable(&v),
            Err(e) => {
                error = Some(e);
                String::new()
            }
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok(rendered),
    }
}

fn stringify_variable(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_trim(content: &str, prefix: Option<&str>, suffix: Option<&str>, prefix_overrides: &[String], suffix_overrides: &[String]) -> String {
    let mut body = content.trim().to_string();
    if !prefix_overrides.is_empty() {
        body = strip_prefix_override(&body, prefix_overrides);
    }
    if !suffix_overrides.is_empty() {
        body = strip_suffix_override(&body, suffix_overrides);
    }
    body = body.trim().to_string();
    if body.is_empty() {
        return body;
    }
    let mut out = String::new();
    if let Some(p) = prefix {
        out.push_str(p);
        out.push(' ');
    }
    out.push_str(&body);
    if let Some(s) = suffix {
        out.push(' ');
        out.push_str(s);
    }
    out
}

fn strip_prefix_override(content: &str, overrides: &[String]) -> String {
    let upper = content.to_ascii_uppercase();
    for candidate in overrides {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            continue;
        }
        let candidate_upper = trimmed.to_ascii_uppercase();
        if upper.starts_with(&candidate_upper) {
            return content[trimmed.len()..].trim_start().to_string();
        }
    }
    content.to_string()
}

fn strip_suffix_override(content: &str, overrides: &[String]) -> String {
    let upper = content.to_ascii_uppercase();
    for candidate in overrides {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            continue;
        }
        let candidate_upper = trimmed.to_ascii_uppercase();
        if upper.ends_with(&candidate_upper) {
            let cut = content.len() - trimmed.len();
            return content[..cut].trim_end().to_string();
        }
    }
    content.to_string()
}

#[allow(clippy::too_many_arguments)]
fn apply_foreach(
    collection: &str,
    item: Option<&str>,
    index: Option<&str>,
    open: Option<&str>,
    close: Option<&str>,
    separator: Option<&str>,
    children: &[SqlNode],
    ctx: &mut DynamicContext,
) -> Result<()> {
    let root = ctx.eval_root();
    let collected = value::navigate(&root, collection)
        .ok_or_else(|| Error::binding(format!("foreach collection `{}` was not found", collection)))?
        .clone();
    let items: Vec<Value> = match collected {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => {
            return Err(Error::binding(format!(
                "foreach collection `{}` is not an array or object (got {:?})",
                collection, other
            )))
        }
    };

    let item_name = item.unwrap_or("item").to_string();
    let index_name = index.unwrap_or("index").to_string();

    if let Some(open) = open {
        ctx.append_sql(open);
    }
    for (position, value) in items.into_iter().enumerate() {
        if position > 0 {
            if let Some(separator) = separator {
                ctx.append_sql(separator);
            }
        }
        let synthetic_item = format!("__frch_{}_{}", item_name, position);
        let synthetic_index = format!("__frch_{}_{}", index_name, position);
        ctx.bindings.set(&synthetic_item, value);
        ctx.bindings.set(&synthetic_index, Value::from(position as u64));

        let mut sub = ctx.child();
        apply_all(children, &mut sub)?;
        let rendered = sub.sql().to_string();
        ctx.absorb_bindings(sub);
        let renamed = rename_placeholders(
            &rendered,
            &[(item_name.as_str(), synthetic_item.as_str()), (index_name.as_str(), synthetic_index.as_str())],
        );
        ctx.append_sql(&renamed);
    }
    if let Some(close) = close {
        ctx.append_sql(close);
    }
    Ok(())
}

/// Rewrites `#{item...}`/`#{index...}` placeholders (and their nested
/// property paths, e.g. `#{item.name}`) emitted by one `foreach` iteration's
/// children to reference that iteration's unique synthetic binding name
/// instead, so each iteration's placeholders resolve unambiguously (§4.5).
fn rename_placeholders(sql: &str, renames: &[(&str, &str)]) -> String {
    PARAMETER_TOKEN_PARSER.parse(sql, |content| {
        let Ok(mut spec) = PlaceholderSpec::parse(content) else {
            return format!("#{{{}}}", content);
        };
        for (old, new) in renames {
            if spec.property == *old {
                spec.property = (*new).to_string();
                break;
            } else if let Some(rest) = spec.property.strip_prefix(&format!("{}.", old)) {
                spec.property = format!("{}.{}", new, rest);
                break;
            } else if let Some(rest) = spec.property.strip_prefix(&format!("{}[", old)) {
                spec.property = format!("{}[{}", new, rest);
                break;
            }
        }
        format!("#{{{}}}", render_placeholder(&spec))
    })
}

fn render_placeholder(spec: &PlaceholderSpec) -> String {
    let mut out = spec.property.clone();
    for (key, value) in &spec.attrs {
        out.push(',');
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(nodes: &[SqlNode], parameter: Value) -> String {
        let mut ctx = DynamicContext::new(parameter, None);
        apply_all(nodes, &mut ctx).unwrap();
        ctx.into_sql()
    }

    #[test]
    fn dynamic_where_drops_null_branch() {
        let nodes = vec![
            SqlNode::Text("SELECT * FROM t ".to_string()),
            SqlNode::where_node(vec![
                SqlNode::If {
                    test: "a!=null".to_string(),
                    children: vec![SqlNode::Text(" AND a=#{a}".to_string())],
                },
                SqlNode::If {
                    test: "b!=null".to_string(),
                    children: vec![SqlNode::Text(" AND b=#{b}".to_string())],
                },
            ]),
        ];
        let sql = render(&nodes, json!({"a": 1, "b": null}));
        assert_eq!(sql, "SELECT * FROM t WHERE a=#{a}");
    }

    #[test]
    fn foreach_in_list_renders_unique_placeholders() {
        let nodes = vec![
            SqlNode::Text("DELETE FROM t WHERE id IN ".to_string()),
            SqlNode::Foreach {
                collection: "ids".to_string(),
                item: Some("i".to_string()),
                index: None,
                open: Some("(".to_string()),
                close: Some(")".to_string()),
                separator: Some(",".to_string()),
                children: vec![SqlNode::Text("#{i}".to_string())],
            },
        ];
        let sql = render(&nodes, json!({"ids": [10, 20, 30]}));
        assert_eq!(sql, "DELETE FROM t WHERE id IN (#{__frch_i_0},#{__frch_i_1},#{__frch_i_2})");
    }

    #[test]
    fn choose_picks_first_truthy_when_else_otherwise() {
        let nodes = vec![SqlNode::Choose {
            whens: vec![
                ("kind=='car'".to_string(), vec![SqlNode::Text("car".to_string())]),
                ("kind=='truck'".to_string(), vec![SqlNode::Text("truck".to_string())]),
            ],
            otherwise: Some(vec![SqlNode::Text("other".to_string())]),
        }];
        assert_eq!(render(&nodes, json!({"kind": "truck"})), "truck");
        assert_eq!(render(&nodes, json!({"kind": "boat"})), "other");
    }

    #[test]
    fn bind_introduces_a_reusable_binding() {
        let nodes = vec![
            SqlNode::Bind {
                name: "pattern".to_string(),
                expression: "name".to_string(),
            },
            SqlNode::Text("${pattern}".to_string()),
        ];
        assert_eq!(render(&nodes, json!({"name": "ada"})), "ada");
    }

    #[test]
    fn set_trims_trailing_comma() {
        let nodes = vec![SqlNode::set_node(vec![
            SqlNode::Text("name=#{name},".to_string()),
            SqlNode::If {
                test: "age!=null".to_string(),
                children: vec![SqlNode::Text("age=#{age},".to_string())],
            },
        ])];
        let sql = render(&nodes, json!({"name": "ada", "age": null}));
        assert_eq!(sql, "SET name=#{name}");
    }
}
