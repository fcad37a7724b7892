//! Template renderer module.
//!
//! Renders parsed template nodes with the given context.

use super::parser::Node;
use super::{escape_html, Result, TemplateContext, TemplateError, Value};

/// Template renderer.
pub struct Renderer<'a> {
    context: &'a TemplateContext,
}

impl<'a> Renderer<'a> {
    /// Create a new renderer with the given context.
    pub fn new(context: &'a TemplateContext) -> Self {
        Self { context }
    }

    /// Render a list of nodes to a string.
    pub fn render(&self, nodes: &[Node]) -> Result<String> {
        let mut output = String::new();

        for node in nodes {
            output.push_str(&self.render_node(node)?);
        }

        Ok(output)
    }

    fn render_node(&self, node: &Node) -> Result<String> {
        match node {
            Node::Text(text) => Ok(text.clone()),
            Node::Variable(name) => Ok(escape_html(&self.lookup(name)).into_owned()),
            Node::RawVariable(name) => Ok(self.lookup(name)),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.is_truthy(condition) {
                    self.render(then_branch)
                } else {
                    self.render(else_branch)
                }
            }
            Node::Each {
                variable,
                item_name,
                body,
            } => self.render_each(variable, item_name.as_deref(), body),
            Node::Unless { condition, body } => {
                if self.is_truthy(condition) {
                    Ok(String::new())
                } else {
                    self.render(body)
                }
            }
            Node::With { variable, body } => self.render_with(variable, body),
        }
    }

    /// Resolve a variable to its display string. Missing variables render
    /// as the empty string (like Handlebars).
    fn lookup(&self, name: &str) -> String {
        self.context
            .get(name)
            .map(Value::to_display_string)
            .unwrap_or_default()
    }

    fn is_truthy(&self, condition: &str) -> bool {
        self.context
            .get(condition)
            .map(Value::is_truthy)
            .unwrap_or(false)
    }

    fn render_each(&self, variable: &str, item_name: Option<&str>, body: &[Node]) -> Result<String> {
        let list = match self.context.get(variable) {
            Some(Value::List(items)) => items,
            Some(_) => {
                return Err(TemplateError::Render(format!("'{variable}' is not a list")));
            }
            None => return Ok(String::new()),
        };

        let mut output = String::new();
        let item_var_name = item_name.unwrap_or("this");

        for (index, item) in list.iter().enumerate() {
            let mut child_context = self.context.child();
            child_context.set(item_var_name, item.clone());
            child_context.set("@index", Value::Number(index as i64));
            child_context.set("@number", Value::Number(index as i64 + 1));
            child_context.set("@first", Value::Bool(index == 0));
            child_context.set("@last", Value::Bool(index == list.len() - 1));

            // Object fields are also exposed directly
            if let Value::Object(obj) = item {
                for (key, value) in obj {
                    child_context.set(key.clone(), value.clone());
                }
            }

            let child_renderer = Renderer::new(&child_context);
            output.push_str(&child_renderer.render(body)?);
        }

        Ok(output)
    }

    fn render_with(&self, variable: &str, body: &[Node]) -> Result<String> {
        let value = match self.context.get(variable) {
            Some(v) => v.clone(),
            None => return Ok(String::new()),
        };

        let mut child_context = self.context.child();

        if let Value::Object(obj) = &value {
            for (key, val) in obj {
                child_context.set(key.clone(), val.clone());
            }
        }

        child_context.set("this", value);

        let child_renderer = Renderer::new(&child_context);
        child_renderer.render(body)
    }
}
