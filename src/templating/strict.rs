//! Registration-time check for lenient variable lookups.
//!
//! Tera resolves most variables strictly, but a bare variable used as a
//! truth value (`{% if x %}`, `a or b`, `not x`) evaluates to `false` when
//! it is undefined. Such tests are rejected when a template is added, so a
//! misspelled key can never render silently.
//!
//! Strict alternatives:
//!
//! | Intent | Write |
//! |--------|-------|
//! | key may be absent | `x is defined` |
//! | key must be a true boolean | `x == true` |
//! | key may be absent, with a fallback | `x \| default(value=false)` |

use tera::ast::{Expr, ExprVal, LogicOperator, Node};

/// Variables tested as truth values in `template`, in source order.
pub fn lenient_conditions(template: &tera::Template) -> Vec<String> {
    let mut found = Vec::new();
    walk_nodes(&template.ast, &mut found);
    found
}

fn walk_nodes(nodes: &[Node], found: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::VariableBlock(_, expr) => walk_expr(expr, false, found),
            Node::Set(_, set) => walk_expr(&set.value, false, found),
            Node::FilterSection(_, section, _) => {
                for arg in section.filter.args.values() {
                    walk_expr(arg, false, found);
                }
                walk_nodes(&section.body, found);
            }
            Node::Block(_, block, _) => walk_nodes(&block.body, found),
            Node::MacroDefinition(_, definition, _) => walk_nodes(&definition.body, found),
            Node::Forloop(_, forloop, _) => {
                walk_expr(&forloop.container, false, found);
                walk_nodes(&forloop.body, found);
                if let Some(body) = &forloop.empty_body {
                    walk_nodes(body, found);
                }
            }
            Node::If(if_node, _) => {
                for (_, condition, body) in &if_node.conditions {
                    walk_expr(condition, true, found);
                    walk_nodes(body, found);
                }
                if let Some((_, body)) = &if_node.otherwise {
                    walk_nodes(body, found);
                }
            }
            _ => {}
        }
    }
}

/// `truth` is set when Tera evaluates `expr` as a boolean.
fn walk_expr(expr: &Expr, truth: bool, found: &mut Vec<String>) {
    for filter in &expr.filters {
        for arg in filter.args.values() {
            walk_expr(arg, false, found);
        }
    }

    match &expr.val {
        ExprVal::Ident(name) => {
            if (truth || expr.negated) && !expr.has_default_filter() {
                found.push(name.clone());
            }
        }
        ExprVal::Logic(logic) => {
            let operands_are_truths =
                matches!(logic.operator, LogicOperator::And | LogicOperator::Or);
            walk_expr(&logic.lhs, operands_are_truths, found);
            walk_expr(&logic.rhs, operands_are_truths, found);
        }
        ExprVal::Math(math) => {
            walk_expr(&math.lhs, false, found);
            walk_expr(&math.rhs, false, found);
        }
        ExprVal::In(in_expr) => {
            walk_expr(&in_expr.lhs, false, found);
            walk_expr(&in_expr.rhs, false, found);
        }
        ExprVal::Test(test) => {
            for arg in &test.args {
                walk_expr(arg, false, found);
            }
        }
        ExprVal::FunctionCall(call) => {
            for arg in call.args.values() {
                walk_expr(arg, false, found);
            }
        }
        ExprVal::MacroCall(call) => {
            for arg in call.args.values() {
                walk_expr(arg, false, found);
            }
        }
        ExprVal::Array(items) => {
            for item in items {
                walk_expr(item, false, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> Vec<String> {
        let template = tera::Template::new("test", None, source).unwrap();
        lenient_conditions(&template)
    }

    #[test]
    fn test_bare_conditions_found() {
        assert_eq!(check("{% if values.typo_key %}on{% endif %}"), vec!["values.typo_key"]);
        assert_eq!(check("{% if a %}{% elif b %}{% endif %}"), vec!["a", "b"]);
        assert_eq!(check("{{ x or y }}"), vec!["x", "y"]);
        assert_eq!(check("{% if not flag %}{% endif %}"), vec!["flag"]);
        assert_eq!(check("{% for i in items %}{% if i.on and ok %}{% endif %}{% endfor %}"), vec![
            "i.on", "ok"
        ]);
    }

    #[test]
    fn test_strict_conditions_accepted() {
        for source in [
            "{% if values.enabled is defined %}{% endif %}",
            "{% if values.enabled == true %}{% endif %}",
            "{% if values.n < 3 %}{% endif %}",
            "{% if values.flag | default(value=false) %}{% endif %}",
            "{% if \"a\" in values.list %}{% endif %}",
            "{{ values.name }}",
        ] {
            assert!(check(source).is_empty(), "{source}");
        }
    }

    #[test]
    fn test_macro_bodies_checked() {
        let source = "{% macro m(x) %}{% if x %}yes{% endif %}{% endmacro m %}";
        assert_eq!(check(source), vec!["x"]);
    }
}
