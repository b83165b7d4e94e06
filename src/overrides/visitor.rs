//! Node visitor injecting the override hooks into compiled templates

use serde_json::Value;

use super::{PARAMETERS_FUNCTION, RENAME_FUNCTION, VISITOR_PRIORITY};
use crate::engine::{NodeMut, NodeVisitor, StructuralError};
use crate::parser::ast::{Expr, Expression, IncludeNode, IncludeTarget, Node, Span, Spanned};

/// Rewrites parents, includes and embeds to go through the override hooks
///
/// - a module parent `P` becomes `rename(P, false, null, _context)`
/// - an include of `T` with `W` becomes an include of `rename(T, only, W, _context)`
///   with `rewrite_args(T, only, W, _context)` as its variables
/// - an embed keeps its target and only gets `rewrite_args(filename, only, W, _context)`
#[derive(Debug, Default, Clone, Copy)]
pub struct OverrideNodeVisitor;

impl NodeVisitor for OverrideNodeVisitor {
    fn leave_node(&self, node: NodeMut<'_>) -> Result<(), StructuralError> {
        match node {
            NodeMut::Module(module) => {
                if let Some(parent) = module.parent.take() {
                    let span = parent.span.clone();
                    module.parent = Some(hook(RENAME_FUNCTION, parent, false, None, &span));
                }
            }
            NodeMut::Node(Spanned {
                node: Node::Include(include),
                span,
            }) => rewrite_include(include, span)?,
            NodeMut::Node(_) => {}
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        VISITOR_PRIORITY
    }
}

fn rewrite_include(include: &mut IncludeNode, span: &Span) -> Result<(), StructuralError> {
    if matches!(&include.target, IncludeTarget::Embedded { filename, .. } if filename.is_empty()) {
        return Err(StructuralError::MissingPart {
            kind: "embed",
            part: "filename",
            span: span.clone(),
        });
    }

    let with = include.variables.take();
    match &mut include.target {
        IncludeTarget::Embedded { filename, .. } => {
            let name = Spanned::new(Expression::constant(filename.clone()), span.clone());
            include.variables = Some(hook(PARAMETERS_FUNCTION, name, include.only, with, span));
        }
        IncludeTarget::Expression(target) => {
            let original = target.clone();
            let target_span = original.span.clone();
            *target = hook(
                RENAME_FUNCTION,
                original.clone(),
                include.only,
                with.clone(),
                &target_span,
            );
            include.variables = Some(hook(PARAMETERS_FUNCTION, original, include.only, with, span));
        }
    }
    Ok(())
}

/// Build `function(name, only, with|null, _context)`
fn hook(function: &str, name: Expr, only: bool, with: Option<Expr>, span: &Span) -> Expr {
    let at = |expression: Expression| Spanned::new(expression, span.clone());
    let with = with.unwrap_or_else(|| at(Expression::Constant(Value::Null)));
    at(Expression::Call {
        name: function.to_string(),
        arguments: vec![
            name,
            at(Expression::constant(only)),
            with,
            at(Expression::context()),
        ],
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::engine::traverse;
    use crate::parser::ast::Module;
    use crate::parser::parse;

    fn compile(source: &str) -> Module {
        let mut module = parse(source, "page").unwrap();
        traverse(&mut module, &OverrideNodeVisitor).unwrap();
        module
    }

    fn call_arguments(expr: &Expr, expected_name: &str) -> Vec<Expression> {
        match &expr.node {
            Expression::Call { name, arguments } => {
                assert_eq!(name, expected_name);
                arguments.iter().map(|a| a.node.clone()).collect()
            }
            other => panic!("expected call to {}, got {:?}", expected_name, other),
        }
    }

    fn include(module: &Module, position: usize) -> &IncludeNode {
        match &module.body[position].node {
            Node::Include(include) => include,
            other => panic!("expected include, got {:?}", other),
        }
    }

    #[test]
    fn test_extends_gets_a_single_rename_hook() {
        let module = compile("{% extends \"base\" %}");
        let parent = module.parent.as_ref().unwrap();

        assert_eq!(
            call_arguments(parent, RENAME_FUNCTION),
            vec![
                Expression::constant("base"),
                Expression::constant(false),
                Expression::Constant(Value::Null),
                Expression::context(),
            ]
        );
        assert!(module.body.is_empty());
    }

    #[test]
    fn test_include_gets_both_hooks_with_the_original_name() {
        let module = compile("{% include \"a\" with {x: 1} only %}");
        let include = include(&module, 0);

        let IncludeTarget::Expression(target) = &include.target else {
            panic!("expected expression target");
        };
        let rename = call_arguments(target, RENAME_FUNCTION);
        let args = call_arguments(include.variables.as_ref().unwrap(), PARAMETERS_FUNCTION);

        assert_eq!(rename, args);
        assert_eq!(rename[0], Expression::constant("a"));
        assert_eq!(rename[1], Expression::constant(true));
        assert!(matches!(&rename[2], Expression::Map(entries) if entries.len() == 1));
        assert_eq!(rename[3], Expression::context());
    }

    #[test]
    fn test_include_without_with_passes_null() {
        let module = compile("{% include name %}");
        let include = include(&module, 0);
        let args = call_arguments(include.variables.as_ref().unwrap(), PARAMETERS_FUNCTION);

        assert_eq!(args[0], Expression::Name("name".to_string()));
        assert_eq!(args[1], Expression::constant(false));
        assert_eq!(args[2], Expression::Constant(Value::Null));
    }

    #[test]
    fn test_embed_target_is_never_renamed() {
        let module = compile("{% embed \"box\" with {x: 1} %}{% endembed %}");
        let include = include(&module, 0);

        assert_eq!(
            include.target,
            IncludeTarget::Embedded {
                filename: "page".to_string(),
                index: 0,
            }
        );
        let args = call_arguments(include.variables.as_ref().unwrap(), PARAMETERS_FUNCTION);
        assert_eq!(args[0], Expression::constant("page"));

        // The embedded module's parent goes through the rename hook instead
        let embedded_parent = module.embedded[0].parent.as_ref().unwrap();
        let rename = call_arguments(embedded_parent, RENAME_FUNCTION);
        assert_eq!(rename[0], Expression::constant("box"));
        assert_eq!(rename[1], Expression::constant(false));
    }

    #[test]
    fn test_includes_inside_blocks_are_rewritten() {
        let module = compile("{% block b %}{% include \"a\" %}{% endblock %}");
        let Node::Block(block) = &module.body[0].node else {
            panic!("expected block");
        };
        let Node::Include(include) = &block.body[0].node else {
            panic!("expected include");
        };
        assert!(include.variables.is_some());
    }

    #[test]
    fn test_embed_without_filename_is_rejected() {
        let mut node = Spanned::new(
            Node::Include(IncludeNode {
                target: IncludeTarget::Embedded {
                    filename: String::new(),
                    index: 0,
                },
                variables: None,
                only: false,
                ignore_missing: false,
            }),
            3..9,
        );
        let err = OverrideNodeVisitor
            .leave_node(NodeMut::Node(&mut node))
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::MissingPart {
                kind: "embed",
                part: "filename",
                span: 3..9,
            }
        );
    }

    #[test]
    fn test_other_nodes_are_untouched() {
        let source = "a{{ b }}{% block c %}d{% endblock %}";
        let before = parse(source, "page").unwrap();
        assert_eq!(compile(source), before);
    }
}
