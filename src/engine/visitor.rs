//! Node visitors: compile-time passes over a parsed module
//!
//! Visitors registered on an [`Environment`](super::Environment) run one after
//! the other, lowest priority first. Each pass walks the whole tree once in
//! post-order: embedded modules, then body nodes (recursing into blocks), then
//! the module itself.

use super::StructuralError;
use crate::parser::ast::{Module, Node, Spanned};

/// Mutable handle on the node currently visited
#[derive(Debug)]
pub enum NodeMut<'a> {
    /// A template root or an embedded module
    Module(&'a mut Module),
    /// A body node
    Node(&'a mut Spanned<Node>),
}

/// A compile-time pass over the parse tree
pub trait NodeVisitor: Send + Sync {
    /// Called before the children of a node are visited
    fn enter_node(&self, _node: NodeMut<'_>) -> Result<(), StructuralError> {
        Ok(())
    }

    /// Called after the children of a node are visited
    fn leave_node(&self, node: NodeMut<'_>) -> Result<(), StructuralError>;

    /// Visitors run in ascending priority order
    fn priority(&self) -> i32 {
        0
    }
}

/// Walk `module` with `visitor`, children before parents
pub fn traverse(module: &mut Module, visitor: &dyn NodeVisitor) -> Result<(), StructuralError> {
    visitor.enter_node(NodeMut::Module(module))?;
    for embedded in module.embedded.iter_mut() {
        traverse(embedded, visitor)?;
    }
    for node in module.body.iter_mut() {
        traverse_node(node, visitor)?;
    }
    visitor.leave_node(NodeMut::Module(module))
}

fn traverse_node(node: &mut Spanned<Node>, visitor: &dyn NodeVisitor) -> Result<(), StructuralError> {
    visitor.enter_node(NodeMut::Node(node))?;
    if let Node::Block(block) = &mut node.node {
        for child in block.body.iter_mut() {
            traverse_node(child, visitor)?;
        }
    }
    visitor.leave_node(NodeMut::Node(node))
}

/// Priority of the built-in [`OptimizerVisitor`]
pub const OPTIMIZER_PRIORITY: i32 = 255;

/// Built-in pass merging adjacent text nodes and dropping empty ones
#[derive(Debug, Default, Clone, Copy)]
pub struct OptimizerVisitor;

impl OptimizerVisitor {
    fn merge_text(body: &mut Vec<Spanned<Node>>) {
        let mut merged: Vec<Spanned<Node>> = Vec::with_capacity(body.len());
        for node in body.drain(..) {
            if let Node::Text(text) = &node.node {
                if text.is_empty() {
                    continue;
                }
                if let Some(Spanned {
                    node: Node::Text(previous),
                    span,
                }) = merged.last_mut()
                {
                    previous.push_str(text);
                    span.end = node.span.end;
                    continue;
                }
            }
            merged.push(node);
        }
        *body = merged;
    }
}

impl NodeVisitor for OptimizerVisitor {
    fn leave_node(&self, node: NodeMut<'_>) -> Result<(), StructuralError> {
        match node {
            NodeMut::Module(module) => Self::merge_text(&mut module.body),
            NodeMut::Node(Spanned {
                node: Node::Block(block),
                ..
            }) => Self::merge_text(&mut block.body),
            NodeMut::Node(_) => {}
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        OPTIMIZER_PRIORITY
    }
}
