//! Template parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use serde_json::Value;

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::ParseError;

/// Tag-level items, before `embed` and `extends` are lowered into the module
#[derive(Debug, Clone)]
enum Item {
    Text(String),
    Print(Expr),
    Block {
        name: String,
        body: Vec<Spanned<Item>>,
    },
    Include {
        target: Expr,
        arguments: IncludeArguments,
    },
    Embed {
        parent: Expr,
        arguments: IncludeArguments,
        body: Vec<Spanned<Item>>,
    },
    Extends(Expr),
}

/// Trailing clauses shared by `include` and `embed`
#[derive(Debug, Clone)]
struct IncludeArguments {
    variables: Option<Expr>,
    only: bool,
    ignore_missing: bool,
}

/// Parse a template source into a module named `name`
pub fn parse(input: &str, name: &str) -> Result<Module, Vec<ParseError>> {
    let len = input.len();

    let tokens = crate::parser::lexer::lex(input).map_err(|e| vec![e])?;
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let items = template_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(ParseError::from).collect::<Vec<_>>())?;

    lower(items, name)
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Integral numbers stay integers so they print without a fraction
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn template_parser<'a, I>(
) -> impl Parser<'a, I, Vec<Spanned<Item>>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => s,
    };

    // ==================== Expressions ====================

    let expr = recursive(|expr| {
        let literal = select! {
            Token::String(s) => Expression::Constant(Value::String(s)),
            Token::Number(n) => Expression::Constant(number_value(n)),
            Token::True => Expression::Constant(Value::Bool(true)),
            Token::False => Expression::Constant(Value::Bool(false)),
            Token::Null => Expression::Constant(Value::Null),
        };

        // Map keys may be bare identifiers or quoted strings
        let map_key = select! {
            Token::Ident(s) => s,
            Token::String(s) => s,
        };

        let map = map_key
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expression::Map);

        let list = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let array = list
            .clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expression::Array);

        let call = identifier
            .clone()
            .then(list.delimited_by(just(Token::ParenOpen), just(Token::ParenClose)))
            .map(|(name, arguments)| Expression::Call { name, arguments });

        // Note: call must be tried before a plain name, both start with an identifier
        let atom = choice((
            literal,
            map,
            array,
            call,
            identifier.clone().map(Expression::Name),
        ))
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
        .or(expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)));

        let attribute = just(Token::Dot)
            .ignore_then(identifier.clone())
            .map_with(|name, e| Spanned::new(name, span_range(&e.span())));

        let postfix = atom
            .then(attribute.repeated().collect::<Vec<_>>())
            .map(|(base, attributes): (Expr, Vec<Spanned<String>>)| {
                attributes.into_iter().fold(base, |object, attribute| {
                    let span = object.span.start..attribute.span.end;
                    Spanned::new(
                        Expression::Attribute {
                            object: Box::new(object),
                            name: attribute.node,
                        },
                        span,
                    )
                })
            });

        postfix
            .clone()
            .then(
                just(Token::Tilde)
                    .ignore_then(postfix)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(first, rest): (Expr, Vec<Expr>)| {
                rest.into_iter().fold(first, |left, right| {
                    let span = left.span.start..right.span.end;
                    Spanned::new(
                        Expression::Concat {
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        span,
                    )
                })
            })
            .boxed()
    });

    // ==================== Tags ====================

    // `[ignore missing] [with <expr>] [only]`
    let include_arguments = just(Token::Ignore)
        .then(just(Token::Missing))
        .or_not()
        .then(just(Token::With).ignore_then(expr.clone()).or_not())
        .then(just(Token::Only).or_not())
        .map(|((ignore, variables), only)| IncludeArguments {
            variables,
            only: only.is_some(),
            ignore_missing: ignore.is_some(),
        });

    let text = select! {
        Token::Text(s) => Item::Text(s),
    };

    let print = expr
        .clone()
        .delimited_by(just(Token::PrintOpen), just(Token::PrintClose))
        .map(Item::Print);

    let include = just(Token::Include)
        .ignore_then(expr.clone())
        .then(include_arguments.clone())
        .delimited_by(just(Token::TagOpen), just(Token::TagClose))
        .map(|(target, arguments)| Item::Include { target, arguments });

    let extends = just(Token::Extends)
        .ignore_then(expr.clone())
        .delimited_by(just(Token::TagOpen), just(Token::TagClose))
        .map(Item::Extends);

    let items = recursive(|items| {
        let block_end = just(Token::EndBlock)
            .ignore_then(identifier.clone().or_not())
            .delimited_by(just(Token::TagOpen), just(Token::TagClose));

        let block = just(Token::Block)
            .ignore_then(identifier.clone())
            .delimited_by(just(Token::TagOpen), just(Token::TagClose))
            .then(items.clone())
            .then(block_end)
            .try_map(
                |((name, body), end_name): ((String, Vec<Spanned<Item>>), Option<String>), span| {
                    match end_name {
                        Some(end) if end != name => Err(Rich::custom(
                            span,
                            format!("Expected endblock for block '{}' (but '{}' given)", name, end),
                        )),
                        _ => Ok(Item::Block { name, body }),
                    }
                },
            );

        let embed = just(Token::Embed)
            .ignore_then(expr.clone())
            .then(include_arguments)
            .delimited_by(just(Token::TagOpen), just(Token::TagClose))
            .then(items)
            .then_ignore(
                just(Token::EndEmbed).delimited_by(just(Token::TagOpen), just(Token::TagClose)),
            )
            .map(|((parent, arguments), body)| Item::Embed {
                parent,
                arguments,
                body,
            });

        // Order matters only for readability: every tag alternative starts with a distinct keyword
        choice((text, print, block, embed, include, extends))
            .map_with(|item, e| Spanned::new(item, span_range(&e.span())))
            .repeated()
            .collect::<Vec<_>>()
            .boxed()
    });

    items.then_ignore(end())
}

// ==================== Lowering ====================

/// Turns parsed items into a module, hoisting embeds into embedded modules
struct Lowering<'n> {
    name: &'n str,
    embedded: Vec<Module>,
    errors: Vec<ParseError>,
}

impl Lowering<'_> {
    /// Lower the top-level body, capturing a single `extends`
    fn lower_root(&mut self, items: Vec<Spanned<Item>>) -> (Option<Expr>, Vec<Spanned<Node>>) {
        let mut parent: Option<Expr> = None;
        let mut body = Vec::new();

        for item in items {
            match item.node {
                Item::Extends(expr) => {
                    if parent.is_some() {
                        self.errors.push(ParseError::syntax(
                            item.span,
                            "Multiple extends tags are forbidden",
                        ));
                    } else {
                        parent = Some(expr);
                    }
                }
                other => {
                    if let Some(node) = self.lower_item(Spanned::new(other, item.span)) {
                        body.push(node);
                    }
                }
            }
        }

        (parent, body)
    }

    fn lower_body(&mut self, items: Vec<Spanned<Item>>) -> Vec<Spanned<Node>> {
        items
            .into_iter()
            .filter_map(|item| self.lower_item(item))
            .collect()
    }

    fn lower_item(&mut self, item: Spanned<Item>) -> Option<Spanned<Node>> {
        let span = item.span;
        let node = match item.node {
            Item::Text(s) => Node::Text(s),
            Item::Print(expr) => Node::Print(expr),
            Item::Block { name, body } => Node::Block(BlockNode {
                name,
                body: self.lower_body(body),
            }),
            Item::Include { target, arguments } => Node::Include(IncludeNode {
                target: IncludeTarget::Expression(target),
                variables: arguments.variables,
                only: arguments.only,
                ignore_missing: arguments.ignore_missing,
            }),
            Item::Embed {
                parent,
                arguments,
                body,
            } => {
                let body = self.lower_body(body);
                self.check_child_body(&body);
                let index = self.embedded.len();
                self.embedded.push(Module {
                    name: self.name.to_string(),
                    parent: Some(parent),
                    body,
                    embedded: Vec::new(),
                    index: Some(index),
                });
                Node::Include(IncludeNode {
                    target: IncludeTarget::Embedded {
                        filename: self.name.to_string(),
                        index,
                    },
                    variables: arguments.variables,
                    only: arguments.only,
                    ignore_missing: arguments.ignore_missing,
                })
            }
            Item::Extends(_) => {
                self.errors.push(ParseError::syntax(
                    span,
                    "Cannot use extends in a block or an embed",
                ));
                return None;
            }
        };
        Some(Spanned::new(node, span))
    }

    /// A template with a parent may only contain blocks and whitespace at its top level
    fn check_child_body(&mut self, body: &[Spanned<Node>]) {
        for node in body {
            let allowed = match &node.node {
                Node::Block(_) => true,
                Node::Text(s) => s.trim().is_empty(),
                _ => false,
            };
            if !allowed {
                self.errors.push(ParseError::syntax(
                    node.span.clone(),
                    "A template that extends another one cannot include content outside blocks",
                ));
            }
        }
    }
}

fn lower(items: Vec<Spanned<Item>>, name: &str) -> Result<Module, Vec<ParseError>> {
    let mut lowering = Lowering {
        name,
        embedded: Vec::new(),
        errors: Vec::new(),
    };

    let (parent, body) = lowering.lower_root(items);
    if parent.is_some() {
        lowering.check_child_body(&body);
    }

    if !lowering.errors.is_empty() {
        return Err(lowering.errors);
    }

    Ok(Module {
        name: name.to_string(),
        parent,
        body,
        embedded: lowering.embedded,
        index: None,
    })
}
