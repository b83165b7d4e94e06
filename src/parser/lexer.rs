//! Lexer for template sources
//!
//! Template text is split on `{{ }}`, `{% %}` and `{# #}` delimiters by a small
//! scanner; the code inside each tag is tokenized with logos.

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Raw template text between tags (produced by the scanner, never by logos)
    Text(String),

    // Tag delimiters (produced by the scanner)
    PrintOpen,
    PrintClose,
    TagOpen,
    TagClose,

    // Tag keywords
    #[token("include")]
    Include,
    #[token("embed")]
    Embed,
    #[token("endembed")]
    EndEmbed,
    #[token("extends")]
    Extends,
    #[token("block")]
    Block,
    #[token("endblock")]
    EndBlock,
    #[token("with")]
    With,
    #[token("only")]
    Only,
    #[token("ignore")]
    Ignore,
    #[token("missing")]
    Missing,

    // Literal keywords
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("~")]
    Tilde,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    String(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Strip the quotes from a string literal and resolve backslash escapes
fn unescape(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Print,
    Tag,
    Comment,
}

impl Delimiter {
    fn closer(self) -> &'static str {
        match self {
            Delimiter::Print => "}}",
            Delimiter::Tag => "%}",
            Delimiter::Comment => "#}",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Delimiter::Print => "print tag",
            Delimiter::Tag => "block tag",
            Delimiter::Comment => "comment",
        }
    }
}

/// Find the next opening delimiter at or after `from`
fn find_opening(input: &str, from: usize) -> Option<(usize, Delimiter)> {
    let bytes = input.as_bytes();
    let mut pos = from;
    while let Some(offset) = input[pos..].find('{') {
        let at = pos + offset;
        match bytes.get(at + 1) {
            Some(b'{') => return Some((at, Delimiter::Print)),
            Some(b'%') => return Some((at, Delimiter::Tag)),
            Some(b'#') => return Some((at, Delimiter::Comment)),
            _ => pos = at + 1,
        }
    }
    None
}

/// Find the closing delimiter for a tag whose code starts at `from`.
///
/// Quoted strings are skipped, and for print tags a `}}` only closes the tag
/// when it is not closing a map literal.
fn find_closing(input: &str, from: usize, delimiter: Delimiter) -> Option<usize> {
    let bytes = input.as_bytes();
    let closer = delimiter.closer().as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        if delimiter == Delimiter::Comment {
            if bytes[i..].starts_with(closer) {
                return Some(i);
            }
            i += 1;
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' if depth > 0 => depth -= 1,
            _ if depth == 0 && bytes[i..].starts_with(closer) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Tokenize the code inside a tag, shifting spans by `offset`
fn lex_code(
    code: &str,
    offset: usize,
    tokens: &mut Vec<(Token, Span)>,
) -> Result<(), ParseError> {
    for (tok, span) in Token::lexer(code).spanned() {
        let span = (span.start + offset)..(span.end + offset);
        match tok {
            Ok(t) => tokens.push((t, span)),
            Err(()) => {
                return Err(ParseError::syntax(
                    span.clone(),
                    format!("Unexpected character '{}'", &code[span.start - offset..span.end - offset]),
                ))
            }
        }
    }
    Ok(())
}

/// Lex a template source into tokens with spans
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let Some((open, delimiter)) = find_opening(input, pos) else {
            tokens.push((Token::Text(input[pos..].to_string()), pos..input.len()));
            break;
        };

        if open > pos {
            tokens.push((Token::Text(input[pos..open].to_string()), pos..open));
        }

        let code_start = open + 2;
        let close = find_closing(input, code_start, delimiter).ok_or_else(|| {
            ParseError::syntax(
                open..input.len(),
                format!("Unclosed {}, expected '{}'", delimiter.describe(), delimiter.closer()),
            )
        })?;

        match delimiter {
            Delimiter::Comment => {}
            Delimiter::Print => {
                tokens.push((Token::PrintOpen, open..code_start));
                lex_code(&input[code_start..close], code_start, &mut tokens)?;
                tokens.push((Token::PrintClose, close..close + 2));
            }
            Delimiter::Tag => {
                tokens.push((Token::TagOpen, open..code_start));
                lex_code(&input[code_start..close], code_start, &mut tokens)?;
                tokens.push((Token::TagClose, close..close + 2));
            }
        }
        pos = close + 2;
    }

    Ok(tokens)
}
