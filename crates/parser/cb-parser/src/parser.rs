//! Recursive-descent parser for C declarations
//!
//! Works over the token stream from [`crate::lexer`]. Typedef names are
//! tracked while parsing, since `foo * bar;` only reads as a declaration
//! when `foo` names a type.

use crate::error::ParseError;
use crate::TypedefNames;
use cb_span::Span;
use cb_syntax::{
    DeclSpecifiers, Declaration, Declarator, Derivation, Ident, Keyword, ParamDecl, ParamList,
    Punct, SpecifierKind, StorageClass, Token, TokenKind, TranslationUnit, TypeSpecifier,
};
use miette::{NamedSource, SourceSpan};

type PResult<T> = Result<T, ParseError>;

/// Where a declarator appears; parameters may omit the name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaratorContext {
    Named,
    Parameter,
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    file_name: &'a str,
    source: &'a str,
    typedefs: &'a mut TypedefNames,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        tokens: &'a [Token],
        file_name: &'a str,
        source: &'a str,
        typedefs: &'a mut TypedefNames,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            file_name,
            source,
            typedefs,
            errors: Vec::new(),
        }
    }

    pub(crate) fn parse_translation_unit(mut self) -> (TranslationUnit, Vec<ParseError>) {
        let mut unit = TranslationUnit::default();
        let mut linkage_blocks: Vec<Span> = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Punct(Punct::Semi) => {
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Extern)
                    if matches!(self.nth_kind(1), TokenKind::Str(_))
                        && self.nth_kind(2) == &TokenKind::Punct(Punct::LBrace) =>
                {
                    let start = self.bump().span;
                    self.bump();
                    let brace = self.bump().span;
                    linkage_blocks.push(start.cover(brace));
                }
                TokenKind::Punct(Punct::RBrace) if !linkage_blocks.is_empty() => {
                    self.bump();
                    linkage_blocks.pop();
                }
                _ => match self.parse_declaration() {
                    Ok(declaration) => unit.declarations.push(declaration),
                    Err(err) => {
                        let failed_at = self.pos;
                        self.errors.push(err);
                        self.recover();
                        if self.pos == failed_at {
                            self.bump();
                        }
                    }
                },
            }
        }

        if let Some(open) = linkage_blocks.pop() {
            let eof = self.peek().span;
            let err = ParseError::UnclosedDelimiter {
                opening_char: '{',
                closing_char: '}',
                opening: source_span(Span::new(open.end - 1, open.end)),
                expected_close: source_span(eof),
                src: self.named_source(),
            };
            self.errors.push(err);
        }

        (unit, self.errors)
    }

    fn parse_declaration(&mut self) -> PResult<Declaration> {
        let start = self.peek().span;
        let (storage, specifiers) = self.parse_specifiers(true)?;

        if self.at_punct(Punct::Semi) {
            return Err(ParseError::InvalidSyntax {
                construct: "declaration".to_string(),
                suggestion: Some("a declaration must declare at least one name".to_string()),
                span: source_span(start.cover(self.peek().span)),
                src: self.named_source(),
            });
        }

        let mut declarators = Vec::new();
        let mut body = None;

        loop {
            let declarator = self.parse_declarator(DeclaratorContext::Named)?;

            if self.at_punct(Punct::Eq) {
                return Err(ParseError::InvalidSyntax {
                    construct: "declaration".to_string(),
                    suggestion: Some("initializers are not supported in headers".to_string()),
                    span: source_span(self.peek().span),
                    src: self.named_source(),
                });
            }

            let is_function = declarator.is_function();
            declarators.push(declarator);

            if is_function && declarators.len() == 1 && self.at_punct(Punct::LBrace) {
                body = Some(self.skip_body()?);
                break;
            }

            if self.eat_punct(Punct::Comma) {
                continue;
            }

            self.expect_punct(Punct::Semi, "`;`")?;
            break;
        }

        if storage == Some(StorageClass::Typedef) {
            for declarator in &declarators {
                if let Some(name) = &declarator.name {
                    self.typedefs.insert(&name.text);
                }
            }
        }

        let end = self.previous_span();
        Ok(Declaration {
            storage,
            specifiers,
            declarators,
            body,
            span: start.cover(end),
        })
    }

    /// Parses storage classes, qualifiers and type specifiers
    fn parse_specifiers(
        &mut self,
        allow_storage: bool,
    ) -> PResult<(Option<StorageClass>, DeclSpecifiers)> {
        let start = self.peek().span;
        let mut storage = None;
        let mut specifiers = DeclSpecifiers::default();

        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Keyword(
                    keyword @ (Keyword::Typedef | Keyword::Extern | Keyword::Static),
                ) => {
                    if !allow_storage {
                        return Err(self.invalid(
                            "parameter declaration",
                            format!("storage class `{keyword}` is not allowed on a parameter"),
                            token.span,
                        ));
                    }
                    if storage.is_some() {
                        return Err(self.invalid(
                            "declaration",
                            "multiple storage classes in one declaration".to_string(),
                            token.span,
                        ));
                    }
                    storage = Some(match keyword {
                        Keyword::Typedef => StorageClass::Typedef,
                        Keyword::Extern => StorageClass::Extern,
                        _ => StorageClass::Static,
                    });
                    self.bump();
                    // `extern "C" int f(void);`
                    if *keyword == Keyword::Extern && matches!(self.peek_kind(), TokenKind::Str(_))
                    {
                        self.bump();
                    }
                }
                TokenKind::Keyword(Keyword::Inline | Keyword::Noreturn | Keyword::Restrict) => {
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Const) => {
                    specifiers.is_const = true;
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Volatile) => {
                    specifiers.is_volatile = true;
                    self.bump();
                }
                TokenKind::Keyword(keyword @ (Keyword::Struct | Keyword::Union | Keyword::Enum)) => {
                    return Err(self.invalid(
                        "type specifier",
                        format!("`{keyword}` types are not supported; declare them opaquely through a pointer typedef"),
                        token.span,
                    ));
                }
                TokenKind::Keyword(keyword) => match keyword.type_specifier() {
                    Some(kind) => {
                        specifiers.types.push(TypeSpecifier {
                            kind,
                            span: token.span,
                        });
                        self.bump();
                    }
                    None => break,
                },
                TokenKind::Ident(name)
                    if specifiers.types.is_empty() && self.typedefs.contains(name) =>
                {
                    specifiers.types.push(TypeSpecifier {
                        kind: SpecifierKind::Named(name.clone()),
                        span: token.span,
                    });
                    self.bump();
                }
                _ => break,
            }
        }

        if specifiers.types.is_empty() {
            let token = self.peek().clone();
            return Err(match token.kind {
                TokenKind::Ident(name) => ParseError::UnknownTypeName {
                    name,
                    span: source_span(token.span),
                    src: self.named_source(),
                },
                _ => self.missing("a type specifier", &token),
            });
        }

        specifiers.span = start.cover(self.previous_span());
        Ok((storage, specifiers))
    }

    fn parse_declarator(&mut self, context: DeclaratorContext) -> PResult<Declarator> {
        let start = self.peek().span;

        if self.eat_punct(Punct::Star) {
            let mut is_const = false;
            loop {
                match self.peek_kind() {
                    TokenKind::Keyword(Keyword::Const) => is_const = true,
                    TokenKind::Keyword(Keyword::Volatile | Keyword::Restrict) => {}
                    _ => break,
                }
                self.bump();
            }

            let inner = self.parse_declarator(context)?;
            let mut derivations = vec![Derivation::Pointer { is_const }];
            derivations.extend(inner.derivations);
            return Ok(Declarator {
                name: inner.name,
                derivations,
                span: start.cover(self.previous_span()),
            });
        }

        let (name, inner_derivations) = match self.peek_kind().clone() {
            TokenKind::Ident(text) => {
                let span = self.bump().span;
                (Some(Ident { text, span }), Vec::new())
            }
            TokenKind::Punct(Punct::LParen) if self.starts_nested_declarator() => {
                let open = self.bump().span;
                let inner = self.parse_declarator(context)?;
                self.expect_close(open, Punct::RParen)?;
                (inner.name, inner.derivations)
            }
            _ => {
                if context == DeclaratorContext::Named {
                    let token = self.peek().clone();
                    return Err(self.missing("an identifier", &token));
                }
                (None, Vec::new())
            }
        };

        let mut suffixes = Vec::new();
        loop {
            if self.at_punct(Punct::LParen) {
                let open = self.bump().span;
                suffixes.push(Derivation::Function(self.parse_params(open)?));
            } else if self.at_punct(Punct::LBracket) {
                let open = self.bump().span;
                let len = match self.peek_kind() {
                    TokenKind::Number(len) => {
                        let len = *len;
                        self.bump();
                        Some(len)
                    }
                    _ => None,
                };
                self.expect_close(open, Punct::RBracket)?;
                suffixes.push(Derivation::Array(len));
            } else {
                break;
            }
        }

        let mut derivations: Vec<Derivation> = suffixes.into_iter().rev().collect();
        derivations.extend(inner_derivations);

        Ok(Declarator {
            name,
            derivations,
            span: start.cover(self.previous_span()),
        })
    }

    /// After an opening `(` has been consumed
    fn parse_params(&mut self, open: Span) -> PResult<ParamList> {
        let mut list = ParamList::default();

        if self.eat_punct(Punct::RParen) {
            return Ok(list);
        }

        if self.peek_kind() == &TokenKind::Keyword(Keyword::Void)
            && self.nth_kind(1) == &TokenKind::Punct(Punct::RParen)
        {
            self.bump();
            self.bump();
            return Ok(list);
        }

        loop {
            if self.eat_punct(Punct::Ellipsis) {
                if list.params.is_empty() {
                    return Err(self.invalid(
                        "parameter list",
                        "`...` must follow at least one named parameter".to_string(),
                        self.previous_span(),
                    ));
                }
                list.variadic = true;
                self.expect_close(open, Punct::RParen)?;
                return Ok(list);
            }

            let start = self.peek().span;
            let (_, specifiers) = self.parse_specifiers(false)?;
            let declarator = self.parse_declarator(DeclaratorContext::Parameter)?;
            list.params.push(ParamDecl {
                specifiers,
                declarator,
                span: start.cover(self.previous_span()),
            });

            if self.eat_punct(Punct::Comma) {
                continue;
            }
            self.expect_close(open, Punct::RParen)?;
            return Ok(list);
        }
    }

    /// Skips a `{ ... }` function body, returning its span
    fn skip_body(&mut self) -> PResult<Span> {
        let open = self.bump().span;
        let mut depth = 1usize;

        loop {
            let token = self.bump().clone();
            match token.kind {
                TokenKind::Punct(Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(open.cover(token.span));
                    }
                }
                TokenKind::Eof => {
                    return Err(ParseError::UnclosedDelimiter {
                        opening_char: '{',
                        closing_char: '}',
                        opening: source_span(open),
                        expected_close: source_span(token.span),
                        src: self.named_source(),
                    });
                }
                _ => {}
            }
        }
    }

    /// Skip to just past the next `;` outside any nesting
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket) => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Punct(Punct::RBrace) => {
                    // Leave it for an enclosing `extern "C"` block
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        // `struct s { ... } x;` still has declarators to skip
                        if !self.continues_declaration() {
                            return;
                        }
                        continue;
                    }
                }
                TokenKind::Punct(Punct::Semi) if depth == 0 => {
                    self.bump();
                    return;
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Whether the tokens after a closing `}` belong to the same declaration
    fn continues_declaration(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Punct(Punct::Semi | Punct::Star | Punct::Comma) => true,
            TokenKind::Ident(name) => !self.is_type_name(name),
            _ => false,
        }
    }

    /// Whether a `(` opens a nested declarator rather than a parameter list
    fn starts_nested_declarator(&self) -> bool {
        match self.nth_kind(1) {
            TokenKind::Punct(Punct::Star | Punct::LParen | Punct::LBracket) => true,
            TokenKind::Ident(name) => !self.is_type_name(name),
            _ => false,
        }
    }

    fn is_type_name(&self, name: &str) -> bool {
        self.typedefs.contains(name)
    }

    fn peek(&self) -> &Token {
        self.nth(0)
    }

    fn nth(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn nth_kind(&self, offset: usize) -> &TokenKind {
        &self.nth(offset).kind
    }

    fn bump(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(index) => self.tokens[index].span,
            None => self.peek().span,
        }
    }

    fn at_punct(&self, punct: Punct) -> bool {
        self.peek_kind() == &TokenKind::Punct(punct)
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.at_punct(punct) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct, expected: &str) -> PResult<Span> {
        if self.at_punct(punct) {
            return Ok(self.bump().span);
        }
        let token = self.peek().clone();
        Err(self.missing(expected, &token))
    }

    /// Expects the closing delimiter for `open`
    fn expect_close(&mut self, open: Span, close: Punct) -> PResult<Span> {
        if self.at_punct(close) {
            return Ok(self.bump().span);
        }

        let token = self.peek().clone();
        let closing_char = if close == Punct::RParen { ')' } else { ']' };
        let opening_char = if close == Punct::RParen { '(' } else { '[' };

        if matches!(
            token.kind,
            TokenKind::Punct(Punct::Semi | Punct::LBrace | Punct::RBrace) | TokenKind::Eof
        ) {
            Err(ParseError::UnclosedDelimiter {
                opening_char,
                closing_char,
                opening: source_span(open),
                expected_close: source_span(token.span),
                src: self.named_source(),
            })
        } else {
            Err(self.missing(&format!("`{closing_char}`"), &token))
        }
    }

    fn missing(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::MissingToken {
            expected: expected.to_string(),
            found: found.kind.to_string(),
            span: source_span(found.span),
            src: self.named_source(),
        }
    }

    fn invalid(&self, construct: &str, suggestion: String, span: Span) -> ParseError {
        ParseError::InvalidSyntax {
            construct: construct.to_string(),
            suggestion: Some(suggestion),
            span: source_span(span),
            src: self.named_source(),
        }
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.file_name, self.source.to_string())
    }
}

pub(crate) fn source_span(span: Span) -> SourceSpan {
    (span.start as usize, span.len() as usize).into()
}
