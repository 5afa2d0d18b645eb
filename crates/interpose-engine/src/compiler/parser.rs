//! Recursive-descent parser for proxy descriptors.

use crate::compiler::ast::{
    ClassDecl, InitDecl, InitTarget, Literal, Member, OverrideDecl, Path, SlotDecl, Unit,
};
use crate::compiler::error::CompileError;
use crate::compiler::lexer::{Span, Token};
use crate::vm::TypeRef;

/// Parser over a token stream
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    eof: Span,
}

impl Parser {
    /// Parser over `tokens`
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        let eof = tokens
            .last()
            .map(|(_, span)| Span {
                start: span.end,
                end: span.end,
                line: span.line,
                column: span.column + (span.end - span.start) as u32,
            })
            .unwrap_or(Span {
                start: 0,
                end: 0,
                line: 1,
                column: 1,
            });
        Self {
            tokens,
            pos: 0,
            eof,
        }
    }

    /// Parse a complete unit
    pub fn parse(mut self) -> Result<Unit, CompileError> {
        let mut uses = Vec::new();
        while self.eat(&Token::Use) {
            uses.push(self.path()?);
            self.expect(&Token::Semicolon)?;
        }
        let class = self.class_decl()?;
        if let Some((token, span)) = self.tokens.get(self.pos) {
            return Err(Self::error_at(
                *span,
                format!("unexpected {} after class body", token.describe()),
            ));
        }
        Ok(Unit { uses, class })
    }

    fn class_decl(&mut self) -> Result<ClassDecl, CompileError> {
        self.expect(&Token::Class)?;
        let name = self.path()?;
        self.expect(&Token::Extends)?;
        let parent = self.path()?;
        self.expect(&Token::LeftBrace)?;
        let mut members = Vec::new();
        while !self.eat(&Token::RightBrace) {
            members.push(self.member()?);
        }
        Ok(ClassDecl {
            name,
            parent,
            members,
        })
    }

    fn member(&mut self) -> Result<Member, CompileError> {
        let span = self.span();
        match self.advance() {
            Some(Token::Slot) => {
                let name = self.ident()?;
                self.expect(&Token::Colon)?;
                let ty = self.ident()?;
                if ty != "handler" {
                    return Err(Self::error_at(span, format!("slot type must be handler, found {}", ty)));
                }
                self.expect(&Token::Semicolon)?;
                Ok(Member::Slot(SlotDecl { name, span }))
            }
            Some(Token::Init) => self.init_decl(span).map(Member::Init),
            Some(Token::Override) => self.override_decl(span).map(Member::Override),
            Some(other) => Err(Self::error_at(
                span,
                format!("expected slot, init or override, found {}", other.describe()),
            )),
            None => Err(Self::error_at(span, "unexpected end of input in class body")),
        }
    }

    fn init_decl(&mut self, span: Span) -> Result<InitDecl, CompileError> {
        self.expect(&Token::LeftParen)?;
        let param = if self.eat(&Token::RightParen) {
            None
        } else {
            let name = self.ident()?;
            self.expect(&Token::RightParen)?;
            Some(name)
        };
        self.expect(&Token::Equals)?;

        let target = if self.eat(&Token::Nothing) {
            InitTarget::Nothing
        } else {
            self.expect(&Token::Super)?;
            self.expect(&Token::Hash)?;
            let index_span = self.span();
            let index = match self.advance() {
                Some(Token::Int(i)) if i >= 0 => i as usize,
                _ => return Err(Self::error_at(index_span, "expected initializer index")),
            };
            self.expect(&Token::LeftParen)?;
            let mut args = Vec::new();
            if !self.eat(&Token::RightParen) {
                loop {
                    args.push(self.literal()?);
                    if self.eat(&Token::RightParen) {
                        break;
                    }
                    self.expect(&Token::Comma)?;
                }
            }
            InitTarget::Super { index, args }
        };

        let passthrough = if self.eat(&Token::With) {
            self.expect(&Token::Passthrough)?;
            true
        } else {
            false
        };
        self.expect(&Token::Semicolon)?;
        Ok(InitDecl {
            param,
            target,
            passthrough,
            span,
        })
    }

    fn override_decl(&mut self, span: Span) -> Result<OverrideDecl, CompileError> {
        let name = self.ident()?;
        self.expect(&Token::LeftParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        if !self.eat(&Token::RightParen) {
            loop {
                params.push(self.type_ref()?);
                if self.eat(&Token::Ellipsis) {
                    variadic = true;
                    self.expect(&Token::RightParen)?;
                    break;
                }
                if self.eat(&Token::RightParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        self.expect(&Token::Arrow)?;
        let return_type = self.type_ref()?;

        let mut throws = Vec::new();
        if self.eat(&Token::Throws) {
            loop {
                throws.push(self.path()?.text);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::From)?;
        let origin = self.path()?;
        self.expect(&Token::Semicolon)?;
        Ok(OverrideDecl {
            name,
            params,
            variadic,
            return_type,
            throws,
            origin,
            span,
        })
    }

    fn literal(&mut self) -> Result<Literal, CompileError> {
        let span = self.span();
        match self.advance() {
            Some(Token::Null) => Ok(Literal::Null),
            Some(Token::True) => Ok(Literal::Bool(true)),
            Some(Token::False) => Ok(Literal::Bool(false)),
            Some(Token::Int(i)) => Ok(Literal::Int(i)),
            Some(Token::Float(f)) => Ok(Literal::Float(f)),
            Some(other) => Err(Self::error_at(
                span,
                format!("expected literal, found {}", other.describe()),
            )),
            None => Err(Self::error_at(span, "expected literal, found end of input")),
        }
    }

    fn type_ref(&mut self) -> Result<TypeRef, CompileError> {
        Ok(TypeRef::parse(&self.path()?.text))
    }

    fn path(&mut self) -> Result<Path, CompileError> {
        let span = self.span();
        match self.advance() {
            Some(Token::Path(text)) => Ok(Path { text, span }),
            Some(other) => Err(Self::error_at(
                span,
                format!("expected name, found {}", other.describe()),
            )),
            None => Err(Self::error_at(span, "expected name, found end of input")),
        }
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        let path = self.path()?;
        if path.text.contains('.') {
            return Err(Self::error_at(
                path.span,
                format!("expected identifier, found path {}", path.text),
            ));
        }
        Ok(path.text)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| *span)
            .unwrap_or(self.eof)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        match self.tokens.get(self.pos) {
            Some((token, _)) if token == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), CompileError> {
        if self.eat(expected) {
            return Ok(());
        }
        let span = self.span();
        let found = self
            .tokens
            .get(self.pos)
            .map(|(t, _)| t.describe())
            .unwrap_or_else(|| "end of input".to_string());
        Err(Self::error_at(
            span,
            format!("expected {}, found {}", expected.describe(), found),
        ))
    }

    fn error_at(span: Span, message: impl Into<String>) -> CompileError {
        CompileError::Parse {
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }
}

/// Parse a token stream into a unit
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Unit, CompileError> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;

    fn parse_src(src: &str) -> Result<Unit, CompileError> {
        parse(tokenize(src)?)
    }

    #[test]
    fn test_parse_full_unit() {
        let unit = parse_src(
            "use a.B;\n\
             class a.B$$Intercepted extends a.B {\n\
                 slot handler: handler;\n\
                 init() = super#1(0, null, 0.0) with passthrough;\n\
                 init(handler) = none;\n\
                 override run(i32, list ...) -> str throws IoFailure, Timeout from a.B;\n\
             }",
        )
        .unwrap();

        assert_eq!(unit.uses.len(), 1);
        assert_eq!(unit.class.parent.text, "a.B");
        assert_eq!(unit.class.members.len(), 4);

        match &unit.class.members[1] {
            Member::Init(init) => {
                assert!(init.passthrough);
                assert_eq!(
                    init.target,
                    InitTarget::Super {
                        index: 1,
                        args: vec![Literal::Int(0), Literal::Null, Literal::Float(0.0)]
                    }
                );
            }
            other => panic!("expected init, got {other:?}"),
        }
        match &unit.class.members[3] {
            Member::Override(op) => {
                assert!(op.variadic);
                assert_eq!(op.params, vec![TypeRef::I32, TypeRef::List]);
                assert_eq!(op.throws, vec!["IoFailure".to_string(), "Timeout".to_string()]);
                assert_eq!(op.describe(), "run(i32, list ...) -> str");
            }
            other => panic!("expected override, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_semicolon_reports_position() {
        let err = parse_src("class a.X extends a.Y {\n  slot h: handler\n}").unwrap_err();
        match err {
            CompileError::Parse { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("expected semicolon"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_slot_type_must_be_handler() {
        let err = parse_src("class a.X extends a.Y { slot h: str; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_src("class a.X extends a.Y { } use").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn test_unterminated_body() {
        let err = parse_src("class a.X extends a.Y { slot h: handler;").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
