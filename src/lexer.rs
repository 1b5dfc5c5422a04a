use crate::errors::MalformedStructure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A key name, or `*`. Surrounding whitespace is already trimmed.
    Ident(String),
    /// The raw, trimmed contents of a `[...]` accessor.
    Accessor(String),
    Question,
    Amp,
    Gt,
    LParen,
    RParen,
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Accessor(raw) => format!("'[{}]'", raw),
            Token::Question => "'?'".to_owned(),
            Token::Amp => "'&'".to_owned(),
            Token::Gt => "'>'".to_owned(),
            Token::LParen => "'('".to_owned(),
            Token::RParen => "')'".to_owned(),
            Token::Eof => "end of structure".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    // Set right after the optional marker, so a second `?` starts the key.
    after_marker: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            after_marker: false,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, MalformedStructure> {
        let mut tokens = vec![];
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, MalformedStructure> {
        self.skip_whitespace();

        let position = self.position;
        let after_marker = std::mem::replace(&mut self.after_marker, false);
        let c = match self.current_char() {
            Some(c) => c,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    position,
                })
            }
        };

        let token = match c {
            '&' => {
                self.advance();
                Token::Amp
            }
            '>' => {
                self.advance();
                Token::Gt
            }
            '(' => {
                self.advance();
                Token::LParen
            }
            ')' => {
                self.advance();
                Token::RParen
            }
            '?' if !after_marker => {
                self.advance();
                self.after_marker = true;
                Token::Question
            }
            '[' => self.accessor()?,
            ']' => {
                return Err(MalformedStructure::UnexpectedToken {
                    expected: "a step",
                    found: "']'".to_owned(),
                    position,
                })
            }
            _ => self.ident(),
        };

        Ok(Spanned { token, position })
    }

    fn accessor(&mut self) -> Result<Token, MalformedStructure> {
        let start = self.position;
        self.advance();

        let inner_start = self.position;
        while let Some(c) = self.current_char() {
            if c == ']' {
                let raw = self.input[inner_start..self.position].trim().to_owned();
                self.advance();
                return Ok(Token::Accessor(raw));
            }
            self.advance();
        }

        Err(MalformedStructure::UnterminatedAccessor { position: start })
    }

    // Keys may contain inner whitespace and `?`; only the structural
    // characters end them.
    fn ident(&mut self) -> Token {
        let start = self.position;
        while let Some(c) = self.current_char() {
            match c {
                '&' | '>' | '(' | ')' | '[' | ']' => break,
                _ => self.advance(),
            }
        }

        Token::Ident(self.input[start..self.position].trim_end().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn path_with_depth_run() {
        assert_eq!(
            tokens("ret >> skey"),
            vec![
                Token::Ident("ret".to_owned()),
                Token::Gt,
                Token::Gt,
                Token::Ident("skey".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn accessors_and_groups() {
        assert_eq!(
            tokens("ret > (key1[ 0 ][*] & ?key2)"),
            vec![
                Token::Ident("ret".to_owned()),
                Token::Gt,
                Token::LParen,
                Token::Ident("key1".to_owned()),
                Token::Accessor("0".to_owned()),
                Token::Accessor("*".to_owned()),
                Token::Amp,
                Token::Question,
                Token::Ident("key2".to_owned()),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn inner_whitespace_is_kept() {
        assert_eq!(
            tokens("  display name  > x"),
            vec![
                Token::Ident("display name".to_owned()),
                Token::Gt,
                Token::Ident("x".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn positions() {
        let spanned = Lexer::new("a & b").tokenize().unwrap();
        let positions: Vec<usize> = spanned.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 2, 4, 5]);
    }

    #[test]
    fn only_leading_question_mark_is_a_marker() {
        assert_eq!(
            tokens("??x & a?b"),
            vec![
                Token::Question,
                Token::Ident("?x".to_owned()),
                Token::Amp,
                Token::Ident("a?b".to_owned()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_accessor() {
        assert_eq!(
            Lexer::new("ret[0").tokenize(),
            Err(MalformedStructure::UnterminatedAccessor { position: 3 })
        );
    }

    #[test]
    fn stray_close_bracket() {
        assert!(Lexer::new("ret]").tokenize().is_err());
    }
}
