use crate::ast::{
    Combinator, CompareOp, ConditionToken, FunctionToken, LiteralToken, PathToken, RepeatOp,
};

/// Character cursor shared by the path, condition and function grammars.
///
/// Each `next_*_token` call skips surrounding whitespace, tries its
/// alternatives in priority order and leaves the position untouched when
/// nothing matches.
pub struct Scanner {
    input: Vec<char>,
    position: usize,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Scanner {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Unconsumed input, without surrounding whitespace.
    pub fn remainder(&self) -> String {
        self.input[self.position.min(self.input.len())..]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Optional `.` between segments, plus trailing whitespace.
    fn eat_separator(&mut self) {
        self.eat('.');
        self.skip_whitespace();
    }

    fn read_digits(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// `[A-Za-z_][A-Za-z0-9_-]*`
    fn read_identifier(&mut self) -> Option<String> {
        match self.current_char() {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
            _ => return None,
        }
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Some(result)
    }

    /// `[A-Za-z0-9_]+`
    fn read_word(&mut self) -> Option<String> {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        (!result.is_empty()).then_some(result)
    }

    /// Quoted string; a backslash escapes the quote character only.
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        let checkpoint = self.position;
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Some(result);
                }
                '\\' if self.peek_char(1) == Some(quote) => {
                    result.push(quote);
                    self.advance();
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        self.position = checkpoint;
        None
    }

    /// `/pattern/flags` with flags drawn from `i`, `m` and `g`.
    fn read_regex(&mut self) -> Option<(String, String)> {
        let checkpoint = self.position;
        let mut pattern = String::new();
        self.advance();

        loop {
            match self.current_char() {
                Some('/') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_char(1) == Some('/') => {
                    pattern.push('/');
                    self.advance();
                    self.advance();
                }
                Some(ch) => {
                    pattern.push(ch);
                    self.advance();
                }
                None => {
                    self.position = checkpoint;
                    return None;
                }
            }
        }

        if pattern.is_empty() {
            self.position = checkpoint;
            return None;
        }

        let mut flags = String::new();
        while let Some(ch) = self.current_char() {
            if matches!(ch, 'i' | 'm' | 'g') && flags.len() < 3 {
                flags.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Some((pattern, flags))
    }

    /// `(-?N)~M` or `-N`.
    fn read_slice(&mut self) -> Option<(i64, Option<usize>)> {
        let checkpoint = self.position;
        let negative = self.eat('-');
        let digits = self.read_digits();

        let start = match digits.parse::<i64>() {
            Ok(n) if negative => -n,
            Ok(n) => n,
            Err(_) => {
                self.position = checkpoint;
                return None;
            }
        };

        let tilde = self.position;
        if self.eat('~') {
            if let Ok(limit) = self.read_digits().parse::<usize>() {
                return Some((start, Some(limit)));
            }
            // `-N~` without a count is still `-N`.
            if negative {
                self.position = tilde;
                return Some((start, None));
            }
        } else if negative {
            return Some((start, None));
        }

        self.position = checkpoint;
        None
    }

    fn read_number(&mut self) -> Option<LiteralToken> {
        let checkpoint = self.position;
        let mut number = self.read_digits();
        let mut is_float = false;

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            number.push('.');
            number.push_str(&self.read_digits());
            is_float = true;
        }

        // Followed by `.`, `:` or `~` it is the start of a path.
        if matches!(self.current_char(), Some('.' | ':' | '~')) {
            self.position = checkpoint;
            return None;
        }

        if !is_float && let Ok(n) = number.parse::<i64>() {
            return Some(LiteralToken::Integer(n));
        }
        match number.parse::<f64>() {
            Ok(n) => Some(LiteralToken::Float(n)),
            Err(_) => {
                self.position = checkpoint;
                None
            }
        }
    }

    /// `true` or `false` not followed by another identifier character.
    fn read_boolean(&mut self) -> Option<bool> {
        for (word, value) in [("true", true), ("false", false)] {
            let len = word.chars().count();
            let matches = word
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_char(i) == Some(c));
            let bounded = !self
                .peek_char(len)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if matches && bounded {
                self.position += len;
                return Some(value);
            }
        }
        None
    }

    fn read_operator(&mut self) -> Option<CompareOp> {
        let (op, len) = match (self.current_char()?, self.peek_char(1)) {
            ('!', Some('=')) => (CompareOp::NotEqual, 2),
            ('=', Some('=')) => (CompareOp::Equal, 2),
            ('>', Some('=')) => (CompareOp::GreaterEqual, 2),
            ('<', Some('=')) => (CompareOp::LessEqual, 2),
            ('>', _) => (CompareOp::GreaterThan, 1),
            ('<', _) => (CompareOp::LessThan, 1),
            ('=', _) => (CompareOp::Equal, 1),
            _ => return None,
        };
        self.position += len;
        Some(op)
    }

    pub fn next_path_token(&mut self) -> PathToken {
        self.skip_whitespace();
        let checkpoint = self.position;

        let Some(ch) = self.current_char() else {
            return PathToken::End;
        };

        if ch == '.' {
            self.advance();
            self.skip_whitespace();
            return PathToken::Parent;
        }

        let reverse = self.eat('^');

        if let Some((start, limit)) = self.read_slice() {
            self.eat_separator();
            return PathToken::Slice {
                start,
                limit,
                reverse,
            };
        }

        let repeat = match self.current_char() {
            Some('*') => Some(RepeatOp::Wildcard),
            Some('#') => Some(RepeatOp::Descend),
            Some('+') => Some(RepeatOp::Conditional),
            _ => None,
        };
        if let Some(op) = repeat {
            self.advance();
            self.eat_separator();
            return PathToken::Repeat { op, reverse };
        }

        if reverse {
            self.position = checkpoint;
            return PathToken::End;
        }

        if ch.is_ascii_digit() {
            let digits = self.read_digits();
            self.eat_separator();
            return PathToken::Field(digits);
        }

        if let Some(name) = self.read_identifier() {
            self.eat_separator();
            return PathToken::Field(name);
        }

        match ch {
            '$' => {
                self.advance();
                match self.read_word() {
                    Some(name) => {
                        self.eat_separator();
                        PathToken::Variable(name)
                    }
                    None => {
                        self.position = checkpoint;
                        PathToken::End
                    }
                }
            }
            ':' => {
                self.advance();
                PathToken::Function
            }
            '[' | '(' => {
                self.advance();
                self.skip_whitespace();
                PathToken::Open
            }
            _ => PathToken::End,
        }
    }

    pub fn next_condition_token(&mut self) -> ConditionToken {
        self.skip_whitespace();
        let checkpoint = self.position;

        let Some(ch) = self.current_char() else {
            return ConditionToken::End;
        };

        let token = if let Some(op) = self.read_operator() {
            ConditionToken::Operator(op)
        } else {
            match ch {
                '!' => {
                    let mut count = 0;
                    while self.eat('!') {
                        count += 1;
                    }
                    ConditionToken::Not(count)
                }
                '&' => {
                    self.advance();
                    ConditionToken::Combinator(Combinator::And)
                }
                '|' => {
                    self.advance();
                    ConditionToken::Combinator(Combinator::Or)
                }
                '[' | '(' => {
                    self.advance();
                    ConditionToken::Open
                }
                ']' | ')' => {
                    self.advance();
                    self.eat('.');
                    ConditionToken::Close
                }
                c if c.is_ascii_digit() => match self.read_number() {
                    Some(literal) => ConditionToken::Literal(literal),
                    None => ConditionToken::Path,
                },
                't' | 'f' => match self.read_boolean() {
                    Some(b) => ConditionToken::Literal(LiteralToken::Boolean(b)),
                    None => ConditionToken::Path,
                },
                '"' | '\'' => match self.read_quoted(ch) {
                    Some(s) => ConditionToken::Literal(LiteralToken::String(s)),
                    None => ConditionToken::Path,
                },
                '/' => match self.read_regex() {
                    Some((pattern, flags)) => {
                        ConditionToken::Literal(LiteralToken::Regex { pattern, flags })
                    }
                    None => ConditionToken::Path,
                },
                '$' => {
                    self.advance();
                    match self.read_word() {
                        Some(name) => ConditionToken::Variable(name),
                        None => {
                            self.position = checkpoint;
                            ConditionToken::Path
                        }
                    }
                }
                _ => ConditionToken::Path,
            }
        };

        if token != ConditionToken::Path {
            self.skip_whitespace();
        }
        token
    }

    pub fn next_function_token(&mut self) -> FunctionToken {
        self.skip_whitespace();

        if self.eat('.') {
            self.skip_whitespace();
            return FunctionToken::Default;
        }

        let Some(name) = self.read_word() else {
            return FunctionToken::End;
        };

        let mut args = None;
        let open = self.position;
        if self.eat('(') {
            let mut raw = String::new();
            loop {
                match self.current_char() {
                    Some(')') => {
                        self.advance();
                        args = Some(raw);
                        break;
                    }
                    Some('\\') if self.peek_char(1) == Some(')') => {
                        raw.push(')');
                        self.advance();
                        self.advance();
                    }
                    Some(ch) => {
                        raw.push(ch);
                        self.advance();
                    }
                    None => {
                        // Unclosed argument list: leave it unconsumed.
                        self.position = open;
                        break;
                    }
                }
            }
        }

        self.eat_separator();
        FunctionToken::Call { name, args }
    }
}

#[test]
fn test_path_segments() {
    let mut scanner = Scanner::new("items.0.*.^#.name");
    assert_eq!(scanner.next_path_token(), PathToken::Field("items".to_string()));
    assert_eq!(scanner.next_path_token(), PathToken::Field("0".to_string()));
    assert_eq!(
        scanner.next_path_token(),
        PathToken::Repeat {
            op: RepeatOp::Wildcard,
            reverse: false
        }
    );
    assert_eq!(
        scanner.next_path_token(),
        PathToken::Repeat {
            op: RepeatOp::Descend,
            reverse: true
        }
    );
    assert_eq!(scanner.next_path_token(), PathToken::Field("name".to_string()));
    assert_eq!(scanner.next_path_token(), PathToken::End);
    assert!(scanner.is_at_end());
}

#[test]
fn test_slices() {
    let mut scanner = Scanner::new("3~5 -1 -2~1. ^0~2");
    assert_eq!(
        scanner.next_path_token(),
        PathToken::Slice {
            start: 3,
            limit: Some(5),
            reverse: false
        }
    );
    assert_eq!(
        scanner.next_path_token(),
        PathToken::Slice {
            start: -1,
            limit: None,
            reverse: false
        }
    );
    assert_eq!(
        scanner.next_path_token(),
        PathToken::Slice {
            start: -2,
            limit: Some(1),
            reverse: false
        }
    );
    assert_eq!(
        scanner.next_path_token(),
        PathToken::Slice {
            start: 0,
            limit: Some(2),
            reverse: true
        }
    );
}

#[test]
fn test_number_before_dot_is_a_path() {
    let mut scanner = Scanner::new("0.name");
    assert_eq!(scanner.next_condition_token(), ConditionToken::Path);
    assert_eq!(scanner.position(), 0);

    let mut scanner = Scanner::new("2009)");
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Literal(LiteralToken::Integer(2009))
    );
    assert_eq!(scanner.next_condition_token(), ConditionToken::Close);
}

#[test]
fn test_condition_tokens() {
    let mut scanner = Scanner::new(r#"!! year >= 1.5 & 'it\'s' | /^ho/i = $who"#);
    assert_eq!(scanner.next_condition_token(), ConditionToken::Not(2));
    assert_eq!(scanner.next_condition_token(), ConditionToken::Path);
    assert_eq!(scanner.next_path_token(), PathToken::Field("year".to_string()));
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Operator(CompareOp::GreaterEqual)
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Literal(LiteralToken::Float(1.5))
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Combinator(Combinator::And)
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Literal(LiteralToken::String("it's".to_string()))
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Combinator(Combinator::Or)
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Literal(LiteralToken::Regex {
            pattern: "^ho".to_string(),
            flags: "i".to_string()
        })
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Operator(CompareOp::Equal)
    );
    assert_eq!(
        scanner.next_condition_token(),
        ConditionToken::Variable("who".to_string())
    );
    assert_eq!(scanner.next_condition_token(), ConditionToken::End);
}

#[test]
fn test_boolean_needs_word_boundary() {
    let mut scanner = Scanner::new("trueish");
    assert_eq!(scanner.next_condition_token(), ConditionToken::Path);
    assert_eq!(scanner.position(), 0);
}

#[test]
fn test_function_chain() {
    let mut scanner = Scanner::new(r#"split(",").first . upper("a\)b")"#);
    assert_eq!(
        scanner.next_function_token(),
        FunctionToken::Call {
            name: "split".to_string(),
            args: Some(r#"",""#.to_string())
        }
    );
    assert_eq!(
        scanner.next_function_token(),
        FunctionToken::Call {
            name: "first".to_string(),
            args: None
        }
    );
    assert_eq!(scanner.next_function_token(), FunctionToken::Default);
    assert_eq!(
        scanner.next_function_token(),
        FunctionToken::Call {
            name: "upper".to_string(),
            args: Some(r#""a)b""#.to_string())
        }
    );
    assert_eq!(scanner.next_function_token(), FunctionToken::End);
}
