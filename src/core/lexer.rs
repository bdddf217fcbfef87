use super::error::{PDFError, PDFResult};

/// Tokens produced by the content-stream [`Lexer`].
///
/// An `Array` carries its elements pre-parsed rather than leaving array
/// handling to a downstream parser — the interpreter never needs a second
/// pass over `[` ... `]` content, only `TJ`'s array operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Name(String),
    String(Vec<u8>),
    HexString(Vec<u8>),
    Array(Vec<Token>),
    Operator(String),
}

/// Tokenizes a content-stream byte buffer into a lazy sequence of [`Token`]s.
///
/// Operates directly on a borrowed byte slice — no stream abstraction, no
/// chunked/progressive loading, since the core only ever sees a page's
/// content-stream bytes already resident in memory.
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
    current_char: i32,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let current_char = if data.is_empty() {
            -1
        } else {
            data[0] as i32
        };
        Lexer {
            data,
            pos: 0,
            current_char,
        }
    }

    fn next_char(&mut self) -> i32 {
        self.pos += 1;
        self.current_char = match self.data.get(self.pos) {
            Some(&b) => b as i32,
            None => -1,
        };
        self.current_char
    }

    fn peek_char(&self) -> i32 {
        match self.data.get(self.pos + 1) {
            Some(&b) => b as i32,
            None => -1,
        }
    }

    fn is_whitespace(ch: i32) -> bool {
        matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
    }

    fn is_delimiter(ch: i32) -> bool {
        matches!(
            ch,
            0x28 | 0x29 | 0x3C | 0x3E | 0x5B | 0x5D | 0x7B | 0x7D | 0x2F | 0x25
        )
    }

    fn is_regular(ch: i32) -> bool {
        ch >= 0 && !Self::is_whitespace(ch) && !Self::is_delimiter(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        let mut in_comment = false;
        loop {
            let ch = self.current_char;
            if ch < 0 {
                break;
            }
            if in_comment {
                if ch == 0x0A || ch == 0x0D {
                    in_comment = false;
                }
            } else if ch == 0x25 {
                // '%' starts a comment
                in_comment = true;
            } else if !Self::is_whitespace(ch) {
                break;
            }
            self.next_char();
        }
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> PDFResult<Option<Token>> {
        self.skip_whitespace_and_comments();
        let ch = self.current_char;
        if ch < 0 {
            return Ok(None);
        }

        match ch {
            0x30..=0x39 | 0x2B | 0x2D | 0x2E => Ok(Some(self.get_number())),
            0x28 => self.get_string().map(Some),
            0x2F => Ok(Some(self.get_name())),
            0x5B => {
                self.next_char();
                self.get_array().map(Some)
            }
            0x3C => {
                if self.peek_char() == 0x3C {
                    self.next_char();
                    self.next_char();
                    self.skip_dictionary()?;
                    self.next_token()
                } else {
                    self.get_hex_string().map(Some)
                }
            }
            _ => Ok(Some(self.get_command())),
        }
    }

    fn get_number(&mut self) -> Token {
        let mut ch = self.current_char;
        let mut sign = 1.0;
        let mut divide_by = 0.0;

        if ch == 0x2D {
            sign = -1.0;
            ch = self.next_char();
        } else if ch == 0x2B {
            ch = self.next_char();
        }

        if ch == 0x2E {
            divide_by = 10.0;
            ch = self.next_char();
        }

        if ch < 0x30 || ch > 0x39 {
            return Token::Number(0.0);
        }

        let mut base_value = (ch - 0x30) as f64;
        loop {
            ch = self.next_char();
            if ch >= 0x30 && ch <= 0x39 {
                if divide_by != 0.0 {
                    divide_by *= 10.0;
                }
                base_value = base_value * 10.0 + (ch - 0x30) as f64;
            } else if ch == 0x2E && divide_by == 0.0 {
                divide_by = 1.0;
            } else {
                break;
            }
        }

        let mut result = base_value;
        if divide_by != 0.0 {
            result /= divide_by;
        }
        Token::Number(sign * result)
    }

    fn get_string(&mut self) -> PDFResult<Token> {
        let mut depth = 1;
        let mut buf = Vec::new();
        let mut ch = self.next_char(); // consume opening '('

        loop {
            let mut char_buffered = false;
            match ch {
                -1 => return Err(PDFError::content_stream_error("unterminated literal string")),
                0x28 => {
                    depth += 1;
                    buf.push(b'(');
                }
                0x29 => {
                    depth -= 1;
                    if depth == 0 {
                        self.next_char();
                        break;
                    }
                    buf.push(b')');
                }
                0x5C => {
                    ch = self.next_char();
                    match ch {
                        -1 => return Err(PDFError::content_stream_error("unterminated literal string")),
                        0x6E => buf.push(b'\n'),
                        0x72 => buf.push(b'\r'),
                        0x74 => buf.push(b'\t'),
                        0x62 => buf.push(0x08),
                        0x66 => buf.push(0x0C),
                        0x5C | 0x28 | 0x29 => buf.push(ch as u8),
                        0x30..=0x37 => {
                            let mut x = (ch & 0x0F) as u8;
                            ch = self.next_char();
                            char_buffered = true;
                            if (0x30..=0x37).contains(&ch) {
                                x = (x << 3) + (ch & 0x0F) as u8;
                                ch = self.next_char();
                                if (0x30..=0x37).contains(&ch) {
                                    char_buffered = false;
                                    x = (x << 3) + (ch & 0x0F) as u8;
                                }
                            }
                            buf.push(x);
                        }
                        0x0D => {
                            if self.peek_char() == 0x0A {
                                self.next_char();
                            }
                        }
                        0x0A => {}
                        _ => buf.push(ch as u8),
                    }
                }
                _ => buf.push(ch as u8),
            }
            if !char_buffered {
                ch = self.next_char();
            }
        }

        Ok(Token::String(buf))
    }

    fn get_hex_string(&mut self) -> PDFResult<Token> {
        let mut digits = Vec::new();
        let mut ch = self.next_char(); // consume '<'

        loop {
            match ch {
                -1 => return Err(PDFError::content_stream_error("unterminated hex string")),
                0x3E => {
                    self.next_char();
                    break;
                }
                c if Self::is_whitespace(c) => {}
                c => digits.push(c as u8),
            }
            ch = self.next_char();
        }

        if digits.len() % 2 == 1 {
            digits.push(b'0');
        }

        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks(2) {
            let hi = hex_value(pair[0]).unwrap_or(0);
            let lo = hex_value(pair[1]).unwrap_or(0);
            bytes.push((hi << 4) | lo);
        }
        Ok(Token::HexString(bytes))
    }

    fn get_name(&mut self) -> Token {
        let mut name = String::new();
        let mut ch = self.next_char(); // consume '/'

        while Self::is_regular(ch) {
            if ch == 0x23 {
                // '#hh' escape
                let hi = self.next_char();
                let lo = self.next_char();
                match (
                    hi.try_into().ok().and_then(hex_value),
                    lo.try_into().ok().and_then(hex_value),
                ) {
                    (Some(h), Some(l)) => name.push(((h << 4) | l) as char),
                    _ => {
                        name.push('#');
                        if hi >= 0 {
                            name.push(hi as u8 as char);
                        }
                        if lo >= 0 {
                            name.push(lo as u8 as char);
                        }
                    }
                }
                ch = self.next_char();
                continue;
            }
            name.push(ch as u8 as char);
            ch = self.next_char();
        }
        Token::Name(name)
    }

    fn get_command(&mut self) -> Token {
        let mut cmd = String::new();
        let mut ch = self.current_char;
        while Self::is_regular(ch) {
            cmd.push(ch as u8 as char);
            ch = self.next_char();
        }
        Token::Operator(cmd)
    }

    fn get_array(&mut self) -> PDFResult<Token> {
        let mut elements = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.current_char == 0x5D {
                self.next_char();
                break;
            }
            if self.current_char < 0 {
                return Err(PDFError::content_stream_error("unterminated array"));
            }
            match self.next_token()? {
                Some(tok) => elements.push(tok),
                None => return Err(PDFError::content_stream_error("unterminated array")),
            }
        }
        Ok(Token::Array(elements))
    }

    fn skip_dictionary(&mut self) -> PDFResult<()> {
        let mut depth = 1;
        loop {
            self.skip_whitespace_and_comments();
            match self.current_char {
                -1 => return Err(PDFError::content_stream_error("unterminated dictionary")),
                0x3C if self.peek_char() == 0x3C => {
                    depth += 1;
                    self.next_char();
                    self.next_char();
                }
                0x3E if self.peek_char() == 0x3E => {
                    depth -= 1;
                    self.next_char();
                    self.next_char();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                // Values inside the dictionary may themselves be strings or
                // arrays containing delimiter-like bytes; tokenize through
                // them rather than scanning raw bytes for '<<'/'>>'.
                0x28 => {
                    self.get_string()?;
                }
                0x5B => {
                    self.next_char();
                    self.get_array()?;
                }
                _ => {
                    self.next_char();
                }
            }
        }
    }
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = PDFResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Some(tok)) => Some(Ok(tok)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
