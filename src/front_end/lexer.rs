use std::collections::VecDeque;
use std::fmt;
use std::panic;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use regex::Regex;
use tracing::{debug, trace};

use crate::front_end::input_stream::InputStream;
use crate::front_end::token::{Token, TokenType};

// Constants that are not directly captured as visible chars
pub const CHAR_TAB: char = '\u{0009}';
pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_CR: char = '\u{000D}';

// State of the scanner. A state scans a bit of input, emits zero or more tokens and returns the
// next state. Returning None stops the lexer.
pub struct StateFn(pub fn(&mut Scanner) -> Option<StateFn>);

// Unicode classification tables that can be used instead of spelling out every accepted rune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Letter,
    Digit,
    Alphanumeric,
    Whitespace,
    Uppercase,
    Lowercase,
    Punctuation,
    Control,
}

impl CharClass {
    pub fn contains(self, c: char) -> bool {
        match self {
            CharClass::Letter => c.is_alphabetic(),
            CharClass::Digit => c.is_numeric(),
            CharClass::Alphanumeric => c.is_alphanumeric(),
            CharClass::Whitespace => c.is_whitespace(),
            CharClass::Uppercase => c.is_uppercase(),
            CharClass::Lowercase => c.is_lowercase(),
            CharClass::Punctuation => c.is_ascii_punctuation(),
            CharClass::Control => c.is_control(),
        }
    }
}

fn in_classes(c: char, classes: &[CharClass]) -> bool {
    classes.iter().any(|class| class.contains(c))
}

// Returns true if the char is '\r' or '\n'
pub fn is_newline(c: char) -> bool {
    c == CHAR_LF || c == CHAR_CR
}

// Returns true for white space other than '\r' and '\n'
pub fn is_non_newline_space(c: char) -> bool {
    !is_newline(c) && c.is_whitespace()
}

pub fn is_alphanumeric(c: char) -> bool {
    in_classes(c, &[CharClass::Letter, CharClass::Digit])
}

// Patterns starting with ^ or \A only ever match at the start of the haystack
fn is_anchored(re: &Regex) -> bool {
    let pattern = re.as_str();
    pattern.starts_with('^') || pattern.starts_with("\\A")
}

// Options for the lexer
#[derive(Debug, Clone)]
pub struct Options {
    pub tab_width: usize,   // Width of a tab when placing the caret in token_in_context()
}

impl Default for Options {
    fn default() -> Self {
        Options { tab_width: 8 }
    }
}

// The scanner holds the state of the lexer while the state machine runs. It is owned by the
// producer thread and hands every emitted token to the consumer over a rendezvous channel.
pub struct Scanner {
    name: String,                   // Name of the source, used in log output
    stream: InputStream,            // Character input stream
    start: usize,                   // Start offset of the pending token
    start_line: usize,              // Line of the start of the pending token
    start_line_offset: usize,       // Offset of the first char on that line
    tokens: SyncSender<Token>,      // Channel to the consumer
    closed: bool,                   // The consumer is gone, no more tokens can be sent
}

impl Scanner {
    pub(crate) fn new(name: &str, source: Arc<str>, tokens: SyncSender<Token>) -> Self {
        let mut stream = InputStream::new();
        stream.read_from_shared(source);

        Scanner {
            name: name.to_string(),
            stream,
            start: 0,
            start_line: 1,
            start_line_offset: 0,
            tokens,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Full source text
    pub fn input(&self) -> &str {
        self.stream.source()
    }

    // Scanned but not yet emitted or ignored part of the input
    pub fn pending(&self) -> &str {
        let end = self.stream.tell().max(self.start);
        &self.stream.source()[self.start..end]
    }

    // Current position of the cursor in the source
    pub fn pos(&self) -> usize {
        self.stream.tell()
    }

    // Line of the first rune of the pending token
    pub fn line(&self) -> usize {
        self.start_line
    }

    // Column of the first rune of the pending token
    pub fn column(&self) -> usize {
        let source = self.stream.source();
        if self.start < self.start_line_offset {
            return 1;
        }
        source[self.start_line_offset..self.start].chars().count() + 1
    }

    // Returns true when the consumer has hung up
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // Returns the next rune in the source, or None at the end of the input. Calling next()
    // at the end keeps returning None.
    pub fn next(&mut self) -> Option<char> {
        self.stream.read_char()
    }

    // Returns but does not consume the next rune
    pub fn peek(&self) -> Option<char> {
        self.stream.look_ahead(0)
    }

    // Goes back one rune. Only the last next() can be undone, back() at the start of the
    // input or after reaching the end does nothing.
    pub fn back(&mut self) {
        self.stream.unread()
    }

    // Consumes the next rune if it satisfies the predicate
    pub fn accept_if(&mut self, f: impl Fn(char) -> bool) -> bool {
        match self.next() {
            Some(c) if f(c) => true,
            _ => {
                self.back();
                false
            }
        }
    }

    // Consumes runes as long as they satisfy the predicate. Reports whether anything matched.
    pub fn accept_run_if(&mut self, f: impl Fn(char) -> bool) -> bool {
        let mut found = false;
        while self.accept_if(&f) {
            found = true;
        }
        found
    }

    // Consumes runes until one satisfies the predicate. Reports false when the end of the
    // input was reached without finding one.
    pub fn accept_until_if(&mut self, f: impl Fn(char) -> bool) -> bool {
        loop {
            match self.next() {
                Some(c) if f(c) => {
                    self.back();
                    return true;
                }
                Some(_) => {}
                None => return false,
            }
        }
    }

    // Consumes the next rune if it is part of the valid string
    pub fn accept(&mut self, valid: &str) -> bool {
        self.accept_if(|c| valid.contains(c))
    }

    // Consumes a run of runes from the valid string
    pub fn accept_run(&mut self, valid: &str) -> bool {
        self.accept_run_if(|c| valid.contains(c))
    }

    // Consumes runes until a rune from the until string is next
    pub fn accept_until(&mut self, until: &str) -> bool {
        self.accept_until_if(|c| until.contains(c))
    }

    pub fn accept_class(&mut self, classes: &[CharClass]) -> bool {
        self.accept_if(|c| in_classes(c, classes))
    }

    pub fn accept_class_run(&mut self, classes: &[CharClass]) -> bool {
        self.accept_run_if(|c| in_classes(c, classes))
    }

    // Accepts a rune that is either in the valid string or in one of the classes
    pub fn accept_match_or_class(&mut self, valid: &str, classes: &[CharClass]) -> bool {
        self.accept_if(|c| valid.contains(c) || in_classes(c, classes))
    }

    pub fn accept_match_or_class_run(&mut self, valid: &str, classes: &[CharClass]) -> bool {
        self.accept_run_if(|c| valid.contains(c) || in_classes(c, classes))
    }

    pub fn accept_until_match_or_class(&mut self, until: &str, classes: &[CharClass]) -> bool {
        self.accept_until_if(|c| until.contains(c) || in_classes(c, classes))
    }

    pub fn accept_spaces(&mut self) -> bool {
        self.accept_run_if(char::is_whitespace)
    }

    pub fn accept_non_newline_spaces(&mut self) -> bool {
        self.accept_run_if(is_non_newline_space)
    }

    // Moves the cursor to the start of the next occurrence of seq without stepping through
    // the runes in between. At the end of the input everything is consumed and false returned.
    pub fn accept_until_sequence(&mut self, seq: &str) -> bool {
        let offset = self.stream.tell();
        match self.stream.source()[offset..].find(seq) {
            Some(idx) => {
                self.stream.seek(offset + idx);
                true
            }
            None => {
                let end = self.stream.length();
                self.stream.seek(end);
                false
            }
        }
    }

    // Consumes a non-empty match of the regex starting exactly at the cursor. The pattern must
    // be anchored with ^ or \A, other patterns never match.
    pub fn accept_regex(&mut self, re: &Regex) -> bool {
        if !is_anchored(re) {
            return false;
        }
        let offset = self.stream.tell();
        let end = match re.find(&self.stream.source()[offset..]) {
            Some(m) if m.start() == 0 && m.end() > 0 => offset + m.end(),
            _ => return false,
        };
        self.stream.seek(end);
        true
    }

    // Classifies the next rune with a lookup table, without consuming it
    pub fn switch(&self, lookup: &phf::Map<char, TokenType>, fallback: TokenType) -> TokenType {
        self.peek()
            .and_then(|c| lookup.get(&c).copied())
            .unwrap_or(fallback)
    }

    // Cuts the pending input into a token and sends it to the consumer
    pub fn emit(&mut self, typ: TokenType) {
        let token = Token::new(typ, self.pending(), self.start, self.start_line, self.column());
        self.send(token);
        self.move_start();
    }

    // Throws away the pending input
    pub fn ignore(&mut self) {
        self.move_start();
    }

    pub fn ignore_spaces(&mut self) {
        self.accept_spaces();
        self.ignore();
    }

    pub fn ignore_non_newline_spaces(&mut self) {
        self.accept_non_newline_spaces();
        self.ignore();
    }

    // Emits an error token carrying the formatted message. Scanning continues, it's up to the
    // consumer to decide how bad the error is.
    pub fn errorf(&mut self, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        debug!(lexer = %self.name, line = self.stream.current_line, %message, "lexing error");

        let token = Token::new(
            TokenType::ERROR,
            message,
            self.stream.tell(),
            self.stream.current_line,
            self.stream.current_column(),
        );
        self.send(token);
    }

    pub fn unexpected_rune(&mut self, unexpected: char, expected: impl fmt::Display) {
        self.errorf(format_args!("expected {}, got '{}'.", expected, unexpected));
    }

    pub fn unexpected(&mut self, unexpected: impl fmt::Display, expected: impl fmt::Display) {
        self.errorf(format_args!("expected {}, got \"{}\".", expected, unexpected));
    }

    pub fn not_allowed_in_context(&mut self, not_allowed: char, context: impl fmt::Display) {
        self.errorf(format_args!("rune '{}' not allowed in {}", not_allowed, context));
    }

    fn send(&mut self, token: Token) {
        if self.closed {
            return;
        }

        trace!(lexer = %self.name, %token, "emit");
        if self.tokens.send(token).is_err() {
            debug!(lexer = %self.name, "consumer hung up, stopping");
            self.closed = true;
        }
    }

    // Moves the start marker up to the cursor. The line of the new start is derived from the
    // newlines in the skipped span, so it stays right even when the cursor jumped with seek.
    fn move_start(&mut self) {
        let end = self.stream.tell();

        // The cursor went back past the start marker, take the line from the stream instead
        if end < self.start {
            self.start = end;
            self.start_line = self.stream.current_line;
            self.start_line_offset = self.stream.current_line_start();
            return;
        }

        let span = &self.stream.source()[self.start..end];
        if let Some(idx) = span.rfind(CHAR_LF) {
            self.start_line += span.matches(CHAR_LF).count();
            self.start_line_offset = self.start + idx + 1;
        }
        self.start = end;
    }
}

// Runs the state machine until a state returns None or the consumer is gone
fn run(mut scanner: Scanner, start: StateFn) {
    debug!(lexer = %scanner.name, "lexer started");

    let mut state = Some(start);
    while let Some(StateFn(f)) = state {
        if scanner.closed {
            break;
        }
        state = f(&mut scanner);
    }

    debug!(lexer = %scanner.name, "lexer finished");
}

// Anything the parse tree can pull tokens from
pub trait TokenSource {
    // Returns the next token. After the end of input this keeps returning an eof token.
    fn next_token(&mut self) -> Token;

    // Renders the source line of the token with a caret under it, when the source is known
    fn token_in_context(&self, _token: &Token) -> Option<String> {
        None
    }

    // Discards all tokens that have not been read yet
    fn drain(&mut self) {}
}

// Consumer side of the lexer. The state machine runs on its own thread and blocks until the
// consumer asks for the next token.
pub struct Lexer {
    name: String,
    input: Arc<str>,
    options: Options,
    tokens: Option<Receiver<Token>>,    // Channel from the running producer, if any
    handle: Option<JoinHandle<()>>,     // Producer thread
    eof: Option<Token>,                 // Eof token handed out once the producer finished
}

impl Lexer {
    pub fn new(name: &str, input: &str, options: Option<Options>) -> Self {
        Lexer {
            name: name.to_string(),
            input: Arc::from(input),
            options: options.unwrap_or_default(),
            tokens: None,
            handle: None,
            eof: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    // Starts the state machine in a producer thread. A producer that is still running from an
    // earlier call is drained first.
    pub fn run(&mut self, start: StateFn) {
        if self.tokens.is_some() {
            self.drain();
        }

        let (tx, rx) = mpsc::sync_channel(0);
        let scanner = Scanner::new(&self.name, Arc::clone(&self.input), tx);

        let handle = thread::spawn(move || run(scanner, start));

        self.tokens = Some(rx);
        self.handle = Some(handle);
        self.eof = None;
    }

    // Returns the next token from the producer. Blocks until the producer emits one.
    pub fn next_token(&mut self) -> Token {
        if let Some(rx) = &self.tokens {
            match rx.recv() {
                Ok(token) => return token,
                Err(_) => self.finish(),
            }
        }

        self.eof_token()
    }

    // Reads and discards all remaining tokens so the producer can finish
    pub fn drain(&mut self) {
        let mut drained = 0usize;
        if let Some(rx) = &self.tokens {
            for _ in rx.iter() {
                drained += 1;
            }
        }
        debug!(lexer = %self.name, drained, "drained lexer");
        self.finish();
    }

    // Returns the source line that contains the token and a caret under its first rune
    pub fn token_in_context(&self, token: &Token) -> String {
        let input: &str = &self.input;

        let mut pos = token.pos().min(input.len());
        while !input.is_char_boundary(pos) {
            pos -= 1;
        }

        let line_start = input[..pos].rfind(CHAR_LF).map_or(0, |idx| idx + 1);
        let line_end = input[pos..].find(CHAR_LF).map_or(input.len(), |idx| pos + idx);
        let line = input[line_start..line_end].trim_end_matches(CHAR_CR);

        let width: usize = input[line_start..pos]
            .chars()
            .map(|c| if c == CHAR_TAB { self.options.tab_width } else { 1 })
            .sum();

        format!("{}\n{}^", line, " ".repeat(width))
    }

    // Closes the channel and waits for the producer. A panic in a state function is passed
    // on to the consumer.
    fn finish(&mut self) {
        self.tokens = None;
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                panic::resume_unwind(e);
            }
        }
    }

    fn eof_token(&mut self) -> Token {
        if let Some(token) = &self.eof {
            return token.clone();
        }

        let input: &str = &self.input;
        let line = input.matches(CHAR_LF).count() + 1;
        let line_start = input.rfind(CHAR_LF).map_or(0, |idx| idx + 1);
        let column = input[line_start..].chars().count() + 1;

        let token = Token::new(TokenType::EOF, "", input.len(), line, column);
        self.eof = Some(token.clone());
        token
    }
}

impl Drop for Lexer {
    // Hanging up wakes a producer that is blocked on the channel, it stops at the next state.
    fn drop(&mut self) {
        self.tokens = None;
        self.handle = None;
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        Lexer::next_token(self)
    }

    fn token_in_context(&self, token: &Token) -> Option<String> {
        Some(Lexer::token_in_context(self, token))
    }

    fn drain(&mut self) {
        Lexer::drain(self)
    }
}

// A pre-lexed token stream
impl TokenSource for VecDeque<Token> {
    fn next_token(&mut self) -> Token {
        self.pop_front().unwrap_or_else(|| Token::debug(TokenType::EOF, ""))
    }

    fn drain(&mut self) {
        self.clear();
    }
}

// Creates a lexer for the input and starts its state machine
pub fn lex(name: &str, input: &str, start: StateFn) -> Lexer {
    let mut lexer = Lexer::new(name, input, None);
    lexer.run(start);
    lexer
}
