// A small calculator language driving the lexer, the parse tree and the symbol table end to end.
//
//   program    := { statement } EOF
//   statement  := definition | assignment | expression ";"
//   definition := "let" IDENT ( "=" expression ";" | "{" { statement } "}" )
//   assignment := name "=" expression ";"
//   expression := term { OP term }
//   term       := NUM | name
//   name       := IDENT { "." IDENT }
//
// Statements starting with a name are first tried as an assignment. When no "=" follows, the
// attempt is rolled back and the tokens are parsed again as an expression.

use frontkit::front_end::error::ParseError;
use frontkit::front_end::lexer::{is_newline, lex, CharClass, Lexer, Scanner, StateFn};
use frontkit::front_end::names::Names;
use frontkit::front_end::node::{NodeId, NodeType};
use frontkit::front_end::parser::{ParseResult, Production, Tree};
use frontkit::front_end::token::{Token, TokenType};
use phf::phf_map;

const NUM: TokenType = TokenType(0);
const OP: TokenType = TokenType(1);
const IDENT: TokenType = TokenType(2);
const LET: TokenType = TokenType(3);
const ASSIGN: TokenType = TokenType(4);
const DOT: TokenType = TokenType(5);
const LBRACE: TokenType = TokenType(6);
const RBRACE: TokenType = TokenType(7);
const SEMI: TokenType = TokenType(8);

const DEFINITION: NodeType = NodeType(0);
const ASSIGNMENT: NodeType = NodeType(1);
const EXPRESSION: NodeType = NodeType(2);
const NAME: NodeType = NodeType(3);
const NUMBER: NodeType = NodeType(4);
const OPERATOR: NodeType = NodeType(5);
const IDENTIFIER: NodeType = NodeType(6);
const KEYWORD: NodeType = NodeType(7);

static PUNCTUATION: phf::Map<char, TokenType> = phf_map! {
    '+' => OP,
    '-' => OP,
    '*' => OP,
    '/' => OP,
    '=' => ASSIGN,
    '.' => DOT,
    '{' => LBRACE,
    '}' => RBRACE,
    ';' => SEMI,
};

fn names() -> Names {
    Names::new()
        .with_token(NUM, "NUM")
        .with_token(OP, "OP")
        .with_token(IDENT, "IDENT")
        .with_token(LET, "LET")
        .with_token(ASSIGN, "ASSIGN")
        .with_token(DOT, "DOT")
        .with_token(LBRACE, "LBRACE")
        .with_token(RBRACE, "RBRACE")
        .with_token(SEMI, "SEMI")
        .with_node(DEFINITION, "Definition")
        .with_node(ASSIGNMENT, "Assignment")
        .with_node(EXPRESSION, "Expression")
        .with_node(NAME, "Name")
        .with_node(NUMBER, "Number")
        .with_node(OPERATOR, "Operator")
        .with_node(IDENTIFIER, "Identifier")
        .with_node(KEYWORD, "Keyword")
}

// ------------------------------------------------------------
// Lexer

fn lex_any(s: &mut Scanner) -> Option<StateFn> {
    s.ignore_spaces();
    match s.peek() {
        None => {
            s.emit(TokenType::EOF);
            None
        }
        Some('#') => Some(StateFn(lex_comment)),
        Some(c) if c.is_ascii_digit() => Some(StateFn(lex_number)),
        Some(c) if CharClass::Letter.contains(c) => Some(StateFn(lex_word)),
        Some(c) => {
            let typ = s.switch(&PUNCTUATION, TokenType::ERROR);
            s.next();
            if typ == TokenType::ERROR {
                s.unexpected_rune(c, "a number, name or operator");
                s.ignore();
            } else {
                s.emit(typ);
            }
            Some(StateFn(lex_any))
        }
    }
}

fn lex_comment(s: &mut Scanner) -> Option<StateFn> {
    s.accept_until_if(is_newline);
    s.ignore();
    Some(StateFn(lex_any))
}

fn lex_number(s: &mut Scanner) -> Option<StateFn> {
    s.accept_run("0123456789");
    s.emit(NUM);
    Some(StateFn(lex_any))
}

fn lex_word(s: &mut Scanner) -> Option<StateFn> {
    s.accept_class_run(&[CharClass::Alphanumeric]);
    let typ = if s.pending() == "let" { LET } else { IDENT };
    s.emit(typ);
    Some(StateFn(lex_any))
}

fn lexer(input: &str) -> Lexer {
    lex("calc", input, StateFn(lex_any))
}

// ------------------------------------------------------------
// Parser

fn program(tree: &mut Tree) -> ParseResult<Option<Production>> {
    if tree.peek().is_eof() {
        return Ok(None);
    }
    statement(tree)?;
    // Statements never backtrack into the previous one
    tree.clear_buffer();
    Ok(Some(Production(program)))
}

fn first_statement_only(tree: &mut Tree) -> ParseResult<Option<Production>> {
    statement(tree)?;
    Ok(None)
}

fn statement(tree: &mut Tree) -> ParseResult<()> {
    let next = tree.peek();
    if next.typ() == LET {
        return definition(tree);
    }
    if next.typ() == IDENT && assignment(tree)? {
        return Ok(());
    }

    let expr = expression(tree)?;
    expect(tree, SEMI)?;
    tree.commit_subtree(expr)?;
    Ok(())
}

fn definition(tree: &mut Tree) -> ParseResult<()> {
    let def = tree.add_non_terminal(DEFINITION)?;
    tree.descend(def)?;

    let keyword = expect(tree, LET)?;
    tree.add_terminal(KEYWORD, keyword)?;
    let ident = expect(tree, IDENT)?;
    let name = ident.lexeme().to_string();
    let ident_node = tree.add_terminal(IDENTIFIER, ident)?;
    let symbol = tree.create_symbol(ident_node, &name)?;

    let t = tree.next();
    match t.typ() {
        ASSIGN => {
            expression(tree)?;
            expect(tree, SEMI)?;
        }
        LBRACE => {
            tree.enter_namespace(symbol);
            while tree.peek().typ() != RBRACE {
                statement(tree)?;
            }
            tree.next();
            tree.exit_namespace();
        }
        _ => return Err(tree.unexpected(names().token(&t), "\"=\" or \"{\"")),
    }

    tree.ascend();
    tree.commit_subtree(def)?;
    Ok(())
}

// Returns false, with the attempt undone, when the statement is not an assignment
fn assignment(tree: &mut Tree) -> ParseResult<bool> {
    let start = tree.buffer_pos();
    let node = tree.add_non_terminal(ASSIGNMENT)?;
    tree.descend(node)?;

    name(tree)?;
    if tree.peek().typ() != ASSIGN {
        tree.rollback(node)?;
        while tree.buffer_pos() > start {
            tree.back();
        }
        return Ok(false);
    }
    tree.next();

    expression(tree)?;
    expect(tree, SEMI)?;
    tree.ascend();
    tree.commit_subtree(node)?;
    Ok(true)
}

fn expression(tree: &mut Tree) -> ParseResult<NodeId> {
    let expr = tree.add_non_terminal(EXPRESSION)?;
    tree.descend(expr)?;

    term(tree)?;
    while tree.peek().typ() == OP {
        let op = tree.next();
        tree.add_terminal(OPERATOR, op)?;
        term(tree)?;
    }

    tree.ascend();
    Ok(expr)
}

fn term(tree: &mut Tree) -> ParseResult<()> {
    match tree.peek().typ() {
        NUM => {
            let t = tree.next();
            tree.add_terminal(NUMBER, t)?;
        }
        IDENT => {
            name(tree)?;
        }
        _ => {
            let t = tree.next();
            return Err(tree.unexpected(names().token(&t), "a number or name"));
        }
    }
    Ok(())
}

// A possibly qualified name, bound to the symbol it refers to
fn name(tree: &mut Tree) -> ParseResult<NodeId> {
    let node = tree.add_non_terminal(NAME)?;
    tree.descend(node)?;

    let mut path = vec![];
    loop {
        let ident = expect(tree, IDENT)?;
        path.push(ident.lexeme().to_string());
        tree.add_terminal(IDENTIFIER, ident)?;
        if tree.peek().typ() != DOT {
            break;
        }
        tree.next();
    }
    tree.ascend();

    let symbol = match tree.lookup_qualified(&path) {
        Some(symbol) => symbol,
        None => frontkit::parse_bail!(tree, "undefined name {:?}", path.join(".")),
    };
    tree.bind_symbol(node, symbol)?;
    Ok(node)
}

fn expect(tree: &mut Tree, typ: TokenType) -> ParseResult<Token> {
    let t = tree.next();
    if t.is_error() {
        return Err(tree.error_at_token(&t, format_args!("{}", t.lexeme())));
    }
    if t.typ() != typ {
        return Err(tree.unexpected(names().token(&t), names().token_name(typ)));
    }
    Ok(t)
}

fn parse(input: &str) -> (Tree, Result<(), ParseError>) {
    let mut tree = Tree::new("calc");
    let result = tree.parse(lexer(input), Production(program));
    (tree, result)
}

// ------------------------------------------------------------
// Tests

#[test]
fn test_tokens_and_positions() {
    let mut lexer = lexer("12 + 34");
    let tokens: Vec<Token> = (0..4).map(|_| lexer.next_token()).collect();

    assert_eq!(
        tokens,
        vec![
            Token::new(NUM, "12", 0, 1, 1),
            Token::new(OP, "+", 3, 1, 4),
            Token::new(NUM, "34", 5, 1, 6),
            Token::new(TokenType::EOF, "", 7, 1, 8),
        ]
    );
}

#[test]
fn test_keywords_and_comments() {
    let mut lexer = lexer("let x # the answer\n= 42;");
    let types: Vec<TokenType> = (0..6).map(|_| lexer.next_token().typ()).collect();
    assert_eq!(types, vec![LET, IDENT, ASSIGN, NUM, SEMI, TokenType::EOF]);
}

#[test]
fn test_parse_program() {
    let (tree, result) = parse("let x = 1;\nx = x + 2;\nx * 3;");
    result.unwrap();

    assert_eq!(
        tree.spprint(&names()),
        vec![
            "Root",
            "  Definition",
            "    Keyword: LET(\"let\")",
            "    Identifier: IDENT(\"x\")",
            "    Expression",
            "      Number: NUM(\"1\")",
            "  Assignment",
            "    Name",
            "      Identifier: IDENT(\"x\")",
            "    Expression",
            "      Name",
            "        Identifier: IDENT(\"x\")",
            "      Operator: OP(\"+\")",
            "      Number: NUM(\"2\")",
            "  Expression",
            "    Name",
            "      Identifier: IDENT(\"x\")",
            "    Operator: OP(\"*\")",
            "    Number: NUM(\"3\")",
        ]
    );
    // Every statement was committed
    assert!(tree.children(tree.root()).iter().all(|id| tree.node(*id).unwrap().is_committed()));
}

#[test]
fn test_failed_attempt_is_rolled_back() {
    let mut tree = Tree::new("calc");
    let kept = tree.add_terminal(NUMBER, Token::debug(NUM, "1")).unwrap();
    tree.commit(kept).unwrap();
    let before = tree.children(tree.root()).len();

    let attempt = tree.add_non_terminal(ASSIGNMENT).unwrap();
    tree.descend(attempt).unwrap();
    tree.add_terminal(IDENTIFIER, Token::debug(IDENT, "x")).unwrap();
    tree.add_terminal(OPERATOR, Token::debug(OP, "+")).unwrap();
    tree.rollback(attempt).unwrap();

    assert_eq!(tree.children(tree.root()).len(), before);
    assert_eq!(tree.current(), tree.root());
}

#[test]
fn test_expression_after_rolled_back_assignment() {
    let (tree, result) = parse("let x = 1;\nx + 2;");
    result.unwrap();

    let statements = tree.children(tree.root());
    assert_eq!(statements.len(), 2);
    assert_eq!(tree.node(statements[1]).unwrap().typ(), EXPRESSION);

    // The name in the expression refers to the definition
    let x = tree.lookup("x").unwrap();
    let name = tree.children(statements[1])[0];
    assert_eq!(tree.node(name).unwrap().symbol(), Some(x));
    assert_eq!(tree.len(), 11);
}

#[test]
fn test_duplicate_definition() {
    let input = "let x = 1; let x = 2;";
    let (tree, result) = parse(input);
    let err = result.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("1:16 : name \"x\" already defined in current scope\n{}\n{}^", input, " ".repeat(15))
    );

    let x = tree.lookup("x").unwrap();
    assert_eq!(tree.symbols().symbol(x).local_id(), 0);
    assert_eq!(tree.symbols().num_symbols(tree.scope()), 1);
}

#[test]
fn test_shadowing_in_namespace() {
    let (tree, result) = parse("let x = 1;\nlet Foo { let x = 2; }");
    result.unwrap();

    let outer = tree.lookup("x").unwrap();
    let inner = tree.lookup_qualified(&["Foo", "x"]).unwrap();
    assert_ne!(outer, inner);
}

#[test]
fn test_qualified_names() {
    let (mut tree, result) = parse("let Foo {\n  let bar = 1;\n}\nFoo.bar + 2;");
    result.unwrap();

    let foo = tree.lookup("Foo").unwrap();
    let bar = tree.lookup_qualified(&["Foo", "bar"]).unwrap();
    assert!(tree.lookup_qualified(&["Foo", "baz"]).is_none());
    assert!(tree.lookup("bar").is_none());
    assert!(tree.namespace().is_empty());

    let symbols = tree.symbols_mut();
    assert_eq!(symbols.resolve_global_ids(), 2);
    assert_eq!(symbols.symbol(foo).global_id(), Some(0));
    assert_eq!(symbols.symbol(bar).global_id(), Some(1));
    assert_eq!(symbols.symbol(bar).scope(), symbols.symbol(foo).namespace());
}

#[test]
fn test_undefined_qualified_name() {
    let (_, result) = parse("let Foo { let bar = 1; }\nFoo.baz;");
    let err = result.unwrap_err();

    assert_eq!(err.message, "undefined name \"Foo.baz\"");
    assert_eq!(err.position.map(|p| (p.line, p.col)), Some((2, 5)));
    assert_eq!(err.context.as_deref(), Some("Foo.baz;\n    ^"));
}

#[test]
fn test_lex_error_reaches_parser() {
    let (_, result) = parse("let x = 1 $ 2;");
    let err = result.unwrap_err();
    assert_eq!(err.message, "expected a number, name or operator, got '$'.");
}

#[test]
fn test_unexpected_token() {
    let (_, result) = parse("let x = ;");
    let err = result.unwrap_err();
    assert_eq!(err.message, "expected a number or name, got SEMI(\";\").");
    assert_eq!(err.position.map(|p| p.col), Some(9));
}

#[test]
fn test_abandoned_parse_is_drained() {
    let mut tree = Tree::new("calc");
    tree.parse(lexer("let a = 1; let b = 2; let c = 3;"), Production(first_statement_only))
        .unwrap();
    tree.drain();

    assert!(tree.lookup("a").is_some());
    assert!(tree.lookup("b").is_none());
}
