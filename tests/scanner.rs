#[cfg(test)]
mod scanner_tests {
    use bunt_lang as bunt;

    use bunt::scanner::*;
    use bunt::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_brackets_and_subscript() {
        assert_token_sequence(
            "xs[0] = [1, 2];",
            &[
                (TokenType::IDENTIFIER, "xs"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::NUMBER(0.0), "0"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::EQUAL, "="),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::NUMBER(1.0), "1"),
                (TokenType::COMMA, ","),
                (TokenType::NUMBER(2.0), "2"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var breaker = 1; while (true) { break; continue; }",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "breaker"),
                (TokenType::EQUAL, "="),
                (TokenType::NUMBER(1.0), "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::TRUE, "true"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_comments_skipped() {
        assert_token_sequence(
            "// nothing here\nprint 1; // trailing",
            &[
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER(1.0), "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_string_and_number_literals() {
        let scanner = Scanner::new(br#"print "hi there" + 3.25;"#);
        let tokens: Vec<Token> = scanner.map(|t| t.expect("clean source")).collect();

        assert_eq!(tokens[1].token_type, TokenType::STRING(String::new()));
        match &tokens[1].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hi there"),
            other => panic!("expected string token, got {:?}", other),
        }

        match tokens[3].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 3.25),
            ref other => panic!("expected number token, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_07_multiline_string_tracks_lines() {
        let scanner = Scanner::new(b"\"a\nb\"\nprint 1;");
        let tokens: Vec<Token> = scanner.map(|t| t.expect("clean source")).collect();

        // The print after the two-line string sits on line 3.
        assert_eq!(tokens[1].lexeme, "print");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_08_unexpected_character() {
        let results: Vec<_> = Scanner::new(b",.$(").collect();

        assert_eq!(results.len(), 5);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert!(results[3].is_ok());
        assert!(results[4].is_ok()); // EOF

        let err = results[2].as_ref().unwrap_err().to_string();
        assert!(
            err.contains("Unexpected character"),
            "unexpected message: {}",
            err
        );
    }

    #[test]
    fn test_scanner_09_unterminated_string() {
        let results: Vec<_> = Scanner::new(b"\"oops").collect();

        let err = results[0].as_ref().unwrap_err().to_string();
        assert!(err.contains("Unterminated string."), "got: {}", err);
    }
}
