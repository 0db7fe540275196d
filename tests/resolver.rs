#[cfg(test)]
mod resolver_tests {
    use bunt_lang as bunt;

    use bunt::interpreter::Interpreter;
    use bunt::parser::Parser;
    use bunt::resolver::Resolver;
    use bunt::scanner::Scanner;
    use bunt::token::Token;

    /// Run scan/parse/resolve on `source` and return every resolution
    /// diagnostic as its display string.  Panics on scan or parse errors:
    /// these tests exercise the resolver only.
    fn diagnostics(source: &str) -> Vec<String> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .map(|t| t.expect("test sources scan cleanly"))
            .collect();

        let mut parser = Parser::new(tokens);
        let statements = parser.parse().expect("test sources parse cleanly");

        let mut interpreter = Interpreter::new();
        match Resolver::new(&mut interpreter).resolve(&statements) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn assert_single_diagnostic(source: &str, fragment: &str) {
        let found = diagnostics(source);
        assert_eq!(found.len(), 1, "diagnostics for {:?}: {:?}", source, found);
        assert!(
            found[0].contains(fragment),
            "expected {:?} in {:?}",
            fragment,
            found[0]
        );
    }

    #[test]
    fn clean_program_has_no_diagnostics() {
        let source = r#"
            fun greet(name) { return "Hello, " + name; }
            print greet("world");
        "#;
        assert_eq!(diagnostics(source), Vec::<String>::new());
    }

    #[test]
    fn self_read_in_initializer() {
        assert_single_diagnostic(
            "{ var a = a; }",
            "Can't read local variable in its own initializer.",
        );
    }

    #[test]
    fn self_read_in_initializer_is_allowed_at_global_scope() {
        // Globals stay late-bound; `var a = a;` at top level is legal and
        // only fails (if at all) at runtime.
        assert_eq!(diagnostics("var a = a;"), Vec::<String>::new());
    }

    #[test]
    fn duplicate_local_declaration() {
        assert_single_diagnostic(
            "fun f() { var x = 1; var x = 2; }",
            "Already a variable with this name in this scope.",
        );
    }

    #[test]
    fn duplicate_global_declaration_is_allowed() {
        assert_eq!(
            diagnostics("var x = 1; var x = 2;"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn return_outside_function() {
        assert_single_diagnostic("return 1;", "Can't return from top-level code.");
    }

    #[test]
    fn return_value_from_initializer() {
        assert_single_diagnostic(
            "class A { init() { return 1; } }",
            "Can't return a value from an initializer.",
        );
    }

    #[test]
    fn bare_return_from_initializer_is_allowed() {
        assert_eq!(
            diagnostics("class A { init() { return; } }"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn this_outside_class() {
        assert_single_diagnostic("print this;", "Can't use 'this' outside of a class.");
    }

    #[test]
    fn super_outside_class() {
        assert_single_diagnostic(
            "fun f() { super.m(); }",
            "Can't use 'super' outside of a class.",
        );
    }

    #[test]
    fn super_without_superclass() {
        assert_single_diagnostic(
            "class A { m() { super.m(); } }",
            "Can't use 'super' in a class with no superclass.",
        );
    }

    #[test]
    fn class_inheriting_from_itself() {
        assert_single_diagnostic("class A < A {}", "A class can't inherit from itself.");
    }

    #[test]
    fn break_outside_loop() {
        assert_single_diagnostic("break;", "Can't break from outside a loop.");
    }

    #[test]
    fn continue_outside_loop() {
        assert_single_diagnostic("continue;", "Can't continue from outside a loop.");
    }

    #[test]
    fn break_inside_function_inside_loop_is_outside() {
        // The function body is a fresh control context: the enclosing loop
        // does not license a `break` inside it.
        assert_single_diagnostic(
            "while (true) { fun f() { break; } f(); }",
            "Can't break from outside a loop.",
        );
    }

    #[test]
    fn diagnostics_accumulate() {
        let found = diagnostics("return 1; break; print this;");
        assert_eq!(found.len(), 3, "got: {:?}", found);
    }

    #[test]
    fn lambda_body_is_a_function_context() {
        // `return` inside a lambda is fine even at top level.
        assert_eq!(
            diagnostics("var f = fun (x) { return x; };"),
            Vec::<String>::new()
        );
    }
}
