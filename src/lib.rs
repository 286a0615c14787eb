//! Front end for a small C-like language targeting PIC16-style pseudo-assembly.
//!
//! `tokenizer` turns source text into tokens, `parser` builds the tree from
//! `ast`, and `codegen` walks it once to allocate addresses and emit the
//! listing. Multiplication, division, comparisons, logical operators, unary
//! operators and array indexing are emitted as `;` comments, not instructions.

type P<T> = Box<T>;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod tokenizer;

pub use ast::*;
pub use codegen::*;
pub use error::*;
pub use parser::*;
pub use tokenizer::*;

/// Compile `source` with the default memory layout.
pub fn compile(source: &str) -> CompileResult<Listing> {
    compile_with(source, &CodegenOptions::default())
}

pub fn compile_with(source: &str, options: &CodegenOptions) -> CompileResult<Listing> {
    let tokens = tokenize(source)?;
    let program = parse(tokens)?;
    Ok(generate(&program, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn asm(source: &str) -> String {
        compile(source).unwrap().text()
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not in listing:\n{haystack}"))
    }

    #[test]
    fn variable_declaration_and_assignment() {
        assert_eq!(asm("int x; x = 42;"), "MOVLW 0x2A\nMOVWF 0x20");
    }

    #[test]
    fn arithmetic() {
        let listing = compile(
            "
        int a;
        int b;
        int c;

        a = 10;
        b = 5;
        c = a + b;
        ",
        )
        .unwrap();
        assert_eq!(
            listing.variables.iter().collect::<Vec<_>>(),
            vec![("a", 0x20), ("b", 0x21), ("c", 0x22)]
        );
        assert_snapshot!(listing.text(), @r"
        MOVLW 0x0A
        MOVWF 0x20
        MOVLW 0x05
        MOVWF 0x21
        MOVF 0x20, W
        MOVWF 0x7F
        MOVF 0x21, W
        ADDWF 0x7F, W
        MOVWF 0x22
        ");
    }

    #[test]
    fn subtraction() {
        let out = asm("int a; int b; int result; a = 15; b = 7; result = a - b;");
        assert!(out.ends_with("MOVF 0x20, W\nMOVWF 0x7F\nMOVF 0x21, W\nSUBWF 0x7F, W\nMOVWF 0x22"));
    }

    #[test]
    fn complex_expression_keeps_right_operand() {
        let out = asm(
            "int a; int b; int c; int result;
             a = 5; b = 3; c = 2;
             result = a + b * c;  // 5 + (3 * 2) once multiplication exists",
        );
        assert!(out.ends_with(
            "MOVF 0x20, W\nMOVWF 0x7F\nMOVF 0x21, W\nMOVWF 0x7F\nMOVF 0x22, W\n; MULT not implemented\nADDWF 0x7F, W\nMOVWF 0x23"
        ));
    }

    #[test]
    fn if_else() {
        assert_snapshot!(asm("int x; int y; if (x > 5) { y = 1; } else { y = 0; }"), @r"
        MOVF 0x20, W
        MOVWF 0x7F
        MOVLW 0x05
        ; op > not implemented
        CPFSEQ W
        GOTO else0
        MOVLW 0x01
        MOVWF 0x21
        GOTO ifend1
        else0:
        MOVLW 0x00
        MOVWF 0x21
        ifend1:
        ");
    }

    #[test]
    fn labels_follow_visitation_order() {
        let out = asm(
            "int x; int y; int z;
             x = 10; y = 5;
             if (x > 5) {
                 if (y < 10) { z = 1; } else { z = 2; }
             } else {
                 z = 3;
             }
             while (x) { x = x - 1; }",
        );
        let labels: Vec<_> = out.lines().filter(|line| line.ends_with(':')).collect();
        assert_eq!(
            labels,
            vec!["else2:", "ifend3:", "else0:", "ifend1:", "while4:", "wend5:"]
        );
        assert!(position(&out, "GOTO else0") < position(&out, "GOTO else2"));
        assert!(position(&out, "GOTO ifend1") < position(&out, "else0:"));
    }

    #[test]
    fn logical_operations() {
        let out = asm(
            "int a; int b; int c; int d;
             a = 1; b = 0;
             if (a && b) { c = 1; } else { c = 0; }
             if (a || b) { d = 1; } else { d = 0; }",
        );
        assert_eq!(out.matches("; op && not implemented").count(), 1);
        assert_eq!(out.matches("; op || not implemented").count(), 1);
        assert!(out.contains("GOTO else2"));
        assert!(out.contains("MOVWF 0x23"));
    }

    #[test]
    fn full_program_in_main() {
        let listing = compile(
            "
        int main() {
            int i;
            int sum;
            int n;

            n = 10;
            sum = 0;
            i = 1;

            while (i <= n) {
                sum = sum + i;
                i = i + 1;
            }
        }
        ",
        )
        .unwrap();
        assert_eq!(listing.variables.get("n"), Some(0x22));
        assert_snapshot!(listing.text(), @r"
        MOVLW 0x0A
        MOVWF 0x22
        MOVLW 0x00
        MOVWF 0x21
        MOVLW 0x01
        MOVWF 0x20
        while0:
        MOVF 0x20, W
        MOVWF 0x7F
        MOVF 0x22, W
        ; op <= not implemented
        CPFSEQ W
        GOTO wend1
        MOVF 0x21, W
        MOVWF 0x7F
        MOVF 0x20, W
        ADDWF 0x7F, W
        MOVWF 0x21
        MOVF 0x20, W
        MOVWF 0x7F
        MOVLW 0x01
        ADDWF 0x7F, W
        MOVWF 0x20
        GOTO while0
        wend1:
        ");
    }

    #[test]
    fn array_operations() {
        let out = asm("int arr[5]; arr[0] = 10; arr[1] = 20; arr[2] = arr[0] + arr[1];");
        assert_eq!(out.matches("; array indexing not implemented").count(), 3);
        assert_eq!(out.matches("MOVWF 0x20").count(), 3);
    }

    #[test]
    fn nested_declarations_share_the_table() {
        let listing = compile("int a; if (a) { int b; b = 1; } while (a) { int c; int b; }").unwrap();
        assert_eq!(
            listing.variables.iter().collect::<Vec<_>>(),
            vec![("a", 0x20), ("b", 0x21), ("c", 0x22)]
        );
    }

    #[test]
    fn deterministic() {
        let source = "int i; int j; while (i < 3) { if (i == j) { j = j - 1; } i = i + 1; }";
        let first = compile(source).unwrap();
        let second = compile(source).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.text(), second.text());
    }

    #[test]
    fn oversized_literal_keeps_low_byte() {
        assert_eq!(
            asm("int x; x = 99999999999999999999;"),
            "MOVLW 0xFF\nMOVWF 0x20"
        );
    }

    #[test]
    fn missing_semicolon_is_parse_error() {
        let err = compile("int x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error at line 1, column 6: expected ';', found end of input"
        );
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn unknown_character_is_lex_error() {
        let err = compile("int x;\nx = 4 $ 2;").unwrap_err();
        assert!(matches!(err, CompileError::Lex(LexError { line: 2, column: 7, found: '$' })));
    }
}
