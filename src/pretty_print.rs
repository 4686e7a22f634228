use crate::{EvalError, ParseError};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

const SOURCE_ID: &str = "REPL";

fn report(input: &str, range: Range<usize>, message: String, label: String) -> io::Result<()> {
    Report::build(ReportKind::Error, (SOURCE_ID, range.clone()))
        .with_message(message)
        .with_label(Label::new((SOURCE_ID, range)).with_message(label))
        .finish()
        .eprint((SOURCE_ID, Source::from(input)))
}

impl EvalError {
    /// Writes a diagnostic for this error to stderr. Values carry no source positions,
    /// so the label covers the whole form.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        let range = 0..input.len();
        let (message, label) = match self {
            EvalError::NotApplicable(value) => (
                format!("Not applicable: {}", value),
                format!("The head of this form is a {}", value.type_name()),
            ),
            EvalError::EmptyApplication => (
                "Cannot apply an empty list".to_string(),
                "This form evaluates an empty list".to_string(),
            ),
            EvalError::TypeMismatch {
                operator,
                position,
                expected,
                found,
            } => (
                format!("Type mismatch in '{}'", operator),
                format!(
                    "Argument {} should be {}, found {} {}",
                    position,
                    expected,
                    found.type_name(),
                    found
                ),
            ),
            EvalError::MissingArgument { operator, position } => (
                format!("Missing argument to '{}'", operator),
                format!("Argument {} is required", position),
            ),
            EvalError::ArityMismatch { expected, found } => (
                "Wrong number of arguments".to_string(),
                format!("The lambda takes {}, this call passes {}", expected, found),
            ),
            EvalError::EmptyList { operator } => (
                format!("'{}' of an empty list", operator),
                "The list has no elements".to_string(),
            ),
            EvalError::DivisionByZero => (
                "Division by zero".to_string(),
                "A divisor in this form is zero".to_string(),
            ),
            EvalError::Output(message) => (
                "Output error".to_string(),
                format!("Writing output failed: {}", message),
            ),
        };
        report(input, range, message, label)
    }
}

impl ParseError {
    /// Writes a diagnostic for this error to stderr.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        match self {
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                report(
                    input,
                    idx..idx,
                    "Unexpected EOF".to_string(),
                    format!("Expected {expected}"),
                )
            }
            ParseError::LexerError(lex_err) => report(
                input,
                lex_err.span.to_range(),
                "Lexer Error".to_string(),
                lex_err.error.to_string(),
            ),
        }
    }
}
