use super::line::Line;
use super::operand::OperandType;
use super::{Error, Settings};
use crate::jvm::{ClassBuilder, ClassFile};
use std::collections::HashMap;

/// Main entry point for translating a program
///
/// Lines are fed in one at a time. Variables, conditions, loops, and function calls are all
/// resolved at compile time, so the only thing that reaches the class file is the sequence of
/// `println` calls the program would make.
pub struct ProgramTranslator {
    settings: Settings,
    class: ClassBuilder,

    /// String variables
    strings: HashMap<String, String>,

    /// Numeric variables
    numbers: HashMap<String, i32>,

    /// Function name to the index of its body
    functions: HashMap<String, usize>,

    /// Committed function bodies (only present once `end fn` has been seen)
    function_bodies: HashMap<usize, Vec<String>>,

    /// Function currently being defined, along with the lines collected so far
    open_function: Option<OpenFunction>,
    next_function_index: usize,

    /// Outcome of the most recent `if`, cleared by `end if`
    condition: Option<bool>,

    /// Iteration count set by `from`, consumed by the next `do`
    iterations: Option<u32>,

    /// Number of top-level lines seen so far
    line_number: usize,
}

struct OpenFunction {
    name: String,
    index: usize,
    body: Vec<String>,
}

impl ProgramTranslator {
    pub fn new(settings: Settings) -> Result<ProgramTranslator, Error> {
        let mut class = ClassBuilder::new(settings.output_class_name.clone());
        class.initialize()?;

        Ok(ProgramTranslator {
            settings,
            class,
            strings: HashMap::new(),
            numbers: HashMap::new(),
            functions: HashMap::new(),
            function_bodies: HashMap::new(),
            open_function: None,
            next_function_index: 0,
            condition: None,
            iterations: None,
            line_number: 0,
        })
    }

    /// Translate a full program, line by line
    pub fn parse_source(&mut self, source: &str) -> Result<(), Error> {
        for line in source.lines() {
            self.parse_line(line)?;
        }
        Ok(())
    }

    /// Translate the next line of the program
    pub fn parse_line(&mut self, line: &str) -> Result<(), Error> {
        self.line_number += 1;
        let line_number = self.line_number;
        self.translate_line(line, 0)
            .map_err(|err| err.at_line(line_number))
    }

    /// Current value of a numeric variable
    pub fn number(&self, name: &str) -> Option<i32> {
        self.numbers.get(name).copied()
    }

    /// Current value of a string variable
    pub fn string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    /// Consume the translator and produce the class
    pub fn result(mut self) -> Result<ClassFile, Error> {
        if let Some(function) = self.open_function.take() {
            return Err(Error::UnterminatedFunction(function.name).at_line(self.line_number));
        }
        log::debug!(
            "Finalizing '{}' after {} lines",
            self.class.this_class_name(),
            self.line_number
        );
        Ok(self.class.finalize()?)
    }

    fn translate_line(&mut self, text: &str, depth: usize) -> Result<(), Error> {
        if depth > self.settings.max_nesting_depth {
            return Err(Error::NestingTooDeep(self.settings.max_nesting_depth));
        }

        let line = Line::classify(text);
        log::trace!("Line {} (depth {}): {:?}", self.line_number, depth, line);

        match line {
            Line::Blank => (),

            Line::PrintLiteral(text) => self.class.emit_print(text)?,

            Line::PrintVariable(name) => {
                let text = self.printable(name)?;
                self.class.emit_print(&text)?;
            }

            Line::AssignString { name, value } => {
                self.strings.insert(name.to_owned(), value.to_owned());
            }

            Line::AssignArithmetic { name, lhs, op, rhs } => {
                let lhs = self.value(lhs)?;
                let rhs = self.value(rhs)?;
                let result = op
                    .apply(lhs, rhs)
                    .ok_or(Error::ArithmeticFault { lhs, rhs })?;
                self.numbers.insert(name.to_owned(), result);
            }

            Line::AssignNumber { name, value } => {
                let value = self.value(value)?;
                self.numbers.insert(name.to_owned(), value);
            }

            Line::If { lhs, op, rhs } => {
                let outcome = op.evaluate(self.value(lhs)?, self.value(rhs)?);
                log::debug!("Condition on line {} is {}", self.line_number, outcome);
                self.condition = Some(outcome);
            }

            Line::EndIf => self.condition = None,

            Line::Then(nested) => match self.condition {
                Some(true) => self.translate_line(nested, depth + 1)?,
                Some(false) => (),
                None => return Err(Error::ConditionOutsideIf),
            },

            Line::Else(nested) => match self.condition {
                Some(false) => self.translate_line(nested, depth + 1)?,
                Some(true) => (),
                None => return Err(Error::ConditionOutsideIf),
            },

            Line::Range { from, until } => {
                let from = parse_number(from)?;
                let until = parse_number(until)?;
                let count = (i64::from(from) - i64::from(until)).unsigned_abs() as u32;
                self.iterations = Some(count);
            }

            Line::Do(nested) => {
                if self.iterations.is_none() {
                    log::warn!(
                        "Line {}: `do` without a preceding `from`, body is skipped",
                        self.line_number
                    );
                }

                // Re-read on every pass: a nested `do` uses up the same count
                let mut pass = 0;
                while pass < self.iterations.unwrap_or(0) {
                    self.translate_line(nested, depth + 1)?;
                    pass += 1;
                }
                self.iterations = None;
            }

            Line::FunctionStart(name) => {
                if self.open_function.is_some() {
                    return Err(Error::NestedFunction(name.to_owned()));
                }
                let index = self.next_function_index;
                self.next_function_index += 1;
                self.functions.insert(name.to_owned(), index);
                self.open_function = Some(OpenFunction {
                    name: name.to_owned(),
                    index,
                    body: vec![],
                });
            }

            Line::FunctionBody(body) => match &mut self.open_function {
                Some(function) => function.body.push(body.to_owned()),
                None => return Err(Error::IndentedLineOutsideFunction(body.to_owned())),
            },

            Line::FunctionEnd => {
                let function = self
                    .open_function
                    .take()
                    .ok_or(Error::UnmatchedEndFunction)?;
                log::debug!(
                    "Defined function '{}' with {} lines",
                    function.name,
                    function.body.len()
                );
                self.function_bodies.insert(function.index, function.body);
            }

            Line::Call(name) => {
                let body = self
                    .functions
                    .get(name)
                    .and_then(|index| self.function_bodies.get(index))
                    .cloned()
                    .ok_or_else(|| Error::UnresolvedFunction(name.to_owned()))?;
                for nested in &body {
                    self.translate_line(nested, depth + 1)?;
                }
            }

            Line::Unrecognized => {
                if self.settings.strict_syntax {
                    return Err(Error::SyntaxUnrecognized(text.to_owned()));
                }
                log::warn!("Line {}: skipping unrecognized {:?}", self.line_number, text);
            }
        }

        Ok(())
    }

    /// Text that `print(name)` should output
    ///
    /// Numeric variables take priority over string variables of the same name.
    fn printable(&self, name: &str) -> Result<String, Error> {
        if let Some(number) = self.numbers.get(name) {
            Ok(number.to_string())
        } else if let Some(text) = self.strings.get(name) {
            Ok(text.clone())
        } else {
            Err(Error::UnresolvedVariable(name.to_owned()))
        }
    }

    /// Numeric value of an operand (either a variable or a literal)
    fn value(&self, token: &str) -> Result<i32, Error> {
        match OperandType::of(token) {
            OperandType::Variable => match self.numbers.get(token) {
                Some(number) => Ok(*number),
                None if self.strings.contains_key(token) => {
                    Err(Error::NotANumber(token.to_owned()))
                }
                None => Err(Error::UnresolvedVariable(token.to_owned())),
            },
            OperandType::Number => parse_number(token),
            OperandType::Text | OperandType::Unknown => Err(Error::InvalidNumber(token.to_owned())),
        }
    }
}

fn parse_number(token: &str) -> Result<i32, Error> {
    token
        .parse::<i32>()
        .map_err(|_| Error::InvalidNumber(token.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jvm::{self, Constant, Instruction};

    fn translator() -> ProgramTranslator {
        ProgramTranslator::new(Settings::new("Test").unwrap()).unwrap()
    }

    /// Strings loaded by `ldc` in `main`, in order
    fn printed(translator: &ProgramTranslator) -> Vec<String> {
        let constants = translator.class.constants();
        translator
            .class
            .main_instructions()
            .iter()
            .filter_map(|insn| match insn {
                Instruction::Ldc(index) => Some(*index),
                _ => None,
            })
            .map(|index| {
                let string = constants.get(crate::jvm::ConstantIndex(u16::from(index)));
                let utf8 = match string {
                    Some(Constant::String(utf8)) => constants.get((*utf8).into()),
                    other => panic!("ldc of {:?}", other),
                };
                match utf8 {
                    Some(Constant::Utf8(text)) => text.clone(),
                    other => panic!("string of {:?}", other),
                }
            })
            .collect()
    }

    fn run(source: &str) -> Vec<String> {
        let mut translator = translator();
        translator.parse_source(source).unwrap();
        printed(&translator)
    }

    fn fail(source: &str) -> Error {
        let mut translator = translator();
        match translator.parse_source(source) {
            Err(err) => err,
            Ok(()) => translator.result().err().expect("translation should fail"),
        }
    }

    #[test]
    fn variables() {
        let mut translator = translator();
        translator
            .parse_source("a = 3\nb = a * 5\nb = b - 1\nname = \"Bob\"")
            .unwrap();
        assert_eq!(translator.number("a"), Some(3));
        assert_eq!(translator.number("b"), Some(14));
        assert_eq!(translator.string("name"), Some("Bob"));
        assert_eq!(translator.number("name"), None);
    }

    #[test]
    fn prints_numbers_before_strings() {
        assert_eq!(run("x = \"text\"\nprint(x)\nx = 5\nprint(x)"), ["text", "5"]);
        assert_eq!(run("n = 0 - 7\nprint(n)"), ["-7"]);
    }

    #[test]
    fn conditionals() {
        let source = "a = 4\nif a >= 4\nthen print(\"yes\")\nelse print(\"no\")\nend if";
        assert_eq!(run(source), ["yes"]);
        let source = "a = 4\nif a != 4\nthen print(\"yes\")\nelse print(\"no\")\nend if";
        assert_eq!(run(source), ["no"]);
    }

    #[test]
    fn loops() {
        assert_eq!(run("from 1 until 4\ndo print(\"x\")"), ["x", "x", "x"]);
        assert_eq!(run("from 4 until 1\ndo print(\"x\")"), ["x", "x", "x"]);
        assert!(run("from 2 until 2\ndo print(\"x\")").is_empty());

        // The count is used up by the first `do`
        assert_eq!(
            run("from 0 until 2\ndo print(\"a\")\ndo print(\"b\")"),
            ["a", "a"]
        );
        assert!(run("do print(\"x\")").is_empty());
    }

    #[test]
    fn nested_do_shares_the_count() {
        assert_eq!(run("from 0 until 2\ndo do print(\"x\")"), ["x", "x"]);
        assert_eq!(
            run("from 0 until 2\ndo do print(\"x\")\ndo print(\"y\")"),
            ["x", "x"]
        );
    }

    #[test]
    fn functions_inline() {
        let source =
            "fn greet:\n\tprint(\"hi\")\n\tprint(\"there\")\nend fn\ncall greet\ncall greet";
        assert_eq!(run(source), ["hi", "there", "hi", "there"]);
    }

    #[test]
    fn functions_see_current_variables() {
        let source = "fn show:\n\tprint(n)\nend fn\nn = 1\ncall show\nn = 2\ncall show";
        assert_eq!(run(source), ["1", "2"]);
    }

    #[test]
    fn blank_lines_do_nothing() {
        assert!(run("\n   \n\t\n").is_empty());
    }

    #[test]
    fn errors() {
        assert!(matches!(
            fail("print(nope)").kind(),
            Error::UnresolvedVariable(name) if name == "nope"
        ));
        assert!(matches!(
            fail("s = \"x\"\nn = s + 1").kind(),
            Error::NotANumber(name) if name == "s"
        ));
        assert!(matches!(
            fail("n = 99999999999").kind(),
            Error::InvalidNumber(_)
        ));
        assert!(matches!(
            fail("n = 1a").kind(),
            Error::InvalidNumber(_)
        ));
        assert!(matches!(
            fail("n = 1 / 0").kind(),
            Error::ArithmeticFault { lhs: 1, rhs: 0 }
        ));
        assert!(matches!(
            fail("then print(\"x\")").kind(),
            Error::ConditionOutsideIf
        ));
        assert!(matches!(
            fail("if 1 < 2\nend if\nelse print(\"x\")").kind(),
            Error::ConditionOutsideIf
        ));
        assert!(matches!(fail("call nowhere").kind(), Error::UnresolvedFunction(_)));
        assert!(matches!(
            fail("fn a:\nfn b:").kind(),
            Error::NestedFunction(name) if name == "b"
        ));
        assert!(matches!(fail("end fn").kind(), Error::UnmatchedEndFunction));
        assert!(matches!(
            fail("\tprint(\"x\")").kind(),
            Error::IndentedLineOutsideFunction(_)
        ));
        assert!(matches!(
            fail("fn a:\n\tprint(\"x\")").kind(),
            Error::UnterminatedFunction(name) if name == "a"
        ));
        assert!(matches!(
            fail("what is this").kind(),
            Error::SyntaxUnrecognized(text) if text == "what is this"
        ));
    }

    #[test]
    fn oversized_literal_is_an_error() {
        let source = format!("print(\"{}\")", "a".repeat(70_000));
        assert!(matches!(
            fail(&source).kind(),
            Error::BytecodeGen(jvm::Error::ConstantTooLong { length: 70_000 })
        ));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = fail("a = 1\n\nprint(b)");
        assert_eq!(err.line_number(), Some(3));
        assert_eq!(err.to_string(), "line 3: unknown variable 'b'");
    }

    #[test]
    fn recursion_is_bounded() {
        let err = fail("fn spin:\n\tcall spin\nend fn\ncall spin");
        assert_eq!(err.line_number(), Some(4));
        assert!(matches!(err.kind(), Error::NestingTooDeep(64)));
    }

    #[test]
    fn body_is_callable_only_after_end_fn() {
        let mut translator = translator();
        translator.parse_line("fn later:").unwrap();
        translator.parse_line("\tprint(\"x\")").unwrap();
        let err = translator.parse_line("call later").unwrap_err();
        assert!(matches!(err.kind(), Error::UnresolvedFunction(name) if name == "later"));

        translator.parse_line("end fn").unwrap();
        translator.parse_line("call later").unwrap();
        assert_eq!(printed(&translator), ["x"]);
    }

    #[test]
    fn lenient_mode_skips_unrecognized() {
        let mut settings = Settings::new("Test").unwrap();
        settings.strict_syntax = false;
        let mut translator = ProgramTranslator::new(settings).unwrap();
        translator
            .parse_source("print(\"a\")\n??\nprint(\"b\")")
            .unwrap();
        assert_eq!(printed(&translator), ["a", "b"]);
    }

    #[test]
    fn too_many_prints() {
        let source = "print(\"x\")\n".repeat(117);
        let err = fail(&source);
        assert_eq!(err.line_number(), Some(117));
        assert!(matches!(err.kind(), Error::BytecodeGen(_)));
    }
}
