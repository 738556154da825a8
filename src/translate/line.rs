//! Classifying a single line of source
//!
//! Every line has exactly one shape. Shapes are tried in a fixed order and the first match wins,
//! so (for instance) `double = 2` is an assignment even though it starts with `do`.

use super::operand::{is_variable_name, ArithmeticOp, ComparisonOp};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Nothing but whitespace
    Blank,

    /// `print("text")`
    PrintLiteral(&'a str),

    /// `print(name)`
    PrintVariable(&'a str),

    /// `name = "text"`
    AssignString { name: &'a str, value: &'a str },

    /// `name = lhs OP rhs`
    AssignArithmetic {
        name: &'a str,
        lhs: &'a str,
        op: ArithmeticOp,
        rhs: &'a str,
    },

    /// `name = value`
    AssignNumber { name: &'a str, value: &'a str },

    /// `if lhs OP rhs`
    If {
        lhs: &'a str,
        op: ComparisonOp,
        rhs: &'a str,
    },

    /// `end if`
    EndIf,

    /// `then <line>`
    Then(&'a str),

    /// `else <line>`
    Else(&'a str),

    /// `from N until M`
    Range { from: &'a str, until: &'a str },

    /// `do <line>`
    Do(&'a str),

    /// `fn name:`
    FunctionStart(&'a str),

    /// Tab-indented line in a function body
    FunctionBody(&'a str),

    /// `end fn`
    FunctionEnd,

    /// `call name`
    Call(&'a str),

    Unrecognized,
}

impl<'a> Line<'a> {
    pub fn classify(line: &'a str) -> Line<'a> {
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            return Line::Blank;
        }

        let shapes: [fn(&str) -> Option<Line<'_>>; 15] = [
            print_literal,
            print_variable,
            assign_string,
            assign_arithmetic,
            assign_number,
            if_condition,
            end_if,
            then_branch,
            else_branch,
            range,
            do_loop,
            function_start,
            function_body,
            function_end,
            call,
        ];
        shapes
            .iter()
            .find_map(|shape| shape(line))
            .unwrap_or(Line::Unrecognized)
    }
}

/// Cursor over the text of a line, used to match the shapes
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Scanner<'a> {
        Scanner { rest: text }
    }

    fn keyword(&mut self, keyword: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(keyword)?;
        Some(())
    }

    /// Zero or more spaces
    fn spaces(&mut self) -> usize {
        let trimmed = self.rest.trim_start_matches(' ');
        let count = self.rest.len() - trimmed.len();
        self.rest = trimmed;
        count
    }

    /// One or more characters matching the predicate
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> Option<&'a str> {
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map_or(self.rest.len(), |(idx, _)| idx);
        if end == 0 {
            return None;
        }
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(taken)
    }

    fn alphanumeric(&mut self) -> Option<&'a str> {
        self.take_while(|c| c.is_ascii_alphanumeric())
    }

    fn digits(&mut self) -> Option<&'a str> {
        self.take_while(|c| c.is_ascii_digit())
    }

    fn finish(self) -> Option<()> {
        if self.rest.is_empty() {
            Some(())
        } else {
            None
        }
    }

    fn rest(self) -> &'a str {
        self.rest
    }
}

fn print_literal(line: &str) -> Option<Line<'_>> {
    let text = line.strip_prefix("print(\"")?.strip_suffix("\")")?;
    Some(Line::PrintLiteral(text))
}

fn print_variable(line: &str) -> Option<Line<'_>> {
    let name = line.strip_prefix("print(")?.strip_suffix(')')?;
    if is_variable_name(name) {
        Some(Line::PrintVariable(name))
    } else {
        None
    }
}

/// Matches `name *= *`, returning the scanner positioned after the `=`
fn assignment(line: &str) -> Option<(&str, Scanner<'_>)> {
    let mut scanner = Scanner::new(line);
    let name = scanner.alphanumeric()?;
    scanner.spaces();
    scanner.keyword("=")?;
    scanner.spaces();
    Some((name, scanner))
}

fn assign_string(line: &str) -> Option<Line<'_>> {
    let (name, scanner) = assignment(line)?;
    let quoted = scanner.rest();
    if quoted.len() < 2 {
        return None;
    }
    let value = quoted.strip_prefix('"')?.strip_suffix('"')?;
    Some(Line::AssignString { name, value })
}

fn assign_arithmetic(line: &str) -> Option<Line<'_>> {
    let (name, mut scanner) = assignment(line)?;
    let lhs = scanner.alphanumeric()?;
    scanner.spaces();
    let symbol = scanner.take_while(|c| "+-*/".contains(c))?;
    let mut symbol_chars = symbol.chars();
    let op = ArithmeticOp::from_symbol(symbol_chars.next()?)?;
    if symbol_chars.next().is_some() {
        return None;
    }
    scanner.spaces();
    let rhs = scanner.alphanumeric()?;
    scanner.finish()?;
    Some(Line::AssignArithmetic { name, lhs, op, rhs })
}

fn assign_number(line: &str) -> Option<Line<'_>> {
    let (name, mut scanner) = assignment(line)?;
    let value = scanner.alphanumeric()?;
    scanner.finish()?;
    Some(Line::AssignNumber { name, value })
}

fn if_condition(line: &str) -> Option<Line<'_>> {
    let mut scanner = Scanner::new(line);
    scanner.keyword("if")?;
    scanner.spaces();
    let lhs = scanner.alphanumeric()?;
    scanner.spaces();
    let op = ComparisonOp::from_symbol(scanner.take_while(|c| "<>=!".contains(c))?)?;
    scanner.spaces();
    let rhs = scanner.alphanumeric()?;
    scanner.finish()?;
    Some(Line::If { lhs, op, rhs })
}

fn end_if(line: &str) -> Option<Line<'_>> {
    let mut scanner = Scanner::new(line);
    scanner.keyword("end")?;
    if scanner.spaces() == 0 {
        return None;
    }
    scanner.keyword("if")?;
    scanner.finish()?;
    Some(Line::EndIf)
}

/// Matches `keyword *(.*)`, returning what's after the spaces
fn prefixed<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let mut scanner = Scanner::new(line);
    scanner.keyword(keyword)?;
    scanner.spaces();
    Some(scanner.rest())
}

fn then_branch(line: &str) -> Option<Line<'_>> {
    prefixed(line, "then").map(Line::Then)
}

fn else_branch(line: &str) -> Option<Line<'_>> {
    prefixed(line, "else").map(Line::Else)
}

fn range(line: &str) -> Option<Line<'_>> {
    let mut scanner = Scanner::new(line);
    scanner.keyword("from")?;
    scanner.spaces();
    let from = scanner.digits()?;
    scanner.spaces();
    scanner.keyword("until")?;
    scanner.spaces();
    let until = scanner.digits()?;
    scanner.finish()?;
    Some(Line::Range { from, until })
}

fn do_loop(line: &str) -> Option<Line<'_>> {
    prefixed(line, "do").map(Line::Do)
}

fn function_start(line: &str) -> Option<Line<'_>> {
    let name = prefixed(line, "fn")?.strip_suffix(':')?.trim();
    if name.is_empty() {
        None
    } else {
        Some(Line::FunctionStart(name))
    }
}

fn function_body(line: &str) -> Option<Line<'_>> {
    line.strip_prefix('\t')
        .map(|body| Line::FunctionBody(body.trim()))
}

fn function_end(line: &str) -> Option<Line<'_>> {
    if line == "end fn" {
        Some(Line::FunctionEnd)
    } else {
        None
    }
}

fn call(line: &str) -> Option<Line<'_>> {
    let name = prefixed(line, "call")?.trim();
    if name.is_empty() {
        None
    } else {
        Some(Line::Call(name))
    }
}
