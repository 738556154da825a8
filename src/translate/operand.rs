/// What a single token in an expression looks like
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperandType {
    /// Letters, optionally followed by digits (`x`, `total`, `a12`)
    Variable,

    /// Only digits
    Number,

    /// Anything wrapped in double quotes
    Text,

    Unknown,
}

impl OperandType {
    pub fn of(token: &str) -> OperandType {
        if is_variable_name(token) {
            OperandType::Variable
        } else if is_digits(token) {
            OperandType::Number
        } else if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            OperandType::Text
        } else {
            OperandType::Unknown
        }
    }
}

/// Matches `[A-Za-z]+[0-9]*`
pub fn is_variable_name(token: &str) -> bool {
    let letters = token.len() - token.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
    letters > 0 && token[letters..].bytes().all(|b| b.is_ascii_digit())
}

/// Matches `[0-9]+`
pub fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub fn from_symbol(symbol: char) -> Option<ArithmeticOp> {
        match symbol {
            '+' => Some(ArithmeticOp::Add),
            '-' => Some(ArithmeticOp::Sub),
            '*' => Some(ArithmeticOp::Mul),
            '/' => Some(ArithmeticOp::Div),
            _ => None,
        }
    }

    /// Evaluate with 32-bit two's complement wrap-around
    ///
    /// Returns `None` only when dividing by zero.
    pub fn apply(self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            ArithmeticOp::Add => Some(lhs.wrapping_add(rhs)),
            ArithmeticOp::Sub => Some(lhs.wrapping_sub(rhs)),
            ArithmeticOp::Mul => Some(lhs.wrapping_mul(rhs)),
            ArithmeticOp::Div if rhs == 0 => None,
            ArithmeticOp::Div => Some(lhs.wrapping_div(rhs)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComparisonOp {
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl ComparisonOp {
    pub fn from_symbol(symbol: &str) -> Option<ComparisonOp> {
        match symbol {
            "<" => Some(ComparisonOp::Less),
            ">" => Some(ComparisonOp::Greater),
            "<=" => Some(ComparisonOp::LessOrEqual),
            ">=" => Some(ComparisonOp::GreaterOrEqual),
            "==" => Some(ComparisonOp::Equal),
            "!=" => Some(ComparisonOp::NotEqual),
            _ => None,
        }
    }

    pub fn evaluate(self, lhs: i32, rhs: i32) -> bool {
        match self {
            ComparisonOp::Less => lhs < rhs,
            ComparisonOp::Greater => lhs > rhs,
            ComparisonOp::LessOrEqual => lhs <= rhs,
            ComparisonOp::GreaterOrEqual => lhs >= rhs,
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
        }
    }
}
