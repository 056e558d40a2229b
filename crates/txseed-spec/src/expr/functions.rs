use std::fmt;

/// Built-in functions callable from expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Rand,
    Array,
    NamedStruct,
    Concat,
    ElementAt,
    Substr,
    DateAdd,
    Round,
    Floor,
    Ceil,
    Abs,
    Coalesce,
    Upper,
    Lower,
    Length,
}

impl Function {
    pub const ALL: [Function; 15] = [
        Function::Rand,
        Function::Array,
        Function::NamedStruct,
        Function::Concat,
        Function::ElementAt,
        Function::Substr,
        Function::DateAdd,
        Function::Round,
        Function::Floor,
        Function::Ceil,
        Function::Abs,
        Function::Coalesce,
        Function::Upper,
        Function::Lower,
        Function::Length,
    ];

    /// Resolve a function by name, ignoring case. `substring` and `ceiling`
    /// are accepted as aliases.
    pub fn lookup(name: &str) -> Option<Function> {
        let lowered = name.to_ascii_lowercase();
        match lowered.as_str() {
            "substring" => Some(Function::Substr),
            "ceiling" => Some(Function::Ceil),
            other => Function::ALL.into_iter().find(|func| func.name() == other),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Rand => "rand",
            Function::Array => "array",
            Function::NamedStruct => "named_struct",
            Function::Concat => "concat",
            Function::ElementAt => "element_at",
            Function::Substr => "substr",
            Function::DateAdd => "date_add",
            Function::Round => "round",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Abs => "abs",
            Function::Coalesce => "coalesce",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Length => "length",
        }
    }

    /// Accepted argument count as `(min, max)`; `None` means unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Rand => (0, Some(0)),
            Function::Array | Function::Concat => (0, None),
            Function::NamedStruct => (2, None),
            Function::Coalesce => (1, None),
            Function::ElementAt | Function::DateAdd => (2, Some(2)),
            Function::Substr => (2, Some(3)),
            Function::Round => (1, Some(2)),
            Function::Floor
            | Function::Ceil
            | Function::Abs
            | Function::Upper
            | Function::Lower
            | Function::Length => (1, Some(1)),
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.is_none_or(|max| count <= max)
    }

    /// Human-readable arity used in error messages.
    pub fn arity_label(self) -> String {
        match self.arity() {
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
