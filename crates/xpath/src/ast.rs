//! Defines the Abstract Syntax Tree (AST) for path expressions.

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    /// A primary expression narrowed by predicates, e.g. `$list[2]`.
    Filter {
        primary: Box<Expression>,
        predicates: Vec<Expression>,
    },
    Variable(String),
    CoreFunction {
        function: CoreFunction,
        args: Vec<Expression>,
    },
    /// A call to a function outside the built-in set. Always fails at
    /// evaluation time.
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    /// `@name = key`, evaluated like `=` but recognized by the evaluator as
    /// a lookup of a named property.
    NameAttributeTest {
        attribute: Box<Expression>,
        key: Box<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
}

impl Expression {
    /// True when the value of the expression can change with the context
    /// node, its position or the context size.
    pub fn is_context_dependent(&self) -> bool {
        match self {
            Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => false,
            Expression::LocationPath(path) => path.is_context_dependent(),
            Expression::Filter { primary, predicates } => {
                primary.is_context_dependent() || predicates.iter().any(Expression::is_context_dependent)
            }
            Expression::CoreFunction { function, args } => {
                function.is_context_dependent(args.len()) || args.iter().any(Expression::is_context_dependent)
            }
            Expression::FunctionCall { .. } => true,
            Expression::NameAttributeTest { .. } => true,
            Expression::BinaryOp { left, right, .. } => left.is_context_dependent() || right.is_context_dependent(),
            Expression::UnaryOp { expr, .. } => expr.is_context_dependent(),
        }
    }
}

/// A unary operator used in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

/// A binary operator used in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
    // Set
    Union,
}

/// Represents a full location path, like `/child::foo`, `descendant::bar[1]`, or `$var/item`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// An optional starting expression, for paths like `$var/foo` or `func()/foo`.
    /// If `None`, the path starts from the context node or root.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts from the root (e.g., `/foo`).
    /// Meaningless if `start_point` is `Some`.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

impl LocationPath {
    pub fn is_context_dependent(&self) -> bool {
        let predicates = self
            .steps
            .iter()
            .any(|step| step.predicates.iter().any(Expression::is_context_dependent));
        match &self.start_point {
            Some(start) => start.is_context_dependent() || predicates,
            None => !self.is_absolute || predicates,
        }
    }
}

/// Represents a single step in a location path, like `child::foo[position() > 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

/// The axis of movement from the context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

/// A test to apply to nodes on a given axis to see if they should be included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A qualified name test (e.g., `foo`, `ns:item`).
    Name(String),
    /// A wildcard test (`*`).
    Wildcard,
    /// A node type test (e.g., `text()`, `node()`).
    NodeType(NodeTypeTest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    ProcessingInstruction,
}

/// The closed set of built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreFunction {
    Last,
    Position,
    Count,
    Id,
    Key,
    LocalName,
    Name,
    NamespaceUri,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
    Null,
}

const FUNCTION_NAMES: &[(&str, CoreFunction)] = &[
    ("last", CoreFunction::Last),
    ("position", CoreFunction::Position),
    ("count", CoreFunction::Count),
    ("id", CoreFunction::Id),
    ("key", CoreFunction::Key),
    ("local-name", CoreFunction::LocalName),
    ("name", CoreFunction::Name),
    ("namespace-uri", CoreFunction::NamespaceUri),
    ("string", CoreFunction::String),
    ("concat", CoreFunction::Concat),
    ("starts-with", CoreFunction::StartsWith),
    ("contains", CoreFunction::Contains),
    ("substring-before", CoreFunction::SubstringBefore),
    ("substring-after", CoreFunction::SubstringAfter),
    ("substring", CoreFunction::Substring),
    ("string-length", CoreFunction::StringLength),
    ("normalize-space", CoreFunction::NormalizeSpace),
    ("translate", CoreFunction::Translate),
    ("boolean", CoreFunction::Boolean),
    ("not", CoreFunction::Not),
    ("true", CoreFunction::True),
    ("false", CoreFunction::False),
    ("lang", CoreFunction::Lang),
    ("number", CoreFunction::Number),
    ("sum", CoreFunction::Sum),
    ("floor", CoreFunction::Floor),
    ("ceiling", CoreFunction::Ceiling),
    ("round", CoreFunction::Round),
    ("null", CoreFunction::Null),
];

impl CoreFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTION_NAMES.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
    }

    pub fn name(&self) -> &'static str {
        FUNCTION_NAMES
            .iter()
            .find(|(_, f)| f == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// Accepted argument counts as an inclusive range; `None` as the upper
    /// bound means unbounded.
    pub fn arity(&self) -> (usize, Option<usize>) {
        use CoreFunction::*;
        match self {
            Last | Position | True | False | Null => (0, Some(0)),
            LocalName | Name | NamespaceUri | String | StringLength | Number => (0, Some(1)),
            Count | Id | Boolean | Not | Lang | Sum | Floor | Ceiling | Round | NormalizeSpace => (1, Some(1)),
            Key | StartsWith | Contains | SubstringBefore | SubstringAfter => (2, Some(2)),
            Substring => (2, Some(3)),
            Translate => (3, Some(3)),
            Concat => (2, None),
        }
    }

    /// Context dependence of the function itself, ignoring its arguments.
    pub fn is_context_dependent(&self, arg_count: usize) -> bool {
        use CoreFunction::*;
        match self {
            Last | Position => true,
            Boolean | LocalName | Name | NamespaceUri | String | Lang | Number => arg_count == 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names_round_trip() {
        for (name, function) in FUNCTION_NAMES {
            assert_eq!(CoreFunction::from_name(name), Some(*function));
            assert_eq!(function.name(), *name);
        }
        assert_eq!(CoreFunction::from_name("format-number"), None);
    }

    #[test]
    fn test_function_context_dependence() {
        assert!(CoreFunction::Last.is_context_dependent(0));
        assert!(CoreFunction::Position.is_context_dependent(0));
        assert!(CoreFunction::Name.is_context_dependent(0));
        assert!(!CoreFunction::Name.is_context_dependent(1));
        assert!(CoreFunction::Lang.is_context_dependent(0));
        assert!(!CoreFunction::Lang.is_context_dependent(1));
        assert!(!CoreFunction::Concat.is_context_dependent(2));
        assert!(!CoreFunction::Count.is_context_dependent(1));
    }

    #[test]
    fn test_path_context_dependence() {
        let relative = LocationPath {
            start_point: None,
            is_absolute: false,
            steps: vec![],
        };
        let absolute = LocationPath {
            is_absolute: true,
            ..relative.clone()
        };
        assert!(relative.is_context_dependent());
        assert!(!absolute.is_context_dependent());

        let with_position = LocationPath {
            steps: vec![Step {
                axis: Axis::Child,
                node_test: NodeTest::Name("a".into()),
                predicates: vec![Expression::CoreFunction {
                    function: CoreFunction::Position,
                    args: vec![],
                }],
            }],
            ..absolute
        };
        assert!(with_position.is_context_dependent());
    }
}
