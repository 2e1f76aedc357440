//! Expression tree nodes.
//!
//! A [`Node`] is an immutable element of the query expression algebra:
//! literals, column references, member access, comparison and boolean
//! operators, null tests, ordering markers and command markers. Fluent
//! operators always build new nodes; nothing is mutated after
//! construction.
//!
//! Arity is not checked when a node is assembled. Generators call
//! [`Node::check_arity`] while walking the tree and fail the whole
//! generation on a mismatch.

use std::fmt;

use chrono::NaiveDateTime;

use super::value::Value;
use crate::error::{Result, TastyError};

/// Shape a node takes when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fix {
    /// No children: literals, references, commands.
    Nullary,
    /// `NOT x`
    Prefix,
    /// `x IS NULL`, `x ASC`
    Postfix,
    /// `x = y`
    Infix,
    /// `table.column`
    InfixWithoutSpaces,
}

impl Fix {
    pub fn arity(self) -> usize {
        match self {
            Fix::Nullary => 0,
            Fix::Prefix | Fix::Postfix => 1,
            Fix::Infix | Fix::InfixWithoutSpaces => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Member,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
    Asc,
    Desc,
}

impl Operator {
    pub fn fix(self) -> Fix {
        match self {
            Operator::Member => Fix::InfixWithoutSpaces,
            Operator::Eq
            | Operator::Ne
            | Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge
            | Operator::And
            | Operator::Or => Fix::Infix,
            Operator::Not => Fix::Prefix,
            Operator::IsNull | Operator::IsNotNull | Operator::Asc | Operator::Desc => {
                Fix::Postfix
            }
        }
    }

    /// SQL spelling, identical across the supported dialects.
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Member => ".",
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Asc => "ASC",
            Operator::Desc => "DESC",
        }
    }

    /// Backend-neutral token used in debug output.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Member => ".",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::Asc => "ascending",
            Operator::Desc => "descending",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge
        )
    }
}

/// Statement a query issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCommand {
    #[default]
    Select,
    Upsert,
    Delete,
}

impl QueryCommand {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "select" => Ok(QueryCommand::Select),
            "upsert" => Ok(QueryCommand::Upsert),
            "delete" => Ok(QueryCommand::Delete),
            other => Err(TastyError::generation(format!("unknown query command: {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryCommand::Select => "select",
            QueryCommand::Upsert => "upsert",
            QueryCommand::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal(Value),
    Reference(String),
    Op(Operator),
    Command(QueryCommand),
}

impl NodeKind {
    pub fn fix(&self) -> Fix {
        match self {
            NodeKind::Literal(_) | NodeKind::Reference(_) | NodeKind::Command(_) => Fix::Nullary,
            NodeKind::Op(op) => op.fix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    /// Assemble a node directly. Arity is checked at generation time.
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(NodeKind::Literal(value.into()), Vec::new())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Reference(name.into()), Vec::new())
    }

    pub fn command(command: QueryCommand) -> Self {
        Self::new(NodeKind::Command(command), Vec::new())
    }

    /// `table.column`
    pub fn member(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            NodeKind::Op(Operator::Member),
            vec![Self::reference(table), Self::reference(column)],
        )
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn fix(&self) -> Fix {
        self.kind.fix()
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            NodeKind::Op(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// Fail when the child count disagrees with the node's shape.
    pub fn check_arity(&self) -> Result<()> {
        let expected = self.fix().arity();
        if self.children.len() != expected {
            return Err(TastyError::generation(format!(
                "node {:?} expects {} children, found {}",
                self.kind,
                expected,
                self.children.len()
            )));
        }
        Ok(())
    }

    /// Number of literal leaves in this subtree.
    pub fn literal_count(&self) -> usize {
        match self.kind {
            NodeKind::Literal(_) => 1,
            _ => self.children.iter().map(Node::literal_count).sum(),
        }
    }

    fn binary(&self, op: Operator, rhs: impl Into<Node>) -> Node {
        Node::new(NodeKind::Op(op), vec![self.clone(), rhs.into()])
    }

    fn unary(&self, op: Operator) -> Node {
        Node::new(NodeKind::Op(op), vec![self.clone()])
    }

    pub fn equals(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Eq, rhs)
    }

    pub fn does_not_equal(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Ne, rhs)
    }

    pub fn less_than(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Lt, rhs)
    }

    pub fn less_than_or_equal(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Le, rhs)
    }

    pub fn greater_than(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Gt, rhs)
    }

    pub fn greater_than_or_equal(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Ge, rhs)
    }

    pub fn and(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::And, rhs)
    }

    pub fn or(&self, rhs: impl Into<Node>) -> Node {
        self.binary(Operator::Or, rhs)
    }

    pub fn not(&self) -> Node {
        self.unary(Operator::Not)
    }

    pub fn is_null(&self) -> Node {
        self.unary(Operator::IsNull)
    }

    pub fn is_not_null(&self) -> Node {
        self.unary(Operator::IsNotNull)
    }

    pub fn asc(&self) -> Node {
        self.unary(Operator::Asc)
    }

    pub fn desc(&self) -> Node {
        self.unary(Operator::Desc)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Literal(v) => write!(f, "{}", v),
            NodeKind::Reference(name) => write!(f, "{}", name),
            NodeKind::Command(c) => write!(f, "{}", c.as_str()),
            NodeKind::Op(op) => match (op.fix(), self.children.as_slice()) {
                (Fix::InfixWithoutSpaces, [l, r]) => write!(f, "{}{}{}", l, op.token(), r),
                (Fix::Infix, [l, r]) => write!(f, "({} {} {})", l, op.token(), r),
                (Fix::Prefix, [c]) => write!(f, "{}{}", op.token(), c),
                (Fix::Postfix, [c]) => write!(f, "{}.{}()", c, op.token()),
                (_, children) => write!(f, "{}<{} children>", op.token(), children.len()),
            },
        }
    }
}

impl From<&Node> for Node {
    fn from(node: &Node) -> Self {
        node.clone()
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::literal(value)
    }
}

macro_rules! literal_node_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Node::literal(value)
                }
            }
        )*
    };
}

literal_node_from!(bool, i64, i32, f64, &str, String, NaiveDateTime);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_fluent_operators_build_new_nodes() {
        let title = Node::member("movies", "title");
        let filter = title.equals("Alien");
        assert_eq!(filter.operator(), Some(Operator::Eq));
        assert_eq!(filter.children()[0], title);
        assert_eq!(filter.children()[1].as_literal(), Some(&Value::from("Alien")));
        // the receiver is untouched
        assert_eq!(title.children().len(), 2);
    }

    #[rstest]
    #[case(Operator::Member, Fix::InfixWithoutSpaces)]
    #[case(Operator::Ne, Fix::Infix)]
    #[case(Operator::Or, Fix::Infix)]
    #[case(Operator::Not, Fix::Prefix)]
    #[case(Operator::IsNotNull, Fix::Postfix)]
    #[case(Operator::Desc, Fix::Postfix)]
    fn test_operator_fix(#[case] op: Operator, #[case] fix: Fix) {
        assert_eq!(op.fix(), fix);
    }

    #[rstest]
    fn test_check_arity_rejects_mismatch() {
        let broken = Node::new(NodeKind::Op(Operator::Eq), vec![Node::literal(1)]);
        let err = broken.check_arity().unwrap_err();
        assert!(err.to_string().contains("expects 2 children, found 1"));
    }

    #[rstest]
    fn test_check_arity_accepts_leaf() {
        assert!(Node::reference("title").check_arity().is_ok());
        assert!(Node::command(QueryCommand::Delete).check_arity().is_ok());
    }

    #[rstest]
    fn test_literal_count() {
        let year = Node::member("movies", "year");
        let filter = year.greater_than(1990).and(year.less_than(2000)).or(year.is_null());
        assert_eq!(filter.literal_count(), 2);
    }

    #[rstest]
    fn test_display() {
        let filter = Node::member("movies", "title").does_not_equal("Alien").not();
        assert_eq!(filter.to_string(), "!(movies.title != \"Alien\")");
    }

    #[rstest]
    #[case("select", QueryCommand::Select)]
    #[case("upsert", QueryCommand::Upsert)]
    #[case("delete", QueryCommand::Delete)]
    fn test_command_parse(#[case] name: &str, #[case] expected: QueryCommand) {
        assert_eq!(QueryCommand::parse(name).unwrap(), expected);
    }

    #[rstest]
    fn test_command_parse_unknown() {
        let err = QueryCommand::parse("truncate").unwrap_err();
        assert!(err.to_string().contains("unknown query command"));
    }
}
