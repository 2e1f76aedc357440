//! Backend-agnostic query model: values, expression nodes, tables,
//! queries and the normalized schema tree.

mod node;
mod query;
mod schema;
mod table;
mod value;

pub use node::{Fix, Node, NodeKind, Operator, QueryCommand};
pub use query::{Query, QueryBuilder, Sort, SortOrder};
pub use schema::{ColumnInfo, Schema, TYPELESS_TABLE};
pub use table::{column, Table, DEFAULT_DELIMITER};
pub use value::{Row, Value, DATE_FORMAT};
