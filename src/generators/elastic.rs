//! Elasticsearch query generation.
//!
//! Selects and deletes become one search request each; upserts pass their
//! payload rows through. Filters are folded into a single `bool` query:
//!
//! - `==` adds a `match` to `filter`, `!=` adds one to `must_not`
//! - range comparisons are merged per column, keeping the tightest bound
//! - `&&` folds both sides into the same `bool`
//! - `||` becomes a nested `bool` with `should` and `minimum_should_match: 1`
//!
//! Columns must be `table.column` member nodes naming the queried table,
//! always on the left-hand side of a comparison.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use super::{BackendKind, GeneratedQuery, Generator, ParameterMode};
use crate::error::{Result, TastyError};
use crate::model::{Node, NodeKind, Operator, Query, QueryCommand, Row, SortOrder, Value};

/// One request against the search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    pub body: SearchBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchBody {
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElasticParam {
    Search(SearchRequest),
    Row(Row),
}

/// Envelope handed to the Elasticsearch driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticQuery {
    pub index: String,
    pub table: String,
    pub primary_keys: Vec<String>,
    pub fields: Vec<String>,
    pub op: QueryCommand,
    pub params: Vec<ElasticParam>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticGenerator;

impl ElasticGenerator {
    pub fn generate_query(&self, query: &Query) -> Result<ElasticQuery> {
        let table = query.table();
        let params = match query.command() {
            QueryCommand::Select | QueryCommand::Delete => {
                vec![ElasticParam::Search(search_request(query)?)]
            }
            QueryCommand::Upsert => query.upserts().iter().cloned().map(ElasticParam::Row).collect(),
        };

        Ok(ElasticQuery {
            index: table.database().to_string(),
            table: table.name().to_string(),
            primary_keys: table.primary_keys().to_vec(),
            fields: table.columns().to_vec(),
            op: query.command(),
            params,
        })
    }
}

impl Generator for ElasticGenerator {
    fn backend(&self) -> BackendKind {
        BackendKind::Elastic
    }

    fn generate(&self, query: &Query, _mode: ParameterMode) -> Result<GeneratedQuery> {
        Ok(GeneratedQuery::Elastic(vec![self.generate_query(query)?]))
    }
}

/// Build the search request for a select or delete.
pub fn search_request(query: &Query) -> Result<SearchRequest> {
    if !query.aliases().is_empty() {
        return Err(TastyError::generation("aliases are not supported by Elasticsearch"));
    }

    let table_name = query.table().name();
    let mut body = SearchBody::default();

    if !query.is_selecting_all() && query.command() == QueryCommand::Select {
        let mut source = Vec::with_capacity(query.selected().len());
        for column in query.selected() {
            source.push(column_name(column, table_name)?);
        }
        body.source = Some(source);
    }

    if !query.sorts().is_empty() {
        let mut sorts = Vec::with_capacity(query.sorts().len());
        for sort in query.sorts() {
            let order = match sort.order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            let column = column_name(&sort.node, table_name)?;
            sorts.push(json!({ column: order }));
        }
        body.sort = Some(sorts);
    }

    if !query.filters().is_empty() {
        let mut clause = BoolClause::default();
        for filter in query.filters() {
            clause.fold(filter, table_name)?;
        }
        body.query = Some(clause.into_json());
    }

    Ok(SearchRequest {
        index: query.table().database().to_string(),
        type_name: table_name.to_string(),
        from: (query.skip() != 0).then_some(query.skip()),
        size: (query.take() != 0).then_some(query.take()),
        body,
    })
}

/// Resolve a `table.column` node to its column name.
pub fn column_name(node: &Node, table_name: &str) -> Result<String> {
    let describe = || node.to_string();

    if node.operator() != Some(Operator::Member) || node.children().len() != 2 {
        return Err(TastyError::generation(format!(
            "could not find column name in expression {}",
            describe()
        )));
    }

    let Some(table) = node.children()[0].as_reference() else {
        return Err(TastyError::generation(format!(
            "could not find table name in expression {}",
            describe()
        )));
    };
    if table != table_name {
        return Err(TastyError::generation(format!(
            "expression {} refers to a table other than {}",
            describe(),
            table_name
        )));
    }

    node.children()[1]
        .as_reference()
        .map(str::to_string)
        .ok_or_else(|| {
            TastyError::generation(format!("could not find column name in expression {}", describe()))
        })
}

#[derive(Debug, Default)]
struct RangeBounds {
    lt: Option<Value>,
    lte: Option<Value>,
    gt: Option<Value>,
    gte: Option<Value>,
}

fn bound_name(op: Operator) -> &'static str {
    match op {
        Operator::Lt => "lt",
        Operator::Le => "lte",
        Operator::Gt => "gt",
        _ => "gte",
    }
}

impl RangeBounds {
    /// Merge a bound, keeping the tighter one.
    ///
    /// Returns the value back when it cannot be ordered against the bound
    /// already held, so the caller can keep it as a separate clause.
    fn tighten(&mut self, op: Operator, value: Value) -> Option<Value> {
        let (slot, keep_when) = match op {
            Operator::Lt => (&mut self.lt, Ordering::Less),
            Operator::Le => (&mut self.lte, Ordering::Less),
            Operator::Gt => (&mut self.gt, Ordering::Greater),
            Operator::Ge => (&mut self.gte, Ordering::Greater),
            _ => return Some(value),
        };
        match slot.as_ref().map(|current| value.compare(current)) {
            None => *slot = Some(value),
            Some(Some(ordering)) => {
                if ordering == keep_when {
                    *slot = Some(value);
                }
            }
            Some(None) => return Some(value),
        }
        None
    }

    fn into_json(self) -> JsonValue {
        let mut map = Map::new();
        for (name, bound) in [("gt", self.gt), ("gte", self.gte), ("lt", self.lt), ("lte", self.lte)] {
            if let Some(value) = bound {
                map.insert(name.to_string(), value.to_json());
            }
        }
        JsonValue::Object(map)
    }
}

#[derive(Debug)]
enum FilterEntry {
    Clause(JsonValue),
    /// Index into `BoolClause::ranges`.
    Range(usize),
}

/// Accumulates one `bool` query.
#[derive(Debug, Default)]
struct BoolClause {
    filter: Vec<FilterEntry>,
    must_not: Vec<JsonValue>,
    ranges: Vec<(String, RangeBounds)>,
}

impl BoolClause {
    fn fold(&mut self, expression: &Node, table_name: &str) -> Result<()> {
        expression.check_arity()?;
        let Some(op) = expression.operator() else {
            return Err(TastyError::generation(format!(
                "filtering on non-operator expression {}",
                expression
            )));
        };
        let children = expression.children();

        match op {
            Operator::And => {
                self.fold(&children[0], table_name)?;
                self.fold(&children[1], table_name)?;
            }
            Operator::Or => {
                let mut branches = Vec::new();
                collect_or_branches(expression, &mut branches);
                let mut should = Vec::with_capacity(branches.len());
                for branch in branches {
                    let mut clause = BoolClause::default();
                    clause.fold(branch, table_name)?;
                    should.push(clause.into_json());
                }
                self.filter.push(FilterEntry::Clause(json!({
                    "bool": { "should": should, "minimum_should_match": 1 }
                })));
            }
            Operator::Not => {
                let mut clause = BoolClause::default();
                clause.fold(&children[0], table_name)?;
                self.must_not.push(clause.into_json());
            }
            Operator::IsNull | Operator::IsNotNull => {
                let column = column_name(&children[0], table_name)?;
                let exists = json!({ "exists": { "field": column } });
                if op == Operator::IsNull {
                    self.must_not.push(exists);
                } else {
                    self.filter.push(FilterEntry::Clause(exists));
                }
            }
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
                let column = column_name(&children[0], table_name)?;
                let Some(value) = children[1].as_literal() else {
                    return Err(TastyError::generation(format!(
                        "right-hand side of {} must be a literal",
                        expression
                    )));
                };
                match op {
                    Operator::Eq => self
                        .filter
                        .push(FilterEntry::Clause(json!({ "match": { column: value.to_json() } }))),
                    Operator::Ne => self
                        .must_not
                        .push(json!({ "match": { column: value.to_json() } })),
                    _ => {
                        if let Some(value) = self.range(column.clone()).tighten(op, value.clone()) {
                            self.filter.push(FilterEntry::Clause(json!({
                                "range": { column: { bound_name(op): value.to_json() } }
                            })));
                        }
                    }
                }
            }
            Operator::Member | Operator::Asc | Operator::Desc => {
                return Err(TastyError::generation(format!(
                    "filtering on unsupported expression {}",
                    expression
                )));
            }
        }
        Ok(())
    }

    fn range(&mut self, column: String) -> &mut RangeBounds {
        let position = match self.ranges.iter().position(|(c, _)| *c == column) {
            Some(position) => position,
            None => {
                self.ranges.push((column, RangeBounds::default()));
                self.filter.push(FilterEntry::Range(self.ranges.len() - 1));
                self.ranges.len() - 1
            }
        };
        &mut self.ranges[position].1
    }

    fn into_json(self) -> JsonValue {
        let mut ranges: Vec<Option<(String, RangeBounds)>> = self.ranges.into_iter().map(Some).collect();
        let filter: Vec<JsonValue> = self
            .filter
            .into_iter()
            .filter_map(|entry| match entry {
                FilterEntry::Clause(clause) => Some(clause),
                FilterEntry::Range(i) => ranges[i]
                    .take()
                    .map(|(column, bounds)| json!({ "range": { column: bounds.into_json() } })),
            })
            .collect();

        let mut body = Map::new();
        if !filter.is_empty() {
            body.insert("filter".to_string(), JsonValue::Array(filter));
        }
        if !self.must_not.is_empty() {
            body.insert("must_not".to_string(), JsonValue::Array(self.must_not));
        }
        json!({ "bool": body })
    }
}

fn collect_or_branches<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    match node.kind() {
        NodeKind::Op(Operator::Or) if node.children().len() == 2 => {
            collect_or_branches(&node.children()[0], out);
            collect_or_branches(&node.children()[1], out);
        }
        _ => out.push(node),
    }
}
