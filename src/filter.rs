/// LiveGrid Filter Predicate Compiler
///
/// Turns the flat filter list stored on a View into a predicate the store can
/// evaluate row by row.
///
/// # Combinators
///
/// Every filter carries a combinator tag: `neutral` for the first filter and a
/// single join (`and` or `or`) shared by all others. Compilation buckets the
/// filters by tag and then:
///
/// - if any `or` filter exists, matches rows satisfying ANY of the `or` and
///   `neutral` filters. `and` filters are ignored in this mode.
/// - otherwise, matches rows satisfying ALL of the `and` and `neutral` filters.
///
/// This "OR dominates" rule is kept as is for compatibility with stored views.
/// It lives entirely in [`select_group`].
///
/// # Failing closed
///
/// A filter naming an unknown column, or a numeric filter whose value does not
/// parse, compiles to a leaf that never matches. Compilation itself never fails.

use crate::column::{parse_number, CellValue, Column, ColumnId, ColumnType};
use crate::store::RowCells;
use serde::{Deserialize, Serialize};

/// Comparison applied by a single filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Substring test on text cells
    Contains,
    /// Exact equality. With an empty value this is the "is empty" test.
    Equals,
    Gt,
    Lt,
    /// Anything else found in a stored view. Never matches.
    #[serde(other)]
    Unknown,
}

impl FilterOperator {
    /// Map a UI operator label to the underlying operator and negation flag.
    ///
    /// ```
    /// use livegrid::FilterOperator;
    ///
    /// assert_eq!(FilterOperator::from_label("not contains"), Some((FilterOperator::Contains, true)));
    /// assert_eq!(FilterOperator::from_label("is empty"), Some((FilterOperator::Equals, false)));
    /// ```
    pub fn from_label(label: &str) -> Option<(FilterOperator, bool)> {
        match label.trim().to_lowercase().as_str() {
            "contains" => Some((FilterOperator::Contains, false)),
            "not contains" | "does not contain" => Some((FilterOperator::Contains, true)),
            "is empty" => Some((FilterOperator::Equals, false)),
            "is not empty" => Some((FilterOperator::Equals, true)),
            ">" | "gt" => Some((FilterOperator::Gt, false)),
            "<" | "lt" => Some((FilterOperator::Lt, false)),
            _ => None,
        }
    }
}

/// How a filter joins the filters before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
    #[default]
    Neutral,
}

/// One filter condition as stored on a View
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub id: String,
    /// Column name
    pub field: String,
    pub column_type: ColumnType,
    #[serde(alias = "key")]
    pub operator: FilterOperator,
    #[serde(default)]
    pub is_negative: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, alias = "type")]
    pub combinator: Combinator,
}

impl FilterSpec {
    pub fn new(
        id: impl Into<String>,
        field: impl Into<String>,
        column_type: ColumnType,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        FilterSpec {
            id: id.into(),
            field: field.into(),
            column_type,
            operator,
            is_negative: false,
            value: Some(value.into()),
            combinator: Combinator::Neutral,
        }
    }

    /// Build a filter from a UI operator label such as "is not empty"
    pub fn from_label(
        id: impl Into<String>,
        field: impl Into<String>,
        column_type: ColumnType,
        label: &str,
        value: Option<String>,
    ) -> Option<Self> {
        let (operator, is_negative) = FilterOperator::from_label(label)?;
        let value = match operator {
            FilterOperator::Equals => Some(value.unwrap_or_default()),
            _ => value,
        };
        Some(FilterSpec {
            id: id.into(),
            field: field.into(),
            column_type,
            operator,
            is_negative,
            value,
            combinator: Combinator::Neutral,
        })
    }

    pub fn negated(mut self) -> Self {
        self.is_negative = !self.is_negative;
        self
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }
}

/// Ordered filter list that assigns combinators the way the filter editor does.
///
/// The first filter is always `neutral`. The second picks the join for the
/// whole list and every later filter inherits it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterList {
    specs: Vec<FilterSpec>,
}

impl FilterList {
    pub fn new() -> Self {
        FilterList { specs: Vec::new() }
    }

    /// Append a filter. The combinator on `spec` is only consulted when it
    /// becomes the second filter; `neutral` there means `or`.
    pub fn push(&mut self, mut spec: FilterSpec) {
        spec.combinator = match self.specs.len() {
            0 => Combinator::Neutral,
            1 => match spec.combinator {
                Combinator::And => Combinator::And,
                _ => Combinator::Or,
            },
            _ => self.specs[1].combinator,
        };
        self.specs.push(spec);
    }

    /// Change the join shared by every non-first filter
    pub fn set_join(&mut self, join: Combinator) {
        if join == Combinator::Neutral {
            return;
        }
        for spec in self.specs.iter_mut().skip(1) {
            spec.combinator = join;
        }
    }

    /// The join shared by the non-first filters, if there are any
    pub fn join(&self) -> Option<Combinator> {
        self.specs.get(1).map(|s| s.combinator)
    }

    pub fn remove(&mut self, id: &str) -> Option<FilterSpec> {
        let pos = self.specs.iter().position(|s| s.id == id)?;
        let removed = self.specs.remove(pos);
        self.normalize();
        Some(removed)
    }

    fn normalize(&mut self) {
        let join = match self.specs.get(1).map(|s| s.combinator) {
            Some(Combinator::And) => Combinator::And,
            _ => Combinator::Or,
        };
        for (i, spec) in self.specs.iter_mut().enumerate() {
            spec.combinator = if i == 0 { Combinator::Neutral } else { join };
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn as_slice(&self) -> &[FilterSpec] {
        &self.specs
    }

    pub fn into_vec(self) -> Vec<FilterSpec> {
        self.specs
    }
}

impl From<Vec<FilterSpec>> for FilterList {
    fn from(specs: Vec<FilterSpec>) -> Self {
        let mut list = FilterList { specs };
        list.normalize();
        list
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LeafTest {
    Contains(String),
    EqualsText(String),
    EqualsNumber(f64),
    IsNull,
    Gt(f64),
    Lt(f64),
    Never,
}

impl LeafTest {
    fn build(spec: &FilterSpec) -> LeafTest {
        let value = spec.value.as_deref().unwrap_or("");
        match (spec.column_type, spec.operator) {
            (ColumnType::Text, FilterOperator::Contains) => LeafTest::Contains(value.to_string()),
            (ColumnType::Text, FilterOperator::Equals) => LeafTest::EqualsText(value.to_string()),
            (ColumnType::Number, FilterOperator::Equals) if value.trim().is_empty() => {
                LeafTest::IsNull
            }
            (ColumnType::Number, FilterOperator::Equals) => {
                parse_number(value).map_or(LeafTest::Never, LeafTest::EqualsNumber)
            }
            (ColumnType::Number, FilterOperator::Gt) => {
                parse_number(value).map_or(LeafTest::Never, LeafTest::Gt)
            }
            (ColumnType::Number, FilterOperator::Lt) => {
                parse_number(value).map_or(LeafTest::Never, LeafTest::Lt)
            }
            _ => LeafTest::Never,
        }
    }

    /// None means the cell's slot for this test is empty (SQL unknown)
    fn eval(&self, cell: &CellValue) -> Option<bool> {
        match (self, cell) {
            (LeafTest::Never, _) => None,
            (LeafTest::IsNull, CellValue::Null) => Some(true),
            (LeafTest::IsNull, CellValue::Number(_)) => Some(false),
            (LeafTest::Contains(needle), CellValue::Text(s)) => Some(s.contains(needle.as_str())),
            (LeafTest::EqualsText(expected), CellValue::Text(s)) => Some(s == expected),
            (LeafTest::EqualsNumber(expected), CellValue::Number(n)) => Some(n == expected),
            (LeafTest::Gt(bound), CellValue::Number(n)) => Some(n > bound),
            (LeafTest::Lt(bound), CellValue::Number(n)) => Some(n < bound),
            _ => None,
        }
    }
}

/// A single compiled filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    /// None when the filter's field named no column
    column_id: Option<ColumnId>,
    test: LeafTest,
    negated: bool,
}

impl FilterLeaf {
    fn compile(spec: &FilterSpec, columns: &[Column]) -> FilterLeaf {
        let column_id = columns
            .iter()
            .find(|c| c.name == spec.field)
            .map(|c| c.id.clone());
        if column_id.is_none() {
            log::warn!("filter {} names unknown field '{}'", spec.id, spec.field);
        }
        FilterLeaf {
            column_id,
            test: LeafTest::build(spec),
            negated: spec.is_negative,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.column_id.is_some() && self.test != LeafTest::Never
    }

    pub fn matches<R: RowCells + ?Sized>(&self, row: &R) -> bool {
        let Some(column_id) = &self.column_id else {
            return false;
        };
        let Some(cell) = row.cell(column_id) else {
            return false;
        };
        match self.test.eval(cell) {
            Some(result) => result != self.negated,
            None => false,
        }
    }
}

/// Result of compiling a filter list
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CompiledFilter {
    /// No filters: every row matches
    #[default]
    Always,
    Single(FilterLeaf),
    All(Vec<FilterLeaf>),
    Any(Vec<FilterLeaf>),
}

impl CompiledFilter {
    pub fn matches<R: RowCells + ?Sized>(&self, row: &R) -> bool {
        match self {
            CompiledFilter::Always => true,
            CompiledFilter::Single(leaf) => leaf.matches(row),
            CompiledFilter::All(leaves) => leaves.iter().all(|l| l.matches(row)),
            CompiledFilter::Any(leaves) => leaves.iter().any(|l| l.matches(row)),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, CompiledFilter::Always)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupMode {
    All,
    Any,
}

/// Pick the filters that take part in the predicate and how they combine.
///
/// Any `or` filter switches the whole list into OR mode over the `or` and
/// `neutral` filters, dropping the `and` ones.
fn select_group(specs: &[FilterSpec]) -> (GroupMode, Vec<&FilterSpec>) {
    let has_or = specs.iter().any(|s| s.combinator == Combinator::Or);
    if has_or {
        let group = specs
            .iter()
            .filter(|s| matches!(s.combinator, Combinator::Or | Combinator::Neutral))
            .collect();
        (GroupMode::Any, group)
    } else {
        let group = specs
            .iter()
            .filter(|s| matches!(s.combinator, Combinator::And | Combinator::Neutral))
            .collect();
        (GroupMode::All, group)
    }
}

/// Compile a View's filter list against the table's current columns
pub fn compile_filters(specs: &[FilterSpec], columns: &[Column]) -> CompiledFilter {
    if specs.is_empty() {
        return CompiledFilter::Always;
    }

    let (mode, group) = select_group(specs);
    let mut leaves: Vec<FilterLeaf> = group
        .into_iter()
        .map(|spec| FilterLeaf::compile(spec, columns))
        .collect();

    if leaves.len() == 1 {
        return CompiledFilter::Single(leaves.remove(0));
    }
    match mode {
        GroupMode::All => CompiledFilter::All(leaves),
        GroupMode::Any => CompiledFilter::Any(leaves),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnPriority;
    use crate::store::StoredRow;
    use std::collections::HashMap;

    fn columns() -> Vec<Column> {
        vec![
            Column {
                id: "c-status".to_string(),
                table_id: "t".to_string(),
                name: "Status".to_string(),
                column_type: ColumnType::Text,
                display_order: 0,
                priority: ColumnPriority::Primary,
            },
            Column {
                id: "c-score".to_string(),
                table_id: "t".to_string(),
                name: "Score".to_string(),
                column_type: ColumnType::Number,
                display_order: 1,
                priority: ColumnPriority::Secondary,
            },
        ]
    }

    fn row(status: &str, score: Option<f64>) -> StoredRow {
        let mut cells = HashMap::new();
        cells.insert("c-status".to_string(), CellValue::Text(status.to_string()));
        cells.insert(
            "c-score".to_string(),
            score.map_or(CellValue::Null, CellValue::Number),
        );
        StoredRow {
            id: format!("r-{}", status),
            table_id: "t".to_string(),
            row_order: 1,
            cells,
        }
    }

    fn contains(id: &str, value: &str) -> FilterSpec {
        FilterSpec::new(id, "Status", ColumnType::Text, FilterOperator::Contains, value)
    }

    #[test]
    fn test_empty_list_matches_everything() {
        let compiled = compile_filters(&[], &columns());
        assert!(compiled.is_always());
        assert!(compiled.matches(&row("", None)));
    }

    #[test]
    fn test_contains_and_negation() {
        let cols = columns();
        let compiled = compile_filters(&[contains("f1", "do")], &cols);
        assert!(matches!(compiled, CompiledFilter::Single(_)));
        assert!(compiled.matches(&row("todo", None)));
        assert!(!compiled.matches(&row("open", None)));

        let compiled = compile_filters(&[contains("f1", "do").negated()], &cols);
        assert!(!compiled.matches(&row("todo", None)));
        assert!(compiled.matches(&row("open", None)));
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let compiled = compile_filters(&[contains("f1", "Todo")], &columns());
        assert!(!compiled.matches(&row("todo", None)));
    }

    #[test]
    fn test_is_empty_labels() {
        let cols = columns();
        let empty =
            FilterSpec::from_label("f1", "Status", ColumnType::Text, "is empty", None).unwrap();
        let compiled = compile_filters(&[empty], &cols);
        assert!(compiled.matches(&row("", None)));
        assert!(!compiled.matches(&row("done", None)));

        let not_empty =
            FilterSpec::from_label("f1", "Status", ColumnType::Text, "is not empty", None).unwrap();
        let compiled = compile_filters(&[not_empty], &cols);
        assert!(!compiled.matches(&row("", None)));
        assert!(compiled.matches(&row("done", None)));
    }

    #[test]
    fn test_number_comparisons() {
        let cols = columns();
        let gt = FilterSpec::new("f1", "Score", ColumnType::Number, FilterOperator::Gt, "10");
        let compiled = compile_filters(&[gt], &cols);
        assert!(compiled.matches(&row("a", Some(11.0))));
        assert!(!compiled.matches(&row("a", Some(10.0))));
        assert!(!compiled.matches(&row("a", None)));

        let lt = FilterSpec::new("f1", "Score", ColumnType::Number, FilterOperator::Lt, "10");
        let compiled = compile_filters(&[lt], &cols);
        assert!(compiled.matches(&row("a", Some(9.5))));
        assert!(!compiled.matches(&row("a", Some(10.0))));
    }

    #[test]
    fn test_null_number_never_matches_negated_comparison() {
        let gt = FilterSpec::new("f1", "Score", ColumnType::Number, FilterOperator::Gt, "10")
            .negated();
        let compiled = compile_filters(&[gt], &columns());
        assert!(compiled.matches(&row("a", Some(3.0))));
        assert!(!compiled.matches(&row("a", None)));
    }

    #[test]
    fn test_number_is_empty() {
        let empty =
            FilterSpec::from_label("f1", "Score", ColumnType::Number, "is empty", None).unwrap();
        let compiled = compile_filters(&[empty], &columns());
        assert!(compiled.matches(&row("a", None)));
        assert!(!compiled.matches(&row("a", Some(1.0))));
    }

    #[test]
    fn test_unknown_field_fails_closed() {
        let spec = FilterSpec::new("f1", "Missing", ColumnType::Text, FilterOperator::Contains, "");
        let compiled = compile_filters(&[spec.clone()], &columns());
        assert!(!compiled.matches(&row("anything", None)));

        // negation does not turn an unresolved filter into a match-all
        let compiled = compile_filters(&[spec.negated()], &columns());
        assert!(!compiled.matches(&row("anything", None)));
    }

    #[test]
    fn test_unparseable_number_fails_closed() {
        let gt = FilterSpec::new("f1", "Score", ColumnType::Number, FilterOperator::Gt, "lots");
        let compiled = compile_filters(&[gt.clone()], &columns());
        assert!(!compiled.matches(&row("a", Some(1e9))));
        assert!(!compiled.matches(&row("a", None)));
        let compiled = compile_filters(&[gt.negated()], &columns());
        assert!(!compiled.matches(&row("a", Some(1.0))));
    }

    #[test]
    fn test_and_group() {
        let cols = columns();
        let specs = vec![
            contains("f1", "t"),
            contains("f2", "o").with_combinator(Combinator::And),
        ];
        let compiled = compile_filters(&specs, &cols);
        assert!(matches!(compiled, CompiledFilter::All(_)));
        assert!(compiled.matches(&row("todo", None)));
        assert!(!compiled.matches(&row("tie", None)));
    }

    #[test]
    fn test_or_dominates_and() {
        // Known asymmetry: an `or` filter drops every `and` filter from the predicate.
        let cols = columns();
        let specs = vec![
            contains("f1", "todo"),
            contains("f2", "done").with_combinator(Combinator::Or),
            contains("f3", "zzz").with_combinator(Combinator::And),
        ];
        let compiled = compile_filters(&specs, &cols);
        match &compiled {
            CompiledFilter::Any(leaves) => assert_eq!(leaves.len(), 2),
            other => panic!("expected OR group, got {:?}", other),
        }
        assert!(compiled.matches(&row("todo", None)));
        assert!(compiled.matches(&row("done", None)));
        assert!(!compiled.matches(&row("open", None)));
    }

    #[test]
    fn test_operator_mismatch_fails_closed() {
        let spec = FilterSpec::new("f1", "Status", ColumnType::Text, FilterOperator::Gt, "1");
        let compiled = compile_filters(&[spec], &columns());
        assert!(!compiled.matches(&row("2", None)));
    }

    #[test]
    fn test_stored_view_json() {
        let json = r#"{
            "id": "f1", "field": "Status", "key": "contains", "filterKey": "contains",
            "value": "todo", "isNegative": false, "type": "neutral", "columnType": "string"
        }"#;
        let spec: FilterSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.operator, FilterOperator::Contains);
        assert_eq!(spec.column_type, ColumnType::Text);
        assert_eq!(spec.combinator, Combinator::Neutral);

        let odd: FilterSpec = serde_json::from_str(
            r#"{"id":"f2","field":"Status","operator":"not","columnType":"text"}"#,
        )
        .unwrap();
        assert_eq!(odd.operator, FilterOperator::Unknown);
        assert_eq!(odd.value, None);
    }

    #[test]
    fn test_filter_list_combinators() {
        let mut list = FilterList::new();
        list.push(contains("f1", "a").with_combinator(Combinator::Or));
        list.push(contains("f2", "b").with_combinator(Combinator::And));
        list.push(contains("f3", "c").with_combinator(Combinator::Or));

        let combinators: Vec<Combinator> = list.as_slice().iter().map(|s| s.combinator).collect();
        assert_eq!(
            combinators,
            vec![Combinator::Neutral, Combinator::And, Combinator::And]
        );

        list.set_join(Combinator::Or);
        assert_eq!(list.join(), Some(Combinator::Or));
        assert!(list.as_slice()[1..].iter().all(|s| s.combinator == Combinator::Or));
    }

    #[test]
    fn test_filter_list_second_defaults_to_or() {
        let mut list = FilterList::new();
        list.push(contains("f1", "a"));
        list.push(contains("f2", "b"));
        assert_eq!(list.join(), Some(Combinator::Or));
    }

    #[test]
    fn test_filter_list_remove_first() {
        let mut list = FilterList::new();
        list.push(contains("f1", "a"));
        list.push(contains("f2", "b").with_combinator(Combinator::And));
        list.push(contains("f3", "c"));

        let removed = list.remove("f1").unwrap();
        assert_eq!(removed.id, "f1");
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].combinator, Combinator::Neutral);
        assert_eq!(list.as_slice()[1].combinator, Combinator::And);
        assert!(list.remove("missing").is_none());
    }
}
