//! Filter expression compiler.
//!
//! Turns user-supplied `(name, operator, values)` directives into the filter
//! clauses understood by the product search index: a field name, a comparison
//! operator, double-quoted string literals or bracketed lists, `AND`/`OR` and
//! parentheses. Each clause is independent; the index ANDs them together.
//!
//! # Example
//!
//! ```
//! use fabric_catalog::filter::{compile_filters, FilterDirective};
//!
//! let clauses = compile_filters(&[
//!     FilterDirective::new("bandwidth", "=", ["100"]),
//!     FilterDirective::new("provider", "IN", ["EQUINIX", "MEGAPORT"]),
//! ])
//! .unwrap();
//!
//! assert_eq!(
//!     clauses,
//!     vec![
//!         r#"bandwidth = "100""#.to_string(),
//!         r#"provider IN ["EQUINIX","MEGAPORT"]"#.to_string(),
//!     ]
//! );
//! ```
//!
//! # Transport routes
//!
//! The index has no "either direction" operator, so when both `location` and
//! `locationTo` are filtered the pair is rewritten into one clause that
//! matches a route stored in either direction:
//!
//! ```text
//! (location = "FR5" AND locationTo = "LD5") OR (locationTo = "FR5" AND location = "LD5")
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FilterError;

/// Field holding the origin of a route.
pub const LOCATION: &str = "location";

/// Field holding the destination of a route.
pub const LOCATION_TO: &str = "locationTo";

/// Comparison operators accepted in a filter directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    Above,
    /// `>=`
    AboveOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `IN`, any number of values.
    In,
    /// `TO`, an inclusive range of two values.
    To,
}

impl FilterOperator {
    /// Every operator, in the order they are advertised to users.
    pub const ALL: [FilterOperator; 8] = [
        Self::Equal,
        Self::NotEqual,
        Self::Above,
        Self::AboveOrEqual,
        Self::Less,
        Self::LessOrEqual,
        Self::In,
        Self::To,
    ];

    /// The operator as written in a directive and in a clause.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Above => ">",
            Self::AboveOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::In => "IN",
            Self::To => "TO",
        }
    }

    /// Look up an operator by its symbol. Matching is case-sensitive.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == symbol)
    }

    /// Parse the operator of the directive on `name`.
    pub fn parse_for(name: &str, symbol: &str) -> Result<Self, FilterError> {
        Self::from_symbol(symbol).ok_or_else(|| FilterError::WrongOperator {
            name: name.to_string(),
            operator: symbol.to_string(),
        })
    }

    /// Comma separated list of the accepted operators, each quoted.
    pub fn expected() -> String {
        Self::ALL
            .iter()
            .map(|op| format!("{:?}", op.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(name, operator, values)` filter as written in configuration.
///
/// The operator is kept as written so that an unknown operator is reported
/// when the directive is compiled rather than when it is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterDirective {
    /// Field to filter on. Casing is preserved.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// One of the symbols of [`FilterOperator`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub operator: String,
    /// Operand values; how many are allowed depends on the operator.
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<String>,
}

impl FilterDirective {
    /// Create a directive.
    pub fn new<I, S>(name: impl Into<String>, operator: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            operator: operator.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The parsed operator, or [`FilterError::WrongOperator`].
    pub fn operator(&self) -> Result<FilterOperator, FilterError> {
        FilterOperator::parse_for(&self.name, &self.operator)
    }

    /// Validate the directive and render it as a single clause.
    pub fn clause(&self) -> Result<String, FilterError> {
        let operator = self.operator()?;
        match (operator, self.values.as_slice()) {
            (FilterOperator::In, values) => Ok(format!(
                "{} IN [{}]",
                self.name,
                values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",")
            )),
            (FilterOperator::To, [from, to]) => {
                Ok(format!("{} {} TO {}", self.name, quote(from), quote(to)))
            },
            (FilterOperator::To, values) => Err(FilterError::OnlyTwoValues {
                name: self.name.clone(),
                got: values.len(),
            }),
            (operator, [value]) => Ok(format!("{} {} {}", self.name, operator, quote(value))),
            (_, values) => Err(FilterError::OnlyOneValue {
                name: self.name.clone(),
                got: values.len(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Pending(FilterDirective),
    Built(String),
}

/// Directives keyed by field name, in first-seen order.
///
/// Inserting a directive on a name already present replaces the earlier one
/// in its original slot. The set is consumed by [`FilterSet::compile`].
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    entries: Vec<(String, Entry)>,
}

impl FilterSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive, replacing any earlier directive on the same name.
    pub fn insert(&mut self, directive: FilterDirective) {
        match self.position(&directive.name) {
            Some(idx) => self.entries[idx].1 = Entry::Pending(directive),
            None => self
                .entries
                .push((directive.name.clone(), Entry::Pending(directive))),
        }
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no directive was inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every directive and render the clause list.
    ///
    /// Fails on the first invalid directive; nothing is returned in that case.
    pub fn compile(mut self) -> Result<Vec<String>, FilterError> {
        self.merge_locations()?;
        self.entries
            .into_iter()
            .map(|(_, entry)| match entry {
                Entry::Pending(directive) => directive.clause(),
                Entry::Built(clause) => Ok(clause),
            })
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key == name)
    }

    fn pending(&self, idx: usize) -> Option<&FilterDirective> {
        match &self.entries[idx].1 {
            Entry::Pending(directive) => Some(directive),
            Entry::Built(_) => None,
        }
    }

    // Collapses `location` + `locationTo` into one symmetric clause kept in
    // the `location` slot.
    fn merge_locations(&mut self) -> Result<(), FilterError> {
        let (Some(from_idx), Some(to_idx)) = (self.position(LOCATION), self.position(LOCATION_TO))
        else {
            return Ok(());
        };
        let (Some(from), Some(to)) = (self.pending(from_idx), self.pending(to_idx)) else {
            return Ok(());
        };

        from.clause()?;
        to.clause()?;

        let clause = combine_location_pairs(&from.values, &to.values);
        self.entries[from_idx].1 = Entry::Built(clause);
        self.entries.remove(to_idx);
        Ok(())
    }
}

impl FromIterator<FilterDirective> for FilterSet {
    fn from_iter<T: IntoIterator<Item = FilterDirective>>(iter: T) -> Self {
        let mut set = Self::new();
        for directive in iter {
            set.insert(directive);
        }
        set
    }
}

impl Extend<FilterDirective> for FilterSet {
    fn extend<T: IntoIterator<Item = FilterDirective>>(&mut self, iter: T) {
        for directive in iter {
            self.insert(directive);
        }
    }
}

/// Compile filter directives into search-index filter clauses.
///
/// See the [module documentation](self) for the clause grammar.
pub fn compile_filters(directives: &[FilterDirective]) -> Result<Vec<String>, FilterError> {
    let clauses = directives.iter().cloned().collect::<FilterSet>().compile()?;
    tracing::trace!(directives = directives.len(), clauses = clauses.len(), "compiled filters");
    Ok(clauses)
}

/// Build the clause matching every `(from, to)` route in either direction.
///
/// Pairs are taken outer loop over `locations`, inner loop over
/// `locations_to`. A self pair yields a single sub-clause. With no pair at
/// all the clause is `location IN []` and matches nothing, rather than
/// failing as an empty single-value filter.
pub fn combine_location_pairs<S: AsRef<str>>(locations: &[S], locations_to: &[S]) -> String {
    let mut parts = Vec::new();
    for from in locations {
        let from = from.as_ref();
        for to in locations_to {
            let to = to.as_ref();
            parts.push(format!(
                "({LOCATION} = {} AND {LOCATION_TO} = {})",
                quote(from),
                quote(to)
            ));
            if from != to {
                parts.push(format!(
                    "({LOCATION_TO} = {} AND {LOCATION} = {})",
                    quote(from),
                    quote(to)
                ));
            }
        }
    }

    if parts.is_empty() {
        return format!("{LOCATION} IN []");
    }
    parts.join(" OR ")
}

/// Render a string literal, escaping backslashes and double quotes.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Treat an explicit `null` like a missing attribute.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(name: &str, operator: &str, values: &[&str]) -> FilterDirective {
        FilterDirective::new(name, operator, values.iter().copied())
    }

    #[test]
    fn test_compile_filters_table() {
        struct Case {
            name: &'static str,
            filters: Vec<FilterDirective>,
            expect: Result<Vec<&'static str>, FilterError>,
        }

        let cases = vec![
            Case {
                name: "equal",
                filters: vec![directive("bandwidth", "=", &["100"])],
                expect: Ok(vec![r#"bandwidth = "100""#]),
            },
            Case {
                name: "equal must fail with two values",
                filters: vec![directive("bandwidth", "=", &["100", "200"])],
                expect: Err(FilterError::OnlyOneValue {
                    name: "bandwidth".to_string(),
                    got: 2,
                }),
            },
            Case {
                name: "equal must fail without values",
                filters: vec![directive("bandwidth", "=", &[])],
                expect: Err(FilterError::OnlyOneValue {
                    name: "bandwidth".to_string(),
                    got: 0,
                }),
            },
            Case {
                name: "range",
                filters: vec![directive("bandwidth", "TO", &["100", "200"])],
                expect: Ok(vec![r#"bandwidth "100" TO "200""#]),
            },
            Case {
                name: "range must fail with one value",
                filters: vec![directive("bandwidth", "TO", &["100"])],
                expect: Err(FilterError::OnlyTwoValues {
                    name: "bandwidth".to_string(),
                    got: 1,
                }),
            },
            Case {
                name: "in",
                filters: vec![directive("location", "IN", &["EQUINIX FR5", "EQUINIX LD5"])],
                expect: Ok(vec![r#"location IN ["EQUINIX FR5","EQUINIX LD5"]"#]),
            },
            Case {
                name: "in empty list",
                filters: vec![directive("location", "IN", &[])],
                expect: Ok(vec!["location IN []"]),
            },
            Case {
                name: "wrong operator",
                filters: vec![directive("location", "plouf", &[])],
                expect: Err(FilterError::WrongOperator {
                    name: "location".to_string(),
                    operator: "plouf".to_string(),
                }),
            },
            Case {
                name: "transport junction",
                filters: vec![
                    directive("location", "=", &["EQUINIX FR5"]),
                    directive("locationTo", "=", &["EQUINIX LD5"]),
                ],
                expect: Ok(vec![
                    r#"(location = "EQUINIX FR5" AND locationTo = "EQUINIX LD5") OR (locationTo = "EQUINIX FR5" AND location = "EQUINIX LD5")"#,
                ]),
            },
            Case {
                name: "transport junction different operators",
                filters: vec![
                    directive("location", "IN", &["EQUINIX FR5"]),
                    directive("locationTo", "=", &["EQUINIX LD5"]),
                ],
                expect: Ok(vec![
                    r#"(location = "EQUINIX FR5" AND locationTo = "EQUINIX LD5") OR (locationTo = "EQUINIX FR5" AND location = "EQUINIX LD5")"#,
                ]),
            },
            Case {
                name: "transport junction with multiple locations bad operator",
                filters: vec![
                    directive("location", "IN", &["EQUINIX FR5", "EQUINIX AM2", "EQUINIX SG1"]),
                    directive("locationTo", "=", &["EQUINIX AM2", "EQUINIX PA3"]),
                ],
                expect: Err(FilterError::OnlyOneValue {
                    name: "locationTo".to_string(),
                    got: 2,
                }),
            },
            Case {
                name: "transport junction with multiple locations",
                filters: vec![
                    directive("location", "IN", &["EQUINIX FR5", "EQUINIX AM2", "EQUINIX SG1"]),
                    directive("locationTo", "IN", &["EQUINIX AM2", "EQUINIX PA3"]),
                ],
                expect: Ok(vec![concat!(
                    r#"(location = "EQUINIX FR5" AND locationTo = "EQUINIX AM2") OR "#,
                    r#"(locationTo = "EQUINIX FR5" AND location = "EQUINIX AM2") OR "#,
                    r#"(location = "EQUINIX FR5" AND locationTo = "EQUINIX PA3") OR "#,
                    r#"(locationTo = "EQUINIX FR5" AND location = "EQUINIX PA3") OR "#,
                    r#"(location = "EQUINIX AM2" AND locationTo = "EQUINIX AM2") OR "#,
                    r#"(location = "EQUINIX AM2" AND locationTo = "EQUINIX PA3") OR "#,
                    r#"(locationTo = "EQUINIX AM2" AND location = "EQUINIX PA3") OR "#,
                    r#"(location = "EQUINIX SG1" AND locationTo = "EQUINIX AM2") OR "#,
                    r#"(locationTo = "EQUINIX SG1" AND location = "EQUINIX AM2") OR "#,
                    r#"(location = "EQUINIX SG1" AND locationTo = "EQUINIX PA3") OR "#,
                    r#"(locationTo = "EQUINIX SG1" AND location = "EQUINIX PA3")"#,
                )]),
            },
        ];

        for case in cases {
            let got = compile_filters(&case.filters);
            let expect = case
                .expect
                .map(|clauses| clauses.into_iter().map(String::from).collect::<Vec<_>>());
            assert_eq!(got, expect, "case: {}", case.name);
        }
    }

    #[test]
    fn test_single_value_operators() {
        for op in ["=", "!=", ">", ">=", "<", "<="] {
            let clauses = compile_filters(&[directive("priceMrc", op, &["42"])]).unwrap();
            assert_eq!(clauses, vec![format!(r#"priceMrc {} "42""#, op)]);

            let err = compile_filters(&[directive("priceMrc", op, &["1", "2", "3"])]).unwrap_err();
            assert!(matches!(err, FilterError::OnlyOneValue { got: 3, .. }));
        }
    }

    #[test]
    fn test_wrong_operator_checked_before_arity() {
        for values in [&[][..], &["a"][..], &["a", "b"][..]] {
            let err = compile_filters(&[directive("x", "in", values)]).unwrap_err();
            assert!(matches!(err, FilterError::WrongOperator { .. }));
        }
    }

    #[test]
    fn test_name_casing_preserved() {
        let clauses = compile_filters(&[directive("cspName", "=", &["AWS"])]).unwrap();
        assert_eq!(clauses, vec![r#"cspName = "AWS""#]);
    }

    #[test]
    fn test_values_are_escaped() {
        let clauses = compile_filters(&[directive("sku", "=", &[r#"a"b\c"#])]).unwrap();
        assert_eq!(clauses, vec![r#"sku = "a\"b\\c""#]);
    }

    #[test]
    fn test_later_directive_replaces_earlier_in_place() {
        let clauses = compile_filters(&[
            directive("bandwidth", "=", &["100"]),
            directive("provider", "=", &["EQUINIX"]),
            directive("bandwidth", "IN", &["100", "1000"]),
        ])
        .unwrap();
        assert_eq!(
            clauses,
            vec![
                r#"bandwidth IN ["100","1000"]"#.to_string(),
                r#"provider = "EQUINIX""#.to_string(),
            ]
        );
    }

    #[test]
    fn test_replaced_directive_is_not_validated() {
        let clauses = compile_filters(&[
            directive("bandwidth", "plouf", &[]),
            directive("bandwidth", "=", &["100"]),
        ])
        .unwrap();
        assert_eq!(clauses, vec![r#"bandwidth = "100""#]);
    }

    #[test]
    fn test_error_discards_everything() {
        let result = compile_filters(&[
            directive("provider", "=", &["EQUINIX"]),
            directive("bandwidth", "TO", &["1"]),
        ]);
        assert!(matches!(result, Err(FilterError::OnlyTwoValues { .. })));
    }

    #[test]
    fn test_location_clause_takes_location_slot() {
        let clauses = compile_filters(&[
            directive("bandwidth", "=", &["100"]),
            directive("locationTo", "=", &["LD5"]),
            directive("provider", "=", &["EQUINIX"]),
            directive("location", "=", &["FR5"]),
        ])
        .unwrap();
        assert_eq!(
            clauses,
            vec![
                r#"bandwidth = "100""#.to_string(),
                r#"provider = "EQUINIX""#.to_string(),
                r#"(location = "FR5" AND locationTo = "LD5") OR (locationTo = "FR5" AND location = "LD5")"#
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_location_self_pair_not_mirrored() {
        let clauses = compile_filters(&[
            directive("location", "=", &["FR5"]),
            directive("locationTo", "=", &["FR5"]),
        ])
        .unwrap();
        assert_eq!(clauses, vec![r#"(location = "FR5" AND locationTo = "FR5")"#]);
    }

    #[test]
    fn test_location_pair_is_symmetric() {
        fn sub_clauses(clause: &str) -> std::collections::BTreeSet<String> {
            clause.split(" OR ").map(String::from).collect()
        }

        let forward = compile_filters(&[
            directive("location", "IN", &["A", "B"]),
            directive("locationTo", "IN", &["C"]),
        ])
        .unwrap();
        let backward = compile_filters(&[
            directive("location", "IN", &["C"]),
            directive("locationTo", "IN", &["A", "B"]),
        ])
        .unwrap();

        // Each route shows up once per direction, whichever side it was given on.
        let normalize = |set: std::collections::BTreeSet<String>| {
            set.into_iter()
                .map(|s| {
                    let mut parts: Vec<_> = s
                        .trim_matches(|c| c == '(' || c == ')')
                        .split(" AND ")
                        .map(String::from)
                        .collect();
                    parts.sort();
                    parts.join(" AND ")
                })
                .collect::<std::collections::BTreeSet<_>>()
        };
        assert_eq!(
            normalize(sub_clauses(&forward[0])),
            normalize(sub_clauses(&backward[0]))
        );
    }

    #[test]
    fn test_location_pair_validates_both_sides() {
        let err = compile_filters(&[
            directive("location", "TO", &["FR5"]),
            directive("locationTo", "=", &["LD5"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::OnlyTwoValues {
                name: "location".to_string(),
                got: 1
            }
        );
    }

    #[test]
    fn test_location_pair_with_empty_side_matches_nothing() {
        let clauses = compile_filters(&[
            directive("location", "IN", &[]),
            directive("locationTo", "IN", &["LD5"]),
        ])
        .unwrap();
        assert_eq!(clauses, vec!["location IN []"]);
    }

    #[test]
    fn test_reserved_names_are_case_sensitive() {
        let clauses = compile_filters(&[
            directive("Location", "=", &["FR5"]),
            directive("locationTo", "=", &["LD5"]),
        ])
        .unwrap();
        assert_eq!(
            clauses,
            vec![
                r#"Location = "FR5""#.to_string(),
                r#"locationTo = "LD5""#.to_string()
            ]
        );
    }

    #[test]
    fn test_only_location_is_left_alone() {
        let clauses = compile_filters(&[directive("location", "=", &["FR5"])]).unwrap();
        assert_eq!(clauses, vec![r#"location = "FR5""#]);
    }

    #[test]
    fn test_operator_lookup() {
        assert_eq!(FilterOperator::from_symbol(">="), Some(FilterOperator::AboveOrEqual));
        assert_eq!(FilterOperator::from_symbol("to"), None);
        assert_eq!(FilterOperator::To.to_string(), "TO");
        assert_eq!(
            FilterOperator::expected(),
            r#""=", "!=", ">", ">=", "<", "<=", "IN", "TO""#
        );
    }

    #[test]
    fn test_directive_deserialize_with_nulls() {
        let directive: FilterDirective =
            serde_json::from_value(serde_json::json!({"name": "location", "operator": "IN", "values": null}))
                .unwrap();
        assert!(directive.values.is_empty());
        assert_eq!(directive.clause().unwrap(), "location IN []");
    }

    #[test]
    fn test_filter_set_len() {
        let set: FilterSet = vec![
            directive("a", "=", &["1"]),
            directive("a", "=", &["2"]),
            directive("b", "=", &["3"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert!(FilterSet::new().is_empty());
    }
}
