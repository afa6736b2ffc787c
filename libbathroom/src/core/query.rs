//! utilities related to database queries
//!
use serde::{Deserialize, Serialize};
use std::{ops::Deref, sync::Arc};

pub mod filter {
    use super::DynFilterPart;

    /// An operator for combining filter parts to form a more complex filter expression
    #[derive(Clone)]
    pub enum Op {
        Or,
        And,
    }

    #[derive(Clone)]
    /// An object that allows you easily build compound filters that can be applied to SQL queries
    pub struct CompoundFilterBuilder {
        pub(crate) top: CompoundFilter,
    }

    pub fn and() -> CompoundFilterBuilder {
        CompoundFilterBuilder::new(Op::And)
    }

    pub fn or() -> CompoundFilterBuilder {
        CompoundFilterBuilder::new(Op::Or)
    }

    impl CompoundFilterBuilder {
        /// Create a new [CompoundFilterBuilder] object that will combine all filter
        /// expressions using the given operator
        pub fn new(op: Op) -> Self {
            Self {
                top: CompoundFilter::new(op),
            }
        }

        /// Add a new filter expression to this compound filter. It will be combined
        /// with all existing filter expressions using the operator that was specified in
        /// the constructor.
        pub fn push<F: Into<DynFilterPart>>(mut self, filter: F) -> Self {
            self.top.add_filter(filter.into());
            self
        }

        /// Generate a new [CompoundFilter] object from this builder object
        pub fn build(self) -> DynFilterPart {
            self.top.into()
        }
    }

    /// A Trait implemented by anything that can be a filter. It could be a single field or a
    /// multi-level compound filter condition.
    pub trait FilterPart: Send {
        /// convert the given filter part to SQL syntax and add it to the given [sqlx::QueryBuilder] object
        fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>);
    }

    #[derive(Clone)]
    /// An object that represents one or more filter conditions that are combined by a single logical
    /// operator ([Op]). Multiple compound filters can be combined together into larger filter
    /// conditions
    pub struct CompoundFilter {
        pub(crate) conditions: Vec<DynFilterPart>,
        pub(crate) op: Op,
    }

    impl CompoundFilter {
        /// Create a new compound filter object
        pub fn new(op: Op) -> Self {
            Self {
                conditions: Default::default(),
                op,
            }
        }

        /// Create an builder object that is used for building compound filters
        pub fn builder(op: Op) -> CompoundFilterBuilder {
            CompoundFilterBuilder::new(op)
        }

        /// Add a new filter expression to the current filter. It will be combined
        /// with the operator [Op] that was specified in [CompoundFilter::new()]
        pub fn add_filter(&mut self, filter: DynFilterPart) {
            self.conditions.push(filter);
        }
    }

    impl FilterPart for CompoundFilter {
        fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
            if self.conditions.is_empty() {
                builder.push("TRUE");
                return;
            }

            let mut first = true;
            builder.push(" (");
            let separator = match self.op {
                Op::And => " AND ",
                Op::Or => " OR ",
            };

            for cond in &self.conditions {
                if first {
                    first = false;
                } else {
                    builder.push(separator);
                }
                cond.add_to_query(builder);
            }
            builder.push(")");
        }
    }

    #[derive(Clone, Debug)]
    /// An object representing the comparison operator that is used in a filter expression
    pub enum Cmp {
        Equal,
        NotEqual,
        Like,
    }

    impl std::fmt::Display for Cmp {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            match self {
                Cmp::Equal => write!(f, " IS "),
                Cmp::NotEqual => write!(f, " IS NOT "),
                Cmp::Like => write!(f, " LIKE "),
            }
        }
    }

    impl Cmp {
        /// Wraps a `LIKE` search fragment in wildcards, leaves other values untouched
        pub fn pattern(&self, frag: &str) -> String {
            match self {
                Cmp::Like => format!("%{frag}%"),
                _ => frag.to_string(),
            }
        }
    }
}

/// A type for specifying the sort order of an SQL query
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    #[default]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl ToSql for SortOrder {
    fn to_sql(&self) -> String {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
        .into()
    }
}

/// a trait that generates an sql respresentation of the implementing type
pub trait ToSql {
    fn to_sql(&self) -> String;
}

/// A type for specifying how the results from an SQL query should be sorted
#[derive(Clone, Debug)]
pub struct SortSpec<T: ToSql> {
    /// The field that the sql query should be sorted on. The type must be
    /// convertible to an SQL representation via [ToSql]
    pub field: T,
    /// The direction to sort results
    pub order: SortOrder,
}

impl<T: ToSql> ToSql for SortSpec<T> {
    fn to_sql(&self) -> String {
        format!("{} {}", self.field.to_sql(), self.order.to_sql())
    }
}

impl<T: ToSql> SortSpec<T> {
    pub fn new(field: T, order: SortOrder) -> Self {
        Self { field, order }
    }
}

/// A type representing an ordered list of multiple sort specifications
pub struct SortSpecs<T: ToSql>(pub Vec<SortSpec<T>>);

impl<T: ToSql> From<SortSpec<T>> for SortSpecs<T> {
    fn from(value: SortSpec<T>) -> Self {
        SortSpecs(vec![value])
    }
}

impl<T: ToSql> ToSql for SortSpecs<T> {
    fn to_sql(&self) -> String {
        "ORDER BY ".to_string()
            + &self
                .0
                .iter()
                .map(ToSql::to_sql)
                .collect::<Vec<String>>()
                .join(", ")
    }
}

impl<T: ToSql> From<T> for SortSpecs<T> {
    fn from(value: T) -> Self {
        SortSpecs(vec![SortSpec {
            field: value,
            order: SortOrder::default(),
        }])
    }
}

#[derive(Clone)]
pub struct DynFilterPart(Arc<dyn filter::FilterPart + Sync>);

impl Deref for DynFilterPart {
    type Target = Arc<dyn filter::FilterPart + Sync>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<F> From<F> for DynFilterPart
where
    F: filter::FilterPart + Send + Sync + 'static,
{
    fn from(value: F) -> Self {
        DynFilterPart(Arc::new(value))
    }
}
