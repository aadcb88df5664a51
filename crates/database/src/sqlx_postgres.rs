use sqlx::{FromRow, Postgres, Error as SqlxError, postgres::PgArguments, Arguments, Executor};

/// Trait to define the schema of a database object for PostgreSQL.
pub trait SqlxSchema: Send + Sync + Unpin + Clone + std::fmt::Debug {
    /// The type of the primary key for this database object.
    type Id: Send + Sync + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Clone + 'static;

    /// The intermediate type that implements FromRow, used for fetching from the database.
    type Row: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin;

    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str;
    const COLUMNS: &'static [&'static str];
    const INDEXES_SQL: &'static [&'static str];

    /// Converts the intermediate Row type to the Self type.
    fn from_row(row: Self::Row) -> Self;

    fn create_table_sql() -> String;

    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS \"{}\" CASCADE", Self::TABLE_NAME)
    }

    fn column_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `INSERT INTO t (c1, .., cn) VALUES ($1, .., $n) RETURNING c1, .., cn`, binding
    /// values in `COLUMNS` order.
    fn insert_sql() -> String {
        let placeholders = (1..=Self::COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING {}",
            Self::TABLE_NAME, Self::column_list(), placeholders, Self::column_list()
        )
    }

    fn select_by_id_sql() -> String {
        format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = $1",
            Self::column_list(), Self::TABLE_NAME, Self::ID_COLUMN_NAME
        )
    }
}

/// Trait for the create/read half of CRUD. Rows in this system are never deleted, and
/// updates go through narrow single-column statements on the owning type.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema + Sized {
    /// Binds the struct fields to an insert query, in `COLUMNS` order.
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Creates a new record in the database.
    async fn create<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::insert_sql();
        self.bind_insert(sqlx::query_as::<_, Self::Row>(&sql))
            .fetch_one(executor)
            .await
            .map(Self::from_row)
    }

    /// Finds a record by its primary key.
    async fn find_by_id<'e, E>(id: Self::Id, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::select_by_id_sql();
        sqlx::query_as::<_, Self::Row>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map(|row| row.map(Self::from_row))
    }
}

/// Specifies the direction for ordering query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

// --- Filtering Structures and Trait ---

/// A trait to allow for boxing of different types that can be encoded as sqlx arguments.
pub trait AsSqlxArg: Send + Sync {
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError>;
}

impl<T> AsSqlxArg for T
where
    T: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError> {
        args.add(self.clone()).map_err(SqlxError::Encode)
    }
}

/// How a single condition is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// `"column" <operator> $n`
    Compare(&'static str),
    /// `$n = ANY("column")` for array columns.
    ArrayContains,
    /// `"column" = ANY($n)` where the bound value is an array.
    InList,
}

/// Represents a single filter condition for a database query.
pub struct FilterCondition {
    pub column: &'static str,
    pub kind: FilterKind,
    pub value: Box<dyn AsSqlxArg>,
}

impl FilterCondition {
    fn render(&self, placeholder: usize) -> String {
        match self.kind {
            FilterKind::Compare(operator) => format!("\"{}\" {} ${}", self.column, operator, placeholder),
            FilterKind::ArrayContains => format!("${} = ANY(\"{}\")", placeholder, self.column),
            FilterKind::InList => format!("\"{}\" = ANY(${})", self.column, placeholder),
        }
    }
}

/// Represents the complete criteria for a filtered database query.
///
/// Top-level conditions are joined with `AND`. Each entry of `any_of` is a group whose
/// members are joined with `OR` before being `AND`ed with the rest.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterCondition>,
    pub any_of: Vec<Vec<FilterCondition>>,
    pub order_by: Vec<(&'static str, OrderDirection)>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_valued_filter<V>(mut self, column: &'static str, operator: &'static str, value: V) -> Self
    where
        V: for<'a> ::sqlx::Encode<'a, Postgres> + ::sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterCondition {
            column,
            kind: FilterKind::Compare(operator),
            value: Box::new(value),
        });
        self
    }

    pub fn add_in_list<V>(mut self, column: &'static str, values: Vec<V>) -> Self
    where
        Vec<V>: for<'a> ::sqlx::Encode<'a, Postgres> + ::sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterCondition {
            column,
            kind: FilterKind::InList,
            value: Box::new(values),
        });
        self
    }

    /// Adds an `OR` group. Empty groups are ignored.
    pub fn add_any_of(mut self, group: Vec<FilterCondition>) -> Self {
        if !group.is_empty() {
            self.any_of.push(group);
        }
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    /// Renders the `WHERE .. ORDER BY ..` tail and fills `arguments`.
    pub fn render(&self, arguments: &mut PgArguments) -> Result<String, SqlxError> {
        let mut placeholder_idx = 1;
        let mut parts: Vec<String> = Vec::new();
        let mut where_clauses: Vec<String> = Vec::new();

        for condition in &self.conditions {
            condition.value.add_to_args(arguments)?;
            where_clauses.push(condition.render(placeholder_idx));
            placeholder_idx += 1;
        }

        for group in &self.any_of {
            let mut alternatives = Vec::with_capacity(group.len());
            for condition in group {
                condition.value.add_to_args(arguments)?;
                alternatives.push(condition.render(placeholder_idx));
                placeholder_idx += 1;
            }
            where_clauses.push(format!("({})", alternatives.join(" OR ")));
        }

        if !where_clauses.is_empty() {
            parts.push(format!("WHERE {}", where_clauses.join(" AND ")));
        }

        if !self.order_by.is_empty() {
            let order_clauses: Vec<String> = self.order_by
                .iter()
                .map(|&(col, dir)| format!("\"{}\" {}", col, dir.as_sql()))
                .collect();
            parts.push(format!("ORDER BY {}", order_clauses.join(", ")));
        }

        Ok(parts.join(" "))
    }
}

/// Builds a standalone condition for [`QueryCriteria::add_any_of`].
pub fn condition<V>(column: &'static str, kind: FilterKind, value: V) -> FilterCondition
where
    V: for<'a> ::sqlx::Encode<'a, Postgres> + ::sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    FilterCondition { column, kind, value: Box::new(value) }
}

/// Trait for finding records based on dynamic filter criteria.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema + Sized {
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let mut arguments = PgArguments::default();
        let tail = criteria.render(&mut arguments)?;
        let sql = format!("SELECT {} FROM \"{}\" {}", Self::column_list(), Self::TABLE_NAME, tail);

        sqlx::query_as_with::<_, Self::Row, _>(&sql, arguments)
            .fetch_all(executor)
            .await
            .map(|rows| rows.into_iter().map(Self::from_row).collect())
    }
}

impl<T: SqlxSchema> SqlxFilterQuery for T {}
