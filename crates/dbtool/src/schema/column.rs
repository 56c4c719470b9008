use crate::value::Value;
use std::fmt;

/// Storage class emitted after the column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlType {
    #[default]
    Integer,
    Text,
    Float,
    Blob,
    Null,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
            SqlType::Float => "FLOAT",
            SqlType::Blob => "BLOB",
            SqlType::Null => "NULL",
        }
    }
}

/// One column of a `CREATE TABLE` statement.
///
/// Clauses are emitted in a fixed order regardless of call order:
/// `name TYPE [PRIMARY KEY] [AUTOINCREMENT] [UNIQUE] [DEFAULT x]
/// [REFERENCES t(c), ...] [CHECK (expr)] [NOT NULL]`.
///
/// The definition compiles once. After [`ColumnDefinition::build`] has
/// produced a string, later constraint calls no longer change it.
///
/// # Example
///
/// ```rust
/// use dbtool::schema::ColumnDefinition;
///
/// let mut id = ColumnDefinition::new("id").type_int().primary_key().not_null();
/// assert_eq!(id.build(), "id INTEGER PRIMARY KEY NOT NULL");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDefinition {
    name: String,
    sql_type: Option<SqlType>,
    primary_key: bool,
    auto_increment: bool,
    unique: bool,
    not_null: bool,
    default: Option<String>,
    check: Option<String>,
    references: Vec<String>,
    compiled: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    pub fn type_int(self) -> Self {
        self.sql_type(SqlType::Integer)
    }

    pub fn type_text(self) -> Self {
        self.sql_type(SqlType::Text)
    }

    pub fn type_float(self) -> Self {
        self.sql_type(SqlType::Float)
    }

    pub fn type_blob(self) -> Self {
        self.sql_type(SqlType::Blob)
    }

    /// Alias for [`ColumnDefinition::type_blob`].
    pub fn type_object(self) -> Self {
        self.type_blob()
    }

    pub fn type_null(self) -> Self {
        self.sql_type(SqlType::Null)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Should be combined with an `INTEGER PRIMARY KEY` column.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// `DEFAULT` rendered as a literal: text is quoted verbatim.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into().to_literal());
        self
    }

    /// Text default with embedded single quotes doubled.
    pub fn default_text_escaped(mut self, value: &str) -> Self {
        self.default = Some(format!("'{}'", value.replace('\'', "''")));
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Add a `table(columns)` reference. Repeated calls share one `REFERENCES`.
    pub fn foreign_key(mut self, table: &str, columns: &str) -> Self {
        self.references.push(format!("{}({})", table, columns));
        self
    }

    pub fn is_built(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compile the column fragment, or return the one compiled earlier.
    ///
    /// A column without a name compiles to an empty string and stays open.
    pub fn build(&mut self) -> &str {
        if self.compiled.is_none() && !self.name.is_empty() {
            self.compiled = Some(self.render());
        }
        self.compiled.as_deref().unwrap_or("")
    }

    fn render(&self) -> String {
        let mut parts: Vec<String> = vec![
            self.name.clone(),
            self.sql_type.unwrap_or_default().as_str().to_string(),
        ];
        if self.primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        if self.auto_increment {
            parts.push("AUTOINCREMENT".to_string());
        }
        if self.unique {
            parts.push("UNIQUE".to_string());
        }
        if let Some(default) = &self.default {
            parts.push(format!("DEFAULT {}", default));
        }
        if !self.references.is_empty() {
            parts.push(format!("REFERENCES {}", self.references.join(", ")));
        }
        if let Some(check) = &self.check {
            parts.push(format!("CHECK ({})", check));
        }
        if self.not_null {
            parts.push("NOT NULL".to_string());
        }
        parts.join(" ")
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.compiled.as_deref().unwrap_or(""))
    }
}
