//! The checklist of schema pieces the application expects.

/// Append-only record of applied checks. Informational: the live schema,
/// not this table, decides what still needs applying.
pub const RECONCILIATION_LEDGER_TABLE: &str = "schema_reconciliations";

/// One additive schema requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    /// `column` must exist on `table`; added with `ALTER TABLE ... ADD COLUMN`.
    AddColumn {
        /// Target table.
        table: String,
        /// Column name.
        column: String,
        /// Column type and constraints, e.g. `INTEGER NOT NULL DEFAULT 0`.
        definition: String,
    },
    /// `table` must exist; created with `statement`, which should be a
    /// `CREATE TABLE IF NOT EXISTS`.
    CreateTable {
        /// Table name.
        table: String,
        /// Full create statement.
        statement: String,
    },
}

impl SchemaCheck {
    /// An add-column check.
    #[must_use]
    pub fn add_column(
        table: impl Into<String>,
        column: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::AddColumn {
            table: table.into(),
            column: column.into(),
            definition: definition.into(),
        }
    }

    /// A create-table check.
    #[must_use]
    pub fn create_table(table: impl Into<String>, statement: impl Into<String>) -> Self {
        Self::CreateTable {
            table: table.into(),
            statement: statement.into(),
        }
    }

    /// Stable identifier: `table.column` or `table`.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::AddColumn { table, column, .. } => format!("{table}.{column}"),
            Self::CreateTable { table, .. } => table.clone(),
        }
    }

    /// The statement that applies this check.
    #[must_use]
    pub fn statement(&self) -> String {
        match self {
            Self::AddColumn {
                table,
                column,
                definition,
            } => format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"),
            Self::CreateTable { statement, .. } => statement.clone(),
        }
    }
}

/// Everything the current application version expects, in apply order.
///
/// Checks are independent of each other. The `users` table itself belongs
/// to user management and is never created here.
#[must_use]
pub fn expected_checks() -> Vec<SchemaCheck> {
    vec![
        SchemaCheck::create_table(
            RECONCILIATION_LEDGER_TABLE,
            "CREATE TABLE IF NOT EXISTS schema_reconciliations (
                check_id TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            )",
        ),
        // Progression
        SchemaCheck::add_column("users", "experience_points", "INTEGER NOT NULL DEFAULT 0"),
        SchemaCheck::add_column("users", "level", "INTEGER NOT NULL DEFAULT 1"),
        SchemaCheck::add_column("users", "title", "TEXT"),
        SchemaCheck::add_column("users", "level_updated_at", "INTEGER"),
        // Discord chat bridge
        SchemaCheck::create_table(
            "discord_messages",
            "CREATE TABLE IF NOT EXISTS discord_messages (
                id TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        ),
        SchemaCheck::add_column("discord_messages", "edited_at", "INTEGER"),
        // Group posts
        SchemaCheck::create_table(
            "group_posts",
            "CREATE TABLE IF NOT EXISTS group_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        ),
        SchemaCheck::add_column("group_posts", "pinned", "INTEGER NOT NULL DEFAULT 0"),
        // Donations
        SchemaCheck::create_table(
            "donations",
            "CREATE TABLE IF NOT EXISTS donations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                amount_cents INTEGER NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                provider_reference TEXT,
                created_at INTEGER NOT NULL
            )",
        ),
    ]
}
