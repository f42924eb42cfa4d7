/// Referential action for `ON UPDATE` / `ON DELETE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
}

impl ReferenceAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferenceAction::NoAction => "NO ACTION",
            ReferenceAction::Restrict => "RESTRICT",
            ReferenceAction::Cascade => "CASCADE",
        }
    }
}

/// A foreign key, configured by chaining:
///
/// ```ignore
/// t.foreign("genre_id")
///     .references("id")
///     .on("genres")
///     .on_delete(ReferenceAction::Cascade);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub(crate) column: String,
    pub(crate) table: String,
    pub(crate) target: String,
    pub(crate) on_update: ReferenceAction,
    pub(crate) on_delete: ReferenceAction,
}

impl Reference {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: String::new(),
            target: String::new(),
            on_update: ReferenceAction::NoAction,
            on_delete: ReferenceAction::NoAction,
        }
    }

    /// Referenced column.
    pub fn references(&mut self, column: impl Into<String>) -> &mut Self {
        self.target = column.into();
        self
    }

    /// Referenced table.
    pub fn on(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self
    }

    pub fn on_update(&mut self, action: ReferenceAction) -> &mut Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(&mut self, action: ReferenceAction) -> &mut Self {
        self.on_delete = action;
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}
