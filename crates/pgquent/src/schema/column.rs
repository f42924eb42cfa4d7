use crate::value::Value;

/// Logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Numeric,
    Real,
    Double,
    SmallSerial,
    Serial,
    BigSerial,
    Varchar,
    Text,
    Uuid,
    Json,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampTz,
}

impl DataType {
    pub fn as_sql(self) -> &'static str {
        match self {
            DataType::SmallInt => "SMALLINT",
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Decimal => "DECIMAL",
            DataType::Numeric => "NUMERIC",
            DataType::Real => "REAL",
            DataType::Double => "DOUBLE PRECISION",
            DataType::SmallSerial => "SMALLSERIAL",
            DataType::Serial => "SERIAL",
            DataType::BigSerial => "BIGSERIAL",
            DataType::Varchar => "VARCHAR",
            DataType::Text => "TEXT",
            DataType::Uuid => "UUID",
            DataType::Json => "JSON",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::TimestampTz => "TIMESTAMPTZ",
        }
    }

    /// Serial counterpart of an integer type.
    pub fn serial(self) -> DataType {
        match self {
            DataType::SmallInt | DataType::SmallSerial => DataType::SmallSerial,
            DataType::BigInt | DataType::BigSerial => DataType::BigSerial,
            _ => DataType::Serial,
        }
    }

    pub fn is_serial(self) -> bool {
        matches!(
            self,
            DataType::SmallSerial | DataType::Serial | DataType::BigSerial
        )
    }
}

/// A column declared on a [`Schema`](super::Schema).
///
/// Returned by the schema's type methods for chaining:
///
/// ```ignore
/// t.string("email").unique().default_value("nobody@example.com");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) nullable: bool,
    pub(crate) unique: bool,
    pub(crate) primary_key: bool,
    pub(crate) default: Option<Value>,
    pub(crate) modified: bool,
    pub(crate) previous_name: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            unique: false,
            primary_key: false,
            default: None,
            modified: false,
            previous_name: None,
        }
    }

    pub(crate) fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        let mut col = Self::new(to, DataType::Text);
        col.previous_name = Some(from.into());
        col
    }

    /// Mark as primary key; implies `UNIQUE NOT NULL`.
    pub fn primary_key(&mut self) -> &mut Self {
        self.primary_key = true;
        self.unique = true;
        self.nullable = false;
        self
    }

    /// Mark as unique; unique columns are also `NOT NULL`.
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self.nullable = false;
        self
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = false;
        self
    }

    pub fn default_value(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    /// Switch to the serial variant of the column type and make it the primary key.
    pub fn auto_increment(&mut self) -> &mut Self {
        self.data_type = self.data_type.serial();
        self.primary_key()
    }

    /// Mark as a type change of an existing column rather than an added column.
    pub fn change(&mut self) -> &mut Self {
        self.modified = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn previous_name(&self) -> Option<&str> {
        self.previous_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_nullable_by_default() {
        let col = Column::new("title", DataType::Varchar);
        assert!(col.is_nullable());
        assert!(!col.is_unique());
        assert!(!col.is_primary_key());
        assert!(col.default().is_none());
    }

    #[test]
    fn primary_key_implies_unique_not_null() {
        let mut col = Column::new("id", DataType::Integer);
        col.primary_key();
        assert!(col.is_primary_key() && col.is_unique() && !col.is_nullable());
    }

    #[test]
    fn auto_increment_picks_matching_serial() {
        let mut small = Column::new("a", DataType::SmallInt);
        small.auto_increment();
        assert_eq!(small.data_type(), DataType::SmallSerial);

        let mut big = Column::new("b", DataType::BigInt);
        big.auto_increment();
        assert_eq!(big.data_type(), DataType::BigSerial);

        let mut numeric = Column::new("c", DataType::Numeric);
        numeric.auto_increment();
        assert_eq!(numeric.data_type(), DataType::Serial);
        assert!(numeric.is_primary_key() && numeric.is_unique() && !numeric.is_nullable());
    }
}
