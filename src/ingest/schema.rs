use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Varchar,
    Timestamp,
}

impl DataType {
    pub fn to_sql_type(&self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Varchar => "VARCHAR",
            DataType::Timestamp => "TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub data_type: DataType,
}

impl ColumnSchema {
    const fn new(name: &'static str, data_type: DataType) -> Self {
        Self { name, data_type }
    }

    pub fn to_sql_definition(&self) -> String {
        format!("{} {} NOT NULL", self.name, self.data_type.to_sql_type())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub references: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnSchema],
    pub foreign_keys: &'static [ForeignKey],
}

pub const CUSTOMERS: TableSchema = TableSchema {
    name: "customers",
    primary_key: "customer_id",
    columns: &[
        ColumnSchema::new("customer_id", DataType::Integer),
        ColumnSchema::new("age", DataType::Integer),
        ColumnSchema::new("sex", DataType::Varchar),
        ColumnSchema::new("live", DataType::Varchar),
    ],
    foreign_keys: &[],
};

pub const ITEMS: TableSchema = TableSchema {
    name: "items",
    primary_key: "item_id",
    columns: &[
        ColumnSchema::new("item_id", DataType::Integer),
        ColumnSchema::new("price", DataType::Integer),
    ],
    foreign_keys: &[],
};

pub const ORDERS: TableSchema = TableSchema {
    name: "orders",
    primary_key: "order_id",
    columns: &[
        ColumnSchema::new("order_id", DataType::Integer),
        ColumnSchema::new("customer_id", DataType::Integer),
        ColumnSchema::new("order_time", DataType::Timestamp),
        ColumnSchema::new("total_price", DataType::Integer),
        ColumnSchema::new("item_id", DataType::Integer),
    ],
    foreign_keys: &[
        ForeignKey {
            column: "customer_id",
            table: "customers",
            references: "customer_id",
        },
        ForeignKey {
            column: "item_id",
            table: "items",
            references: "item_id",
        },
    ],
};

/// All tables, referenced tables first.
pub const TABLES: [&TableSchema; 3] = [&CUSTOMERS, &ITEMS, &ORDERS];

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn to_create_table_sql(&self) -> String {
        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|col| col.to_sql_definition())
            .collect();
        definitions.push(format!("PRIMARY KEY ({})", self.primary_key));
        for fk in self.foreign_keys {
            definitions.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.column, fk.table, fk.references
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            definitions.join(",\n    ")
        )
    }

    /// `INSERT INTO t (a, b) VALUES ($1, $2)`
    pub fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_names().join(", "),
            placeholders.join(", ")
        )
    }

    /// One-line description used in the SQL generation prompt.
    pub fn describe(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.data_type.to_sql_type()))
            .collect();
        format!("- {} table: {}", self.name, columns.join(", "))
    }
}

/// Fixed textual description of the dataset handed to the model.
pub fn schema_description() -> String {
    let mut out = String::from("Database schema:\n");
    for table in TABLES {
        let _ = writeln!(out, "{}", table.describe());
    }

    out.push_str("\nRelationships between tables:\n");
    for table in TABLES {
        for fk in table.foreign_keys {
            let _ = writeln!(
                out,
                "- {}.{} -> {}.{}",
                table.name, fk.column, fk.table, fk.references
            );
        }
    }

    out
}
