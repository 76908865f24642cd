/// A single event row from the exported table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
    pub time: String,
    /// None when the table has no category column or the cell is blank.
    pub protocol: Option<String>,
}

/// All rows of one input file, in file order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn protocol_of(row: &Row) -> Option<&str> {
        row.protocol.as_deref()
    }
}
