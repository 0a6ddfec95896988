use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// Identifies a unique page of a table.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct HeapPageID {
    pub table_id: u32,

    /// position of the page in the table, starting from 0
    pub page_index: usize,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: usize) -> Self {
        Self {
            table_id,
            page_index,
        }
    }

    pub fn get_table_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_short_repr(&self) -> String {
        format!("page_{}_{}", self.table_id, self.page_index)
    }
}

impl Hash for HeapPageID {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let v = (self.table_id as u64)
            .wrapping_mul(31)
            .wrapping_add(self.page_index as u64);
        state.write_u64(v);
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get_short_repr())
    }
}

impl fmt::Debug for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
