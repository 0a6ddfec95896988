use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::Arc,
};

use log::info;

use crate::{
    error::TinyError,
    storage::{
        heap::HeapFile,
        schema::{FieldItem, Schema, Type},
    },
    types::TinyResult,
};

#[derive(Clone)]
struct CatalogEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: String,
}

/// In-memory registry of the tables of the database. Populated by the host
/// (directly or through `load_schema`), read by every operator; lives for
/// the process lifetime behind the global `Database`.
pub struct Catalog {
    tables: HashMap<u32, CatalogEntry>,
    name_to_id: HashMap<String, u32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            name_to_id: HashMap::new(),
        }
    }

    /// Register a table. A repeated name shadows the earlier binding, the
    /// empty name is legal.
    pub fn add_table(
        &mut self,
        file: Arc<HeapFile>,
        name: &str,
        primary_key: &str,
    ) {
        let table_id = file.get_id();
        self.name_to_id.insert(name.to_string(), table_id);
        self.tables.insert(
            table_id,
            CatalogEntry {
                file,
                name: name.to_string(),
                primary_key: primary_key.to_string(),
            },
        );
    }

    pub fn get_table_id(&self, name: &str) -> Result<u32, TinyError> {
        self.name_to_id.get(name).copied().ok_or_else(|| {
            TinyError::db(&format!("no table named {:?}", name))
        })
    }

    fn get_entry(&self, table_id: u32) -> Result<&CatalogEntry, TinyError> {
        self.tables.get(&table_id).ok_or_else(|| {
            TinyError::db(&format!("no table with id {}", table_id))
        })
    }

    pub fn get_db_file(
        &self,
        table_id: u32,
    ) -> Result<Arc<HeapFile>, TinyError> {
        Ok(Arc::clone(&self.get_entry(table_id)?.file))
    }

    pub fn get_schema(&self, table_id: u32) -> Result<Schema, TinyError> {
        Ok(self.get_entry(table_id)?.file.get_schema().clone())
    }

    pub fn get_table_name(&self, table_id: u32) -> Result<String, TinyError> {
        Ok(self.get_entry(table_id)?.name.clone())
    }

    pub fn get_primary_key(
        &self,
        table_id: u32,
    ) -> Result<String, TinyError> {
        Ok(self.get_entry(table_id)?.primary_key.clone())
    }

    pub fn table_ids(&self) -> Vec<u32> {
        self.tables.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.name_to_id.clear();
    }

    /// Load a text schema file, one table per line:
    ///
    /// ```text
    /// tablename (field type [pk], field type, ...)
    /// ```
    ///
    /// `type` is `int` or `string`; the optional `pk` token marks the
    /// primary key. The data file of table `T` is `<catalog dir>/T.dat`.
    pub fn load_schema(&mut self, catalog_path: &str) -> TinyResult {
        let content = fs::read_to_string(catalog_path)?;
        let base_dir = Path::new(catalog_path)
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let open = line.find('(').ok_or_else(|| {
                TinyError::db(&format!("malformed schema line: {:?}", line))
            })?;
            let close = line.rfind(')').ok_or_else(|| {
                TinyError::db(&format!("malformed schema line: {:?}", line))
            })?;

            let table_name = line[..open].trim();
            let mut fields: Vec<FieldItem> = Vec::new();
            let mut primary_key = String::new();

            for part in line[open + 1..close].split(',') {
                let tokens: Vec<&str> = part.split_whitespace().collect();
                if tokens.len() < 2 || tokens.len() > 3 {
                    return Err(TinyError::db(&format!(
                        "malformed field declaration: {:?}",
                        part.trim()
                    )));
                }

                let field_name = tokens[0];
                let field_type =
                    Type::parse(tokens[1]).ok_or_else(|| {
                        TinyError::db(&format!(
                            "unknown type {:?} of field {:?}",
                            tokens[1], field_name
                        ))
                    })?;

                if tokens.len() == 3 {
                    if tokens[2] != "pk" {
                        return Err(TinyError::db(&format!(
                            "unknown annotation {:?} of field {:?}",
                            tokens[2], field_name
                        )));
                    }
                    primary_key = field_name.to_string();
                }

                fields.push(FieldItem::new(field_name, field_type));
            }

            if fields.is_empty() {
                return Err(TinyError::db(&format!(
                    "table {:?} declares no fields",
                    table_name
                )));
            }

            let data_path = base_dir.join(format!("{}.dat", table_name));
            let file = HeapFile::new(
                data_path.to_str().ok_or_else(|| {
                    TinyError::db("catalog path is not valid utf-8")
                })?,
                &Schema::new(fields),
            )?;

            info!(
                "table loaded: {} ({} fields, pk: {:?})",
                table_name,
                file.get_schema().fields_count(),
                primary_key
            );
            self.add_table(Arc::new(file), table_name, &primary_key);
        }

        Ok(())
    }
}
