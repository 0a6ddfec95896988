use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    fs::{File, OpenOptions},
    hash::{Hash, Hasher},
    io::{Read, Seek, SeekFrom, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;

use crate::{
    buffer_pool::BufferPool,
    database::Database,
    error::TinyError,
    storage::{
        heap::{HeapPage, HeapPageID},
        schema::Schema,
        tuple::Tuple,
    },
    transaction::{Permission, Transaction},
    types::{Pod, TinyResult},
    utils::HandyRwLock,
};

/// A table stored as an unordered sequence of slotted pages in a single
/// file. Page `k` occupies bytes `[k * P, (k + 1) * P)`.
pub struct HeapFile {
    file_path: String,

    file: Mutex<File>,

    schema: Schema,

    table_id: u32,
}

impl HeapFile {
    /// Open (or create) the backing file. An existing file is reused as-is,
    /// so a table survives a catalog reload within the process lifetime.
    pub fn new(file_path: &str, schema: &Schema) -> Result<Self, TinyError> {
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(file_path)?;

        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Ok(Self {
            file_path: file_path.to_string(),
            file: Mutex::new(f),
            schema: schema.clone(),
            table_id,
        })
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_file_path(&self) -> &str {
        &self.file_path
    }

    fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    pub fn num_pages(&self) -> usize {
        let page_size = BufferPool::get_page_size();
        let len = self.get_file().metadata().map(|m| m.len()).unwrap_or(0);
        (len as usize + page_size - 1) / page_size
    }

    /// Read the page image at `pid` from disk. A short read means the file
    /// is torn and is reported as an I/O failure.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, TinyError> {
        let page_size = BufferPool::get_page_size();
        let start_pos = pid.page_index * page_size;

        let mut buf: Vec<u8> = vec![0; page_size];
        {
            let mut file = self.get_file();
            file.seek(SeekFrom::Start(start_pos as u64))?;
            file.read_exact(&mut buf)?;
        }
        debug!("page read from disk, pid: {}", pid);

        HeapPage::new(pid, &buf, &self.schema)
    }

    pub fn write_page(&self, page: &HeapPage) -> TinyResult {
        let pid = page.get_pid();
        if pid.get_table_id() != self.table_id {
            return Err(TinyError::db(&format!(
                "page {} does not belong to table {}",
                pid, self.table_id
            )));
        }

        let page_size = BufferPool::get_page_size();
        let data = page.get_page_data();
        {
            let mut file = self.get_file();
            file.seek(SeekFrom::Start((pid.page_index * page_size) as u64))?;
            file.write_all(&data)?;
        }
        debug!("page written to disk, pid: {}", pid);
        Ok(())
    }

    /// Extend the file with one zeroed page and return its id. The file
    /// mutex makes the length check and the append a single step.
    fn append_empty_page(&self) -> Result<HeapPageID, TinyError> {
        let page_size = BufferPool::get_page_size();

        let mut file = self.get_file();
        let len = file.metadata()?.len() as usize;
        let page_index = (len + page_size - 1) / page_size;

        file.seek(SeekFrom::Start((page_index * page_size) as u64))?;
        file.write_all(&HeapPage::empty_page_data())?;

        debug!(
            "table {} extended to {} pages",
            self.table_id,
            page_index + 1
        );
        Ok(HeapPageID::new(self.table_id, page_index))
    }

    /// Find a page with room and insert the tuple into it, extending the
    /// file when every page is full. Returns the pages touched; the caller
    /// (the buffer pool) marks them dirty.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        t: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, TinyError> {
        let buffer_pool = Database::buffer_pool();

        loop {
            for page_index in 0..self.num_pages() {
                let pid = HeapPageID::new(self.table_id, page_index);

                // probe under a read lock first
                let page_rc =
                    buffer_pool.get_page(tx, Permission::ReadOnly, &pid)?;
                let has_room = page_rc.rl().get_num_empty_slots() > 0;
                if !has_room {
                    // give the probe lock back, the page stays untouched
                    buffer_pool.release_page(tx, &pid);
                    continue;
                }

                // upgrade and insert; the emptiness cannot change while we
                // hold the read lock
                let page_rc =
                    buffer_pool.get_page(tx, Permission::ReadWrite, &pid)?;
                page_rc.wl().insert_tuple(t)?;
                return Ok(vec![page_rc]);
            }

            // every existing page is full
            let pid = self.append_empty_page()?;
            let page_rc =
                buffer_pool.get_page(tx, Permission::ReadWrite, &pid)?;

            // borrow of page_rc starts here
            {
                let mut page = page_rc.wl();
                if page.get_num_empty_slots() > 0 {
                    page.insert_tuple(t)?;
                } else {
                    // another transaction filled the fresh page first
                    continue;
                }
            }
            // borrow of page_rc ends here

            return Ok(vec![page_rc]);
        }
    }

    /// Delete the tuple at its record id. Returns the page touched.
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        t: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, TinyError> {
        let rid = t.get_record_id().ok_or_else(|| {
            TinyError::db("tuple has no record id, cannot delete")
        })?;
        let pid = rid.get_pid();
        if pid.get_table_id() != self.table_id {
            return Err(TinyError::db(&format!(
                "tuple of table {} cannot be deleted from table {}",
                pid.get_table_id(),
                self.table_id
            )));
        }

        let buffer_pool = Database::buffer_pool();
        let page_rc = buffer_pool.get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().delete_tuple(t)?;
        Ok(vec![page_rc])
    }
}

impl fmt::Display for HeapFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapFile, file: {}, id: {}>",
            self.file_path, self.table_id
        )
    }
}

/// Scans every live tuple of a heap file in (page, slot) order. Pages are
/// fetched through the buffer pool under a read lock one at a time, as the
/// iterator advances.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    tx: Transaction,

    page_index: usize,
    page_tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl HeapFileIterator {
    pub fn new(file: Arc<HeapFile>, tx: &Transaction) -> Self {
        Self {
            file,
            tx: tx.clone(),
            page_index: 0,
            page_tuples: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    pub fn open(&mut self) -> TinyResult {
        self.opened = true;
        self.page_index = 0;
        self.cursor = 0;
        self.page_tuples.clear();
        if self.file.num_pages() > 0 {
            self.load_page(0)?;
        }
        Ok(())
    }

    fn load_page(&mut self, page_index: usize) -> TinyResult {
        let pid = HeapPageID::new(self.file.get_id(), page_index);
        let page_rc = Database::buffer_pool().get_page(
            &self.tx,
            Permission::ReadOnly,
            &pid,
        )?;

        self.page_tuples = page_rc.rl().iter().cloned().collect();
        self.cursor = 0;
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool, TinyError> {
        if !self.opened {
            return Ok(false);
        }
        loop {
            if self.cursor < self.page_tuples.len() {
                return Ok(true);
            }
            if self.page_index + 1 >= self.file.num_pages() {
                return Ok(false);
            }
            self.page_index += 1;
            self.load_page(self.page_index)?;
        }
    }

    pub fn next(&mut self) -> Result<Tuple, TinyError> {
        if !self.has_next()? {
            return Err(TinyError::no_such_element());
        }
        let t = self.page_tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(t)
    }

    pub fn rewind(&mut self) -> TinyResult {
        self.open()
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.page_tuples.clear();
        self.cursor = 0;
        self.page_index = 0;
    }
}
