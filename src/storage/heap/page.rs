use std::fmt;

use bit_vec::BitVec;

use log::debug;

use crate::{
    buffer_pool::BufferPool,
    error::TinyError,
    io::{TinyReader, TinyWriter},
    storage::{
        heap::HeapPageID,
        schema::Schema,
        tuple::{RecordID, Tuple},
    },
    transaction::TransactionID,
    types::TinyResult,
};

/// A slotted page of fixed-width tuples.
///
/// # Layout
///
/// - header: ⌈slot_count/8⌉ bytes, one bit per slot, LSB-first within each
///   byte, set bit means the slot is occupied
/// - slots: slot_count images of `schema.get_size()` bytes each; empty
///   slots are zero-filled
/// - zero padding up to the page size
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    tuples: Vec<Option<Tuple>>,

    // byte image of the last committed version, used for rollback
    old_data: Vec<u8>,

    dirtier: Option<TransactionID>,
}

impl HeapPage {
    pub fn new(
        pid: &HeapPageID,
        bytes: &[u8],
        schema: &Schema,
    ) -> Result<Self, TinyError> {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(TinyError::db(&format!(
                "page data size mismatch, expect {} bytes, got {}",
                page_size,
                bytes.len()
            )));
        }

        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);

        let header = header_from_bytes(&bytes[..header_size]);

        let tuple_size = schema.get_size();
        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            if header[i] {
                let start = header_size + i * tuple_size;
                let mut reader = TinyReader::new(&bytes[start..start + tuple_size]);
                let mut t = Tuple::read_from(&mut reader, schema);
                t.set_record_id(Some(RecordID::new(*pid, i)));
                tuples.push(Some(t));
            } else {
                tuples.push(None);
            }
        }

        Ok(Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            old_data: bytes.to_vec(),
            dirtier: None,
        })
    }

    /// Number of tuple slots a page can hold under the given schema.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        (BufferPool::get_page_size() * 8) / bits_per_tuple_including_header
    }

    /// Number of header bytes for a page with `slot_count` slots.
    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    /// Emit the on-disk image of the page.
    pub fn get_page_data(&self) -> Vec<u8> {
        let mut writer = TinyWriter::new();
        writer.write_bytes(&header_to_bytes(&self.header));

        let tuple_size = self.schema.get_size();
        for i in 0..self.slot_count {
            match &self.tuples[i] {
                Some(t) => writer.write(t),
                None => writer.write_bytes(&vec![0; tuple_size]),
            }
        }

        writer.to_padded_bytes(BufferPool::get_page_size())
    }

    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    pub fn get_num_empty_slots(&self) -> usize {
        let mut count = 0;
        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                count += 1;
            }
        }
        count
    }

    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.get_num_empty_slots()
    }

    /// Store the tuple in the lowest-index empty slot and stamp its record
    /// id.
    pub fn insert_tuple(&mut self, t: &mut Tuple) -> TinyResult {
        if t.get_schema() != &self.schema {
            return Err(TinyError::db(&format!(
                "tuple schema {} does not match page schema {}",
                t.get_schema(),
                self.schema
            )));
        }

        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                t.set_record_id(Some(RecordID::new(self.pid, i)));
                self.tuples[i] = Some(t.clone());
                self.mark_slot_status(i, true);
                debug!("tuple inserted, page: {}, slot: {}", self.pid, i);
                return Ok(());
            }
        }

        Err(TinyError::db(&format!(
            "no empty slot on page {}",
            self.pid
        )))
    }

    /// Remove the tuple from its slot and clear its record id.
    pub fn delete_tuple(&mut self, t: &mut Tuple) -> TinyResult {
        let rid = t.get_record_id().ok_or_else(|| {
            TinyError::db("tuple has no record id, it is not stored on any page")
        })?;

        if rid.get_pid() != self.pid {
            return Err(TinyError::db(&format!(
                "tuple belongs to page {}, not {}",
                rid.get_pid(),
                self.pid
            )));
        }

        let slot = rid.get_slot();
        if slot >= self.slot_count || !self.is_slot_used(slot) {
            return Err(TinyError::db(&format!(
                "slot {} of page {} is already empty",
                slot, self.pid
            )));
        }

        match &self.tuples[slot] {
            Some(stored) if stored == t => {}
            _ => {
                return Err(TinyError::db(&format!(
                    "stored tuple of slot {} differs from the one to delete",
                    slot
                )));
            }
        }

        self.tuples[slot] = None;
        self.mark_slot_status(slot, false);
        t.set_record_id(None);
        debug!("tuple deleted, page: {}, slot: {}", self.pid, slot);
        Ok(())
    }

    /// Occupied tuples in ascending slot order.
    pub fn iter(&self) -> HeapPageIterator {
        HeapPageIterator {
            page: self,
            cursor: 0,
        }
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionID) {
        if dirty {
            self.dirtier = Some(tid);
        } else {
            self.dirtier = None;
        }
    }

    pub fn dirty_tid(&self) -> Option<TransactionID> {
        self.dirtier
    }

    pub fn get_before_image(&self) -> HeapPage {
        HeapPage::new(&self.pid, &self.old_data, &self.schema)
            .expect("before image has the page size by construction")
    }

    pub fn set_before_image(&mut self) {
        self.old_data = self.get_page_data();
    }
}

impl fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapPage, pid: {}, used: {}/{}>",
            self.pid,
            self.tuples_count(),
            self.slot_count
        )
    }
}

pub struct HeapPageIterator<'a> {
    page: &'a HeapPage,
    cursor: usize,
}

impl<'a> Iterator for HeapPageIterator<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.page.slot_count {
            let i = self.cursor;
            self.cursor += 1;
            if self.page.is_slot_used(i) {
                return self.page.tuples[i].as_ref();
            }
        }
        None
    }
}

/// Expand header bytes into per-slot bits. Bit `i` lives at byte `i / 8`,
/// bit `i % 8`, LSB-first.
fn header_from_bytes(bytes: &[u8]) -> BitVec {
    let mut header = BitVec::from_elem(bytes.len() * 8, false);
    for i in 0..header.len() {
        let bit = (bytes[i / 8] >> (i % 8)) & 1;
        header.set(i, bit == 1);
    }
    header
}

fn header_to_bytes(header: &BitVec) -> Vec<u8> {
    let mut bytes = vec![0u8; header.len() / 8];
    for i in 0..header.len() {
        if header[i] {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}
