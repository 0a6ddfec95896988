use std::{cmp::Ordering, fmt::Debug};

use crate::{
    io::{Decodeable, Encodeable, TinyReader},
    storage::schema::{Type, MAX_STRING_LEN},
};

/// A single typed value.
///
/// # Wire format
///
/// - `Int`: 4 bytes, big-endian, two's complement
/// - `String`: 4 bytes big-endian content length, then exactly
///   `MAX_STRING_LEN` content bytes (zero padding past the length)
#[derive(Debug, Clone, Hash)]
pub enum Cell {
    Int(i32),
    String(String),
}

impl Cell {
    pub fn get_type(&self) -> Type {
        match self {
            Cell::Int(_) => Type::Int,
            Cell::String(_) => Type::String,
        }
    }

    pub fn read_from(reader: &mut TinyReader, t: Type) -> Cell {
        match t {
            Type::Int => Cell::Int(i32::read_from(reader)),
            Type::String => {
                let len = (u32::read_from(reader) as usize).min(MAX_STRING_LEN);
                let content = reader.read_exact(MAX_STRING_LEN);
                let s = String::from_utf8_lossy(&content[..len]).to_string();
                Cell::String(s)
            }
        }
    }
}

impl Encodeable for Cell {
    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Cell::Int(v) => v.to_bytes(),
            Cell::String(v) => {
                let mut content = v.as_bytes().to_vec();
                content.truncate(MAX_STRING_LEN);

                let mut buf = Vec::with_capacity(4 + MAX_STRING_LEN);
                buf.extend((content.len() as u32).to_bytes());
                buf.extend_from_slice(&content);
                buf.resize(4 + MAX_STRING_LEN, 0);
                buf
            }
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::String(a), Cell::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.partial_cmp(b),
            (Cell::String(a), Cell::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .expect("cells of different types are not comparable")
    }
}
