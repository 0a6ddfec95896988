use std::convert::TryInto;

pub trait Encodeable {
    fn to_bytes(&self) -> Vec<u8>;
}

pub trait Decodeable {
    fn read_from(reader: &mut TinyReader) -> Self;
}

/// Cursor over an in-memory page image. Reading past the end is a
/// programming error, not an I/O condition, hence the panic.
pub struct TinyReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> TinyReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    pub fn read_exact(&mut self, bytes_count: usize) -> &'a [u8] {
        let start = self.cursor;
        let end = self.cursor + bytes_count;

        // boundary check
        if end > self.buf.len() {
            panic!(
                "read out of boundary, cursor: {}, request: {}, size: {}",
                self.cursor,
                bytes_count,
                self.buf.len()
            );
        }

        self.cursor = end;
        &self.buf[start..end]
    }
}

pub struct TinyWriter {
    buf: Vec<u8>,
}

impl TinyWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write<T: Encodeable>(&mut self, obj: &T) {
        self.buf.extend_from_slice(obj.to_bytes().as_slice());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    pub fn to_padded_bytes(&self, size: usize) -> Vec<u8> {
        let mut buf = self.buf.clone();

        if buf.len() > size {
            panic!(
                "buffer size is larger than the given size: {} > {}",
                buf.len(),
                size
            );
        }

        buf.resize(size, 0);
        buf
    }
}

impl Encodeable for i32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl Decodeable for i32 {
    fn read_from(reader: &mut TinyReader) -> Self {
        i32::from_be_bytes(reader.read_exact(4).try_into().unwrap())
    }
}

impl Encodeable for u32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl Decodeable for u32 {
    fn read_from(reader: &mut TinyReader) -> Self {
        u32::from_be_bytes(reader.read_exact(4).try_into().unwrap())
    }
}
