//! Little-endian field cursors shared by the frame shapes
//!
//! Callers size-check the whole frame before constructing a cursor, so the
//! individual puts and takes never run past the slice.

pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.put_bytes(&[value]);
    }

    pub(crate) fn put_i16(&mut self, value: i16) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub(crate) fn put_f32(&mut self, value: f32) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub(crate) fn put_f32s(&mut self, values: &[f32]) {
        for &value in values {
            self.put_f32(value);
        }
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Append the CRC over everything written so far and return the frame length
    pub(crate) fn finish(mut self) -> usize {
        let crc = crate::crc8(&self.buf[..self.pos]);
        self.put_u8(crc);
        self.pos
    }
}

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn u8(&mut self) -> u8 {
        let [byte] = self.take::<1>();
        byte
    }

    pub(crate) fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    pub(crate) fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    pub(crate) fn f32_array<const N: usize>(&mut self) -> [f32; N] {
        let mut out = [0.0; N];
        for value in out.iter_mut() {
            *value = self.f32();
        }
        out
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}
