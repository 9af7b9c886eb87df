use std::fmt;

/// A reusable text buffer for rendering and loading artifacts.
///
/// A pool hands out its buffer through [`ScratchPool::acquire`]. The buffer is
/// cleared when handed out and cleared again when the [`Scratch`] guard is
/// dropped, on every exit path. Acquiring takes `&mut self`, so two
/// overlapping uses of the same pool do not compile.
#[derive(Debug, Default)]
pub struct ScratchPool {
    buffer: String,
    acquisitions: u64,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool whose buffer starts with `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        ScratchPool {
            buffer: String::with_capacity(capacity),
            acquisitions: 0,
        }
    }

    /// Hands out the buffer, empty.
    pub fn acquire(&mut self) -> Scratch<'_> {
        self.buffer.clear();
        self.acquisitions += 1;
        Scratch {
            buffer: &mut self.buffer,
        }
    }

    /// True when the buffer holds no leftover content.
    pub fn is_clear(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes currently allocated for the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Number of times the buffer has been handed out.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }
}

/// Scoped access to a [`ScratchPool`]'s buffer. Clears the buffer on drop.
pub struct Scratch<'a> {
    buffer: &'a mut String,
}

impl Scratch<'_> {
    pub fn as_str(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl fmt::Write for Scratch<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        self.buffer.clear();
    }
}
