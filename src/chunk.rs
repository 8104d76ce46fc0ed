use std::ops::Deref;

/// A run of bytes passed from one pipeline stage to the next.
///
/// Chunks are immutable once created. Each stage makes its own copy of the bytes it hands on,
/// and the chunk is then moved into the handoff, so no two stages ever look at the same chunk.
#[derive(PartialEq, Eq)]
pub struct Chunk {
    data: Box<[u8]>,
}

impl Chunk {
    /// Copies the given bytes into a new chunk, leaving the caller free to reuse its buffer.
    pub fn copy_from(bytes: &[u8]) -> Chunk {
        Chunk { data: bytes.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.into_vec()
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(v: Vec<u8>) -> Self {
        Chunk { data: v.into_boxed_slice() }
    }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Chunk {
    // Printing the contents of every chunk makes trace logs unreadable, so just show the size
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chunk({} bytes)", self.data.len())
    }
}
