use alloc::vec::Vec;

/// Owns the staging resources of a capture and selects which one is written and which one is
/// read each frame.
///
/// When double buffered, the texture copied this frame is only read on the next frame, trading a
/// frame of latency for not waiting on the copy before mapping.
#[derive(Debug)]
pub struct DoubleBuffer<T> {
    buffers: Vec<T>,
    parity: usize,
}

impl<T> DoubleBuffer<T> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            buffers: Vec::with_capacity(2),
            parity: 0,
        }
    }

    /// Releases every held resource then creates two resources if `double_buffered`, else one.
    ///
    /// If creation fails the manager is left empty.
    pub fn reallocate<E, F>(&mut self, double_buffered: bool, mut create: F) -> Result<(), E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.clear();

        let count = if double_buffered { 2 } else { 1 };
        for _ in 0..count {
            match create() {
                Ok(buffer) => self.buffers.push(buffer),
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Returns the `(write, read)` targets for this frame, or `None` if nothing is allocated.
    pub fn acquire(&mut self) -> Option<(&T, &T)> {
        match self.buffers.as_slice() {
            [single] => Some((single, single)),

            [_, _] => {
                self.parity ^= 1;
                let write = &self.buffers[self.parity];
                let read = &self.buffers[1 - self.parity];
                Some((write, read))
            }

            _ => None,
        }
    }

    /// The first resource, used when the write and read target must be the same.
    pub fn first(&self) -> Option<&T> {
        self.buffers.first()
    }

    /// Drops every held resource.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.parity = 0;
    }

    /// The number of held resources.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// If no resources are held.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// The current parity bit.
    pub fn parity(&self) -> usize {
        self.parity
    }
}

impl<T> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
