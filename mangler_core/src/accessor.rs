/// A fixed-width unsigned integer that can be moved in and out of a byte
/// buffer one byte at a time.
///
/// Mutation operators pick their offsets at runtime, so a chosen window is
/// rarely aligned for the width being accessed. Every implementation here
/// goes through `copy_from_slice` on the native-endian byte representation,
/// never through a typed load, which keeps the access well-defined at any
/// offset on any architecture.
pub trait Scalar: Copy + PartialEq + std::fmt::Debug {
    /// Width of the scalar in bytes.
    const WIDTH: usize;

    /// Reads a value from exactly `Self::WIDTH` native-endian bytes.
    fn load_ne(bytes: &[u8]) -> Self;

    /// Writes the value into exactly `Self::WIDTH` native-endian bytes.
    fn store_ne(self, out: &mut [u8]);

    /// Wrapping addition, used by the arithmetic mutation operators.
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Wrapping subtraction, used by the arithmetic mutation operators.
    fn wrapping_sub(self, rhs: Self) -> Self;

    /// Reverses the byte order of the value.
    fn swap_bytes(self) -> Self;

    /// Truncates a `u64` to this width.
    fn from_u64_lossy(value: u64) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const WIDTH: usize = size_of::<$ty>();

                fn load_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn store_ne(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn wrapping_add(self, rhs: Self) -> Self {
                    <$ty>::wrapping_add(self, rhs)
                }

                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$ty>::wrapping_sub(self, rhs)
                }

                fn swap_bytes(self) -> Self {
                    <$ty>::swap_bytes(self)
                }

                fn from_u64_lossy(value: u64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64);

/// A read/modify/write handle for a scalar living at an arbitrary byte offset
/// inside a buffer.
///
/// On construction the scalar is copied out of the buffer into a cached
/// value; `get` returns the cache and `set` writes through to the original
/// bytes. The handle borrows the window mutably, so the buffer cannot change
/// underneath the cache while the accessor is alive.
pub struct ScalarAccessor<'a, T: Scalar> {
    window: &'a mut [u8],
    value: T,
}

impl<'a, T: Scalar> ScalarAccessor<'a, T> {
    /// Creates an accessor for the `T::WIDTH` bytes at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + T::WIDTH` exceeds the buffer length. Callers pick
    /// offsets with [`crate::select::block_offset`], which cannot produce an
    /// out-of-range window.
    pub fn new(buffer: &'a mut [u8], offset: usize) -> Self {
        let window = &mut buffer[offset..offset + T::WIDTH];
        let value = T::load_ne(window);
        Self { window, value }
    }

    /// Returns the cached copy of the referenced value.
    pub fn get(&self) -> T {
        self.value
    }

    /// Updates the cache and copies the new value back into the buffer.
    pub fn set(&mut self, value: T) {
        self.value = value;
        value.store_ne(self.window);
    }
}
