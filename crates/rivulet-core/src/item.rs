#![allow(unsafe_code)]
//! Typed views over byte streams.
//!
//! Buffers are type-erased: they move fixed-size items as bytes. Blocks that
//! know their item type borrow typed slices through [`StreamItem`], which is
//! only implemented for plain-old-data types where every bit pattern is valid.

/// Marker for types that can be reinterpreted from raw stream bytes.
///
/// # Safety
///
/// Implementors must be `Copy`, contain no padding, no pointers, and accept
/// every bit pattern as a valid value.
pub unsafe trait StreamItem: Copy + Send + Sync + 'static {}

macro_rules! impl_stream_item {
    ($($t:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric types have no padding and no invalid bit patterns.
            unsafe impl StreamItem for $t {}
        )*
    };
}

impl_stream_item!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, [f32; 2], [f64; 2], [i16; 2]);

/// Reinterprets a byte slice as a slice of `T`.
///
/// # Panics
///
/// Panics if the length is not a multiple of `size_of::<T>()` or the slice is
/// not aligned for `T`. Buffer memory is page-aligned and item offsets are
/// multiples of the item size, so a correctly sized `T` always passes.
pub fn cast_slice<T: StreamItem>(bytes: &[u8]) -> &[T] {
    let size = core::mem::size_of::<T>();
    assert!(
        size != 0 && bytes.len() % size == 0,
        "byte length {} is not a multiple of item size {size}",
        bytes.len()
    );
    assert_eq!(
        bytes.as_ptr().align_offset(core::mem::align_of::<T>()),
        0,
        "stream bytes are misaligned for the item type"
    );
    // SAFETY: length and alignment checked above; T accepts every bit pattern.
    unsafe { core::slice::from_raw_parts(bytes.as_ptr().cast::<T>(), bytes.len() / size) }
}

/// Mutable counterpart of [`cast_slice`].
///
/// # Panics
///
/// Same conditions as [`cast_slice`].
pub fn cast_slice_mut<T: StreamItem>(bytes: &mut [u8]) -> &mut [T] {
    let size = core::mem::size_of::<T>();
    assert!(
        size != 0 && bytes.len() % size == 0,
        "byte length {} is not a multiple of item size {size}",
        bytes.len()
    );
    assert_eq!(
        bytes.as_ptr().align_offset(core::mem::align_of::<T>()),
        0,
        "stream bytes are misaligned for the item type"
    );
    // SAFETY: length and alignment checked above; T accepts every bit pattern.
    unsafe { core::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<T>(), bytes.len() / size) }
}

/// Views a typed slice as its raw bytes.
pub fn as_bytes<T: StreamItem>(items: &[T]) -> &[u8] {
    // SAFETY: T has no padding, so every byte of the slice is initialized.
    unsafe { core::slice::from_raw_parts(items.as_ptr().cast::<u8>(), core::mem::size_of_val(items)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_bytes() {
        let values = [1.0f32, -2.5, 3.25];
        let bytes = as_bytes(&values);
        assert_eq!(bytes.len(), 12);
        assert_eq!(cast_slice::<f32>(bytes), &values);
    }

    #[test]
    fn mutable_view_writes_through() {
        let mut backing = [0u32; 4];
        {
            let bytes = bytes_of_mut(&mut backing);
            let view = cast_slice_mut::<u32>(bytes);
            view[2] = 7;
        }
        assert_eq!(backing, [0, 0, 7, 0]);
    }

    fn bytes_of_mut(values: &mut [u32; 4]) -> &mut [u8] {
        let len = core::mem::size_of_val(values);
        // SAFETY: u32 has no padding; the borrow covers the whole array.
        unsafe { core::slice::from_raw_parts_mut(values.as_mut_ptr().cast::<u8>(), len) }
    }

    #[test]
    #[should_panic]
    fn rejects_ragged_length() {
        let bytes = [0u8; 6];
        let _ = cast_slice::<u32>(&bytes[..6]);
    }
}
