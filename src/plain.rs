/// Types that can be viewed as raw bytes for upload to the gpu.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or a primitive/array of primitives) with no padding bytes
/// and no pointers.
pub unsafe trait Plain: Sized {
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: Plain guarantees every byte of Self is initialised.
        unsafe {
            std::slice::from_raw_parts(self as *const Self as *const u8, std::mem::size_of::<Self>())
        }
    }
}

pub trait PlainSlice {
    fn as_bytes(&self) -> &[u8];
}

impl<T: Plain> PlainSlice for [T] {
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: Plain guarantees every byte of T is initialised, and slices are contiguous.
        unsafe { std::slice::from_raw_parts(self.as_ptr() as *const u8, std::mem::size_of_val(self)) }
    }
}

unsafe impl Plain for u16 {}
unsafe impl Plain for f32 {}
unsafe impl<T: Plain, const N: usize> Plain for [T; N] {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_bytes_cover_every_element() {
        let data: Vec<[f32; 2]> = vec![[1.0, 2.0], [3.0, 4.0]];
        let bytes = data.as_slice().as_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[4..8], &2.0f32.to_ne_bytes());
    }

    #[test]
    fn value_bytes() {
        let value: u16 = 0x0102;
        assert_eq!(value.as_bytes(), &0x0102u16.to_ne_bytes());
    }
}
