#![allow(unsafe_code)]
//! Backing memory for stream buffers.
//!
//! A double-mapped region maps the same physical pages twice, back to back, so
//! that `base[i]` and `base[i + len]` alias each other. Any run of at most
//! `len` bytes starting inside the first copy is contiguous in virtual memory,
//! which is what lets the executor hand blocks flat slices of a ring.
//!
//! Backends, tried in order:
//!
//! | Backend | Platforms | Object |
//! |---------|-----------|--------|
//! | `memfd` | Linux | anonymous `memfd_create` file |
//! | `posix-shm` | unix | `shm_open` object, unlinked immediately |
//!
//! When none works, [`allocate_double_mapped`] fails and callers either give
//! up (explicit double-mapped request) or fall back to a [`FlatRegion`].

use crate::error::BufferError;

/// Size of a virtual-memory page on this system.
///
/// Mappings are page-granular, so double-mapped buffers are always a whole
/// number of pages long.
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    4096
}

/// Capability interface for a region whose two halves alias one another.
pub trait DoubleMappedRegion: Send + Sync {
    /// Short backend name for logs and reports.
    fn backend(&self) -> &'static str;

    /// Start of the first copy. The mapping extends for `2 * len()` bytes.
    fn as_mut_ptr(&self) -> *mut u8;

    /// Length of one copy in bytes.
    fn len(&self) -> usize;

    /// True if the region is empty (never the case for a live buffer).
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(unix)]
mod mirrored {
    use super::DoubleMappedRegion;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    /// Two adjacent shared mappings of one file descriptor.
    pub(super) struct MirroredMapping {
        base: *mut u8,
        len: usize,
        backend: &'static str,
    }

    // SAFETY: the mapping is process-wide memory owned by this value; access
    // discipline (who may touch which bytes) is enforced by the buffer layer.
    unsafe impl Send for MirroredMapping {}
    // SAFETY: see above; the struct itself holds no interior state.
    unsafe impl Sync for MirroredMapping {}

    impl DoubleMappedRegion for MirroredMapping {
        fn backend(&self) -> &'static str {
            self.backend
        }

        fn as_mut_ptr(&self) -> *mut u8 {
            self.base
        }

        fn len(&self) -> usize {
            self.len
        }
    }

    impl Drop for MirroredMapping {
        fn drop(&mut self) {
            // SAFETY: base/len describe exactly the reservation made in `mirror`.
            unsafe {
                libc::munmap(self.base.cast(), self.len * 2);
            }
        }
    }

    /// Sizes `fd` to `len` bytes and maps it twice at adjacent addresses.
    pub(super) fn mirror(
        fd: OwnedFd,
        len: usize,
        backend: &'static str,
    ) -> std::io::Result<MirroredMapping> {
        // SAFETY: fd is a valid, owned descriptor; every mmap result is checked
        // against MAP_FAILED and the reservation is released on any failure.
        unsafe {
            if libc::ftruncate(fd.as_raw_fd(), len as libc::off_t) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            let reserve = libc::mmap(
                core::ptr::null_mut(),
                len * 2,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            );
            if reserve == libc::MAP_FAILED {
                return Err(std::io::Error::last_os_error());
            }

            for half in 0..2 {
                let addr = reserve.cast::<u8>().add(half * len);
                let mapped = libc::mmap(
                    addr.cast(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED | libc::MAP_FIXED,
                    fd.as_raw_fd(),
                    0,
                );
                if mapped == libc::MAP_FAILED {
                    let err = std::io::Error::last_os_error();
                    libc::munmap(reserve, len * 2);
                    return Err(err);
                }
            }

            // The mappings keep the object alive; the descriptor can go.
            drop(fd);
            Ok(MirroredMapping {
                base: reserve.cast(),
                len,
                backend,
            })
        }
    }

    #[cfg(target_os = "linux")]
    pub(super) fn memfd(len: usize) -> std::io::Result<MirroredMapping> {
        // SAFETY: the name is a valid NUL-terminated string; the result is checked.
        let raw = unsafe { libc::memfd_create(c"rivulet-buffer".as_ptr(), libc::MFD_CLOEXEC) };
        if raw < 0 {
            return Err(std::io::Error::last_os_error());
        }
        // SAFETY: raw is a freshly created descriptor we exclusively own.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        mirror(fd, len, "memfd")
    }

    pub(super) fn posix_shm(len: usize) -> std::io::Result<MirroredMapping> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);

        let name = format!(
            "/rivulet-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        );
        let cname = std::ffi::CString::new(name)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        #[cfg(target_os = "macos")]
        let mode = 0o600 as libc::c_uint;
        #[cfg(not(target_os = "macos"))]
        let mode: libc::mode_t = 0o600;

        // SAFETY: cname is NUL-terminated; the result is checked.
        let raw = unsafe {
            libc::shm_open(
                cname.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                mode,
            )
        };
        if raw < 0 {
            return Err(std::io::Error::last_os_error());
        }
        // SAFETY: unlinking only removes the name; the open descriptor stays valid.
        unsafe {
            libc::shm_unlink(cname.as_ptr());
        }
        // SAFETY: raw is a freshly opened descriptor we exclusively own.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        mirror(fd, len, "posix-shm")
    }
}

/// Allocates a double-mapped region of `len` bytes per copy.
///
/// `len` must be a non-zero multiple of [`page_size()`].
///
/// # Errors
///
/// [`BufferError::MappingUnavailable`] if no backend can provide the mapping.
/// This is a capability error, not a transient one.
pub fn allocate_double_mapped(len: usize) -> Result<Box<dyn DoubleMappedRegion>, BufferError> {
    if len == 0 || len % page_size() != 0 {
        return Err(BufferError::MappingUnavailable {
            reason: format!(
                "region length {len} is not a positive multiple of the page size {}",
                page_size()
            ),
        });
    }

    #[cfg(unix)]
    {
        let mut failures: Vec<String> = Vec::new();

        #[cfg(target_os = "linux")]
        match mirrored::memfd(len) {
            Ok(region) => return Ok(Box::new(region)),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("double_map: memfd backend failed: {e}");
                failures.push(format!("memfd: {e}"));
            }
        }

        match mirrored::posix_shm(len) {
            Ok(region) => return Ok(Box::new(region)),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("double_map: posix-shm backend failed: {e}");
                failures.push(format!("posix-shm: {e}"));
            }
        }

        Err(BufferError::MappingUnavailable {
            reason: failures.join("; "),
        })
    }

    #[cfg(not(unix))]
    {
        Err(BufferError::MappingUnavailable {
            reason: "no shared-memory primitive on this platform".to_string(),
        })
    }
}

/// Single flat mapping used by single-mapped buffers.
pub struct FlatRegion {
    _map: memmap2::MmapMut,
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the region is plain anonymous memory owned by this value; the buffer
// layer decides which bytes each party may touch.
unsafe impl Send for FlatRegion {}
// SAFETY: see above.
unsafe impl Sync for FlatRegion {}

impl FlatRegion {
    /// Maps `len` zeroed bytes of anonymous memory.
    pub fn new(len: usize) -> Result<Self, BufferError> {
        let mut map = memmap2::MmapMut::map_anon(len).map_err(|source| BufferError::Allocation {
            bytes: len,
            source,
        })?;
        let ptr = map.as_mut_ptr();
        Ok(Self {
            _map: map,
            ptr,
            len,
        })
    }

    /// Start of the region.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for an empty region.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
