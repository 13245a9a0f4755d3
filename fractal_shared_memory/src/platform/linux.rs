//! Linux-specific shared memory and named semaphore operations

use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::ptr::NonNull;
use std::time::Duration;

/// Open an existing shared memory object read-only. Never creates it.
pub fn open_region_readonly(name: &str) -> io::Result<File> {
    let fd = shm_open(name, OFlag::O_RDONLY, Mode::empty()).map_err(io::Error::from)?;
    Ok(File::from(fd))
}

/// Create (or open) a shared memory object read-write and size it to `len`.
pub fn create_region(name: &str, len: usize) -> io::Result<File> {
    let fd = shm_open(
        name,
        OFlag::O_CREAT | OFlag::O_RDWR,
        Mode::S_IRUSR | Mode::S_IWUSR,
    )
    .map_err(io::Error::from)?;
    let file = File::from(fd);
    file.set_len(len as u64)?;
    Ok(file)
}

/// Remove the name of a shared memory object. Existing mappings stay valid.
pub fn unlink_region(name: &str) -> io::Result<()> {
    shm_unlink(name).map_err(io::Error::from)
}

/// State of a shared memory object as seen through an open descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionProbe {
    /// Current object size in bytes.
    pub len: u64,
    /// False once the object's name has been unlinked.
    pub linked: bool,
}

/// `fstat` the descriptor. Bounded and non-blocking on tmpfs.
pub fn probe_region(file: &File) -> io::Result<RegionProbe> {
    let meta = file.metadata()?;
    Ok(RegionProbe {
        len: meta.len(),
        linked: meta.nlink() > 0,
    })
}

/// POSIX named semaphore used as a binary signal.
#[derive(Debug)]
pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: CString,
    created: bool,
}

// The semaphore handle is process-wide; moving it between threads is fine.
unsafe impl Send for NamedSemaphore {}

impl NamedSemaphore {
    /// Open the semaphore, creating it with value 0 if it does not exist.
    pub fn open_or_create(name: &str) -> io::Result<Self> {
        let c_name = CString::new(name)?;
        let mode = (libc::S_IRUSR | libc::S_IWUSR) as libc::c_uint;

        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                mode,
                0 as libc::c_uint,
            )
        };
        if sem != libc::SEM_FAILED {
            return Self::wrap(sem, c_name, true);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EEXIST) {
            return Err(err);
        }
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        Self::wrap(sem, c_name, false)
    }

    /// Open an existing semaphore. Fails with `NotFound` if absent.
    pub fn open_existing(name: &str) -> io::Result<Self> {
        let c_name = CString::new(name)?;
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        Self::wrap(sem, c_name, false)
    }

    fn wrap(sem: *mut libc::sem_t, name: CString, created: bool) -> io::Result<Self> {
        let sem = NonNull::new(sem)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "sem_open returned null"))?;
        Ok(Self { sem, name, created })
    }

    /// True if this handle created the object.
    pub fn created(&self) -> bool {
        self.created
    }

    /// Current semaphore value.
    pub fn value(&self) -> io::Result<i32> {
        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(value)
    }

    /// Post only if the value is 0, keeping the signal binary.
    ///
    /// Returns `true` if a post happened. Check-then-post is not atomic; a
    /// concurrent second poster can push the value to 2, which waiters
    /// observe as two pulses.
    pub fn post_if_clear(&self) -> io::Result<bool> {
        if self.value()? > 0 {
            return Ok(false);
        }
        if unsafe { libc::sem_post(self.sem.as_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(true)
    }

    /// Consume one pulse if available, without blocking.
    pub fn try_wait(&self) -> io::Result<bool> {
        loop {
            if unsafe { libc::sem_trywait(self.sem.as_ptr()) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(err),
            }
        }
    }

    /// Wait up to `timeout` for one pulse. Returns `false` on timeout.
    pub fn timed_wait(&self, timeout: Duration) -> io::Result<bool> {
        let deadline = realtime_deadline(timeout)?;
        loop {
            if unsafe { libc::sem_timedwait(self.sem.as_ptr(), &deadline) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ETIMEDOUT) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(err),
            }
        }
    }

    /// Remove the semaphore's name.
    pub fn unlink(&self) -> io::Result<()> {
        if unsafe { libc::sem_unlink(self.name.as_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem.as_ptr());
        }
    }
}

/// Absolute `CLOCK_REALTIME` deadline, as `sem_timedwait` expects.
fn realtime_deadline(timeout: Duration) -> io::Result<libc::timespec> {
    let mut now: libc::timespec = unsafe { std::mem::zeroed() };
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } == -1 {
        return Err(io::Error::last_os_error());
    }

    let total_nanos = now.tv_nsec as u64 + u64::from(timeout.subsec_nanos());
    let mut deadline: libc::timespec = unsafe { std::mem::zeroed() };
    deadline.tv_sec = now.tv_sec
        + timeout.as_secs() as libc::time_t
        + (total_nanos / 1_000_000_000) as libc::time_t;
    deadline.tv_nsec = (total_nanos % 1_000_000_000) as _;
    Ok(deadline)
}
