use std::convert::Infallible;
use std::ffi::{CStr, CString, NulError, OsStr};
use std::io::Error as IoError;
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use libc::c_char;
use log::debug;
use thiserror::Error;

/// Maximum number of trailing arguments accepted: the target path
/// and one argument passed to it.
pub const MAX_ARGS: usize = 2;

#[derive(Error, Debug)]
pub enum Error {
    #[error("expecting a target path and at most one argument, got {0} argument(s)")]
    Usage(usize),
    #[error("string contains a nul byte: {0}")]
    Nul(#[from] NulError),
    #[error("invalid environment entry (expecting KEY=VALUE): {0}")]
    InvalidEnv(String),
    #[error("execve failed: {0}")]
    Exec(#[from] IoError),
}

impl Error {
    #[inline(always)]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

#[inline]
fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect()
}

/// Argument vector handed to the new program image. The first
/// entry is the target path, which becomes the program's `argv[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgList {
    args: Vec<CString>,
}

impl ArgList {
    /// Builds an argument list out of the trailing command line
    /// arguments. One or two arguments are expected.
    pub fn from_args<I, S>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();

        if args.is_empty() || args.len() > MAX_ARGS {
            return Err(Error::Usage(args.len()));
        }

        Ok(Self {
            args: args
                .iter()
                .map(|a| CString::new(a.as_ref().as_bytes()))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &CStr {
        // from_args never builds an empty list
        &self.args[0]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.args.iter().map(|a| a.as_c_str())
    }

    /// Null terminated pointer array. Pointers are valid as long
    /// as `self` is alive.
    pub fn as_ptrs(&self) -> Vec<*const c_char> {
        null_terminated(&self.args)
    }
}

/// Environment handed to the new program image. It replaces the
/// environment of the calling process entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvList {
    entries: Vec<CString>,
}

impl EnvList {
    pub fn new<I, S>(entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = vec![];

        for e in entries {
            let e = e.as_ref();
            match e.split_once('=') {
                Some((key, _)) if !key.is_empty() => out.push(CString::new(e)?),
                _ => return Err(Error::InvalidEnv(e.into())),
            }
        }

        Ok(Self { entries: out })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.entries.iter().map(|e| e.as_c_str())
    }

    pub fn as_ptrs(&self) -> Vec<*const c_char> {
        null_terminated(&self.entries)
    }
}

/// Replaces the current process image with the program at `args.path()`.
/// This function only returns if `execve` failed, with the
/// corresponding OS error.
pub fn execve(args: &ArgList, env: &EnvList) -> IoError {
    let argv = args.as_ptrs();
    let envp = env.as_ptrs();

    unsafe { libc::execve(args.path().as_ptr(), argv.as_ptr(), envp.as_ptr()) };

    IoError::last_os_error()
}

/// Validates the trailing command line arguments and replaces the
/// current process with the target. Never returns on success.
pub fn run<I, S>(args: I, env: &EnvList) -> Result<Infallible, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args = ArgList::from_args(args)?;

    debug!(
        "executing {:?} with argc={} and {} environment entries",
        args.path(),
        args.len(),
        env.len()
    );

    Err(Error::Exec(execve(&args, env)))
}
