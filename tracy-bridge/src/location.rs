// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Zone identity and the per-call-site interning records.

use std::ffi::{CStr, CString};

use hashbrown::Equivalent;

use crate::backend::ProfilerBackend;
use crate::error::ProfilerError;

/// Where a zone was opened.
///
/// Usually produced by [`call_site!`](macro@crate::call_site), which captures the
/// actual call site; every field can also be supplied by hand when the zone
/// logically belongs somewhere else (generated code, scripting layers).
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub line: u32,
    pub function: &'a str,
    pub source_file: &'a str,
}

/// Owned cache key. Two zones are the same zone iff all four fields match
/// byte for byte; nothing is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ZoneIdentity {
    name: String,
    line: u32,
    function: String,
    source_file: String,
}

/// Borrowed lookup key.
///
/// Field order matches [`ZoneIdentity`] so the derived `Hash` produces the
/// same stream for both; cache lookups rely on that parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ZoneIdentityRef<'a> {
    pub name: &'a str,
    pub line: u32,
    pub function: &'a str,
    pub source_file: &'a str,
}

impl Equivalent<ZoneIdentity> for ZoneIdentityRef<'_> {
    fn equivalent(&self, key: &ZoneIdentity) -> bool {
        self.name == key.name
            && self.line == key.line
            && self.function == key.function
            && self.source_file == key.source_file
    }
}

impl From<&ZoneIdentityRef<'_>> for ZoneIdentity {
    fn from(key: &ZoneIdentityRef<'_>) -> Self {
        Self {
            name: key.name.to_owned(),
            line: key.line,
            function: key.function.to_owned(),
            source_file: key.source_file.to_owned(),
        }
    }
}

/// A zone identity's backend-side record: the owned C-string buffers the
/// backend's interning call was given, the line number, and the opaque
/// token the backend returned.
///
/// The buffers must outlive every use of the token, since the backend may
/// retain references rather than copies. Entries live in the per-thread
/// cache, which never evicts, so the buffers last until the thread exits.
#[derive(Debug)]
pub struct InternedLocation {
    line: u32,
    token: u64,
    name: CString,
    function: CString,
    source_file: CString,
}

impl InternedLocation {
    /// Converts the identity's strings to owned C buffers and asks the
    /// backend to intern them. This is the only allocation on the zone-open
    /// path, paid once per distinct call site.
    pub(crate) fn derive(
        backend: &dyn ProfilerBackend,
        name: &str,
        site: CallSite<'_>,
    ) -> Result<Self, ProfilerError> {
        let name = CString::new(name)?;
        let function = CString::new(site.function)?;
        let source_file = CString::new(site.source_file)?;
        let token = backend.intern_location(site.line, &name, &function, &source_file);
        Ok(Self {
            line: site.line,
            token,
            name,
            function,
            source_file,
        })
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// The backend's opaque token for this location.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn name(&self) -> &CStr {
        &self.name
    }

    pub fn function(&self) -> &CStr {
        &self.function
    }

    pub fn source_file(&self) -> &CStr {
        &self.source_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoopBackend;
    use std::hash::{BuildHasher, BuildHasherDefault};

    const SITE: CallSite<'static> = CallSite {
        line: 42,
        function: "sim::step",
        source_file: "sim.rs",
    };

    fn sample_ref() -> ZoneIdentityRef<'static> {
        ZoneIdentityRef {
            name: "integrate",
            line: SITE.line,
            function: SITE.function,
            source_file: SITE.source_file,
        }
    }

    #[test]
    fn borrowed_and_owned_keys_hash_identically() {
        let hasher = BuildHasherDefault::<rustc_hash::FxHasher>::default();
        let key = sample_ref();
        let owned = ZoneIdentity::from(&key);
        assert_eq!(hasher.hash_one(&key), hasher.hash_one(&owned));
    }

    #[test]
    fn borrowed_key_finds_owned_entry() {
        let mut map = hashbrown::HashMap::new();
        let key = sample_ref();
        map.insert(ZoneIdentity::from(&key), ());
        assert!(map.get(&key).is_some());

        let other = ZoneIdentityRef {
            line: key.line + 1,
            ..key
        };
        assert!(map.get(&other).is_none());
    }

    #[test]
    fn any_single_field_changes_identity() {
        let base = sample_ref();
        let variants = [
            ZoneIdentityRef { name: "solve", ..base },
            ZoneIdentityRef { line: 7, ..base },
            ZoneIdentityRef { function: "sim::solve", ..base },
            ZoneIdentityRef { source_file: "solver.rs", ..base },
        ];
        for variant in variants {
            assert_ne!(ZoneIdentity::from(&variant), ZoneIdentity::from(&base));
        }
    }

    #[test]
    fn derive_owns_nul_terminated_buffers() {
        let location = InternedLocation::derive(&NoopBackend, "integrate", SITE).unwrap();
        assert_eq!(location.line(), 42);
        assert_eq!(location.name(), c"integrate");
        assert_eq!(location.function(), c"sim::step");
        assert_eq!(location.source_file(), c"sim.rs");
    }

    #[test]
    fn derive_rejects_interior_nul() {
        let err = InternedLocation::derive(&NoopBackend, "bad\0name", SITE).unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidString(_)));
    }
}
