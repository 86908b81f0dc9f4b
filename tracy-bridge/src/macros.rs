// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Call-site capture macros.

/// Expands to the fully qualified path of the enclosing function.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn _probe() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        // The probe's type name ends with "::_probe"; strip it.
        let name = type_name_of(_probe);
        &name[..name.len() - "::_probe".len()]
    }};
}

/// Captures the current line, function, and file as a
/// [`CallSite`](crate::CallSite).
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite {
            line: ::core::line!(),
            function: $crate::function_name!(),
            source_file: ::core::file!(),
        }
    };
}

/// Opens a zone bound to the enclosing lexical scope.
///
/// Expands to a [`ProfileScope`](crate::ProfileScope); bind it to keep the
/// zone open for the rest of the scope:
///
/// ```
/// # fn main() -> Result<(), tracy_bridge::ProfilerError> {
/// tracy_bridge::init_thread(Some("worker"))?;
/// {
///     let _zone = tracy_bridge::zone!("decode");
///     // timed as "decode" until the end of this block
/// }
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! zone {
    ($name:expr) => {
        $crate::ProfileScope::new($name, ::core::option::Option::None, $crate::call_site!())
    };
    ($name:expr, $color:expr) => {
        $crate::ProfileScope::new(
            $name,
            ::core::option::Option::Some($color),
            $crate::call_site!(),
        )
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn function_name_resolves_enclosing_fn() {
        let name = crate::function_name!();
        assert!(name.ends_with("function_name_resolves_enclosing_fn"));
    }

    #[test]
    fn call_site_captures_this_file() {
        let site = crate::call_site!();
        assert!(site.source_file.ends_with("macros.rs"));
        assert!(site.line > 0);
        assert!(site.function.contains("call_site_captures_this_file"));
    }
}
