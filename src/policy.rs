//! Capability allow-list consulted when the sandbox namespace is built
//!
//! Policy is allow-list, not deny-list: the sandbox namespace contains only
//! what is enumerated here. Anything else is absent from the namespace, so
//! submitted code cannot discover it, let alone call it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A standard-library module the sandbox may expose
///
/// Closed enumeration of pure, side-effect-free modules: no filesystem, no
/// process control, no network. A module absent from this enum cannot be
/// named in a policy at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Math,
    Random,
    Statistics,
    String,
    Re,
    Json,
    Itertools,
    Functools,
    Collections,
    Heapq,
    Bisect,
    Datetime,
    Decimal,
    Fractions,
}

impl Capability {
    /// Module name as the interpreter knows it
    pub fn module_name(self) -> &'static str {
        match self {
            Capability::Math => "math",
            Capability::Random => "random",
            Capability::Statistics => "statistics",
            Capability::String => "string",
            Capability::Re => "re",
            Capability::Json => "json",
            Capability::Itertools => "itertools",
            Capability::Functools => "functools",
            Capability::Collections => "collections",
            Capability::Heapq => "heapq",
            Capability::Bisect => "bisect",
            Capability::Datetime => "datetime",
            Capability::Decimal => "decimal",
            Capability::Fractions => "fractions",
        }
    }

    /// Every capability the engine can grant
    pub fn all() -> [Capability; 14] {
        [
            Capability::Math,
            Capability::Random,
            Capability::Statistics,
            Capability::String,
            Capability::Re,
            Capability::Json,
            Capability::Itertools,
            Capability::Functools,
            Capability::Collections,
            Capability::Heapq,
            Capability::Bisect,
            Capability::Datetime,
            Capability::Decimal,
            Capability::Fractions,
        ]
    }
}

/// Builtins reachable from the sandbox namespace
///
/// Everything not listed is absent. Notably excluded: `open`, `eval`, `exec`,
/// `compile`, `__import__` (replaced by the guarded importer), the
/// reflection set (`getattr`, `setattr`, `delattr`, `hasattr`, `globals`,
/// `locals`, `vars`), and `breakpoint`/`help`/`exit`/`quit`.
pub(crate) const ALLOWED_BUILTINS: &[&str] = &[
    // callables and types
    "abs",
    "all",
    "any",
    "ascii",
    "bin",
    "bool",
    "bytearray",
    "bytes",
    "callable",
    "chr",
    "classmethod",
    "complex",
    "dict",
    "dir",
    "divmod",
    "enumerate",
    "filter",
    "float",
    "format",
    "frozenset",
    "hash",
    "hex",
    "id",
    "input",
    "int",
    "isinstance",
    "issubclass",
    "iter",
    "len",
    "list",
    "map",
    "max",
    "memoryview",
    "min",
    "next",
    "object",
    "oct",
    "ord",
    "pow",
    "print",
    "property",
    "range",
    "repr",
    "reversed",
    "round",
    "set",
    "slice",
    "sorted",
    "staticmethod",
    "str",
    "sum",
    "super",
    "tuple",
    "type",
    "zip",
    // class-statement machinery
    "__build_class__",
    // constants
    "NotImplemented",
    // exception hierarchy, so submissions can use try/except normally
    "BaseException",
    "Exception",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "EOFError",
    "FloatingPointError",
    "GeneratorExit",
    "IndexError",
    "KeyError",
    "KeyboardInterrupt",
    "LookupError",
    "MemoryError",
    "NameError",
    "NotImplementedError",
    "OverflowError",
    "RecursionError",
    "RuntimeError",
    "StopAsyncIteration",
    "StopIteration",
    "TypeError",
    "UnboundLocalError",
    "UnicodeDecodeError",
    "UnicodeEncodeError",
    "UnicodeError",
    "ValueError",
    "ZeroDivisionError",
];

/// The set of capabilities granted to a sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityPolicy {
    /// Importable modules
    #[serde(default = "default_modules")]
    pub modules: BTreeSet<Capability>,
}

fn default_modules() -> BTreeSet<Capability> {
    Capability::all().into_iter().collect()
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self {
            modules: default_modules(),
        }
    }
}

impl CapabilityPolicy {
    /// Policy granting no imports at all; builtins only
    pub fn none() -> Self {
        Self {
            modules: BTreeSet::new(),
        }
    }

    /// Check whether a module name is importable under this policy
    pub fn is_permitted(&self, module: &str) -> bool {
        self.modules.iter().any(|c| c.module_name() == module)
    }

    /// Module names granted by this policy, in stable order
    pub(crate) fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|c| c.module_name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_grants_pure_modules() {
        let policy = CapabilityPolicy::default();
        assert!(policy.is_permitted("math"));
        assert!(policy.is_permitted("json"));
        assert!(policy.is_permitted("collections"));
    }

    #[test]
    fn test_io_modules_are_not_expressible() {
        let policy = CapabilityPolicy::default();
        assert!(!policy.is_permitted("os"));
        assert!(!policy.is_permitted("sys"));
        assert!(!policy.is_permitted("subprocess"));
        assert!(!policy.is_permitted("socket"));
        assert!(!policy.is_permitted("pathlib"));
    }

    #[test]
    fn test_dangerous_builtins_are_absent() {
        for denied in ["open", "eval", "exec", "compile", "__import__", "getattr"] {
            assert!(
                !ALLOWED_BUILTINS.contains(&denied),
                "{denied} must not be allow-listed"
            );
        }
        assert!(ALLOWED_BUILTINS.contains(&"print"));
        assert!(ALLOWED_BUILTINS.contains(&"len"));
        assert!(ALLOWED_BUILTINS.contains(&"ValueError"));
    }

    #[test]
    fn test_empty_policy_permits_nothing() {
        let policy = CapabilityPolicy::none();
        assert!(!policy.is_permitted("math"));
        assert!(policy.module_names().is_empty());
    }

    #[test]
    fn test_policy_round_trips_through_serde() {
        let policy = CapabilityPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"math\""));
        let back: CapabilityPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
