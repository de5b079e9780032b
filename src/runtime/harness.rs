//! In-sandbox harness source generation
//!
//! The harness is the only thing the interpreter is given to run. It compiles
//! the submission, builds a namespace holding nothing but the allow-listed
//! builtins and a guarded importer, executes, and reports how the run ended
//! through a closed set of exit codes plus a final one-line diagnostic on
//! stderr. The submission itself is embedded as a string literal, so nothing
//! it contains is ever parsed as part of the harness.

use crate::classify::{EXIT_CAPABILITY, EXIT_FAULT, EXIT_RESOURCE, EXIT_SYNTAX};
use crate::policy::{CapabilityPolicy, ALLOWED_BUILTINS};

const TEMPLATE: &str = r#"import builtins as _builtins
import sys as _sys

_ALLOWED_MODULES = frozenset([@MODULES@])
_ALLOWED_BUILTINS = frozenset([@BUILTINS@])


class _CapabilityError(BaseException):
    pass


def _fail(code, message):
    try:
        _sys.stdout.flush()
    except Exception:
        pass
    _sys.stderr.write("\n" + " ".join(str(message).splitlines()) + "\n")
    _sys.stderr.flush()
    _sys.exit(code)


_real_import = _builtins.__import__

# sticky record of the first denial, so a submission that swallows the
# exception still classifies as a violation
_violation = []


def _guarded_import(name, globals=None, locals=None, fromlist=(), level=0):
    root = name.split(".")[0]
    if level != 0 or root not in _ALLOWED_MODULES:
        message = "capability '%s' not permitted" % root
        _violation.append(message)
        raise _CapabilityError(message)
    return _real_import(name, globals, locals, fromlist, level)


try:
    _code = compile(@SOURCE@, "<submission>", "exec")
except SyntaxError as exc:
    _fail(@EXIT_SYNTAX@, "syntax error: %s (line %s)" % (exc.msg, exc.lineno))
except ValueError as exc:
    _fail(@EXIT_SYNTAX@, "syntax error: %s" % exc)
except MemoryError:
    _fail(@EXIT_RESOURCE@, "memory limit exceeded")

_safe = {}
for _name in _ALLOWED_BUILTINS:
    if hasattr(_builtins, _name):
        _safe[_name] = getattr(_builtins, _name)
_safe["__import__"] = _guarded_import

try:
    exec(_code, {"__builtins__": _safe, "__name__": "__main__"})
except _CapabilityError as exc:
    _fail(@EXIT_CAPABILITY@, exc)
except NameError as exc:
    _name = getattr(exc, "name", None)
    if _name is None:
        _parts = str(exc).split("'")
        if len(_parts) >= 2:
            _name = _parts[1]
    if _name and hasattr(_builtins, _name) and _name not in _ALLOWED_BUILTINS:
        _fail(@EXIT_CAPABILITY@, "capability '%s' not permitted" % _name)
    if _violation:
        _fail(@EXIT_CAPABILITY@, _violation[0])
    _fail(@EXIT_FAULT@, "%s: %s" % (type(exc).__name__, exc))
except MemoryError:
    _fail(@EXIT_RESOURCE@, "memory limit exceeded")
except SystemExit:
    pass
except BaseException as exc:
    if _violation:
        _fail(@EXIT_CAPABILITY@, _violation[0])
    _fail(@EXIT_FAULT@, "%s: %s" % (type(exc).__name__, exc))

if _violation:
    _fail(@EXIT_CAPABILITY@, _violation[0])

_sys.stdout.flush()
_sys.stderr.flush()
"#;

/// Render the harness for one submission under the given policy
pub(crate) fn render(code: &str, policy: &CapabilityPolicy) -> String {
    let modules = quote_list(&policy.module_names());
    let builtins = quote_list(ALLOWED_BUILTINS);
    // a JSON string literal is also a valid interpreter string literal
    let source = serde_json::to_string(code).unwrap_or_else(|_| "\"\"".to_string());

    // the submission literal goes in last so its content is never
    // re-scanned for placeholders
    TEMPLATE
        .replace("@MODULES@", &modules)
        .replace("@BUILTINS@", &builtins)
        .replace("@EXIT_SYNTAX@", &EXIT_SYNTAX.to_string())
        .replace("@EXIT_CAPABILITY@", &EXIT_CAPABILITY.to_string())
        .replace("@EXIT_FAULT@", &EXIT_FAULT.to_string())
        .replace("@EXIT_RESOURCE@", &EXIT_RESOURCE.to_string())
        .replace("@SOURCE@", &source)
}

fn quote_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
