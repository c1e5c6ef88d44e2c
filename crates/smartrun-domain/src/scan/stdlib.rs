use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::python::PythonVersion;

/// Top-level standard-library modules present across every supported 3.x
/// release (3.8 onward).
const COMMON: &[&str] = &[
    "__future__", "_abc", "_ast", "_thread", "abc", "argparse", "array", "ast", "asyncio",
    "atexit", "base64", "bdb", "binascii", "bisect", "builtins", "bz2", "calendar", "cmath",
    "cmd", "code", "codecs", "codeop", "collections", "colorsys", "compileall", "concurrent",
    "configparser", "contextlib", "contextvars", "copy", "copyreg", "cProfile", "csv",
    "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal", "difflib", "dis",
    "doctest", "email", "encodings", "ensurepip", "enum", "errno", "faulthandler", "fcntl",
    "filecmp", "fileinput", "fnmatch", "fractions", "ftplib", "functools", "gc", "getopt",
    "getpass", "gettext", "glob", "grp", "gzip", "hashlib", "heapq", "hmac", "html", "http",
    "idlelib", "imaplib", "importlib", "inspect", "io", "ipaddress", "itertools", "json",
    "keyword", "linecache", "locale", "logging", "lzma", "mailbox", "marshal", "math",
    "mimetypes", "mmap", "modulefinder", "msvcrt", "multiprocessing", "netrc", "ntpath",
    "numbers", "opcode", "operator", "optparse", "os", "pathlib", "pdb", "pickle",
    "pickletools", "pkgutil", "platform", "plistlib", "poplib", "posix", "posixpath",
    "pprint", "profile", "pstats", "pty", "pwd", "py_compile", "pyclbr", "pydoc",
    "pyexpat", "queue", "quopri", "random", "re", "readline", "reprlib", "resource",
    "rlcompleter", "runpy", "sched", "secrets", "select", "selectors", "shelve", "shlex",
    "shutil", "signal", "site", "smtplib", "socket", "socketserver", "sqlite3",
    "sre_compile", "sre_constants", "sre_parse", "ssl", "stat", "statistics", "string",
    "stringprep", "struct", "subprocess", "symtable", "sys", "sysconfig", "syslog",
    "tabnanny", "tarfile", "tempfile", "termios", "textwrap", "this", "threading", "time",
    "timeit", "tkinter", "token", "tokenize", "trace", "traceback", "tracemalloc", "tty",
    "turtle", "turtledemo", "types", "typing", "unicodedata", "unittest", "urllib", "uuid",
    "venv", "warnings", "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref",
    "xml", "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib",
];

/// Modules dropped in 3.12.
const REMOVED_IN_3_12: &[&str] = &["asynchat", "asyncore", "distutils", "imp", "smtpd"];

/// Modules dropped in 3.13.
const REMOVED_IN_3_13: &[&str] = &[
    "aifc", "audioop", "cgi", "cgitb", "chunk", "crypt", "imghdr", "lib2to3", "mailcap",
    "msilib", "nis", "nntplib", "ossaudiodev", "pipes", "sndhdr", "spwd", "sunau",
    "telnetlib", "uu", "xdrlib",
];

/// Modules added after 3.8, with the release that introduced them.
const ADDED: &[(&str, u8)] = &[
    ("graphlib", 9),
    ("zoneinfo", 9),
    ("tomllib", 11),
    ("_interpreters", 13),
];

static COMMON_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| COMMON.iter().copied().collect());

/// Whether `module` ships with the given interpreter version.
#[must_use]
pub fn is_stdlib(module: &str, version: PythonVersion) -> bool {
    if COMMON_SET.contains(module) {
        return true;
    }
    if REMOVED_IN_3_12.contains(&module) {
        return !version.at_least(3, 12);
    }
    if REMOVED_IN_3_13.contains(&module) {
        return !version.at_least(3, 13);
    }
    ADDED
        .iter()
        .any(|(name, minor)| *name == module && version.at_least(3, *minor))
}
