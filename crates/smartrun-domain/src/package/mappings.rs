use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Import names whose distribution on the package index is named differently.
pub static KNOWN_MAPPINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("cv2", "opencv-python"),
        ("sklearn", "scikit-learn"),
        ("skimage", "scikit-image"),
        ("yaml", "PyYAML"),
        ("PIL", "Pillow"),
        ("bs4", "beautifulsoup4"),
        ("dateutil", "python-dateutil"),
        ("dotenv", "python-dotenv"),
        ("Crypto", "pycryptodome"),
        ("Cryptodome", "pycryptodomex"),
        ("jwt", "PyJWT"),
        ("serial", "pyserial"),
        ("usb", "pyusb"),
        ("OpenSSL", "pyOpenSSL"),
        ("attr", "attrs"),
        ("magic", "python-magic"),
        ("docx", "python-docx"),
        ("pptx", "python-pptx"),
        ("fitz", "PyMuPDF"),
        ("Levenshtein", "python-Levenshtein"),
        ("MySQLdb", "mysqlclient"),
        ("win32api", "pywin32"),
        ("win32con", "pywin32"),
        ("win32com", "pywin32"),
        ("pythoncom", "pywin32"),
        ("telegram", "python-telegram-bot"),
        ("gi", "PyGObject"),
        ("wx", "wxPython"),
        ("zmq", "pyzmq"),
        ("faiss", "faiss-cpu"),
        ("sentence_transformers", "sentence-transformers"),
        ("google_auth_oauthlib", "google-auth-oauthlib"),
        ("googleapiclient", "google-api-python-client"),
        ("slugify", "python-slugify"),
        ("multipart", "python-multipart"),
        ("jose", "python-jose"),
        ("ldap", "python-ldap"),
        ("Xlib", "python-xlib"),
        ("git", "GitPython"),
        ("github", "PyGithub"),
        ("nacl", "PyNaCl"),
        ("kafka", "kafka-python"),
        ("snappy", "python-snappy"),
        ("markdown", "Markdown"),
        ("sklearn_crfsuite", "sklearn-crfsuite"),
    ]
    .into_iter()
    .collect()
});

/// Returns the distribution known to provide `module`, if it differs from the
/// module name.
#[must_use]
pub fn known_mapping(module: &str) -> Option<&'static str> {
    KNOWN_MAPPINGS.get(module).copied()
}

/// Resolves an importable name to its distribution name; unmapped names are
/// their own distribution.
#[must_use]
pub fn distribution_for(module: &str) -> &str {
    known_mapping(module).unwrap_or(module)
}
