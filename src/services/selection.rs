use regex::Regex;
use std::sync::LazyLock;

static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?:(?P<user>[^@/]*)@)?(?P<host>[^/]*)(?P<path>/.*)?$")
        .expect("Invalid URI regex")
});

/// One file or folder of the file-manager selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedItem {
    uri: String,
    scheme: String,
    user: String,
    host: String,
    path: String,
    mimetype: String,
    is_dir: bool,
}

impl SelectedItem {
    /// Build from a URI (`file:///home/user/a.txt`, `sftp://me@host/srv`).
    ///
    /// A bare absolute path is taken as a `file` URI.
    pub fn new(uri: &str, mimetype: &str, is_dir: bool) -> Self {
        let (uri, scheme, user, host, path) = match URI_PATTERN.captures(uri) {
            Some(caps) => {
                let get = |name: &str| caps.name(name).map_or("", |m| m.as_str()).to_string();
                let path = caps.name("path").map_or("/", |m| m.as_str()).to_string();
                (uri.to_string(), get("scheme"), get("user"), get("host"), path)
            }
            None => (
                format!("file://{uri}"),
                "file".to_string(),
                String::new(),
                String::new(),
                uri.to_string(),
            ),
        };

        Self {
            uri,
            scheme,
            user,
            host,
            path,
            mimetype: mimetype.to_string(),
            is_dir,
        }
    }

    pub fn file(path: &str, mimetype: &str) -> Self {
        Self::new(path, mimetype, false)
    }

    pub fn dir(path: &str) -> Self {
        Self::new(path, "inode/directory", true)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path component, without scheme and host.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Last path component, ignoring a trailing separator.
    pub fn basename(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Parent folder of the path; `/` for top-level entries.
    pub fn dirname(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) | None => "/",
            Some(index) => &trimmed[..index],
        }
    }
}
