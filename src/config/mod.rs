//! Server configuration model and its textual front-end
//!
//! Text flows `lexer` → `parser` (structure, directive dispatch through
//! `rules`) → `ServerData` → `ServerConf::from_server_data`, after which the
//! rest of the server only reads the model through `ServerConf::server`.

pub mod address;
pub mod collections;
pub mod lexer;
pub mod parser;
pub mod rules;
pub mod server_conf;

pub use self::address::{Address, Family, HostAddr};
pub use self::parser::{parse_config, parse_location_directive, parse_server_directive,
                       ServerData};
pub use self::server_conf::ServerConf;

use self::collections::CodeMap;
use crate::errors::Result;

use std::fs;
use std::path::Path;

/// Everything one virtual server is configured with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerBlock {
    /// Listen port and host, one address family active at a time
    pub address: Address,
    /// Host names this server answers to, in declaration order
    pub server_names: Vec<String>,
    /// Pages served for a status code
    pub error_pages: CodeMap,
    /// Upper bound on request body size
    pub max_body_bytes: u64,
    /// Server-wide redirections by status code
    pub redirects: CodeMap,
    /// Index files tried when a location names none
    pub default_indexes: Vec<String>,
    /// Routing rules, in creation order
    pub locations: Vec<LocationBlock>,
}

/// A routing rule for one path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationBlock {
    pub path: String,
    pub root_dir: String,
    pub upload_dir: String,
    pub allow_get: bool,
    pub allow_post: bool,
    pub allow_delete: bool,
    pub auto_index: bool,
    pub indexes: Vec<String>,
    pub cgi_langs: Vec<String>,
    pub redirects: CodeMap,
}

impl LocationBlock {
    /// A fresh block with the given path and directories and every other
    /// field at its default.
    pub fn with_dirs(path: &str, root_dir: &str, upload_dir: &str) -> LocationBlock {
        LocationBlock {
            path: path.to_owned(),
            root_dir: root_dir.to_owned(),
            upload_dir: upload_dir.to_owned(),
            ..Default::default()
        }
    }

    pub fn allows(&self, method: Method) -> bool {
        match method {
            Method::Get => self.allow_get,
            Method::Post => self.allow_post,
            Method::Delete => self.allow_delete,
        }
    }

    fn permission_mut(&mut self, method: Method) -> &mut bool {
        match method {
            Method::Get => &mut self.allow_get,
            Method::Post => &mut self.allow_post,
            Method::Delete => &mut self.allow_delete,
        }
    }

    pub fn allow(&mut self, method: Method) {
        *self.permission_mut(method) = true;
    }

    pub fn flip(&mut self, method: Method) {
        let flag = self.permission_mut(method);
        *flag = !*flag;
    }
}

/// The request methods a location can permit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    /// Map the numeric selector used by `ServerConf::flip_permissions`:
    /// 0 is GET, 1 is POST, 2 is DELETE.
    pub fn from_index(index: u32) -> Option<Method> {
        match index {
            0 => Some(Method::Get),
            1 => Some(Method::Post),
            2 => Some(Method::Delete),
            _ => None,
        }
    }

    /// Case-insensitive method name lookup
    pub fn from_name(name: &str) -> Option<Method> {
        if name.eq_ignore_ascii_case("GET") {
            Some(Method::Get)
        } else if name.eq_ignore_ascii_case("POST") {
            Some(Method::Post)
        } else if name.eq_ignore_ascii_case("DELETE") {
            Some(Method::Delete)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// Parse every server block in `text` and build a `ServerConf` for each.
pub fn load_str(text: &str) -> Result<Vec<ServerConf>> {
    parse_config(text)?
        .into_iter()
        .map(ServerConf::from_server_data)
        .collect()
}

/// Read and parse a configuration file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<ServerConf>> {
    let text = fs::read_to_string(path)?;
    load_str(&text)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::Error;

    const SAMPLE: &str = include_str!("../../conf/default.conf");

    #[test]
    fn sample_config_loads() {
        let servers = load_str(SAMPLE).unwrap();
        assert_eq!(servers.len(), 2);

        let main = servers[0].server();
        assert_eq!(main.address.port(), 8080);
        assert_eq!(main.address.host().to_string(), "127.0.0.1");
        assert_eq!(main.server_names, vec!["localhost", "example.com"]);
        assert_eq!(main.max_body_bytes, 1024 * 1024);
        assert_eq!(main.error_pages[&404], vec!["/errors/404.html"]);
        assert_eq!(main.error_pages[&500], vec!["/errors/50x.html"]);
        assert_eq!(main.default_indexes, vec!["index.html"]);

        let paths: Vec<&str> = main.locations.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/upload", "/cgi-bin", "/old"]);

        let upload = servers[0].find_location("/upload").unwrap();
        assert!(upload.allow_post && upload.allow_delete && !upload.allow_get);
        assert_eq!(upload.upload_dir, "/var/www/uploads");

        let old = servers[0].find_location("/old").unwrap();
        assert_eq!(old.redirects[&301], vec!["/"]);

        let ipv6 = servers[1].server();
        assert_eq!(ipv6.address.family(), Family::Inet6);
        assert_eq!(ipv6.address.port(), 8081);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        match load_file("/nonexistent/http-server/server.conf") {
            Err(Error::Io(_)) => (),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn method_selectors() {
        assert_eq!(Method::from_index(0), Some(Method::Get));
        assert_eq!(Method::from_index(2), Some(Method::Delete));
        assert_eq!(Method::from_index(3), None);
        assert_eq!(Method::from_name("post"), Some(Method::Post));
        assert_eq!(Method::from_name("PUT"), None);
    }

    #[test]
    fn flipping_a_permission_twice_restores_it() {
        let mut loc = LocationBlock::with_dirs("/a", "/srv", "/tmp");
        loc.flip(Method::Delete);
        assert!(loc.allows(Method::Delete));
        loc.flip(Method::Delete);
        assert!(!loc.allows(Method::Delete));
        assert!(!loc.allow_get && !loc.allow_post);
    }
}
