//! Configuration front-end for a small static-files and CGI Web server.
//!
//! A configuration holds one or more server blocks, each with any number of
//! location blocks:
//!
//! ```text
//! server: {
//!     listen: 8080;                   # or `127.0.0.1:8080`, or `::1 8080`
//!     server_name: localhost;
//!     error_page: 404 /errors/404.html;
//!     client_max_body_size: 1m;
//!
//!     location: / [
//!         root: /var/www/html;
//!         limit_except: GET;
//!         auto_index: on;
//!     ]
//! }
//! ```
//!
//! Every directive sits on a line of its own and ends with `;`, blocks open
//! at the end of a line, and `#` starts a comment. `listen:` and
//! `server_name:` are required in each server block.
//!
//! `config::load_file` turns such a file into one `config::ServerConf` per
//! server block. A `ServerConf` can also be built or edited directly through
//! its methods, and its `Display` output is a human-readable dump.

#[macro_use] extern crate log;

pub mod config;
pub mod errors;
pub mod log_util;
