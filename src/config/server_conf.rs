//! The per-server configuration builder
//!
//! `ServerConf` owns one `ServerBlock` and is the only way the rest of the
//! server changes it. Location mutators follow a find-or-create pattern: the
//! target location is looked up by path and, when missing, a fresh block is
//! appended first. Which fields a fresh block starts from depends on the
//! operation, see each method.

use super::address::Family;
use super::collections::{check_range, insert_code, insert_unique, remove_code_value,
                         remove_first};
use super::parser::ServerData;
use super::{LocationBlock, Method, ServerBlock};
use crate::errors::{Error, Result};

use std::fmt;
use std::ops::Range;
use std::slice;

/// One server's configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConf {
    server_block: ServerBlock,
}

impl From<ServerBlock> for ServerConf {
    fn from(block: ServerBlock) -> ServerConf {
        ServerConf { server_block: block }
    }
}

impl ServerConf {
    pub fn new() -> ServerConf {
        Default::default()
    }

    /// Build a configuration from a parsed server block.
    ///
    /// Server-scope settings are applied in source order, then the parsed
    /// locations are appended as they appeared.
    pub fn from_server_data(data: ServerData) -> Result<ServerConf> {
        let mut conf = ServerConf::new();

        for setting in &data.settings {
            debug!("applying {:?}", setting);
            setting.apply_to(&mut conf)?;
        }
        for (path, mut location) in data.locations {
            location.path = path;
            conf.add_location(location);
        }

        Ok(conf)
    }

    /// Read-only view of the whole server block
    pub fn server(&self) -> &ServerBlock {
        &self.server_block
    }

    pub fn locations(&self) -> slice::Iter<LocationBlock> {
        self.server_block.locations.iter()
    }

    pub fn locations_mut(&mut self) -> slice::IterMut<LocationBlock> {
        self.server_block.locations.iter_mut()
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.server_block.locations.iter().position(|l| l.path == path)
    }

    /// First location whose path is exactly `path`
    pub fn find_location(&self, path: &str) -> Option<&LocationBlock> {
        self.server_block.locations.iter().find(|l| l.path == path)
    }

    pub fn find_location_mut(&mut self, path: &str) -> Option<&mut LocationBlock> {
        self.server_block.locations.iter_mut().find(|l| l.path == path)
    }

    /// Look `dst` up, appending `create()` if it isn't there.
    fn find_or_create<F>(&mut self, dst: &str, create: F) -> &mut LocationBlock
        where F: FnOnce() -> LocationBlock
    {
        let idx = match self.position(dst) {
            Some(idx) => idx,
            None => {
                self.server_block.locations.push(create());
                self.server_block.locations.len() - 1
            }
        };
        &mut self.server_block.locations[idx]
    }

    // Server block modifiers

    /// Fails with `PortOutOfRange` above 65535, leaving the old port in place.
    pub fn set_port(&mut self, port: u32) -> Result<()> {
        self.server_block.address.set_port(port)
    }

    /// Parse `host` as an address of `family` and switch to that family.
    pub fn set_host(&mut self, host: &str, family: Family) -> Result<()> {
        self.server_block.address.set_host(host, family)
    }

    pub fn add_serv_name(&mut self, name: &str) {
        insert_unique(&mut self.server_block.server_names, name);
    }

    pub fn erase_serv_name(&mut self, name: &str) {
        remove_first(&mut self.server_block.server_names, name);
    }

    pub fn erase_serv_names(&mut self, range: Range<usize>) -> Result<()> {
        check_range(&range, self.server_block.server_names.len())?;
        self.server_block.server_names.drain(range);
        Ok(())
    }

    pub fn add_error_page(&mut self, code: u16, path: &str) {
        insert_code(&mut self.server_block.error_pages, code, path);
    }

    pub fn erase_error_page(&mut self, code: u16, name: &str) {
        remove_code_value(&mut self.server_block.error_pages, code, name);
    }

    /// Erase a range of the pages configured for `code`.
    ///
    /// Fails with `MissingErrorPage` when `code` has no pages at all.
    pub fn erase_error_pages(&mut self, code: u16, range: Range<usize>) -> Result<()> {
        let pages = self.server_block.error_pages.get_mut(&code)
            .ok_or(Error::MissingErrorPage(code))?;
        check_range(&range, pages.len())?;
        pages.drain(range);
        Ok(())
    }

    pub fn set_max_bytes(&mut self, bytes: u64) {
        self.server_block.max_body_bytes = bytes;
    }

    /// Add a server-wide redirection target for `code`.
    pub fn add_redir(&mut self, code: u16, path: &str) {
        insert_code(&mut self.server_block.redirects, code, path);
    }

    /// Add a server-wide default index.
    pub fn add_index(&mut self, name: &str) {
        insert_unique(&mut self.server_block.default_indexes, name);
    }

    // Location block modifiers

    /// Append `block` as is, without checking its path.
    pub fn add_location(&mut self, block: LocationBlock) -> &mut LocationBlock {
        let locations = &mut self.server_block.locations;
        locations.push(block);
        let last = locations.len() - 1;
        &mut locations[last]
    }

    /// Rename location `dst` to `name`.
    ///
    /// If `dst` doesn't exist, or `name` is empty, a new location is appended
    /// with `name` as its path, root and upload directory instead.
    pub fn set_location_path(&mut self, name: &str, dst: &str) -> &mut LocationBlock {
        match self.position(dst) {
            Some(idx) if !name.is_empty() => {
                let location = &mut self.server_block.locations[idx];
                location.path = name.to_owned();
                location
            }
            _ => self.add_location(LocationBlock::with_dirs(name, name, name)),
        }
    }

    /// Toggle one permission of location `dst`: 0 is GET, 1 is POST and 2 is
    /// DELETE. Any other selector changes nothing.
    ///
    /// Returns `None`, and creates nothing, if `dst` doesn't exist.
    pub fn flip_permissions(&mut self, method: u32, dst: &str) -> Option<&mut LocationBlock> {
        let location = self.find_location_mut(dst)?;
        if let Some(method) = Method::from_index(method) {
            location.flip(method);
        }
        Some(location)
    }

    /// A new location starts with `dst` as path, root and upload directory.
    pub fn add_location_redir(&mut self, code: u16, path: &str, dst: &str)
                              -> &mut LocationBlock
    {
        let location = self.find_or_create(dst, || LocationBlock::with_dirs(dst, dst, dst));
        insert_code(&mut location.redirects, code, path);
        location
    }

    /// A new location starts with `dst` as path and upload directory.
    pub fn set_root_dir(&mut self, name: &str, dst: &str) -> &mut LocationBlock {
        let location = self.find_or_create(dst, || LocationBlock::with_dirs(dst, name, dst));
        location.root_dir = name.to_owned();
        location
    }

    /// A new location starts with `dst` as path, root and upload directory.
    pub fn set_auto_index(&mut self, value: bool, dst: &str) -> &mut LocationBlock {
        let location = self.find_or_create(dst, || LocationBlock::with_dirs(dst, dst, dst));
        location.auto_index = value;
        location
    }

    /// A new location starts with `dst` as path, root and upload directory.
    pub fn add_location_index(&mut self, index: &str, dst: &str) -> &mut LocationBlock {
        let location = self.find_or_create(dst, || LocationBlock::with_dirs(dst, dst, dst));
        insert_unique(&mut location.indexes, index);
        location
    }

    /// A new location starts with `dst` as path, root and upload directory.
    pub fn add_location_cgi(&mut self, cgi: &str, dst: &str) -> &mut LocationBlock {
        let location = self.find_or_create(dst, || LocationBlock::with_dirs(dst, dst, dst));
        insert_unique(&mut location.cgi_langs, cgi);
        location
    }

    /// A new location starts with `dst` as path and root.
    pub fn set_upload_dir(&mut self, path: &str, dst: &str) -> &mut LocationBlock {
        let location = self.find_or_create(dst, || LocationBlock::with_dirs(dst, dst, path));
        location.upload_dir = path.to_owned();
        location
    }

    /// Remove the first location at `dst`, if any.
    pub fn erase_location(&mut self, dst: &str) {
        if let Some(idx) = self.position(dst) {
            self.server_block.locations.remove(idx);
        }
    }

    pub fn erase_locations(&mut self, range: Range<usize>) -> Result<()> {
        check_range(&range, self.server_block.locations.len())?;
        self.server_block.locations.drain(range);
        Ok(())
    }

    pub fn clear_locations(&mut self) {
        self.server_block.locations.clear();
    }

    /// Remove redirection target `name` for `code` from location `dst`, or
    /// from the server-wide redirections when `dst` is empty. Missing
    /// locations, codes and targets are ignored.
    pub fn erase_redir(&mut self, code: u16, name: &str, dst: &str) {
        if dst.is_empty() {
            remove_code_value(&mut self.server_block.redirects, code, name);
        } else if let Some(location) = self.find_location_mut(dst) {
            remove_code_value(&mut location.redirects, code, name);
        }
    }

    /// Remove index `name` from location `dst`, or from the server default
    /// indexes when `dst` is empty.
    ///
    /// Missing location indexes are ignored, but a missing server default
    /// index fails with `MissingIndex`.
    pub fn erase_index(&mut self, name: &str, dst: &str) -> Result<()> {
        if dst.is_empty() {
            if !remove_first(&mut self.server_block.default_indexes, name) {
                return Err(Error::MissingIndex(name.to_owned()));
            }
        } else if let Some(location) = self.find_location_mut(dst) {
            remove_first(&mut location.indexes, name);
        }
        Ok(())
    }
}

impl fmt::Display for ServerConf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let server = self.server();

        writeln!(f, "Port: {}", server.address.port())?;
        writeln!(f, "Host: {}", server.address.host())?;
        writeln!(f, "Aliases:")?;
        for name in &server.server_names {
            writeln!(f, " -> {}", name)?;
        }
        writeln!(f, "Error redirections:")?;
        for (code, pages) in &server.error_pages {
            writeln!(f, " -> {}", code)?;
            for page in pages {
                writeln!(f, "     * {}", page)?;
            }
        }
        writeln!(f, "Max bytes: {}", server.max_body_bytes)?;

        for location in self.locations() {
            writeln!(f, "----------")?;
            writeln!(f, "Location: {}", location.path)?;
            writeln!(f, " -> Allowed methods:")?;
            for &method in &[Method::Get, Method::Post, Method::Delete] {
                writeln!(f, "     * {}: {}", method.as_str(), location.allows(method))?;
            }
            writeln!(f, " -> Root: {}", location.root_dir)?;
            writeln!(f, " -> Upload Dir: {}", location.upload_dir)?;
            writeln!(f, " -> Auto Index: {}", location.auto_index)?;
            writeln!(f, " -> Index list:")?;
            for index in &location.indexes {
                writeln!(f, "     * {}", index)?;
            }
            writeln!(f, " -> Cgi Languages:")?;
            for cgi in &location.cgi_langs {
                writeln!(f, "     * {}", cgi)?;
            }
            writeln!(f, " -> Redirections:")?;
            for (code, targets) in &location.redirects {
                writeln!(f, "     * {}", code)?;
                for target in targets {
                    writeln!(f, "         - {}", target)?;
                }
            }
            writeln!(f, "----------")?;
        }
        Ok(())
    }
}
