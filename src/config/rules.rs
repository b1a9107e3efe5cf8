//! Directive handlers
//!
//! Each scope has a closed set of directive kinds. A directive is recognised
//! by its name being a prefix of the first word on its line, so a value glued
//! to the name (`root:/var`) is still found. Handlers get the remaining words
//! and either write them into the model or describe why they can't.

use super::address::{validate_port, Family};
use super::collections::{insert_code, insert_unique};
use super::server_conf::ServerConf;
use super::{LocationBlock, Method};
use crate::errors::Result;

use std::net::{Ipv4Addr, Ipv6Addr};

/// Outcome of a handler; the message ends up in a syntax error
pub type RuleResult<T> = ::std::result::Result<T, String>;

/// Directives allowed inside a `location: ... [ ]` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRule {
    LimitExcept,
    Return,
    Root,
    TryFiles,
    AutoIndex,
    Index,
    CgiPass,
    Upload,
}

impl LocationRule {
    pub const ALL: [LocationRule; 8] = [
        LocationRule::LimitExcept,
        LocationRule::Return,
        LocationRule::Root,
        LocationRule::TryFiles,
        LocationRule::AutoIndex,
        LocationRule::Index,
        LocationRule::CgiPass,
        LocationRule::Upload,
    ];

    pub fn name(&self) -> &'static str {
        match *self {
            LocationRule::LimitExcept => "limit_except:",
            LocationRule::Return => "return:",
            LocationRule::Root => "root:",
            LocationRule::TryFiles => "try_files:",
            LocationRule::AutoIndex => "auto_index:",
            LocationRule::Index => "index:",
            LocationRule::CgiPass => "cgi_pass:",
            LocationRule::Upload => "upload:",
        }
    }

    /// Find the rule `word` starts with, along with whatever follows the
    /// name in that same word.
    pub fn lookup(word: &str) -> Option<(LocationRule, &str)> {
        LocationRule::ALL
            .iter()
            .find(|rule| word.starts_with(rule.name()))
            .map(|rule| (*rule, &word[rule.name().len()..]))
    }

    pub fn apply(&self, args: &[String], location: &mut LocationBlock) -> RuleResult<()> {
        match *self {
            LocationRule::LimitExcept => {
                for arg in at_least_one(self.name(), args)? {
                    let method = Method::from_name(arg)
                        .ok_or_else(|| format!("unsupported method `{}`", arg))?;
                    location.allow(method);
                }
            }
            LocationRule::Return => {
                let (code, target) = redirect(self.name(), args)?;
                insert_code(&mut location.redirects, code, target);
            }
            LocationRule::Root => {
                location.root_dir = exactly_one(self.name(), args)?.to_owned();
            }
            LocationRule::TryFiles | LocationRule::Index => {
                for arg in at_least_one(self.name(), args)? {
                    insert_unique(&mut location.indexes, arg);
                }
            }
            LocationRule::AutoIndex => {
                location.auto_index = switch(exactly_one(self.name(), args)?)?;
            }
            LocationRule::CgiPass => {
                for arg in at_least_one(self.name(), args)? {
                    insert_unique(&mut location.cgi_langs, arg);
                }
            }
            LocationRule::Upload => {
                location.upload_dir = exactly_one(self.name(), args)?.to_owned();
            }
        }
        Ok(())
    }
}

/// Directives allowed at server scope, outside any location block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRule {
    Listen,
    ServerName,
    ErrorPage,
    ClientMaxBodySize,
    Index,
    Return,
}

impl ServerRule {
    pub const ALL: [ServerRule; 6] = [
        ServerRule::Listen,
        ServerRule::ServerName,
        ServerRule::ErrorPage,
        ServerRule::ClientMaxBodySize,
        ServerRule::Index,
        ServerRule::Return,
    ];

    pub fn name(&self) -> &'static str {
        match *self {
            ServerRule::Listen => "listen:",
            ServerRule::ServerName => "server_name:",
            ServerRule::ErrorPage => "error_page:",
            ServerRule::ClientMaxBodySize => "client_max_body_size:",
            ServerRule::Index => "index:",
            ServerRule::Return => "return:",
        }
    }

    pub fn lookup(word: &str) -> Option<(ServerRule, &str)> {
        ServerRule::ALL
            .iter()
            .find(|rule| word.starts_with(rule.name()))
            .map(|rule| (*rule, &word[rule.name().len()..]))
    }

    /// Turn the words of a directive into a typed setting.
    pub fn parse(&self, args: &[String]) -> RuleResult<ServerSetting> {
        let setting = match *self {
            ServerRule::Listen => ServerSetting::Listen(listen(args)?),
            ServerRule::ServerName => {
                ServerSetting::ServerNames(at_least_one(self.name(), args)?.to_vec())
            }
            ServerRule::ErrorPage => match args.split_last() {
                Some((page, codes)) if !codes.is_empty() => {
                    let codes = codes.iter()
                        .map(|c| status_code(c))
                        .collect::<RuleResult<Vec<u16>>>()?;
                    ServerSetting::ErrorPage { codes, page: page.clone() }
                }
                _ => {
                    return Err(format!("`{}` takes one or more codes and a page",
                                       self.name()))
                }
            },
            ServerRule::ClientMaxBodySize => {
                ServerSetting::MaxBodyBytes(byte_size(exactly_one(self.name(), args)?)?)
            }
            ServerRule::Index => {
                ServerSetting::Indexes(at_least_one(self.name(), args)?.to_vec())
            }
            ServerRule::Return => {
                let (code, target) = redirect(self.name(), args)?;
                ServerSetting::Redirect { code, target: target.to_owned() }
            }
        };
        Ok(setting)
    }
}

/// A `listen:` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listen {
    /// Host text and the family it parsed as, if one was given
    pub host: Option<(String, Family)>,
    pub port: u32,
}

/// A validated server-scope directive, waiting to be applied to a
/// `ServerConf`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSetting {
    Listen(Listen),
    ServerNames(Vec<String>),
    ErrorPage { codes: Vec<u16>, page: String },
    MaxBodyBytes(u64),
    Indexes(Vec<String>),
    Redirect { code: u16, target: String },
}

impl ServerSetting {
    /// Write this setting into `conf` through the builder operations.
    pub fn apply_to(&self, conf: &mut ServerConf) -> Result<()> {
        match *self {
            ServerSetting::Listen(ref listen) => {
                if let Some((ref host, family)) = listen.host {
                    conf.set_host(host, family)?;
                }
                conf.set_port(listen.port)?;
            }
            ServerSetting::ServerNames(ref names) => {
                for name in names {
                    conf.add_serv_name(name);
                }
            }
            ServerSetting::ErrorPage { ref codes, ref page } => {
                for &code in codes {
                    conf.add_error_page(code, page);
                }
            }
            ServerSetting::MaxBodyBytes(bytes) => conf.set_max_bytes(bytes),
            ServerSetting::Indexes(ref indexes) => {
                for index in indexes {
                    conf.add_index(index);
                }
            }
            ServerSetting::Redirect { code, ref target } => conf.add_redir(code, target),
        }
        Ok(())
    }
}

fn exactly_one<'a>(name: &str, args: &'a [String]) -> RuleResult<&'a str> {
    match args {
        [one] => Ok(one.as_str()),
        _ => Err(format!("`{}` takes exactly one value, got {}", name, args.len())),
    }
}

fn at_least_one<'a>(name: &str, args: &'a [String]) -> RuleResult<&'a [String]> {
    if args.is_empty() {
        return Err(format!("`{}` needs at least one value", name));
    }
    Ok(args)
}

fn redirect<'a>(name: &str, args: &'a [String]) -> RuleResult<(u16, &'a str)> {
    match args {
        [code, target] => Ok((status_code(code)?, target.as_str())),
        _ => Err(format!("`{}` takes a status code and a target", name)),
    }
}

/// An HTTP status code between 100 and 599
fn status_code(text: &str) -> RuleResult<u16> {
    match text.parse::<u16>() {
        Ok(code) if (100..=599).contains(&code) && text.len() == 3 => Ok(code),
        _ => Err(format!("`{}` is not an HTTP status code", text)),
    }
}

fn switch(text: &str) -> RuleResult<bool> {
    match text {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(format!("expected `on` or `off`, got `{}`", text)),
    }
}

/// A byte count, optionally suffixed with `k`, `m` or `g` (powers of 1024)
fn byte_size(text: &str) -> RuleResult<u64> {
    let invalid = || format!("`{}` is not a byte size", text);

    let (digits, multiplier): (&str, u64) = match text.char_indices().last() {
        Some((i, 'k')) | Some((i, 'K')) => (&text[..i], 1 << 10),
        Some((i, 'm')) | Some((i, 'M')) => (&text[..i], 1 << 20),
        Some((i, 'g')) | Some((i, 'G')) => (&text[..i], 1 << 30),
        _ => (text, 1),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits.parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

fn port(text: &str) -> RuleResult<u32> {
    let port = text.parse::<u32>()
        .map_err(|_| format!("`{}` is not a port number", text))?;
    validate_port(port).map_err(|e| e.to_string())?;
    Ok(port)
}

fn host_family(text: &str) -> RuleResult<Family> {
    if text.parse::<Ipv4Addr>().is_ok() {
        Ok(Family::Inet)
    } else if text.parse::<Ipv6Addr>().is_ok() {
        Ok(Family::Inet6)
    } else {
        Err(format!("`{}` is not an IPv4 or IPv6 address", text))
    }
}

/// `PORT`, `IPV4:PORT`, or `HOST PORT`
fn listen(args: &[String]) -> RuleResult<Listen> {
    match args {
        [single] if single.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(Listen { host: None, port: port(single)? })
        }
        [single] => match single.rsplit_once(':') {
            Some((host, p)) if host.parse::<Ipv4Addr>().is_ok() => Ok(Listen {
                host: Some((host.to_owned(), Family::Inet)),
                port: port(p)?,
            }),
            _ => Err(format!("`{}` is not `PORT` or `IPV4:PORT`", single)),
        },
        [host, p] => Ok(Listen {
            host: Some((host.clone(), host_family(host)?)),
            port: port(p)?,
        }),
        _ => Err("`listen:` takes `PORT`, `IPV4:PORT` or `HOST PORT`".to_owned()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(|w| w.to_owned()).collect()
    }

    fn location(rule: LocationRule, line: &str) -> RuleResult<LocationBlock> {
        let mut loc = LocationBlock::default();
        rule.apply(&words(line), &mut loc)?;
        Ok(loc)
    }

    #[test]
    fn lookup_is_by_prefix() {
        assert_eq!(LocationRule::lookup("root:"), Some((LocationRule::Root, "")));
        assert_eq!(LocationRule::lookup("root:/var"), Some((LocationRule::Root, "/var")));
        assert_eq!(LocationRule::lookup("auto_index:"), Some((LocationRule::AutoIndex, "")));
        assert_eq!(LocationRule::lookup("index:"), Some((LocationRule::Index, "")));
        assert_eq!(LocationRule::lookup("myroot:"), None);
        assert_eq!(LocationRule::lookup("root"), None);

        assert_eq!(ServerRule::lookup("listen:"), Some((ServerRule::Listen, "")));
        assert_eq!(ServerRule::lookup("location:"), None);
    }

    #[test]
    fn limit_except_allows_listed_methods() {
        let loc = location(LocationRule::LimitExcept, "GET delete").unwrap();
        assert!(loc.allow_get && loc.allow_delete && !loc.allow_post);

        assert!(location(LocationRule::LimitExcept, "PUT").is_err());
        assert!(location(LocationRule::LimitExcept, "").is_err());
    }

    #[test]
    fn return_adds_redirect_once() {
        let mut loc = LocationBlock::default();
        LocationRule::Return.apply(&words("301 /new"), &mut loc).unwrap();
        LocationRule::Return.apply(&words("301 /new"), &mut loc).unwrap();
        LocationRule::Return.apply(&words("301 /newer"), &mut loc).unwrap();

        assert_eq!(loc.redirects[&301], vec!["/new", "/newer"]);
        assert!(location(LocationRule::Return, "3011 /x").is_err());
        assert!(location(LocationRule::Return, "301").is_err());
        assert!(location(LocationRule::Return, "700 /x").is_err());
    }

    #[test]
    fn scalar_directives() {
        assert_eq!(location(LocationRule::Root, "/var/www").unwrap().root_dir, "/var/www");
        assert!(location(LocationRule::Root, "/a /b").is_err());
        assert_eq!(location(LocationRule::Upload, "/tmp").unwrap().upload_dir, "/tmp");
        assert!(location(LocationRule::AutoIndex, "on").unwrap().auto_index);
        assert!(!location(LocationRule::AutoIndex, "off").unwrap().auto_index);
        assert!(location(LocationRule::AutoIndex, "yes").is_err());
    }

    #[test]
    fn list_directives_keep_order_without_duplicates() {
        let mut loc = LocationBlock::default();
        LocationRule::Index.apply(&words("index.html index.htm"), &mut loc).unwrap();
        LocationRule::TryFiles.apply(&words("index.htm fallback.html"), &mut loc).unwrap();
        LocationRule::CgiPass.apply(&words(".py .php .py"), &mut loc).unwrap();

        assert_eq!(loc.indexes, vec!["index.html", "index.htm", "fallback.html"]);
        assert_eq!(loc.cgi_langs, vec![".py", ".php"]);
    }

    #[test]
    fn listen_forms() {
        assert_eq!(
            ServerRule::Listen.parse(&words("8080")).unwrap(),
            ServerSetting::Listen(Listen { host: None, port: 8080 })
        );
        assert_eq!(
            ServerRule::Listen.parse(&words("127.0.0.1:80")).unwrap(),
            ServerSetting::Listen(Listen {
                host: Some(("127.0.0.1".to_owned(), Family::Inet)),
                port: 80,
            })
        );
        assert_eq!(
            ServerRule::Listen.parse(&words("::1 8081")).unwrap(),
            ServerSetting::Listen(Listen {
                host: Some(("::1".to_owned(), Family::Inet6)),
                port: 8081,
            })
        );
        assert!(ServerRule::Listen.parse(&words("65536")).is_err());
        assert!(ServerRule::Listen.parse(&words("localhost:80")).is_err());
        assert!(ServerRule::Listen.parse(&words("example.com 80")).is_err());
        assert!(ServerRule::Listen.parse(&words("")).is_err());
    }

    #[test]
    fn error_page_takes_codes_then_page() {
        assert_eq!(
            ServerRule::ErrorPage.parse(&words("500 502 /50x.html")).unwrap(),
            ServerSetting::ErrorPage { codes: vec![500, 502], page: "/50x.html".to_owned() }
        );
        assert!(ServerRule::ErrorPage.parse(&words("/50x.html")).is_err());
        assert!(ServerRule::ErrorPage.parse(&words("five /50x.html")).is_err());
    }

    #[test]
    fn body_size_suffixes() {
        assert_eq!(byte_size("512"), Ok(512));
        assert_eq!(byte_size("4k"), Ok(4096));
        assert_eq!(byte_size("1M"), Ok(1 << 20));
        assert_eq!(byte_size("2g"), Ok(2 << 30));
        assert!(byte_size("k").is_err());
        assert!(byte_size("-1").is_err());
        assert!(byte_size("99999999999999999999g").is_err());
    }

    #[test]
    fn settings_apply_through_builder() {
        let mut conf = ServerConf::default();
        let settings = vec![
            ServerRule::Listen.parse(&words("10.0.0.1:8000")).unwrap(),
            ServerRule::ServerName.parse(&words("a b a")).unwrap(),
            ServerRule::ErrorPage.parse(&words("404 /404.html")).unwrap(),
            ServerRule::ClientMaxBodySize.parse(&words("1k")).unwrap(),
            ServerRule::Index.parse(&words("index.html")).unwrap(),
            ServerRule::Return.parse(&words("302 /elsewhere")).unwrap(),
        ];
        for setting in &settings {
            setting.apply_to(&mut conf).unwrap();
        }

        let server = conf.server();
        assert_eq!(server.address.socket_addr().to_string(), "10.0.0.1:8000");
        assert_eq!(server.server_names, vec!["a", "b"]);
        assert_eq!(server.error_pages[&404], vec!["/404.html"]);
        assert_eq!(server.max_body_bytes, 1024);
        assert_eq!(server.default_indexes, vec!["index.html"]);
        assert_eq!(server.redirects[&302], vec!["/elsewhere"]);
    }
}
