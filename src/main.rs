//! Load and check a server configuration.
//!
//! Call it like this:
//!
//!     http-server-conf -f server.conf
//!
//! Without `-f`, `/etc/http-server/server.conf` is read. On success a line
//! per server is logged; `--dump-config` also prints the full configuration.
//! Any error is logged and the process exits with status 1.
//!
//! Logging defaults to the `info` level and can be tuned through the
//! `SERVER_LOG` environment variable, e.g. `SERVER_LOG=http_server_conf=debug`.

#[macro_use] extern crate log;

use http_server_conf::config::load_file;
use http_server_conf::errors::Error;

use clap::{Arg, ArgAction, Command};

use std::env;
use std::io::{stderr, Write};
use std::path::PathBuf;
use std::process::exit;

const DEFAULT_CONFIG: &str = "/etc/http-server/server.conf";

fn main() {
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter_level(log::LevelFilter::Info);

    if let Ok(var) = env::var("SERVER_LOG") {
        log_builder.parse_filters(&var);
    }

    if let Err(e) = log_builder.try_init() {
        let _ = writeln!(stderr(),
                         "http-server-conf: Error when initializing logging: {}",
                         e);
        exit(1);
    }

    let matches = Command::new("http-server-conf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parses and validates an http-server configuration file")
        .arg(Arg::new("config_file")
             .short('f')
             .value_name("FILE")
             .help("The server configuration file")
             .value_parser(clap::value_parser!(PathBuf))
             .default_value(DEFAULT_CONFIG))
        .arg(Arg::new("dump_config")
             .long("dump-config")
             .help("Print every parsed server after loading")
             .action(ArgAction::SetTrue))
        .get_matches();

    let config_file = matches.get_one::<PathBuf>("config_file")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let servers = match load_file(&config_file) {
        Ok(servers) => servers,
        Err(Error::Io(e)) => {
            error!("Error opening config file {:?}: {}", config_file, e);
            exit(1);
        }
        Err(Error::Syntax(e)) => {
            error!("Error parsing config file {:?}", config_file);
            error!("{}", e);
            exit(1);
        }
        Err(e) => {
            error!("Error in config file {:?}: {}", config_file, e);
            exit(1);
        }
    };

    for conf in &servers {
        let server = conf.server();
        info!("Server on {}:{} with {} location(s)",
              server.address.host(), server.address.port(), server.locations.len());
    }

    if matches.get_flag("dump_config") {
        for (i, conf) in servers.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print!("{}", conf);
        }
    }
}
