use async_std::task;

use storefront_edge::config::{ServerConfig, set_config};
use storefront_edge::logging::Logger;
use storefront_edge::net::server::Server;

fn main() -> std::io::Result<()> {
    Logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_file(&path),
        None => ServerConfig::default(),
    };
    set_config(config);

    task::block_on(Server.run())
}
